// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com
//
// Equality is defined over presence, and merge is defined over equality's
// view: every field present in the source lands in the destination.

use std::sync::Arc;
use tagwire::{
    AccessError, DynamicMessage, FieldType, MessageBuilder, SchemaBuilder, SchemaRegistry, Value,
};

fn build_registry() -> Arc<SchemaRegistry> {
    SchemaBuilder::new()
        .message(
            MessageBuilder::new("mq.Pair")
                .field("first", 1, FieldType::Int32)
                .field("second", 2, FieldType::Int32),
        )
        .message(
            MessageBuilder::new("mq.Holder")
                .field("count", 1, FieldType::Int32)
                .optional_field("label", 2, FieldType::String)
                .message_field("pair", 3, "mq.Pair")
                .repeated_field("items", 4, FieldType::Int32)
                .field("alt_num", 5, FieldType::UInt32)
                .field("alt_text", 6, FieldType::String)
                .oneof("alt", ["alt_num", "alt_text"]),
        )
        .build()
        .expect("schema should build")
}

fn holder(registry: &Arc<SchemaRegistry>) -> DynamicMessage {
    DynamicMessage::new(registry.resolve("mq.Holder").expect("registered"))
}

#[test]
fn merge_sets_absent_scalar() {
    let registry = build_registry();
    let mut dst = holder(&registry);
    let mut src = holder(&registry);
    src.set_by_name("count", 5i32).expect("set");

    dst.merge_from(&src).expect("merge");
    assert!(dst.has_by_name("count").expect("has"));
    assert_eq!(dst.get_by_name("count").expect("get"), Value::I32(5));
}

#[test]
fn merge_overwrites_present_scalar() {
    let registry = build_registry();
    let mut dst = holder(&registry);
    let mut src = holder(&registry);
    dst.set_by_name("label", "old").expect("set");
    src.set_by_name("label", "new").expect("set");

    dst.merge_from(&src).expect("merge");
    assert_eq!(
        dst.get_by_name("label").expect("get"),
        Value::String("new".into())
    );
}

#[test]
fn merge_appends_repeated_in_order() {
    let registry = build_registry();
    let mut dst = holder(&registry);
    let mut src = holder(&registry);
    dst.add_by_name("items", 1i32).expect("add");
    src.add_by_name("items", 2i32).expect("add");
    src.add_by_name("items", 3i32).expect("add");

    dst.merge_from(&src).expect("merge");
    assert_eq!(dst.count_by_name("items").expect("count"), 3);
    assert_eq!(
        dst.get_by_name("items").expect("get"),
        Value::List(vec![Value::I32(1), Value::I32(2), Value::I32(3)])
    );
}

#[test]
fn merge_recurses_into_message_fields() {
    let registry = build_registry();
    let mut dst = holder(&registry);
    let mut src = holder(&registry);
    dst.mutable_by_name("pair")
        .expect("mutable access")
        .set_by_name("first", 1i32)
        .expect("set");
    src.mutable_by_name("pair")
        .expect("mutable access")
        .set_by_name("second", 2i32)
        .expect("set");

    dst.merge_from(&src).expect("merge");
    let pair = dst.get_by_name("pair").expect("get");
    let pair = pair.as_message().expect("message value");
    assert_eq!(pair.get_by_name("first").expect("get"), Value::I32(1));
    assert_eq!(pair.get_by_name("second").expect("get"), Value::I32(2));
}

#[test]
fn merge_overwrites_the_active_oneof_member() {
    let registry = build_registry();
    let mut dst = holder(&registry);
    let mut src = holder(&registry);
    dst.set_by_name("alt_num", 7u32).expect("set");
    src.set_by_name("alt_text", "taken").expect("set");

    dst.merge_from(&src).expect("merge");
    assert_eq!(dst.oneof_case_by_name("alt").expect("case"), Some(6));
    assert!(!dst.has_by_name("alt_num").expect("has"));
    assert_eq!(
        dst.get_by_name("alt_text").expect("get"),
        Value::String("taken".into())
    );
}

#[test]
fn merge_skips_absent_source_fields() {
    let registry = build_registry();
    let mut dst = holder(&registry);
    let src = holder(&registry);
    dst.set_by_name("count", 9i32).expect("set");

    dst.merge_from(&src).expect("merge");
    assert_eq!(dst.get_by_name("count").expect("get"), Value::I32(9));
}

#[test]
fn merge_rejects_different_descriptors() {
    let registry = build_registry();
    let mut dst = holder(&registry);
    let pair = DynamicMessage::new(registry.resolve("mq.Pair").expect("registered"));
    let err = dst.merge_from(&pair).unwrap_err();
    assert!(matches!(err, AccessError::DescriptorMismatch { .. }));
}

#[test]
fn merge_from_bytes_merges_field_wise() {
    let registry = build_registry();
    let mut dst = holder(&registry);
    dst.set_by_name("count", 1i32).expect("set");
    dst.mutable_by_name("pair")
        .expect("mutable access")
        .set_by_name("first", 1i32)
        .expect("set");

    let mut src = holder(&registry);
    src.set_by_name("count", 2i32).expect("set");
    src.mutable_by_name("pair")
        .expect("mutable access")
        .set_by_name("second", 2i32)
        .expect("set");

    dst.merge_from_bytes(&src.encode()).expect("merge bytes");
    assert_eq!(dst.get_by_name("count").expect("get"), Value::I32(2));
    let pair = dst.get_by_name("pair").expect("get");
    let pair = pair.as_message().expect("message value");
    assert_eq!(pair.get_by_name("first").expect("get"), Value::I32(1));
    assert_eq!(pair.get_by_name("second").expect("get"), Value::I32(2));
}

#[test]
fn merge_concatenates_unknown_fields() {
    let full = SchemaBuilder::new()
        .message(
            MessageBuilder::new("mq.Wide")
                .field("a", 1, FieldType::UInt32)
                .field("x", 7, FieldType::UInt32)
                .field("y", 8, FieldType::UInt32),
        )
        .build()
        .expect("schema should build");
    let narrow = SchemaBuilder::new()
        .message(MessageBuilder::new("mq.Wide").field("a", 1, FieldType::UInt32))
        .build()
        .expect("schema should build");

    let narrow_descriptor = narrow.resolve("mq.Wide").expect("registered");
    let mut one = DynamicMessage::new(full.resolve("mq.Wide").expect("registered"));
    one.set_by_name("x", 1u32).expect("set");
    let mut two = DynamicMessage::new(full.resolve("mq.Wide").expect("registered"));
    two.set_by_name("y", 2u32).expect("set");

    let mut dst = tagwire::decode(narrow_descriptor, &one.encode()).expect("decode");
    let src = tagwire::decode(narrow_descriptor, &two.encode()).expect("decode");
    dst.merge_from(&src).expect("merge");

    let widened = tagwire::decode(full.resolve("mq.Wide").expect("registered"), &dst.encode())
        .expect("decode");
    assert_eq!(widened.get_by_name("x").expect("get"), Value::U32(1));
    assert_eq!(widened.get_by_name("y").expect("get"), Value::U32(2));
}

#[test]
fn equality_ignores_implicit_defaults_but_not_explicit_ones() {
    let registry = build_registry();
    let mut touched = holder(&registry);
    let untouched = holder(&registry);

    // Implicit field written at its default: indistinguishable.
    touched.set_by_name("count", 0i32).expect("set");
    assert_eq!(touched, untouched);

    // Explicit field written at its default: observable.
    touched.set_by_name("label", "").expect("set");
    assert_ne!(touched, untouched);
}

#[test]
fn equality_sees_a_default_valued_oneof_member() {
    let registry = build_registry();
    let mut chosen = holder(&registry);
    let untouched = holder(&registry);
    chosen.set_by_name("alt_num", 0u32).expect("set");
    assert_ne!(chosen, untouched);
}

#[test]
fn equality_holds_across_registry_builds() {
    let first = build_registry();
    let second = build_registry();

    let mut a = holder(&first);
    let mut b = holder(&second);
    a.set_by_name("count", 3i32).expect("set");
    b.set_by_name("count", 3i32).expect("set");
    assert_eq!(a, b);

    b.set_by_name("count", 4i32).expect("set");
    assert_ne!(a, b);
}

#[test]
fn equality_compares_sub_messages_recursively() {
    let registry = build_registry();
    let mut a = holder(&registry);
    let mut b = holder(&registry);
    a.mutable_by_name("pair")
        .expect("mutable access")
        .set_by_name("first", 1i32)
        .expect("set");
    b.mutable_by_name("pair")
        .expect("mutable access")
        .set_by_name("first", 1i32)
        .expect("set");
    assert_eq!(a, b);

    b.mutable_by_name("pair")
        .expect("mutable access")
        .set_by_name("second", 2i32)
        .expect("set");
    assert_ne!(a, b);
}

#[test]
fn equality_ignores_unknown_fields() {
    let full = SchemaBuilder::new()
        .message(
            MessageBuilder::new("mq.Wide")
                .field("a", 1, FieldType::UInt32)
                .field("x", 7, FieldType::UInt32),
        )
        .build()
        .expect("schema should build");
    let narrow = SchemaBuilder::new()
        .message(MessageBuilder::new("mq.Wide").field("a", 1, FieldType::UInt32))
        .build()
        .expect("schema should build");
    let narrow_descriptor = narrow.resolve("mq.Wide").expect("registered");

    let mut original = DynamicMessage::new(full.resolve("mq.Wide").expect("registered"));
    original.set_by_name("a", 1u32).expect("set");
    original.set_by_name("x", 2u32).expect("set");

    let with_unknown = tagwire::decode(narrow_descriptor, &original.encode()).expect("decode");
    let mut plain = DynamicMessage::new(narrow_descriptor);
    plain.set_by_name("a", 1u32).expect("set");

    assert!(!with_unknown.unknown_fields().is_empty());
    assert_eq!(with_unknown, plain);
}
