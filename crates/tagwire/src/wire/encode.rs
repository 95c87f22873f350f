// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Encoder: presence-driven two-pass serialization.
//!
//! Pass one ([`serialized_size`]) computes the exact byte length; pass
//! two writes into a buffer reserved at that size. Fields are walked in
//! ascending field-number order, so output is deterministic for a given
//! instance.

use crate::message::{DynamicMessage, Value};
use crate::schema::{FieldDescriptor, FieldType};
use crate::wire::{varint, WireType, WireWriter};

/// Exact byte length [`encode`] will produce for `msg`.
///
/// A message with nothing present (and no unknown fields) sizes to 0,
/// regardless of how many fields its schema declares.
pub fn serialized_size(msg: &DynamicMessage) -> usize {
    let mut size = 0;
    for field in msg.descriptor().fields() {
        if field.is_repeated() {
            size += repeated_size(msg, field);
        } else if msg.field_present(field) {
            if let Some(value) = msg.stored(field.number()) {
                size += tag_size(field.number()) + payload_size(field.field_type(), value);
            }
        }
    }
    size + msg.unknown_fields().len()
}

/// Encode `msg` to the wire format. Never fails for a structurally valid
/// instance.
pub fn encode(msg: &DynamicMessage) -> Vec<u8> {
    let size = serialized_size(msg);
    let mut writer = WireWriter::with_capacity(size);
    write_message(msg, &mut writer);
    debug_assert_eq!(writer.len(), size, "size pass disagrees with write pass");
    writer.into_bytes()
}

/// Encode `msg`, appending to `out`.
pub fn encode_to(msg: &DynamicMessage, out: &mut Vec<u8>) {
    let mut writer = WireWriter::from_vec(std::mem::take(out));
    write_message(msg, &mut writer);
    *out = writer.into_bytes();
}

fn tag_size(field_number: u32) -> usize {
    varint::encoded_len(u64::from(field_number) << crate::config::TAG_TYPE_BITS)
}

fn repeated_size(msg: &DynamicMessage, field: &FieldDescriptor) -> usize {
    let Some(Value::List(list)) = msg.stored(field.number()) else {
        return 0;
    };
    if list.is_empty() {
        return 0;
    }
    if field.is_packed() {
        let payload: usize = list
            .iter()
            .map(|value| payload_size(field.field_type(), value))
            .sum();
        tag_size(field.number()) + varint::encoded_len(payload as u64) + payload
    } else {
        list.iter()
            .map(|value| tag_size(field.number()) + payload_size(field.field_type(), value))
            .sum()
    }
}

/// Payload byte length of one value, including the length prefix for
/// length-delimited types.
fn payload_size(field_type: &FieldType, value: &Value) -> usize {
    match field_type {
        FieldType::Int32 => varint::encoded_len(value.as_i32().unwrap_or(0) as i64 as u64),
        FieldType::Int64 => varint::encoded_len(value.as_i64().unwrap_or(0) as u64),
        FieldType::UInt32 => varint::encoded_len(u64::from(value.as_u32().unwrap_or(0))),
        FieldType::UInt64 => varint::encoded_len(value.as_u64().unwrap_or(0)),
        FieldType::SInt32 => {
            varint::encoded_len(u64::from(varint::zigzag32(value.as_i32().unwrap_or(0))))
        }
        FieldType::SInt64 => varint::encoded_len(varint::zigzag64(value.as_i64().unwrap_or(0))),
        FieldType::Fixed32 | FieldType::SFixed32 | FieldType::Float => 4,
        FieldType::Fixed64 | FieldType::SFixed64 | FieldType::Double => 8,
        FieldType::Bool => 1,
        FieldType::Enum(_) => varint::encoded_len(value.as_enum().unwrap_or(0) as i64 as u64),
        FieldType::String => {
            let len = value.as_str().map_or(0, str::len);
            varint::encoded_len(len as u64) + len
        }
        FieldType::Bytes => {
            let len = value.as_bytes().map_or(0, <[u8]>::len);
            varint::encoded_len(len as u64) + len
        }
        FieldType::Message(_) => {
            let len = value.as_message().map_or(0, serialized_size);
            varint::encoded_len(len as u64) + len
        }
    }
}

fn write_message(msg: &DynamicMessage, writer: &mut WireWriter) {
    for field in msg.descriptor().fields() {
        if field.is_repeated() {
            write_repeated(msg, field, writer);
        } else if msg.field_present(field) {
            if let Some(value) = msg.stored(field.number()) {
                writer.put_tag(field.number(), field.wire_type());
                write_payload(writer, field.field_type(), value);
            }
        }
    }
    writer.put_bytes(msg.unknown_fields());
}

fn write_repeated(msg: &DynamicMessage, field: &FieldDescriptor, writer: &mut WireWriter) {
    let Some(Value::List(list)) = msg.stored(field.number()) else {
        return;
    };
    if list.is_empty() {
        return;
    }
    if field.is_packed() {
        let payload: usize = list
            .iter()
            .map(|value| payload_size(field.field_type(), value))
            .sum();
        writer.put_tag(field.number(), WireType::LengthDelimited);
        writer.put_varint(payload as u64);
        for value in list {
            write_payload(writer, field.field_type(), value);
        }
    } else {
        for value in list {
            writer.put_tag(field.number(), field.wire_type());
            write_payload(writer, field.field_type(), value);
        }
    }
}

fn write_payload(writer: &mut WireWriter, field_type: &FieldType, value: &Value) {
    match field_type {
        FieldType::Int32 => writer.put_varint(value.as_i32().unwrap_or(0) as i64 as u64),
        FieldType::Int64 => writer.put_varint(value.as_i64().unwrap_or(0) as u64),
        FieldType::UInt32 => writer.put_varint(u64::from(value.as_u32().unwrap_or(0))),
        FieldType::UInt64 => writer.put_varint(value.as_u64().unwrap_or(0)),
        FieldType::SInt32 => {
            writer.put_varint(u64::from(varint::zigzag32(value.as_i32().unwrap_or(0))));
        }
        FieldType::SInt64 => writer.put_varint(varint::zigzag64(value.as_i64().unwrap_or(0))),
        FieldType::Fixed32 => writer.put_fixed32(value.as_u32().unwrap_or(0)),
        FieldType::Fixed64 => writer.put_fixed64(value.as_u64().unwrap_or(0)),
        FieldType::SFixed32 => writer.put_fixed32(value.as_i32().unwrap_or(0) as u32),
        FieldType::SFixed64 => writer.put_fixed64(value.as_i64().unwrap_or(0) as u64),
        FieldType::Float => writer.put_fixed32(value.as_f32().unwrap_or(0.0).to_bits()),
        FieldType::Double => writer.put_fixed64(value.as_f64().unwrap_or(0.0).to_bits()),
        FieldType::Bool => writer.put_varint(u64::from(value.as_bool().unwrap_or(false))),
        FieldType::Enum(_) => writer.put_varint(value.as_enum().unwrap_or(0) as i64 as u64),
        FieldType::String => {
            writer.put_len_prefixed(value.as_str().unwrap_or("").as_bytes());
        }
        FieldType::Bytes => writer.put_len_prefixed(value.as_bytes().unwrap_or(&[])),
        FieldType::Message(_) => match value.as_message() {
            Some(sub) => {
                writer.put_varint(serialized_size(sub) as u64);
                write_message(sub, writer);
            }
            None => writer.put_varint(0),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{MessageBuilder, SchemaBuilder};

    #[test]
    fn test_empty_message_encodes_to_nothing() {
        let registry = SchemaBuilder::new()
            .message(
                MessageBuilder::new("t.M")
                    .field("a", 1, FieldType::Int32)
                    .optional_field("b", 2, FieldType::String),
            )
            .build()
            .expect("schema should build");
        let msg = DynamicMessage::new(registry.resolve("t.M").expect("registered"));
        assert_eq!(serialized_size(&msg), 0);
        assert!(encode(&msg).is_empty());
    }

    #[test]
    fn test_varint_field_golden() {
        let registry = SchemaBuilder::new()
            .message(MessageBuilder::new("t.M").field("a", 1, FieldType::Int32))
            .build()
            .expect("schema should build");
        let mut msg = DynamicMessage::new(registry.resolve("t.M").expect("registered"));
        msg.set_by_name("a", 150i32).expect("set");
        assert_eq!(encode(&msg), [0x08, 0x96, 0x01]);
        assert_eq!(serialized_size(&msg), 3);
    }

    #[test]
    fn test_negative_int32_sign_extends() {
        let registry = SchemaBuilder::new()
            .message(MessageBuilder::new("t.M").field("a", 1, FieldType::Int32))
            .build()
            .expect("schema should build");
        let mut msg = DynamicMessage::new(registry.resolve("t.M").expect("registered"));
        msg.set_by_name("a", -1i32).expect("set");
        assert_eq!(
            encode(&msg),
            [0x08, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]
        );
    }

    #[test]
    fn test_encode_to_appends() {
        let registry = SchemaBuilder::new()
            .message(MessageBuilder::new("t.M").field("a", 1, FieldType::Int32))
            .build()
            .expect("schema should build");
        let mut msg = DynamicMessage::new(registry.resolve("t.M").expect("registered"));
        msg.set_by_name("a", 1i32).expect("set");
        let mut out = vec![0xAA];
        encode_to(&msg, &mut out);
        assert_eq!(out, [0xAA, 0x08, 0x01]);
    }
}
