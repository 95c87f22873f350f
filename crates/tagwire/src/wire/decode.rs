// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Decoder: record stream to message instance.
//!
//! Records may arrive in any order. Presence is marked per the field's
//! discipline even when a decoded value equals the declared default, so
//! a zero-length sub-message record or a oneof member at its default
//! survives a round trip as present. Any malformed input aborts the whole
//! decode; no partial message is returned.

use crate::config::DecodeLimits;
use crate::message::{DynamicMessage, Value};
use crate::schema::{FieldDescriptor, FieldType, MessageDescriptor};
use crate::wire::{varint, DecodeError, DecodeResult, WireReader, WireType};
use std::sync::Arc;

/// Decode a fresh instance of `descriptor` from `bytes`.
pub fn decode(descriptor: &Arc<MessageDescriptor>, bytes: &[u8]) -> DecodeResult<DynamicMessage> {
    decode_with_limits(descriptor, bytes, DecodeLimits::default())
}

/// [`decode`] with custom limits.
pub fn decode_with_limits(
    descriptor: &Arc<MessageDescriptor>,
    bytes: &[u8],
    limits: DecodeLimits,
) -> DecodeResult<DynamicMessage> {
    let mut msg = DynamicMessage::new(descriptor);
    merge_message(&mut msg, bytes, limits)?;
    Ok(msg)
}

/// Decode `bytes` into an existing instance, field-wise merging with its
/// current contents.
pub(crate) fn merge_message(
    msg: &mut DynamicMessage,
    bytes: &[u8],
    limits: DecodeLimits,
) -> DecodeResult<()> {
    let mut reader = WireReader::new(bytes);
    merge_records(msg, &mut reader, limits.recursion_limit, limits)
}

fn merge_records(
    msg: &mut DynamicMessage,
    reader: &mut WireReader<'_>,
    depth: usize,
    limits: DecodeLimits,
) -> DecodeResult<()> {
    loop {
        let record_start = reader.offset();
        let Some((field_number, wire_type)) = reader.read_tag()? else {
            return Ok(());
        };
        match msg.descriptor().field_by_number(field_number).cloned() {
            Some(field) => decode_field(msg, &field, wire_type, reader, depth, limits)?,
            None => {
                skip_payload(reader, wire_type)?;
                let raw = reader.slice_from(record_start);
                log::debug!(
                    "[wire] preserving unknown field {} ({} bytes) in {}",
                    field_number,
                    raw.len(),
                    msg.descriptor().full_name()
                );
                msg.push_unknown(raw);
            }
        }
    }
}

fn decode_field(
    msg: &mut DynamicMessage,
    field: &Arc<FieldDescriptor>,
    wire_type: WireType,
    reader: &mut WireReader<'_>,
    depth: usize,
    limits: DecodeLimits,
) -> DecodeResult<()> {
    let declared = field.wire_type();
    if field.is_repeated() {
        // A length-delimited record on a numeric repeated field is a
        // packed run, whether or not the descriptor asks for packed
        // output.
        if wire_type == WireType::LengthDelimited && declared != WireType::LengthDelimited {
            let len = reader.read_len()?;
            let payload = reader.read_bytes(len)?;
            let mut packed = WireReader::new(payload);
            while !packed.is_eof() {
                let value = read_scalar(&mut packed, field)?;
                msg.append_element(field, value);
            }
            return Ok(());
        }
        if wire_type != declared {
            return Err(DecodeError::WireTypeMismatch {
                field: field.name().to_string(),
                expected: declared,
                got: wire_type,
            });
        }
        let value = if let FieldType::Message(type_name) = field.field_type() {
            decode_message_element(msg, type_name, reader, depth, limits)?
        } else {
            read_scalar(reader, field)?
        };
        msg.append_element(field, value);
        return Ok(());
    }

    if wire_type != declared {
        return Err(DecodeError::WireTypeMismatch {
            field: field.name().to_string(),
            expected: declared,
            got: wire_type,
        });
    }
    if let FieldType::Message(type_name) = field.field_type() {
        // Recursive merge into an existing sub-message, else materialize
        // fresh; either way the field is present afterwards, even for a
        // zero-length payload.
        if depth == 0 {
            return Err(DecodeError::RecursionLimit {
                limit: limits.recursion_limit,
            });
        }
        let sub_descriptor = resolve_type(msg, type_name)?;
        let len = reader.read_len()?;
        let payload = reader.read_bytes(len)?;
        let sub = msg.sub_message_slot(field, &sub_descriptor);
        let mut sub_reader = WireReader::new(payload);
        merge_records(sub, &mut sub_reader, depth - 1, limits)
    } else {
        let value = read_scalar(reader, field)?;
        msg.store_singular(field, value);
        Ok(())
    }
}

fn decode_message_element(
    msg: &DynamicMessage,
    type_name: &str,
    reader: &mut WireReader<'_>,
    depth: usize,
    limits: DecodeLimits,
) -> DecodeResult<Value> {
    if depth == 0 {
        return Err(DecodeError::RecursionLimit {
            limit: limits.recursion_limit,
        });
    }
    let sub_descriptor = resolve_type(msg, type_name)?;
    let len = reader.read_len()?;
    let payload = reader.read_bytes(len)?;
    let mut sub = DynamicMessage::new(&sub_descriptor);
    let mut sub_reader = WireReader::new(payload);
    merge_records(&mut sub, &mut sub_reader, depth - 1, limits)?;
    Ok(Value::Message(Box::new(sub)))
}

fn resolve_type(msg: &DynamicMessage, type_name: &str) -> DecodeResult<Arc<MessageDescriptor>> {
    msg.descriptor()
        .resolve_message(type_name)
        .ok_or_else(|| DecodeError::UnresolvedType {
            type_name: type_name.to_string(),
        })
}

/// Read one non-message payload of the field's declared type.
fn read_scalar(reader: &mut WireReader<'_>, field: &FieldDescriptor) -> DecodeResult<Value> {
    Ok(match field.field_type() {
        FieldType::Int32 => Value::I32(reader.read_varint()? as i32),
        FieldType::Int64 => Value::I64(reader.read_varint()? as i64),
        FieldType::UInt32 => Value::U32(reader.read_varint()? as u32),
        FieldType::UInt64 => Value::U64(reader.read_varint()?),
        FieldType::SInt32 => Value::I32(varint::unzigzag32(reader.read_varint()? as u32)),
        FieldType::SInt64 => Value::I64(varint::unzigzag64(reader.read_varint()?)),
        FieldType::Fixed32 => Value::U32(reader.read_fixed32()?),
        FieldType::Fixed64 => Value::U64(reader.read_fixed64()?),
        FieldType::SFixed32 => Value::I32(reader.read_fixed32()? as i32),
        FieldType::SFixed64 => Value::I64(reader.read_fixed64()? as i64),
        FieldType::Float => Value::F32(f32::from_bits(reader.read_fixed32()?)),
        FieldType::Double => Value::F64(f64::from_bits(reader.read_fixed64()?)),
        FieldType::Bool => Value::Bool(reader.read_varint()? != 0),
        // Open enum: numbers outside the declared variants are kept.
        FieldType::Enum(_) => Value::Enum(reader.read_varint()? as i32),
        FieldType::String => {
            let len = reader.read_len()?;
            let bytes = reader.read_bytes(len)?;
            let text = String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidUtf8 {
                field: field.name().to_string(),
            })?;
            Value::String(text)
        }
        FieldType::Bytes => {
            let len = reader.read_len()?;
            Value::Bytes(reader.read_bytes(len)?.to_vec())
        }
        // Message payloads never reach here; kept total for safety.
        FieldType::Message(type_name) => {
            return Err(DecodeError::UnresolvedType {
                type_name: type_name.clone(),
            })
        }
    })
}

fn skip_payload(reader: &mut WireReader<'_>, wire_type: WireType) -> DecodeResult<()> {
    match wire_type {
        WireType::Varint => {
            reader.read_varint()?;
        }
        WireType::Fixed32 => {
            reader.read_bytes(4)?;
        }
        WireType::Fixed64 => {
            reader.read_bytes(8)?;
        }
        WireType::LengthDelimited => {
            let len = reader.read_len()?;
            reader.read_bytes(len)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{MessageBuilder, SchemaBuilder};

    fn single_field_registry(field_type: FieldType) -> Arc<crate::schema::SchemaRegistry> {
        SchemaBuilder::new()
            .message(MessageBuilder::new("t.M").field("a", 1, field_type))
            .build()
            .expect("schema should build")
    }

    #[test]
    fn test_decode_varint_field() {
        let registry = single_field_registry(FieldType::Int32);
        let descriptor = registry.resolve("t.M").expect("registered");
        let msg = decode(descriptor, &[0x08, 0x96, 0x01]).expect("decode");
        assert_eq!(msg.get_by_name("a").expect("get"), Value::I32(150));
    }

    #[test]
    fn test_decode_out_of_order_records() {
        let registry = SchemaBuilder::new()
            .message(
                MessageBuilder::new("t.M")
                    .field("a", 1, FieldType::Int32)
                    .field("b", 2, FieldType::Int32),
            )
            .build()
            .expect("schema should build");
        let descriptor = registry.resolve("t.M").expect("registered");
        // b first, then a: must decode identically to ascending order.
        let msg = decode(descriptor, &[0x10, 0x02, 0x08, 0x01]).expect("decode");
        assert_eq!(msg.get_by_name("a").expect("get"), Value::I32(1));
        assert_eq!(msg.get_by_name("b").expect("get"), Value::I32(2));
    }

    #[test]
    fn test_last_record_wins_for_singular() {
        let registry = single_field_registry(FieldType::Int32);
        let descriptor = registry.resolve("t.M").expect("registered");
        let msg = decode(descriptor, &[0x08, 0x01, 0x08, 0x05]).expect("decode");
        assert_eq!(msg.get_by_name("a").expect("get"), Value::I32(5));
    }

    #[test]
    fn test_truncated_varint_fails() {
        let registry = single_field_registry(FieldType::Int32);
        let descriptor = registry.resolve("t.M").expect("registered");
        let err = decode(descriptor, &[0x08, 0x96]).unwrap_err();
        assert_eq!(err, DecodeError::Truncated { offset: 2 });
    }

    #[test]
    fn test_wire_type_mismatch_fails() {
        let registry = single_field_registry(FieldType::Int32);
        let descriptor = registry.resolve("t.M").expect("registered");
        // Field 1 as fixed32 against declared varint.
        let err = decode(descriptor, &[0x0D, 0x01, 0x00, 0x00, 0x00]).unwrap_err();
        assert!(matches!(err, DecodeError::WireTypeMismatch { .. }));
    }

    #[test]
    fn test_length_overflow_fails() {
        let registry = single_field_registry(FieldType::Bytes);
        let descriptor = registry.resolve("t.M").expect("registered");
        let err = decode(descriptor, &[0x0A, 0x05, 0x01]).unwrap_err();
        assert!(matches!(err, DecodeError::LengthOverflow { .. }));
    }

    #[test]
    fn test_invalid_utf8_fails() {
        let registry = single_field_registry(FieldType::String);
        let descriptor = registry.resolve("t.M").expect("registered");
        let err = decode(descriptor, &[0x0A, 0x02, 0xFF, 0xFE]).unwrap_err();
        assert_eq!(err, DecodeError::InvalidUtf8 { field: "a".into() });
    }

    #[test]
    fn test_unknown_field_preserved_verbatim() {
        let registry = single_field_registry(FieldType::Int32);
        let descriptor = registry.resolve("t.M").expect("registered");
        // Known field 1 plus unknown field 9 (varint 7).
        let msg = decode(descriptor, &[0x08, 0x01, 0x48, 0x07]).expect("decode");
        assert_eq!(msg.unknown_fields(), &[0x48, 0x07]);
        // Re-encode carries the unknown record after known fields.
        assert_eq!(msg.encode(), [0x08, 0x01, 0x48, 0x07]);
    }

    #[test]
    fn test_packed_and_expanded_decode_agree() {
        let registry = SchemaBuilder::new()
            .message(MessageBuilder::new("t.M").repeated_field("v", 1, FieldType::Int32))
            .build()
            .expect("schema should build");
        let descriptor = registry.resolve("t.M").expect("registered");

        let expanded = decode(descriptor, &[0x08, 0x01, 0x08, 0x02, 0x08, 0x03]).expect("decode");
        let packed = decode(descriptor, &[0x0A, 0x03, 0x01, 0x02, 0x03]).expect("decode");
        assert_eq!(expanded, packed);
        assert_eq!(packed.count_by_name("v").expect("count"), 3);
    }

    #[test]
    fn test_recursion_limit_enforced() {
        let registry = SchemaBuilder::new()
            .message(
                MessageBuilder::new("t.Node")
                    .field("v", 1, FieldType::Int32)
                    .message_field("next", 2, "t.Node"),
            )
            .build()
            .expect("schema should build");
        let descriptor = registry.resolve("t.Node").expect("registered");

        // Deeply nested: each level is `next { ... }`.
        let mut bytes: Vec<u8> = Vec::new();
        for _ in 0..8 {
            let mut outer = vec![0x12, bytes.len() as u8];
            outer.extend_from_slice(&bytes);
            bytes = outer;
        }
        let limits = DecodeLimits::with_recursion_limit(4);
        let err = decode_with_limits(descriptor, &bytes, limits).unwrap_err();
        assert_eq!(err, DecodeError::RecursionLimit { limit: 4 });

        assert!(decode(descriptor, &bytes).is_ok());
    }
}
