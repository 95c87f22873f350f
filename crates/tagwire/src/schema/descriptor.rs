// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Descriptors for runtime message type information.

use crate::message::Value;
use crate::schema::SchemaRegistry;
use crate::wire::WireType;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, Weak};

/// Declared field type.
///
/// The variant decides the wire representation: raw varint, zig-zag
/// varint, fixed-width little-endian, or length-prefixed payload.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    Int32,
    Int64,
    UInt32,
    UInt64,
    SInt32,
    SInt64,
    Fixed32,
    Fixed64,
    SFixed32,
    SFixed64,
    Float,
    Double,
    Bool,
    String,
    Bytes,
    Enum(Arc<EnumDescriptor>),
    /// Nested message, referenced by fully-qualified type name.
    ///
    /// Name indirection (resolved through the owning [`SchemaRegistry`])
    /// keeps recursive schemas constructible.
    Message(String),
}

impl FieldType {
    /// Wire-type selector for a single value of this type.
    pub fn wire_type(&self) -> WireType {
        match self {
            Self::Int32
            | Self::Int64
            | Self::UInt32
            | Self::UInt64
            | Self::SInt32
            | Self::SInt64
            | Self::Bool
            | Self::Enum(_) => WireType::Varint,
            Self::Fixed64 | Self::SFixed64 | Self::Double => WireType::Fixed64,
            Self::Fixed32 | Self::SFixed32 | Self::Float => WireType::Fixed32,
            Self::String | Self::Bytes | Self::Message(_) => WireType::LengthDelimited,
        }
    }

    /// Whether repeated values of this type may share one length-prefixed
    /// record (numeric, bool and enum types only).
    pub fn is_packable(&self) -> bool {
        !matches!(self, Self::String | Self::Bytes | Self::Message(_))
    }

    /// Whether this is a nested-message type.
    pub fn is_message(&self) -> bool {
        matches!(self, Self::Message(_))
    }

    /// Short name used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::SInt32 => "sint32",
            Self::SInt64 => "sint64",
            Self::Fixed32 => "fixed32",
            Self::Fixed64 => "fixed64",
            Self::SFixed32 => "sfixed32",
            Self::SFixed64 => "sfixed64",
            Self::Float => "float",
            Self::Double => "double",
            Self::Bool => "bool",
            Self::String => "string",
            Self::Bytes => "bytes",
            Self::Enum(_) => "enum",
            Self::Message(_) => "message",
        }
    }

    /// Zero value for scalar and enum types. `None` for message types,
    /// whose defaults are materialized by the access layer through the
    /// registry.
    pub(crate) fn zero_value(&self) -> Option<Value> {
        Some(match self {
            Self::Int32 | Self::SInt32 | Self::SFixed32 => Value::I32(0),
            Self::Int64 | Self::SInt64 | Self::SFixed64 => Value::I64(0),
            Self::UInt32 | Self::Fixed32 => Value::U32(0),
            Self::UInt64 | Self::Fixed64 => Value::U64(0),
            Self::Float => Value::F32(0.0),
            Self::Double => Value::F64(0.0),
            Self::Bool => Value::Bool(false),
            Self::String => Value::String(String::new()),
            Self::Bytes => Value::Bytes(Vec::new()),
            Self::Enum(e) => Value::Enum(e.default_number()),
            Self::Message(_) => return None,
        })
    }

    /// Whether a single (non-list) value matches this declared type.
    pub(crate) fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Int32 | Self::SInt32 | Self::SFixed32, Value::I32(_))
            | (Self::Int64 | Self::SInt64 | Self::SFixed64, Value::I64(_))
            | (Self::UInt32 | Self::Fixed32, Value::U32(_))
            | (Self::UInt64 | Self::Fixed64, Value::U64(_))
            | (Self::Float, Value::F32(_))
            | (Self::Double, Value::F64(_))
            | (Self::Bool, Value::Bool(_))
            | (Self::String, Value::String(_))
            | (Self::Bytes, Value::Bytes(_))
            | (Self::Enum(_), Value::Enum(_)) => true,
            (Self::Message(name), Value::Message(m)) => m.descriptor().full_name() == name,
            _ => false,
        }
    }
}

/// Field cardinality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Singular,
    Repeated,
}

/// Presence discipline of a singular field.
///
/// Derived once at schema build time and attached to the descriptor, so
/// the access layer and codec dispatch on it without re-deriving:
/// message-typed fields are always `Explicit`, oneof members are
/// `Exclusive`, fields marked optional are `Explicit`, everything else is
/// `Implicit`. Repeated fields carry no meaningful discipline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Present iff the stored value differs from the declared default.
    Implicit,
    /// Present iff the instance's presence bit for this field is set.
    Explicit,
    /// Present iff the owning oneof's discriminant names this field.
    Exclusive,
}

/// Enum variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumVariant {
    pub name: String,
    pub number: i32,
}

impl EnumVariant {
    pub fn new(name: impl Into<String>, number: i32) -> Self {
        Self {
            name: name.into(),
            number,
        }
    }
}

/// Enumeration type descriptor.
///
/// Open-enum semantics: field values outside the declared variants are
/// representable and survive encode/decode untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDescriptor {
    name: String,
    variants: Vec<EnumVariant>,
}

impl EnumDescriptor {
    pub fn new(name: impl Into<String>, variants: Vec<EnumVariant>) -> Self {
        Self {
            name: name.into(),
            variants,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variants(&self) -> &[EnumVariant] {
        &self.variants
    }

    /// Get variant by name.
    pub fn variant_by_name(&self, name: &str) -> Option<&EnumVariant> {
        self.variants.iter().find(|v| v.name == name)
    }

    /// Get variant by number.
    pub fn variant_by_number(&self, number: i32) -> Option<&EnumVariant> {
        self.variants.iter().find(|v| v.number == number)
    }

    /// Default number: the first declared variant.
    pub fn default_number(&self) -> i32 {
        self.variants.first().map_or(0, |v| v.number)
    }
}

/// Field descriptor.
///
/// `presence` and `presence_slot` are derived at build time; callers only
/// read them.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub(crate) name: String,
    pub(crate) number: u32,
    pub(crate) field_type: FieldType,
    pub(crate) cardinality: Cardinality,
    pub(crate) packed: bool,
    pub(crate) oneof_index: Option<usize>,
    pub(crate) default: Option<Value>,
    pub(crate) presence: Presence,
    pub(crate) presence_slot: Option<usize>,
}

impl FieldDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    pub fn is_repeated(&self) -> bool {
        self.cardinality == Cardinality::Repeated
    }

    /// Whether repeated values are encoded as one packed record.
    pub fn is_packed(&self) -> bool {
        self.packed
    }

    /// Index of the owning oneof, if any.
    pub fn oneof_index(&self) -> Option<usize> {
        self.oneof_index
    }

    /// Presence discipline. Meaningful for singular fields only.
    pub fn presence(&self) -> Presence {
        self.presence
    }

    /// Bit index in the instance presence set (`Explicit` fields only).
    pub fn presence_slot(&self) -> Option<usize> {
        self.presence_slot
    }

    /// Declared or zero default for scalar/enum fields.
    ///
    /// `None` for message-typed fields: their default instance is
    /// materialized by the access layer through the registry.
    pub fn default_value(&self) -> Option<Value> {
        if let Some(default) = &self.default {
            return Some(default.clone());
        }
        self.field_type.zero_value()
    }

    /// Wire-type selector for one value of this field.
    pub fn wire_type(&self) -> WireType {
        self.field_type.wire_type()
    }
}

/// Oneof group descriptor: sibling fields sharing one discriminant slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneofDescriptor {
    pub(crate) name: String,
    pub(crate) index: usize,
    pub(crate) members: Vec<u32>,
}

impl OneofDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position in the owning message's oneof list (discriminant slot).
    pub fn index(&self) -> usize {
        self.index
    }

    /// Member field numbers, in declaration order.
    pub fn member_numbers(&self) -> &[u32] {
        &self.members
    }

    pub fn contains(&self, field_number: u32) -> bool {
        self.members.contains(&field_number)
    }
}

/// A complete message type descriptor.
///
/// Fields are kept in ascending field-number order, which the encoder
/// relies on for deterministic output.
#[derive(Debug)]
pub struct MessageDescriptor {
    pub(crate) full_name: String,
    pub(crate) fields: Vec<Arc<FieldDescriptor>>,
    pub(crate) oneofs: Vec<OneofDescriptor>,
    pub(crate) by_number: HashMap<u32, usize>,
    pub(crate) by_name: HashMap<String, usize>,
    pub(crate) explicit_slots: usize,
    pub(crate) registry: OnceLock<Weak<SchemaRegistry>>,
}

impl MessageDescriptor {
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Fields in ascending field-number order.
    pub fn fields(&self) -> &[Arc<FieldDescriptor>] {
        &self.fields
    }

    pub fn oneofs(&self) -> &[OneofDescriptor] {
        &self.oneofs
    }

    pub fn field_by_number(&self, number: u32) -> Option<&Arc<FieldDescriptor>> {
        self.by_number.get(&number).map(|&i| &self.fields[i])
    }

    pub fn field_by_name(&self, name: &str) -> Option<&Arc<FieldDescriptor>> {
        self.by_name.get(name).map(|&i| &self.fields[i])
    }

    pub fn oneof_by_name(&self, name: &str) -> Option<&OneofDescriptor> {
        self.oneofs.iter().find(|o| o.name == name)
    }

    /// Number of explicit presence bits an instance must track.
    pub fn explicit_slots(&self) -> usize {
        self.explicit_slots
    }

    /// The registry this descriptor was built into.
    ///
    /// `None` only if the registry has been dropped while descriptors
    /// outlive it.
    pub fn registry(&self) -> Option<Arc<SchemaRegistry>> {
        self.registry.get().and_then(Weak::upgrade)
    }

    pub(crate) fn attach_registry(&self, registry: &Arc<SchemaRegistry>) {
        // Ignore a second attach; build() calls this exactly once.
        let _ = self.registry.set(Arc::downgrade(registry));
    }

    /// Resolve a nested message type through the owning registry.
    pub fn resolve_message(&self, type_name: &str) -> Option<Arc<MessageDescriptor>> {
        self.registry()?.resolve(type_name).cloned()
    }
}

/// Descriptor identity: same full name.
///
/// Registries are built once per schema, so name equality is the
/// observable contract for "share a descriptor".
pub(crate) fn same_descriptor(a: &Arc<MessageDescriptor>, b: &Arc<MessageDescriptor>) -> bool {
    Arc::ptr_eq(a, b) || a.full_name == b.full_name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_type_mapping() {
        assert_eq!(FieldType::Int32.wire_type(), WireType::Varint);
        assert_eq!(FieldType::SInt64.wire_type(), WireType::Varint);
        assert_eq!(FieldType::Fixed32.wire_type(), WireType::Fixed32);
        assert_eq!(FieldType::Double.wire_type(), WireType::Fixed64);
        assert_eq!(FieldType::Bytes.wire_type(), WireType::LengthDelimited);
        assert_eq!(
            FieldType::Message("m.M".into()).wire_type(),
            WireType::LengthDelimited
        );
    }

    #[test]
    fn test_packable() {
        assert!(FieldType::Int32.is_packable());
        assert!(FieldType::Bool.is_packable());
        assert!(!FieldType::String.is_packable());
        assert!(!FieldType::Message("m.M".into()).is_packable());
    }

    #[test]
    fn test_zero_values() {
        assert_eq!(FieldType::Int32.zero_value(), Some(Value::I32(0)));
        assert_eq!(FieldType::Bool.zero_value(), Some(Value::Bool(false)));
        assert_eq!(
            FieldType::String.zero_value(),
            Some(Value::String(String::new()))
        );
        assert_eq!(FieldType::Message("m.M".into()).zero_value(), None);
    }

    #[test]
    fn test_enum_descriptor_lookup() {
        let desc = EnumDescriptor::new(
            "demo.Color",
            vec![
                EnumVariant::new("RED", 0),
                EnumVariant::new("GREEN", 1),
                EnumVariant::new("BLUE", 2),
            ],
        );
        assert_eq!(desc.variant_by_name("GREEN").map(|v| v.number), Some(1));
        assert_eq!(
            desc.variant_by_number(2).map(|v| v.name.as_str()),
            Some("BLUE")
        );
        assert_eq!(desc.default_number(), 0);
    }

    #[test]
    fn test_accepts() {
        assert!(FieldType::Int32.accepts(&Value::I32(-1)));
        assert!(!FieldType::Int32.accepts(&Value::U32(1)));
        assert!(FieldType::Bytes.accepts(&Value::Bytes(vec![1, 2])));
        assert!(!FieldType::Bytes.accepts(&Value::String("x".into())));
    }
}
