// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Schema model: message descriptors, field descriptors and the registry.
//!
//! A schema is built once through [`SchemaBuilder`], validated in full at
//! build time, and is immutable afterwards. Descriptors are shared via
//! `Arc` and safe for unsynchronized concurrent reads; no validation error
//! can surface later at instance-mutation time.
//!
//! # Example
//!
//! ```rust
//! use tagwire::{FieldType, MessageBuilder, SchemaBuilder};
//!
//! let registry = SchemaBuilder::new()
//!     .message(
//!         MessageBuilder::new("demo.Reading")
//!             .field("sensor_id", 1, FieldType::UInt32)
//!             .optional_field("label", 2, FieldType::String)
//!             .repeated_field("samples", 3, FieldType::Double),
//!     )
//!     .build()
//!     .expect("valid schema");
//!
//! let reading = registry.resolve("demo.Reading").expect("registered");
//! assert_eq!(reading.fields().len(), 3);
//! ```

mod builder;
mod descriptor;
mod registry;

pub use builder::{MessageBuilder, SchemaBuilder};
pub use descriptor::{
    Cardinality, EnumDescriptor, EnumVariant, FieldDescriptor, FieldType, MessageDescriptor,
    OneofDescriptor, Presence,
};
pub use registry::SchemaRegistry;

pub(crate) use descriptor::same_descriptor;

use std::fmt;

/// Errors raised while building a schema.
///
/// All of these are fatal at schema load; a registry that builds
/// successfully can never produce them again.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaError {
    DuplicateMessage { name: String },
    DuplicateFieldNumber { message: String, number: u32 },
    DuplicateFieldName { message: String, name: String },
    InvalidFieldNumber { message: String, field: String, number: u32 },
    ReservedFieldNumber { message: String, field: String, number: u32 },
    UnknownOneofMember { message: String, oneof: String, member: String },
    InvalidOneofMember { message: String, oneof: String, member: String, reason: String },
    UnresolvedType { message: String, field: String, type_name: String },
    InvalidDefault { message: String, field: String, reason: String },
    NotPackable { message: String, field: String },
    EmptyEnum { name: String },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateMessage { name } => write!(f, "duplicate message type: {}", name),
            Self::DuplicateFieldNumber { message, number } => {
                write!(f, "duplicate field number {} in {}", number, message)
            }
            Self::DuplicateFieldName { message, name } => {
                write!(f, "duplicate field name {} in {}", name, message)
            }
            Self::InvalidFieldNumber { message, field, number } => {
                write!(f, "invalid number {} for field {}.{}", number, message, field)
            }
            Self::ReservedFieldNumber { message, field, number } => {
                write!(f, "reserved number {} for field {}.{}", number, message, field)
            }
            Self::UnknownOneofMember { message, oneof, member } => {
                write!(f, "oneof {}.{} names unknown field {}", message, oneof, member)
            }
            Self::InvalidOneofMember { message, oneof, member, reason } => write!(
                f,
                "field {} cannot join oneof {}.{}: {}",
                member, message, oneof, reason
            ),
            Self::UnresolvedType { message, field, type_name } => write!(
                f,
                "field {}.{} references unknown type {}",
                message, field, type_name
            ),
            Self::InvalidDefault { message, field, reason } => {
                write!(f, "invalid default for {}.{}: {}", message, field, reason)
            }
            Self::NotPackable { message, field } => {
                write!(f, "field {}.{} cannot be packed", message, field)
            }
            Self::EmptyEnum { name } => write!(f, "enum {} has no variants", name),
        }
    }
}

impl std::error::Error for SchemaError {}

pub type SchemaResult<T> = core::result::Result<T, SchemaError>;
