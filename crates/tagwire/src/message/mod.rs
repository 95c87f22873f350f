// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Dynamic message instances: typed field storage, presence tracking and
//! the reflective access layer.
//!
//! [`DynamicMessage`] is the single presence authority: generated typed
//! accessors and generic schema-driven tooling both delegate here, so
//! `has`/`get`/`set`/`clear` behave identically on every path.
//!
//! Instances are mutated from one thread at a time (not guarded); shared
//! references are safe for concurrent reads, including concurrent encode
//! calls.

mod dynamic;
mod presence;
mod value;

pub use dynamic::DynamicMessage;
pub use presence::PresenceSet;
pub use value::Value;

use std::fmt;

/// Errors for reflective access operations.
///
/// A failed call leaves the instance unmodified.
#[derive(Debug, Clone, PartialEq)]
pub enum AccessError {
    /// Field descriptor does not belong to this message's descriptor.
    ForeignField { field: String, message: String },
    /// No field with that name in this message's descriptor.
    FieldNotFound { message: String, name: String },
    /// Value kind does not match the field's declared type.
    TypeMismatch { field: String, expected: &'static str, got: &'static str },
    /// Operation not applicable to the field's cardinality or type.
    InvalidOperation(String),
    IndexOutOfBounds { index: usize, length: usize },
    /// Merge partners are instances of different message types.
    DescriptorMismatch { left: String, right: String },
    /// Nested type name did not resolve through the registry.
    ///
    /// Unreachable once a schema has built successfully; still reported
    /// rather than panicking.
    UnresolvedType { type_name: String },
}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ForeignField { field, message } => {
                write!(f, "field {} does not belong to message {}", field, message)
            }
            Self::FieldNotFound { message, name } => {
                write!(f, "no field named {} in {}", name, message)
            }
            Self::TypeMismatch { field, expected, got } => {
                write!(f, "type mismatch on {}: expected {}, got {}", field, expected, got)
            }
            Self::InvalidOperation(msg) => write!(f, "invalid operation: {}", msg),
            Self::IndexOutOfBounds { index, length } => {
                write!(f, "index out of bounds: {} >= {}", index, length)
            }
            Self::DescriptorMismatch { left, right } => {
                write!(f, "descriptor mismatch: {} vs {}", left, right)
            }
            Self::UnresolvedType { type_name } => {
                write!(f, "unresolved message type: {}", type_name)
            }
        }
    }
}

impl std::error::Error for AccessError {}

pub type AccessResult<T> = core::result::Result<T, AccessError>;
