// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire codec: tag/varint records over a byte sequence.
//!
//! Each field record is a tag varint (`field_number << 3 | wire_type`)
//! followed by a payload determined by the wire type. Encoding walks
//! fields in ascending field-number order for reproducible output;
//! decoding accepts records in any order.
//!
//! Encoding never fails for a structurally valid instance. Decoding is
//! all-or-nothing: any malformed input aborts with a [`DecodeError`] and
//! no partial message is returned.

mod decode;
mod encode;
mod reader;
pub mod varint;
mod writer;

pub use decode::{decode, decode_with_limits};
pub use encode::{encode, encode_to, serialized_size};
pub use reader::WireReader;
pub use writer::WireWriter;

pub(crate) use decode::merge_message;

use std::fmt;

/// Wire-type selector carried in the low tag bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    /// Raw or zig-zag varint payload (integers, bool, enum).
    Varint = 0,
    /// 8-byte little-endian payload.
    Fixed64 = 1,
    /// Varint length prefix + that many bytes (string, bytes, nested
    /// message, packed repeated).
    LengthDelimited = 2,
    /// 4-byte little-endian payload.
    Fixed32 = 5,
}

impl WireType {
    /// Parse a wire-type selector. Selectors 3 and 4 (legacy group
    /// delimiters) and 6/7 are rejected.
    pub fn from_id(id: u32) -> Option<Self> {
        match id {
            0 => Some(Self::Varint),
            1 => Some(Self::Fixed64),
            2 => Some(Self::LengthDelimited),
            5 => Some(Self::Fixed32),
            _ => None,
        }
    }

    pub fn id(self) -> u32 {
        self as u32
    }
}

/// Errors raised while decoding.
///
/// Every variant is fatal for the whole decode call.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// Input ended mid-record.
    Truncated { offset: usize },
    /// Varint ran past its maximum encoded length.
    InvalidVarint { offset: usize },
    /// Record tag carried field number 0.
    InvalidFieldNumber { offset: usize },
    /// Unsupported wire-type selector (3, 4, 6 or 7).
    InvalidWireType { offset: usize, wire_type: u32 },
    /// Known field arrived with a wire type other than its declared one.
    WireTypeMismatch { field: String, expected: WireType, got: WireType },
    /// Length prefix exceeds the remaining input.
    LengthOverflow { offset: usize, length: u64, remaining: usize },
    /// Sub-message nesting exceeded the configured limit.
    RecursionLimit { limit: usize },
    /// String field payload was not valid UTF-8.
    InvalidUtf8 { field: String },
    /// Nested type name did not resolve through the registry.
    UnresolvedType { type_name: String },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated { offset } => write!(f, "input truncated at offset {}", offset),
            Self::InvalidVarint { offset } => {
                write!(f, "varint too long at offset {}", offset)
            }
            Self::InvalidFieldNumber { offset } => {
                write!(f, "field number 0 in tag at offset {}", offset)
            }
            Self::InvalidWireType { offset, wire_type } => {
                write!(f, "unsupported wire type {} at offset {}", wire_type, offset)
            }
            Self::WireTypeMismatch { field, expected, got } => write!(
                f,
                "wire type mismatch on field {}: expected {:?}, got {:?}",
                field, expected, got
            ),
            Self::LengthOverflow { offset, length, remaining } => write!(
                f,
                "length {} at offset {} exceeds remaining {} bytes",
                length, offset, remaining
            ),
            Self::RecursionLimit { limit } => {
                write!(f, "message nesting exceeds limit of {}", limit)
            }
            Self::InvalidUtf8 { field } => {
                write!(f, "invalid UTF-8 in string field {}", field)
            }
            Self::UnresolvedType { type_name } => {
                write!(f, "unresolved message type: {}", type_name)
            }
        }
    }
}

impl std::error::Error for DecodeError {}

pub type DecodeResult<T> = core::result::Result<T, DecodeError>;
