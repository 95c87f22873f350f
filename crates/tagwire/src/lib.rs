// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # tagwire - field presence and wire encoding for structured messages
//!
//! The core engine of a schema-driven serialization stack: message
//! descriptors with three presence disciplines, a reflective dynamic
//! message container, and a compact tag/varint wire codec.
//!
//! ## Presence disciplines
//!
//! | Discipline  | Applies to                         | Present when                         |
//! |-------------|------------------------------------|--------------------------------------|
//! | `Implicit`  | plain singular scalars and enums   | stored value != declared default     |
//! | `Explicit`  | optional fields, message fields    | presence bit set (value irrelevant)  |
//! | `Exclusive` | oneof members                      | group discriminant names the field   |
//!
//! Presence drives everything downstream: only present fields are
//! encoded, `all_present` enumerates them, and equality compares them.
//! Repeated fields have no presence; they encode element-wise.
//!
//! ## Quick start
//!
//! ```rust
//! use tagwire::{DynamicMessage, FieldType, MessageBuilder, SchemaBuilder, Value};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = SchemaBuilder::new()
//!         .message(
//!             MessageBuilder::new("demo.Reading")
//!                 .field("sensor_id", 1, FieldType::UInt32)
//!                 .optional_field("label", 2, FieldType::String)
//!                 .repeated_field("samples", 3, FieldType::Double),
//!         )
//!         .build()?;
//!
//!     let descriptor = registry.resolve("demo.Reading").expect("registered").clone();
//!     let mut reading = DynamicMessage::new(&descriptor);
//!     reading.set_by_name("sensor_id", 42u32)?;
//!     reading.add_by_name("samples", 23.5f64)?;
//!
//!     let bytes = reading.encode();
//!     let parsed = tagwire::decode(&descriptor, &bytes)?;
//!     assert_eq!(parsed, reading);
//!     assert_eq!(parsed.get_by_name("sensor_id")?, Value::U32(42));
//!     Ok(())
//! }
//! ```
//!
//! ## Modules Overview
//!
//! - [`schema`] - descriptors, builder, registry (build once, read many)
//! - [`message`] - [`DynamicMessage`], the reflective access layer
//! - [`wire`] - encode/decode, deterministic two-pass serialization
//! - [`config`] - wire constants and [`DecodeLimits`]
//!
//! Mutation of one instance is single-threaded by contract; descriptors
//! and registries are immutable after build and freely shared across
//! threads.

pub mod config;
pub mod message;
pub mod schema;
pub mod wire;

pub use config::DecodeLimits;
pub use message::{AccessError, AccessResult, DynamicMessage, PresenceSet, Value};
pub use schema::{
    Cardinality, EnumDescriptor, EnumVariant, FieldDescriptor, FieldType, MessageBuilder,
    MessageDescriptor, OneofDescriptor, Presence, SchemaBuilder, SchemaError, SchemaRegistry,
    SchemaResult,
};
pub use wire::{
    decode, decode_with_limits, encode, encode_to, serialized_size, DecodeError, DecodeResult,
    WireType,
};
