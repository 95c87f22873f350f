// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fluent builder API for schemas.
//!
//! All validation happens in [`SchemaBuilder::build`]; a registry that
//! builds successfully cannot raise schema errors at instance-mutation
//! time.

use crate::config::{MAX_FIELD_NUMBER, RESERVED_FIELD_NUMBER_FIRST, RESERVED_FIELD_NUMBER_LAST};
use crate::message::Value;
use crate::schema::{
    Cardinality, FieldDescriptor, FieldType, MessageDescriptor, OneofDescriptor, Presence,
    SchemaError, SchemaRegistry, SchemaResult,
};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Builder for one message type.
#[derive(Debug)]
pub struct MessageBuilder {
    full_name: String,
    fields: Vec<FieldSpec>,
    oneofs: Vec<OneofSpec>,
}

#[derive(Debug)]
struct FieldSpec {
    name: String,
    number: u32,
    field_type: FieldType,
    cardinality: Cardinality,
    packed: bool,
    optional: bool,
    default: Option<Value>,
}

#[derive(Debug)]
struct OneofSpec {
    name: String,
    members: Vec<String>,
}

impl MessageBuilder {
    /// Create a builder for the given fully-qualified type name.
    pub fn new(full_name: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            fields: Vec::new(),
            oneofs: Vec::new(),
        }
    }

    fn push(
        mut self,
        name: impl Into<String>,
        number: u32,
        field_type: FieldType,
        cardinality: Cardinality,
        packed: bool,
        optional: bool,
        default: Option<Value>,
    ) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            number,
            field_type,
            cardinality,
            packed,
            optional,
            default,
        });
        self
    }

    /// Add a singular field with implicit presence (unless it is
    /// message-typed, which is always explicit).
    pub fn field(self, name: impl Into<String>, number: u32, field_type: FieldType) -> Self {
        self.push(name, number, field_type, Cardinality::Singular, false, false, None)
    }

    /// Add a singular field with explicit presence.
    pub fn optional_field(
        self,
        name: impl Into<String>,
        number: u32,
        field_type: FieldType,
    ) -> Self {
        self.push(name, number, field_type, Cardinality::Singular, false, true, None)
    }

    /// Add a singular nested-message field (always explicit presence).
    pub fn message_field(
        self,
        name: impl Into<String>,
        number: u32,
        type_name: impl Into<String>,
    ) -> Self {
        self.field(name, number, FieldType::Message(type_name.into()))
    }

    /// Add a singular field with a declared default value.
    pub fn field_with_default(
        self,
        name: impl Into<String>,
        number: u32,
        field_type: FieldType,
        default: Value,
    ) -> Self {
        self.push(
            name,
            number,
            field_type,
            Cardinality::Singular,
            false,
            false,
            Some(default),
        )
    }

    /// Add a repeated field (one record per element on the wire).
    pub fn repeated_field(
        self,
        name: impl Into<String>,
        number: u32,
        field_type: FieldType,
    ) -> Self {
        self.push(name, number, field_type, Cardinality::Repeated, false, false, None)
    }

    /// Add a packed repeated field (one length-prefixed record for all
    /// elements). Only numeric, bool and enum types are packable.
    pub fn packed_field(
        self,
        name: impl Into<String>,
        number: u32,
        field_type: FieldType,
    ) -> Self {
        self.push(name, number, field_type, Cardinality::Repeated, true, false, None)
    }

    /// Group previously declared singular fields into a oneof.
    pub fn oneof<I, S>(mut self, name: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.oneofs.push(OneofSpec {
            name: name.into(),
            members: members.into_iter().map(Into::into).collect(),
        });
        self
    }

    fn build(self) -> SchemaResult<MessageDescriptor> {
        let message = self.full_name;

        // Per-field validation.
        for (i, spec) in self.fields.iter().enumerate() {
            if spec.number == 0 || spec.number > MAX_FIELD_NUMBER {
                return Err(SchemaError::InvalidFieldNumber {
                    message,
                    field: spec.name.clone(),
                    number: spec.number,
                });
            }
            if (RESERVED_FIELD_NUMBER_FIRST..=RESERVED_FIELD_NUMBER_LAST).contains(&spec.number) {
                return Err(SchemaError::ReservedFieldNumber {
                    message,
                    field: spec.name.clone(),
                    number: spec.number,
                });
            }
            for other in &self.fields[..i] {
                if other.number == spec.number {
                    return Err(SchemaError::DuplicateFieldNumber {
                        message,
                        number: spec.number,
                    });
                }
                if other.name == spec.name {
                    return Err(SchemaError::DuplicateFieldName {
                        message,
                        name: spec.name.clone(),
                    });
                }
            }
            if let FieldType::Enum(e) = &spec.field_type {
                if e.variants().is_empty() {
                    return Err(SchemaError::EmptyEnum {
                        name: e.name().to_string(),
                    });
                }
            }
            if spec.packed && !spec.field_type.is_packable() {
                return Err(SchemaError::NotPackable {
                    message,
                    field: spec.name.clone(),
                });
            }
            if let Some(default) = &spec.default {
                if spec.cardinality == Cardinality::Repeated {
                    return Err(SchemaError::InvalidDefault {
                        message,
                        field: spec.name.clone(),
                        reason: "repeated fields have no default".into(),
                    });
                }
                if spec.field_type.is_message() {
                    return Err(SchemaError::InvalidDefault {
                        message,
                        field: spec.name.clone(),
                        reason: "message fields have no declared default".into(),
                    });
                }
                if !spec.field_type.accepts(default) {
                    return Err(SchemaError::InvalidDefault {
                        message,
                        field: spec.name.clone(),
                        reason: format!(
                            "default kind {} does not match field type {}",
                            default.kind_name(),
                            spec.field_type.kind_name()
                        ),
                    });
                }
            }
        }

        // Oneof resolution: member names -> field indices.
        let mut oneof_of: HashMap<usize, usize> = HashMap::new();
        let mut oneofs = Vec::with_capacity(self.oneofs.len());
        for (oneof_index, spec) in self.oneofs.iter().enumerate() {
            let mut members = Vec::with_capacity(spec.members.len());
            for member in &spec.members {
                let Some(field_index) = self.fields.iter().position(|f| &f.name == member) else {
                    return Err(SchemaError::UnknownOneofMember {
                        message,
                        oneof: spec.name.clone(),
                        member: member.clone(),
                    });
                };
                let field = &self.fields[field_index];
                let reject = |reason: &str| SchemaError::InvalidOneofMember {
                    message: message.clone(),
                    oneof: spec.name.clone(),
                    member: member.clone(),
                    reason: reason.into(),
                };
                if field.cardinality == Cardinality::Repeated {
                    return Err(reject("repeated field"));
                }
                if field.optional {
                    return Err(reject("explicitly optional field"));
                }
                if oneof_of.insert(field_index, oneof_index).is_some() {
                    return Err(reject("already a member of another oneof"));
                }
                members.push(field.number);
            }
            oneofs.push(OneofDescriptor {
                name: spec.name.clone(),
                index: oneof_index,
                members,
            });
        }

        // Derive disciplines, order by field number, assign presence slots.
        let mut specs: Vec<(usize, FieldSpec)> = self.fields.into_iter().enumerate().collect();
        specs.sort_by_key(|(_, spec)| spec.number);

        let mut fields = Vec::with_capacity(specs.len());
        let mut explicit_slots = 0usize;
        for (original_index, spec) in specs {
            let oneof_index = oneof_of.get(&original_index).copied();
            let presence = if spec.cardinality == Cardinality::Repeated {
                Presence::Implicit
            } else if oneof_index.is_some() {
                Presence::Exclusive
            } else if spec.field_type.is_message() || spec.optional {
                Presence::Explicit
            } else {
                Presence::Implicit
            };
            let presence_slot = if spec.cardinality == Cardinality::Singular
                && presence == Presence::Explicit
            {
                let slot = explicit_slots;
                explicit_slots += 1;
                Some(slot)
            } else {
                None
            };
            fields.push(Arc::new(FieldDescriptor {
                name: spec.name,
                number: spec.number,
                field_type: spec.field_type,
                cardinality: spec.cardinality,
                packed: spec.packed,
                oneof_index,
                default: spec.default,
                presence,
                presence_slot,
            }));
        }

        let by_number = fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.number, i))
            .collect();
        let by_name = fields
            .iter()
            .enumerate()
            .map(|(i, f)| (f.name.clone(), i))
            .collect();

        Ok(MessageDescriptor {
            full_name: message,
            fields,
            oneofs,
            by_number,
            by_name,
            explicit_slots,
            registry: OnceLock::new(),
        })
    }
}

/// Builder for a complete schema (a set of message types).
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    messages: Vec<MessageBuilder>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message type.
    pub fn message(mut self, builder: MessageBuilder) -> Self {
        self.messages.push(builder);
        self
    }

    /// Validate everything and produce the immutable registry.
    pub fn build(self) -> SchemaResult<Arc<SchemaRegistry>> {
        let mut types: HashMap<String, Arc<MessageDescriptor>> = HashMap::new();
        for builder in self.messages {
            let descriptor = Arc::new(builder.build()?);
            let name = descriptor.full_name.clone();
            if types.insert(name.clone(), descriptor).is_some() {
                return Err(SchemaError::DuplicateMessage { name });
            }
        }

        // Cross-message: every message-typed field must resolve.
        for descriptor in types.values() {
            for field in descriptor.fields() {
                if let FieldType::Message(type_name) = field.field_type() {
                    if !types.contains_key(type_name) {
                        return Err(SchemaError::UnresolvedType {
                            message: descriptor.full_name.clone(),
                            field: field.name().to_string(),
                            type_name: type_name.clone(),
                        });
                    }
                }
            }
        }

        let registry = Arc::new(SchemaRegistry::new(types));
        for descriptor in registry.descriptors() {
            descriptor.attach_registry(&registry);
        }
        log::debug!(
            "[schema] built registry with {} message type(s)",
            registry.len()
        );
        Ok(registry)
    }
}
