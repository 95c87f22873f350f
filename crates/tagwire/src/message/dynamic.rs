// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! DynamicMessage: schema-driven message instances with reflective access.

use crate::config::DecodeLimits;
use crate::message::{AccessError, AccessResult, PresenceSet, Value};
use crate::schema::{
    same_descriptor, FieldDescriptor, FieldType, MessageDescriptor, OneofDescriptor, Presence,
};
use crate::wire::DecodeResult;
use std::collections::HashMap;
use std::sync::Arc;

/// A message instance built from a [`MessageDescriptor`].
///
/// Owns the field store (values keyed by field number), the presence
/// state, and any unknown fields captured during decoding. All presence
/// semantics live here; typed accessors are thin delegations to these
/// methods.
///
/// Mutation is single-threaded by contract: mutating one instance from
/// several threads concurrently is a caller error. Shared references are
/// safe for concurrent reads, including concurrent [`encode`] calls.
///
/// [`encode`]: DynamicMessage::encode
#[derive(Debug, Clone)]
pub struct DynamicMessage {
    descriptor: Arc<MessageDescriptor>,
    fields: HashMap<u32, Value>,
    presence: PresenceSet,
    unknown: Vec<u8>,
}

impl DynamicMessage {
    /// Create an empty instance: nothing present, zero serialized size.
    pub fn new(descriptor: &Arc<MessageDescriptor>) -> Self {
        Self {
            descriptor: descriptor.clone(),
            fields: HashMap::new(),
            presence: PresenceSet::new(descriptor.explicit_slots(), descriptor.oneofs().len()),
            unknown: Vec::new(),
        }
    }

    pub fn descriptor(&self) -> &Arc<MessageDescriptor> {
        &self.descriptor
    }

    /// Look up a field of this message's descriptor by name.
    pub fn field_named(&self, name: &str) -> AccessResult<Arc<FieldDescriptor>> {
        self.descriptor.field_by_name(name).cloned().ok_or_else(|| {
            AccessError::FieldNotFound {
                message: self.descriptor.full_name().to_string(),
                name: name.to_string(),
            }
        })
    }

    /// Map a caller-supplied descriptor onto this message's own copy,
    /// rejecting descriptors from unrelated message types.
    fn own_field(&self, field: &FieldDescriptor) -> AccessResult<Arc<FieldDescriptor>> {
        match self.descriptor.field_by_number(field.number()) {
            Some(own) if own.name() == field.name() => Ok(own.clone()),
            _ => Err(AccessError::ForeignField {
                field: field.name().to_string(),
                message: self.descriptor.full_name().to_string(),
            }),
        }
    }

    fn resolve_type(&self, type_name: &str) -> AccessResult<Arc<MessageDescriptor>> {
        self.descriptor
            .resolve_message(type_name)
            .ok_or_else(|| AccessError::UnresolvedType {
                type_name: type_name.to_string(),
            })
    }

    fn check_value(&self, field: &FieldDescriptor, value: &Value) -> AccessResult<()> {
        if field.field_type().accepts(value) {
            Ok(())
        } else {
            Err(AccessError::TypeMismatch {
                field: field.name().to_string(),
                expected: field.field_type().kind_name(),
                got: value.kind_name(),
            })
        }
    }

    // ---------------------------------------------------------------
    // Presence
    // ---------------------------------------------------------------

    /// Whether a singular field is present.
    ///
    /// Implicit fields are present iff their stored value differs from
    /// the declared default; explicit fields iff their presence bit is
    /// set; oneof members iff the group's discriminant names them.
    /// Repeated fields have no presence and are rejected.
    pub fn has(&self, field: &FieldDescriptor) -> AccessResult<bool> {
        let field = self.own_field(field)?;
        if field.is_repeated() {
            return Err(AccessError::InvalidOperation(format!(
                "repeated field {} has no presence; use count",
                field.name()
            )));
        }
        Ok(self.field_present(&field))
    }

    pub fn has_by_name(&self, name: &str) -> AccessResult<bool> {
        let field = self.field_named(name)?;
        self.has(&field)
    }

    pub(crate) fn field_present(&self, field: &FieldDescriptor) -> bool {
        if field.is_repeated() {
            return self
                .fields
                .get(&field.number())
                .and_then(|v| v.as_list())
                .is_some_and(|list| !list.is_empty());
        }
        match field.presence() {
            Presence::Implicit => match self.fields.get(&field.number()) {
                Some(value) => field.default_value().is_none_or(|default| *value != default),
                None => false,
            },
            Presence::Explicit => field
                .presence_slot()
                .is_some_and(|slot| self.presence.is_set(slot)),
            Presence::Exclusive => field
                .oneof_index()
                .is_some_and(|index| self.presence.active_member(index) == Some(field.number())),
        }
    }

    /// Active member of a oneof, by field number.
    pub fn oneof_case(&self, oneof: &OneofDescriptor) -> AccessResult<Option<u32>> {
        match self.descriptor.oneofs().get(oneof.index()) {
            Some(own) if own.name() == oneof.name() => {
                Ok(self.presence.active_member(oneof.index()))
            }
            _ => Err(AccessError::InvalidOperation(format!(
                "oneof {} does not belong to message {}",
                oneof.name(),
                self.descriptor.full_name()
            ))),
        }
    }

    pub fn oneof_case_by_name(&self, name: &str) -> AccessResult<Option<u32>> {
        let oneof = self.descriptor.oneof_by_name(name).ok_or_else(|| {
            AccessError::FieldNotFound {
                message: self.descriptor.full_name().to_string(),
                name: name.to_string(),
            }
        })?;
        Ok(self.presence.active_member(oneof.index()))
    }

    // ---------------------------------------------------------------
    // Get
    // ---------------------------------------------------------------

    /// Current value of a field.
    ///
    /// An absent singular field yields its declared default; a non-active
    /// oneof member yields its own default, never a sibling's value; an
    /// absent repeated field yields an empty list.
    pub fn get(&self, field: &FieldDescriptor) -> AccessResult<Value> {
        let field = self.own_field(field)?;
        if field.is_repeated() {
            return Ok(self
                .fields
                .get(&field.number())
                .cloned()
                .unwrap_or(Value::List(Vec::new())));
        }
        if field.presence() == Presence::Exclusive && !self.field_present(&field) {
            return self.default_for(&field);
        }
        match self.fields.get(&field.number()) {
            Some(value) => Ok(value.clone()),
            None => self.default_for(&field),
        }
    }

    pub fn get_by_name(&self, name: &str) -> AccessResult<Value> {
        let field = self.field_named(name)?;
        self.get(&field)
    }

    fn default_for(&self, field: &FieldDescriptor) -> AccessResult<Value> {
        match field.field_type() {
            FieldType::Message(type_name) => {
                let sub = self.resolve_type(type_name)?;
                Ok(Value::Message(Box::new(DynamicMessage::new(&sub))))
            }
            _ => field.default_value().ok_or_else(|| {
                AccessError::InvalidOperation(format!("field {} has no default", field.name()))
            }),
        }
    }

    // ---------------------------------------------------------------
    // Set / clear
    // ---------------------------------------------------------------

    /// Assign a field, updating presence per the field's discipline.
    ///
    /// Repeated fields take a `Value::List` whose elements are checked
    /// individually; an empty list clears the sequence.
    pub fn set(&mut self, field: &FieldDescriptor, value: impl Into<Value>) -> AccessResult<()> {
        let field = self.own_field(field)?;
        let value = value.into();
        if field.is_repeated() {
            let Value::List(elements) = &value else {
                return Err(AccessError::TypeMismatch {
                    field: field.name().to_string(),
                    expected: "list",
                    got: value.kind_name(),
                });
            };
            for element in elements {
                self.check_value(&field, element)?;
            }
            if elements.is_empty() {
                self.fields.remove(&field.number());
            } else {
                self.fields.insert(field.number(), value);
            }
            return Ok(());
        }
        self.check_value(&field, &value)?;
        self.store_singular(&field, value);
        Ok(())
    }

    pub fn set_by_name(&mut self, name: &str, value: impl Into<Value>) -> AccessResult<()> {
        let field = self.field_named(name)?;
        self.set(&field, value)
    }

    /// Store a type-checked singular value and update presence.
    ///
    /// Shared by `set` and the decoder: activating a oneof member drops
    /// the previously active sibling's value within this same call.
    pub(crate) fn store_singular(&mut self, field: &FieldDescriptor, value: Value) {
        match field.presence() {
            Presence::Explicit => {
                if let Some(slot) = field.presence_slot() {
                    self.presence.mark(slot);
                }
            }
            Presence::Exclusive => {
                if let Some(index) = field.oneof_index() {
                    let previous = self.presence.set_active(index, field.number());
                    if let Some(previous) = previous {
                        if previous != field.number() {
                            self.fields.remove(&previous);
                        }
                    }
                }
            }
            Presence::Implicit => {}
        }
        self.fields.insert(field.number(), value);
    }

    /// Reset a field to absent.
    ///
    /// Removes the stored value and clears the presence bit / resets the
    /// group discriminant in one step; the effects are never partially
    /// applied.
    pub fn clear(&mut self, field: &FieldDescriptor) -> AccessResult<()> {
        let field = self.own_field(field)?;
        self.fields.remove(&field.number());
        match field.presence() {
            Presence::Explicit => {
                if let Some(slot) = field.presence_slot() {
                    self.presence.clear(slot);
                }
            }
            Presence::Exclusive => {
                if let Some(index) = field.oneof_index() {
                    if self.presence.active_member(index) == Some(field.number()) {
                        self.presence.clear_active(index);
                    }
                }
            }
            Presence::Implicit => {}
        }
        Ok(())
    }

    pub fn clear_by_name(&mut self, name: &str) -> AccessResult<()> {
        let field = self.field_named(name)?;
        self.clear(&field)
    }

    /// Reset the instance to its freshly-constructed state.
    pub fn clear_all(&mut self) {
        self.fields.clear();
        self.presence.clear_all();
        self.unknown.clear();
    }

    // ---------------------------------------------------------------
    // Nested messages
    // ---------------------------------------------------------------

    /// Mutable access to a singular message field, creating a default
    /// sub-message if the field is unset.
    ///
    /// This is a presence-mutating read: merely requesting the handle
    /// marks the field present, even if nothing is written through it.
    pub fn get_or_create_mutable(
        &mut self,
        field: &FieldDescriptor,
    ) -> AccessResult<&mut DynamicMessage> {
        let field = self.own_field(field)?;
        self.sub_message_mut(&field)
    }

    /// By-name variant of [`get_or_create_mutable`](Self::get_or_create_mutable).
    pub fn mutable_by_name(&mut self, name: &str) -> AccessResult<&mut DynamicMessage> {
        let field = self.field_named(name)?;
        self.sub_message_mut(&field)
    }

    pub(crate) fn sub_message_mut(
        &mut self,
        field: &Arc<FieldDescriptor>,
    ) -> AccessResult<&mut DynamicMessage> {
        if field.is_repeated() {
            return Err(AccessError::InvalidOperation(format!(
                "field {} is repeated; use add",
                field.name()
            )));
        }
        let FieldType::Message(type_name) = field.field_type() else {
            return Err(AccessError::InvalidOperation(format!(
                "field {} is not message-typed",
                field.name()
            )));
        };
        let sub_descriptor = self.resolve_type(type_name)?;
        Ok(self.sub_message_slot(field, &sub_descriptor))
    }

    /// Mutable sub-message slot for a field whose type is already
    /// resolved; marks presence as a side effect. Shared by the access
    /// layer and the decoder.
    pub(crate) fn sub_message_slot(
        &mut self,
        field: &Arc<FieldDescriptor>,
        sub_descriptor: &Arc<MessageDescriptor>,
    ) -> &mut DynamicMessage {
        match field.presence() {
            Presence::Explicit => {
                if let Some(slot) = field.presence_slot() {
                    if !self.presence.is_set(slot) {
                        log::trace!(
                            "[message] {}.{} materialized via mutable access",
                            self.descriptor.full_name(),
                            field.name()
                        );
                        self.presence.mark(slot);
                    }
                }
            }
            Presence::Exclusive => {
                if let Some(index) = field.oneof_index() {
                    let previous = self.presence.set_active(index, field.number());
                    if let Some(previous) = previous {
                        if previous != field.number() {
                            self.fields.remove(&previous);
                        }
                    }
                }
            }
            Presence::Implicit => {}
        }
        // Normalize the slot; a non-message value cannot appear here
        // through the typed accessors.
        if !matches!(
            self.fields.get(&field.number()),
            Some(Value::Message(_))
        ) {
            self.fields.insert(
                field.number(),
                Value::Message(Box::new(DynamicMessage::new(sub_descriptor))),
            );
        }
        match self.fields.get_mut(&field.number()) {
            Some(Value::Message(sub)) => sub,
            _ => unreachable!("message slot was just normalized"),
        }
    }

    // ---------------------------------------------------------------
    // Repeated fields
    // ---------------------------------------------------------------

    /// Append one element to a repeated field.
    pub fn add(&mut self, field: &FieldDescriptor, value: impl Into<Value>) -> AccessResult<()> {
        let field = self.own_field(field)?;
        let value = value.into();
        if !field.is_repeated() {
            return Err(AccessError::InvalidOperation(format!(
                "field {} is singular; use set",
                field.name()
            )));
        }
        self.check_value(&field, &value)?;
        self.append_element(&field, value);
        Ok(())
    }

    pub fn add_by_name(&mut self, name: &str, value: impl Into<Value>) -> AccessResult<()> {
        let field = self.field_named(name)?;
        self.add(&field, value)
    }

    pub(crate) fn append_element(&mut self, field: &FieldDescriptor, value: Value) {
        if let Value::List(list) = self
            .fields
            .entry(field.number())
            .or_insert_with(|| Value::List(Vec::new()))
        {
            list.push(value);
        }
    }

    /// Element count of a repeated field (0 when absent).
    pub fn count(&self, field: &FieldDescriptor) -> AccessResult<usize> {
        let field = self.own_field(field)?;
        if !field.is_repeated() {
            return Err(AccessError::InvalidOperation(format!(
                "field {} is singular; use has",
                field.name()
            )));
        }
        Ok(self
            .fields
            .get(&field.number())
            .and_then(|v| v.as_list())
            .map_or(0, <[Value]>::len))
    }

    pub fn count_by_name(&self, name: &str) -> AccessResult<usize> {
        let field = self.field_named(name)?;
        self.count(&field)
    }

    pub fn get_element(&self, field: &FieldDescriptor, index: usize) -> AccessResult<Value> {
        let field = self.own_field(field)?;
        let list = self
            .fields
            .get(&field.number())
            .and_then(|v| v.as_list())
            .unwrap_or(&[]);
        list.get(index)
            .cloned()
            .ok_or(AccessError::IndexOutOfBounds {
                index,
                length: list.len(),
            })
    }

    pub fn set_element(
        &mut self,
        field: &FieldDescriptor,
        index: usize,
        value: impl Into<Value>,
    ) -> AccessResult<()> {
        let field = self.own_field(field)?;
        let value = value.into();
        if !field.is_repeated() {
            return Err(AccessError::InvalidOperation(format!(
                "field {} is singular; use set",
                field.name()
            )));
        }
        self.check_value(&field, &value)?;
        let length = self
            .fields
            .get(&field.number())
            .and_then(|v| v.as_list())
            .map_or(0, <[Value]>::len);
        if index >= length {
            return Err(AccessError::IndexOutOfBounds { index, length });
        }
        if let Some(Value::List(list)) = self.fields.get_mut(&field.number()) {
            list[index] = value;
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Enumeration, equality, merge
    // ---------------------------------------------------------------

    /// All present fields with their values, ordered by field number.
    ///
    /// Contains exactly the singular fields for which `has` is true plus
    /// the non-empty repeated fields. This sequence defines equality.
    pub fn all_present(&self) -> Vec<(Arc<FieldDescriptor>, Value)> {
        let mut out = Vec::new();
        for field in self.descriptor.fields() {
            if !self.field_present(field) {
                continue;
            }
            let value = match self.fields.get(&field.number()) {
                Some(value) => value.clone(),
                None => match field.default_value() {
                    Some(default) => default,
                    None => continue,
                },
            };
            out.push((field.clone(), value));
        }
        out
    }

    /// Field-wise merge: every field present in `src` overwrites (scalar,
    /// oneof member) or extends (repeated: append, message: recursive
    /// merge) the corresponding field of `self`. Unknown fields are
    /// concatenated.
    pub fn merge_from(&mut self, src: &DynamicMessage) -> AccessResult<()> {
        if !same_descriptor(&self.descriptor, &src.descriptor) {
            return Err(AccessError::DescriptorMismatch {
                left: self.descriptor.full_name().to_string(),
                right: src.descriptor.full_name().to_string(),
            });
        }
        for (field, value) in src.all_present() {
            let field = self.own_field(&field)?;
            if field.is_repeated() {
                if let Value::List(elements) = value {
                    for element in elements {
                        self.append_element(&field, element);
                    }
                }
            } else if let Value::Message(sub) = value {
                if self.field_present(&field) {
                    self.sub_message_mut(&field)?.merge_from(&sub)?;
                } else {
                    self.store_singular(&field, Value::Message(sub));
                }
            } else {
                self.store_singular(&field, value);
            }
        }
        self.unknown.extend_from_slice(&src.unknown);
        Ok(())
    }

    // ---------------------------------------------------------------
    // Unknown fields and codec hooks
    // ---------------------------------------------------------------

    /// Raw bytes of unknown-field records captured during decoding,
    /// re-emitted verbatim after all known fields on re-encode. Not part
    /// of equality.
    pub fn unknown_fields(&self) -> &[u8] {
        &self.unknown
    }

    pub(crate) fn push_unknown(&mut self, raw: &[u8]) {
        self.unknown.extend_from_slice(raw);
    }

    pub(crate) fn stored(&self, number: u32) -> Option<&Value> {
        self.fields.get(&number)
    }

    // ---------------------------------------------------------------
    // Wire format
    // ---------------------------------------------------------------

    /// Encode to the compact wire format. Never fails for a structurally
    /// valid instance; an instance with nothing present yields an empty
    /// vector.
    pub fn encode(&self) -> Vec<u8> {
        crate::wire::encode(self)
    }

    /// Exact byte length [`encode`](Self::encode) will produce.
    pub fn serialized_size(&self) -> usize {
        crate::wire::serialized_size(self)
    }

    /// Decode a fresh instance.
    pub fn decode(
        descriptor: &Arc<MessageDescriptor>,
        bytes: &[u8],
    ) -> DecodeResult<DynamicMessage> {
        crate::wire::decode(descriptor, bytes)
    }

    /// Decode `bytes` into this instance, field-wise merging with its
    /// current contents.
    pub fn merge_from_bytes(&mut self, bytes: &[u8]) -> DecodeResult<()> {
        crate::wire::merge_message(self, bytes, DecodeLimits::default())
    }

    /// [`merge_from_bytes`](Self::merge_from_bytes) with custom limits.
    pub fn merge_from_bytes_with_limits(
        &mut self,
        bytes: &[u8],
        limits: DecodeLimits,
    ) -> DecodeResult<()> {
        crate::wire::merge_message(self, bytes, limits)
    }
}

impl PartialEq for DynamicMessage {
    /// Structural equality over presence: two instances are equal iff
    /// they share a descriptor and their `all_present` sequences match
    /// element-wise. A oneof member set to its own default value is
    /// present and therefore observable here.
    fn eq(&self, other: &Self) -> bool {
        if !same_descriptor(&self.descriptor, &other.descriptor) {
            return false;
        }
        let ours = self.all_present();
        let theirs = other.all_present();
        ours.len() == theirs.len()
            && ours
                .iter()
                .zip(&theirs)
                .all(|((fa, va), (fb, vb))| fa.number() == fb.number() && va == vb)
    }
}
