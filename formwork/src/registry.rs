//! Per-form validation registry: the mapping from field id to its current
//! rule fragment, and the memoized soft/hard composite schemas derived from
//! it.
//!
//! One registry exists per form instance and is dependency-injected into
//! the composer and the visibility resolver, never a process-wide
//! singleton, so independent forms coexist safely.

use std::collections::HashMap;
use std::sync::Arc;

use formtree::{RuleSpec, ValueKind};

use crate::compose::{ComposeMode, FieldSchema, compose_with};
use crate::conditions::SharedConditions;
use crate::outcome::{FieldError, ValidationOutcome};
use crate::store::ValueMap;

/// The registered `(kind, rules, live)` triple for one field id.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    /// Base value kind.
    pub kind: ValueKind,
    /// Rules, in authored order.
    pub rules: Vec<RuleSpec>,
    /// Whether the field participates in live (as-you-type) validation.
    pub live: bool,
}

/// Composite schema over a set of fields, validated as a unit.
#[derive(Debug)]
pub struct CompositeSchema {
    fields: HashMap<String, FieldSchema>,
}

impl CompositeSchema {
    pub(crate) fn new(fields: HashMap<String, FieldSchema>) -> Self {
        Self { fields }
    }

    /// Whether the composite covers a field id.
    pub fn contains(&self, field_id: &str) -> bool {
        self.fields.contains_key(field_id)
    }

    /// Number of covered fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the composite covers no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// One field's schema.
    pub fn field(&self, field_id: &str) -> Option<&FieldSchema> {
        self.fields.get(field_id)
    }

    /// Validate every covered field against the snapshot. Errors are
    /// ordered by field id so outcomes compare deterministically.
    pub fn validate(&self, values: &ValueMap) -> ValidationOutcome {
        let mut errors: Vec<FieldError> = self
            .fields
            .iter()
            .filter_map(|(field_id, schema)| {
                schema
                    .validate(values.get(field_id), values)
                    .err()
                    .map(|message| FieldError {
                        field_id: field_id.clone(),
                        message,
                    })
            })
            .collect();
        if errors.is_empty() {
            ValidationOutcome::Valid
        } else {
            errors.sort_by(|a, b| a.field_id.cmp(&b.field_id));
            ValidationOutcome::Invalid(errors)
        }
    }

    /// Validate a single covered field. Unknown ids pass.
    pub fn validate_field(&self, field_id: &str, values: &ValueMap) -> Result<(), String> {
        match self.fields.get(field_id) {
            Some(schema) => schema.validate(values.get(field_id), values),
            None => Ok(()),
        }
    }

    /// Whether the whole snapshot validates cleanly.
    pub fn is_valid(&self, values: &ValueMap) -> bool {
        self.validate(values).is_valid()
    }
}

/// Registry of rule fragments for one form instance.
#[derive(Debug)]
pub struct ValidationRegistry {
    conditions: SharedConditions,
    fragments: HashMap<String, Fragment>,
    epoch: u64,
    soft_cache: Option<Arc<CompositeSchema>>,
    hard_cache: Option<Arc<CompositeSchema>>,
}

impl ValidationRegistry {
    /// Create an empty registry sharing the given condition registry.
    pub fn new(conditions: SharedConditions) -> Self {
        Self {
            conditions,
            fragments: HashMap::new(),
            epoch: 0,
            soft_cache: None,
            hard_cache: None,
        }
    }

    /// The condition registry composed schemas dispatch through.
    pub fn conditions(&self) -> &SharedConditions {
        &self.conditions
    }

    /// Upsert a field's fragment. Registering an identical fragment again
    /// is a no-op that keeps the memoized composites.
    pub fn register_field(&mut self, field_id: &str, kind: ValueKind, rules: Vec<RuleSpec>, live: bool) {
        let fragment = Fragment { kind, rules, live };
        if self.fragments.get(field_id) == Some(&fragment) {
            return;
        }
        self.fragments.insert(field_id.to_string(), fragment);
        self.invalidate();
    }

    /// Delete a field's fragment. Silently does nothing when the id is
    /// absent: multiple cleanup paths may race to deregister the same id.
    pub fn remove_field(&mut self, field_id: &str) {
        if self.fragments.remove(field_id).is_some() {
            self.invalidate();
        }
    }

    /// Whether a field is currently registered.
    pub fn contains(&self, field_id: &str) -> bool {
        self.fragments.contains_key(field_id)
    }

    /// The registered base kind of a field, if any.
    pub fn kind_of(&self, field_id: &str) -> Option<ValueKind> {
        self.fragments.get(field_id).map(|fragment| fragment.kind)
    }

    /// Currently registered field ids, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.fragments.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Number of registered fields.
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Whether no fields are registered.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Bumped on every real mutation; resolution passes key off this to
    /// observe registry changes instead of assuming effect ordering.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// The composite including every registered field's full rule set,
    /// used to gate submission regardless of interaction mode.
    pub fn hard_schema(&mut self) -> Arc<CompositeSchema> {
        if let Some(schema) = &self.hard_cache {
            return Arc::clone(schema);
        }
        let schema = Arc::new(self.build(false));
        self.hard_cache = Some(Arc::clone(&schema));
        schema
    }

    /// The composite honoring interaction modes: non-live fragments
    /// contribute only their base type check.
    pub fn soft_schema(&mut self) -> Arc<CompositeSchema> {
        if let Some(schema) = &self.soft_cache {
            return Arc::clone(schema);
        }
        let schema = Arc::new(self.build(true));
        self.soft_cache = Some(Arc::clone(&schema));
        schema
    }

    /// Drop the memoized composites, forcing recomposition. Needed when the
    /// shared condition registry gains a name that composition previously
    /// skipped.
    pub(crate) fn reset_caches(&mut self) {
        self.invalidate();
    }

    fn build(&self, soft: bool) -> CompositeSchema {
        let fields = self
            .fragments
            .iter()
            .map(|(field_id, fragment)| {
                let rules: &[RuleSpec] = if soft && !fragment.live {
                    &[]
                } else {
                    &fragment.rules
                };
                let schema =
                    compose_with(fragment.kind, rules, &self.conditions, ComposeMode::Strict);
                (field_id.clone(), schema)
            })
            .collect();
        CompositeSchema::new(fields)
    }

    fn invalidate(&mut self) {
        self.epoch += 1;
        self.soft_cache = None;
        self.hard_cache = None;
    }
}
