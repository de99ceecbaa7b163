//! Conditional visibility resolution.
//!
//! A field's render rule is a disjunction of groups, each group a
//! conjunction of per-field rule lists. Resolution builds an ephemeral
//! composite schema per group (pulling referenced fields' base kinds from
//! the validation registry at evaluation time) and validates the whole
//! current snapshot against it. The first group that validates cleanly
//! makes the field visible; exhausting all groups hides it.
//!
//! Everything here fails open: an empty rule is always visible, and a
//! referenced field with no registry entry yet passes vacuously instead of
//! hiding the field, which would otherwise flicker during mount ordering.

use std::collections::HashMap;

use formtree::{RenderRule, RuleGroup};

use crate::compose::{ComposeMode, compose_with};
use crate::registry::{CompositeSchema, ValidationRegistry};
use crate::store::{ValueMap, ValueStore};

/// Per-field visibility state. Fields start out unresolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Visibility {
    /// Not resolved yet.
    #[default]
    Unknown,
    /// Present in the rendered tree and the submitted payload.
    Visible,
    /// Absent from both; its fragment and value are deregistered.
    Hidden,
}

impl Visibility {
    /// Whether the field is currently visible.
    pub fn is_visible(self) -> bool {
        self == Self::Visible
    }

    /// Whether the field is currently hidden.
    pub fn is_hidden(self) -> bool {
        self == Self::Hidden
    }
}

/// Decide whether a field with the given render rule is renderable against
/// the current snapshot. First-match-wins over the rule's groups.
pub fn resolve(rule: Option<&RenderRule>, registry: &ValidationRegistry, values: &ValueMap) -> bool {
    // the default-open fast path: no rule, no registry lookups
    let Some(rule) = rule else {
        return true;
    };
    if rule.is_empty() {
        return true;
    }

    rule.0
        .iter()
        .any(|group| group_schema(group, registry).is_valid(values))
}

/// Build the ephemeral composite for one group. Referenced ids without a
/// registry entry are left out entirely, making their checks vacuous.
fn group_schema(group: &RuleGroup, registry: &ValidationRegistry) -> CompositeSchema {
    let mut fields = HashMap::new();
    for (field_id, specs) in &group.0 {
        let Some(kind) = registry.kind_of(field_id) else {
            log::debug!("visibility dependency `{field_id}` is not registered, treating as satisfied");
            continue;
        };
        let schema = compose_with(kind, specs, registry.conditions(), ComposeMode::Lenient);
        fields.insert(field_id.clone(), schema);
    }
    CompositeSchema::new(fields)
}

/// Deregister a hidden node's whole subtree: every id is removed from the
/// validation registry and from the value store, so a stale invalid value
/// can never block hard-schema validation. Missing ids are no-ops; nothing
/// here can fail.
pub fn conceal(subtree_ids: &[String], registry: &mut ValidationRegistry, store: &mut ValueStore) {
    for field_id in subtree_ids {
        registry.remove_field(field_id);
        store.remove(field_id);
    }
}
