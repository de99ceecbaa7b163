//! Per-form engine: one mounted form's registry, resolver, and store,
//! driven as serialized reaction passes.
//!
//! All state here is owned by the instance and mutated through `&mut self`:
//! concurrent logical writers (two fields registering "simultaneously") are
//! serialized by the embedding runtime, so the engine needs no locking of
//! its own. Within one [`FormEngine::sync`] pass, registry mutations always
//! land before visibility resolution reads the registry (resolution is
//! keyed off the registry's contents, never off assumed effect ordering),
//! and re-running a pass redundantly is safe.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use formtree::{FieldNode, FormSchema, NodeKind, RenderRule, RuleSpec, ValueKind};
use serde_json::Value;

use crate::conditions::{ConditionError, ConditionRegistry, KindClass};
use crate::outcome::ValidationOutcome;
use crate::registry::{CompositeSchema, ValidationRegistry};
use crate::store::{ChangeEmitter, ValueMap, ValueStore};
use crate::visibility::{Visibility, conceal, resolve};

/// One flattened node of the authored tree, precomputed for resolution
/// passes. The tree is immutable per render pass, so this is built once.
#[derive(Debug, Clone)]
struct PlanEntry {
    id: String,
    kind: ValueKind,
    rules: Vec<RuleSpec>,
    live: bool,
    structural: bool,
    show_if: Option<RenderRule>,
    /// Implicit companion ids mounted alongside this node.
    aux_ids: Vec<String>,
    /// Deregistration set on a visible-to-hidden transition.
    subtree_ids: Vec<String>,
    parent: Option<usize>,
}

/// The engine behind one mounted form.
pub struct FormEngine {
    schema: FormSchema,
    plan: Arc<Vec<PlanEntry>>,
    registry: ValidationRegistry,
    store: ValueStore,
    visibility: HashMap<String, Visibility>,
    emitter: ChangeEmitter,
}

impl FormEngine {
    /// An engine with the shipped built-in conditions.
    pub fn new(schema: FormSchema) -> Self {
        Self::with_conditions(schema, ConditionRegistry::with_builtins())
    }

    /// An engine with a caller-provided condition registry. Each engine
    /// owns its registries; nothing is shared across form instances.
    pub fn with_conditions(schema: FormSchema, conditions: ConditionRegistry) -> Self {
        let plan = Arc::new(build_plan(&schema));
        Self {
            schema,
            plan,
            registry: ValidationRegistry::new(Arc::new(RwLock::new(conditions))),
            store: ValueStore::new(),
            visibility: HashMap::new(),
            emitter: ChangeEmitter::new(),
        }
    }

    /// The authored schema.
    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    /// Mount the form: resolve every node's visibility and register every
    /// visible field's fragment. Idempotent.
    pub fn mount(&mut self) {
        self.sync();
    }

    /// Widget-facing registration of a field's fragment.
    pub fn register_field(&mut self, field_id: &str, kind: ValueKind, rules: Vec<RuleSpec>, live: bool) {
        self.registry.register_field(field_id, kind, rules, live);
        self.sync();
    }

    /// Widget-facing deregistration. Safe to call redundantly.
    pub fn remove_field(&mut self, field_id: &str) {
        self.registry.remove_field(field_id);
        self.sync();
    }

    /// The submit-gating composite schema.
    pub fn hard_schema(&mut self) -> Arc<CompositeSchema> {
        self.registry.hard_schema()
    }

    /// The live-validation composite schema.
    pub fn soft_schema(&mut self) -> Arc<CompositeSchema> {
        self.registry.soft_schema()
    }

    /// Register a named condition for `Named` rules to dispatch to.
    pub fn add_named_condition<F>(
        &mut self,
        class: KindClass,
        name: &str,
        func: F,
    ) -> Result<(), ConditionError>
    where
        F: Fn(&Value, &Value, &ValueMap) -> bool + Send + Sync + 'static,
    {
        {
            let mut conditions = self
                .registry
                .conditions()
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            conditions.register(class, name, func)?;
        }
        // rules that composition skipped as unregistered may resolve now
        self.registry.reset_caches();
        self.sync();
        Ok(())
    }

    /// Targeted value change.
    pub fn set_value(&mut self, field_id: &str, value: Value) {
        self.store.set(field_id, value);
        self.sync();
    }

    /// Bulk value change (e.g. a server-side override of the whole form).
    pub fn replace_values(&mut self, values: ValueMap) {
        self.store.replace(values);
        self.sync();
    }

    /// The current snapshot. Hidden fields have no entry.
    pub fn values(&self) -> &ValueMap {
        self.store.snapshot()
    }

    /// One field's current value.
    pub fn value(&self, field_id: &str) -> Option<&Value> {
        self.store.get(field_id)
    }

    /// Attach an externally-injected error (e.g. the server rejected the
    /// field's submitted value). Cleared again by a real local edit of the
    /// same field.
    pub fn set_external_error(&mut self, field_id: &str, message: impl Into<String>) {
        self.store.set_external_error(field_id, message);
    }

    /// A field's standing external error.
    pub fn external_error(&self, field_id: &str) -> Option<&str> {
        self.store.external_error(field_id)
    }

    /// The message to display for one field right now: the external error
    /// if one stands, else the soft-schema verdict on the current value.
    pub fn field_message(&mut self, field_id: &str) -> Option<String> {
        if let Some(message) = self.store.external_error(field_id) {
            return Some(message.to_string());
        }
        let soft = self.registry.soft_schema();
        soft.validate_field(field_id, self.store.snapshot()).err()
    }

    /// Install the `(values, is_valid)` listener.
    pub fn on_change(&mut self, listener: impl FnMut(&ValueMap, bool) + Send + 'static) {
        self.emitter.subscribe(listener);
    }

    /// A node's current visibility state.
    pub fn visibility(&self, field_id: &str) -> Visibility {
        self.visibility.get(field_id).copied().unwrap_or_default()
    }

    /// Whether a node is currently part of the rendered tree.
    pub fn is_renderable(&self, field_id: &str) -> bool {
        self.visibility(field_id).is_visible()
    }

    /// Validate the snapshot against the hard schema.
    pub fn validate(&mut self) -> ValidationOutcome {
        self.registry.hard_schema().validate(self.store.snapshot())
    }

    /// Whether the form would currently pass submission gating.
    pub fn is_valid(&mut self) -> bool {
        self.validate().is_valid()
    }

    /// Gate submission on the hard schema; the payload is the current
    /// snapshot (hidden fields are already absent from it).
    pub fn submit(&mut self) -> Result<ValueMap, ValidationOutcome> {
        let outcome = self.validate();
        if outcome.is_valid() {
            Ok(self.store.snapshot().clone())
        } else {
            Err(outcome)
        }
    }

    /// Run the serialized reaction pass: resolve visibility against the
    /// current registry and snapshot, apply hide/show transitions, repeat
    /// until a fixpoint (hiding a field removes its value, which may
    /// re-open another field's groups), then notify the embedder.
    ///
    /// The configuration contract forbids visibility cycles; the iteration
    /// cap only bounds runaway authoring mistakes and keeps the last
    /// resolved state instead of failing.
    pub fn sync(&mut self) {
        let plan = Arc::clone(&self.plan);
        let mut rounds_left = plan.len() + 8;
        while self.resolve_pass(&plan) {
            rounds_left -= 1;
            if rounds_left == 0 {
                log::warn!(
                    "visibility resolution did not settle after {} rounds, keeping the last resolved state",
                    plan.len() + 8
                );
                break;
            }
        }
        let is_valid = self.registry.hard_schema().is_valid(self.store.snapshot());
        self.emitter.emit(self.store.snapshot(), is_valid);
    }

    /// One resolution sweep over the plan, parents before descendants.
    /// Returns whether anything changed (visibility, registry, or store).
    fn resolve_pass(&mut self, plan: &[PlanEntry]) -> bool {
        let epoch_before = self.registry.epoch();
        let values_before = self.store.snapshot().len();
        let mut transitions = false;
        let mut resolved = vec![false; plan.len()];

        for (index, entry) in plan.iter().enumerate() {
            let parent_visible = entry.parent.is_none_or(|parent| resolved[parent]);
            let renderable = parent_visible
                && resolve(entry.show_if.as_ref(), &self.registry, self.store.snapshot());
            resolved[index] = renderable;

            let previous = self.visibility(&entry.id);
            if renderable {
                if previous != Visibility::Visible {
                    // (re-)mount: a fresh fragment, no carried-over errors
                    if !entry.structural {
                        self.registry.register_field(
                            &entry.id,
                            entry.kind,
                            entry.rules.clone(),
                            entry.live,
                        );
                    }
                    for aux in &entry.aux_ids {
                        self.registry
                            .register_field(aux, ValueKind::String, Vec::new(), entry.live);
                    }
                    self.visibility.insert(entry.id.clone(), Visibility::Visible);
                    transitions = true;
                }
            } else {
                // deregister on the transition, and again if anything
                // re-registered the subtree while the node stayed hidden
                if previous != Visibility::Hidden || self.registry.contains(&entry.id) {
                    conceal(&entry.subtree_ids, &mut self.registry, &mut self.store);
                }
                if previous != Visibility::Hidden {
                    self.visibility.insert(entry.id.clone(), Visibility::Hidden);
                    transitions = true;
                }
            }
        }

        transitions
            || self.registry.epoch() != epoch_before
            || self.store.snapshot().len() != values_before
    }
}

impl std::fmt::Debug for FormEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormEngine")
            .field("fields", &self.plan.len())
            .field("registered", &self.registry.len())
            .field("values", &self.store.snapshot().len())
            .finish()
    }
}

fn build_plan(schema: &FormSchema) -> Vec<PlanEntry> {
    fn push(node: &FieldNode, parent: Option<usize>, plan: &mut Vec<PlanEntry>) {
        let index = plan.len();
        plan.push(PlanEntry {
            id: node.id.clone(),
            kind: node.value_kind,
            rules: node.rules.clone(),
            live: node.live,
            structural: node.kind.is_structural(),
            show_if: node.show_if.clone(),
            aux_ids: node.auxiliary_ids(),
            subtree_ids: node.subtree_ids(),
            parent,
        });
        // only checkbox/radio options smuggle mountable sub-trees
        if matches!(node.kind, NodeKind::Checkbox | NodeKind::Radio) {
            for option in &node.options {
                for child in &option.children {
                    push(child, Some(index), plan);
                }
            }
        }
        for child in &node.children {
            push(child, Some(index), plan);
        }
    }

    let mut plan = Vec::new();
    for field in &schema.fields {
        push(field, None, &mut plan);
    }
    plan
}
