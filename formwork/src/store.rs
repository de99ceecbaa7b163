//! Value snapshot and change propagation.
//!
//! The store mirrors the reactive form-state the widget layer writes into,
//! one snapshot per form instance. It also tracks externally-injected field
//! errors (a server rejecting a submitted value): a local edit clears the
//! external error of the edited field, and only of fields whose value
//! actually changed.

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;

/// Snapshot of current field values, keyed by field id.
pub type ValueMap = HashMap<String, Value>;

/// The per-form value snapshot plus externally-injected errors.
#[derive(Debug, Default)]
pub struct ValueStore {
    values: ValueMap,
    external_errors: HashMap<String, String>,
}

impl ValueStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Targeted change of a single field. Returns whether the value
    /// actually changed; a real change clears that field's external error.
    pub fn set(&mut self, field_id: &str, value: Value) -> bool {
        if self.values.get(field_id) == Some(&value) {
            return false;
        }
        self.values.insert(field_id.to_string(), value);
        self.external_errors.remove(field_id);
        true
    }

    /// Bulk change of the whole snapshot (e.g. a schema override). External
    /// errors are cleared only for ids whose value actually changed.
    pub fn replace(&mut self, values: ValueMap) -> bool {
        if self.values == values {
            return false;
        }
        let changed: Vec<String> = values
            .iter()
            .filter(|(id, value)| self.values.get(id.as_str()) != Some(*value))
            .map(|(id, _)| id.clone())
            .chain(
                self.values
                    .keys()
                    .filter(|id| !values.contains_key(*id))
                    .cloned(),
            )
            .collect();
        for id in changed {
            self.external_errors.remove(&id);
        }
        self.values = values;
        true
    }

    /// Drop a field's value (deregistration cleanup). Returns whether an
    /// entry existed; absent ids are a silent no-op.
    pub fn remove(&mut self, field_id: &str) -> bool {
        self.external_errors.remove(field_id);
        self.values.remove(field_id).is_some()
    }

    /// One field's current value.
    pub fn get(&self, field_id: &str) -> Option<&Value> {
        self.values.get(field_id)
    }

    /// The whole snapshot.
    pub fn snapshot(&self) -> &ValueMap {
        &self.values
    }

    /// Attach an externally-injected error to a field.
    pub fn set_external_error(&mut self, field_id: &str, message: impl Into<String>) {
        self.external_errors
            .insert(field_id.to_string(), message.into());
    }

    /// A field's externally-injected error, if still standing.
    pub fn external_error(&self, field_id: &str) -> Option<&str> {
        self.external_errors.get(field_id).map(String::as_str)
    }

    /// All standing external errors.
    pub fn external_errors(&self) -> &HashMap<String, String> {
        &self.external_errors
    }
}

/// Listener invoked with `(values, is_valid)`.
pub type ChangeListener = Box<dyn FnMut(&ValueMap, bool) + Send>;

/// Emits `(values, is_valid)` to the embedding application, suppressing
/// notifications when neither changed since the last emission; registry
/// recompositions for unrelated reasons must not re-fire.
#[derive(Default)]
pub struct ChangeEmitter {
    listener: Option<ChangeListener>,
    last: Option<(ValueMap, bool)>,
}

impl ChangeEmitter {
    /// An emitter with no listener yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the listener. Replaces any earlier one.
    pub fn subscribe(&mut self, listener: impl FnMut(&ValueMap, bool) + Send + 'static) {
        self.listener = Some(Box::new(listener));
    }

    /// Emit if values (deep equality) or validity changed.
    pub fn emit(&mut self, values: &ValueMap, is_valid: bool) {
        if self
            .last
            .as_ref()
            .is_some_and(|(last_values, last_valid)| last_values == values && *last_valid == is_valid)
        {
            return;
        }
        self.last = Some((values.clone(), is_valid));
        if let Some(listener) = &mut self.listener {
            listener(values, is_valid);
        }
    }

    /// The last emitted pair.
    pub fn last(&self) -> Option<(&ValueMap, bool)> {
        self.last.as_ref().map(|(values, valid)| (values, *valid))
    }
}

impl fmt::Debug for ChangeEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeEmitter")
            .field("subscribed", &self.listener.is_some())
            .field("last", &self.last)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use serde_json::json;

    use super::*;

    #[test]
    fn test_set_reports_real_changes_only() {
        let mut store = ValueStore::new();
        assert!(store.set("a", json!("x")));
        assert!(!store.set("a", json!("x")));
        assert!(store.set("a", json!("y")));
    }

    #[test]
    fn test_external_error_cleared_by_real_edit_only() {
        let mut store = ValueStore::new();
        store.set("a", json!("x"));
        store.set_external_error("a", "taken");
        store.set_external_error("b", "bad");

        // a no-op write keeps the error
        store.set("a", json!("x"));
        assert_eq!(store.external_error("a"), Some("taken"));

        // editing a different field leaves it standing too
        store.set("c", json!("z"));
        assert_eq!(store.external_error("a"), Some("taken"));

        // a real edit clears it, and only it
        store.set("a", json!("y"));
        assert_eq!(store.external_error("a"), None);
        assert_eq!(store.external_error("b"), Some("bad"));
    }

    #[test]
    fn test_replace_clears_errors_for_changed_ids() {
        let mut store = ValueStore::new();
        store.set("a", json!(1));
        store.set("b", json!(2));
        store.set_external_error("a", "bad a");
        store.set_external_error("b", "bad b");

        let mut next = ValueMap::new();
        next.insert("a".to_string(), json!(1)); // unchanged
        next.insert("b".to_string(), json!(3)); // changed
        assert!(store.replace(next));

        assert_eq!(store.external_error("a"), Some("bad a"));
        assert_eq!(store.external_error("b"), None);
    }

    #[test]
    fn test_replace_treats_dropped_ids_as_changed() {
        let mut store = ValueStore::new();
        store.set("gone", json!(1));
        store.set_external_error("gone", "bad");

        assert!(store.replace(ValueMap::new()));
        assert_eq!(store.external_error("gone"), None);
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_emitter_suppresses_unchanged_pairs() {
        let seen: Arc<Mutex<Vec<(usize, bool)>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let mut emitter = ChangeEmitter::new();
        emitter.subscribe(move |values, valid| {
            sink.lock().unwrap().push((values.len(), valid));
        });

        let mut values = ValueMap::new();
        emitter.emit(&values, false);
        emitter.emit(&values, false); // suppressed

        values.insert("a".to_string(), json!(1));
        emitter.emit(&values, false);
        emitter.emit(&values, true); // validity flip alone still fires

        assert_eq!(*seen.lock().unwrap(), vec![(0, false), (1, false), (1, true)]);
        assert_eq!(emitter.last(), Some((&values, true)));
    }
}
