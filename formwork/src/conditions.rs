//! Named-condition registry: the runtime extension point of the rule
//! vocabulary.
//!
//! A condition is a predicate `(value, args, snapshot) -> bool`, registered
//! under a `(kind class, name)` key. Lookup tries the field's own class
//! first and falls back to the `Any` bucket, so a condition registered for
//! `Any` serves every field kind. Registration is additive: the shipped
//! built-in names are write-protected, custom names may be re-registered.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use formtree::ValueKind;
use serde_json::Value;
use thiserror::Error;

use crate::store::ValueMap;
use crate::value::present;

/// Class of base value kinds a condition is registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KindClass {
    /// Text fields.
    Text,
    /// Numeric fields.
    Numeric,
    /// Boolean fields.
    Toggle,
    /// List fields.
    List,
    /// Object fields.
    Entries,
    /// Every field, including untyped ones.
    Any,
}

impl KindClass {
    /// The class a value kind belongs to.
    pub fn of(kind: ValueKind) -> Self {
        match kind {
            ValueKind::String => Self::Text,
            ValueKind::Number => Self::Numeric,
            ValueKind::Boolean => Self::Toggle,
            ValueKind::Array => Self::List,
            ValueKind::Object => Self::Entries,
            ValueKind::Mixed => Self::Any,
        }
    }
}

/// Predicate signature: current value, rule arguments, whole snapshot.
pub type ConditionFn = Box<dyn Fn(&Value, &Value, &ValueMap) -> bool + Send + Sync>;

/// The condition registry handle shared between composed schemas.
pub type SharedConditions = Arc<RwLock<ConditionRegistry>>;

/// Errors raised by condition registration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConditionError {
    /// The name belongs to a shipped built-in and cannot be replaced.
    #[error("`{0}` is a built-in condition and cannot be replaced")]
    ReservedName(String),
}

struct Registered {
    func: ConditionFn,
    builtin: bool,
}

/// Registry of named conditions for one form instance.
pub struct ConditionRegistry {
    conditions: HashMap<(KindClass, String), Registered>,
}

impl ConditionRegistry {
    /// An empty registry with no conditions at all.
    pub fn empty() -> Self {
        Self {
            conditions: HashMap::new(),
        }
    }

    /// A registry preloaded with the shipped built-ins.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();

        registry.builtin(KindClass::Any, "filled", |value, args, _| {
            present(value) == args.as_bool().unwrap_or(true)
        });
        registry.builtin(KindClass::Any, "empty", |value, _, _| !present(value));
        registry.builtin(KindClass::Any, "is", |value, args, _| value == args);
        registry.builtin(KindClass::Any, "is_not", |value, args, _| value != args);
        registry.builtin(KindClass::Any, "in", |value, args, _| {
            let Some(allowed) = args.as_array() else {
                return false;
            };
            match value {
                Value::Array(items) => items.iter().all(|item| allowed.contains(item)),
                other => allowed.contains(other),
            }
        });
        registry.builtin(KindClass::Any, "not_in", |value, args, _| {
            let Some(banned) = args.as_array() else {
                return false;
            };
            match value {
                Value::Array(items) => items.iter().all(|item| !banned.contains(item)),
                other => !banned.contains(other),
            }
        });
        registry.builtin(KindClass::Text, "national_id", |value, _, _| {
            value.as_str().is_some_and(national_id_valid)
        });

        registry
    }

    /// Register a condition. Built-in names are write-protected; a custom
    /// name may be registered again, replacing the earlier predicate.
    pub fn register<F>(&mut self, class: KindClass, name: &str, func: F) -> Result<(), ConditionError>
    where
        F: Fn(&Value, &Value, &ValueMap) -> bool + Send + Sync + 'static,
    {
        let key = (class, name.to_string());
        if self.conditions.get(&key).is_some_and(|entry| entry.builtin) {
            return Err(ConditionError::ReservedName(name.to_string()));
        }
        self.conditions.insert(
            key,
            Registered {
                func: Box::new(func),
                builtin: false,
            },
        );
        Ok(())
    }

    /// Look up a condition for a field of the given kind, falling back to
    /// the `Any` bucket.
    pub fn lookup(&self, kind: ValueKind, name: &str) -> Option<&ConditionFn> {
        let class = KindClass::of(kind);
        self.conditions
            .get(&(class, name.to_string()))
            .or_else(|| {
                if class == KindClass::Any {
                    None
                } else {
                    self.conditions.get(&(KindClass::Any, name.to_string()))
                }
            })
            .map(|entry| &entry.func)
    }

    /// Whether a condition resolves for the given kind.
    pub fn knows(&self, kind: ValueKind, name: &str) -> bool {
        self.lookup(kind, name).is_some()
    }

    fn builtin<F>(&mut self, class: KindClass, name: &str, func: F)
    where
        F: Fn(&Value, &Value, &ValueMap) -> bool + Send + Sync + 'static,
    {
        self.conditions.insert(
            (class, name.to_string()),
            Registered {
                func: Box::new(func),
                builtin: true,
            },
        );
    }
}

impl Default for ConditionRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for ConditionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&(KindClass, String)> = self.conditions.keys().collect();
        names.sort_by(|a, b| a.1.cmp(&b.1));
        f.debug_struct("ConditionRegistry")
            .field("conditions", &names)
            .finish()
    }
}

/// 10-digit national-id check: the last digit is a mod-11 checksum over the
/// first nine, weighted 10 down to 2. All-identical sequences are rejected.
fn national_id_valid(id: &str) -> bool {
    let digits: Vec<u32> = id.chars().filter_map(|c| c.to_digit(10)).collect();
    if id.chars().count() != 10 || digits.len() != 10 {
        return false;
    }
    if digits.windows(2).all(|pair| pair[0] == pair[1]) {
        return false;
    }
    let sum: u32 = digits[..9]
        .iter()
        .enumerate()
        .map(|(i, digit)| digit * (10 - i as u32))
        .sum();
    let remainder = sum % 11;
    if remainder < 2 {
        digits[9] == remainder
    } else {
        digits[9] == 11 - remainder
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn snapshot() -> ValueMap {
        ValueMap::new()
    }

    fn check(registry: &ConditionRegistry, kind: ValueKind, name: &str, value: &Value, args: &Value) -> bool {
        registry.lookup(kind, name).unwrap()(value, args, &snapshot())
    }

    #[test]
    fn test_filled_and_empty() {
        let reg = ConditionRegistry::with_builtins();
        assert!(check(&reg, ValueKind::String, "filled", &json!("x"), &Value::Null));
        assert!(!check(&reg, ValueKind::String, "filled", &json!(""), &Value::Null));
        // filled(false) asserts absence
        assert!(check(&reg, ValueKind::String, "filled", &json!(""), &json!(false)));
        assert!(check(&reg, ValueKind::String, "empty", &Value::Null, &Value::Null));
    }

    #[test]
    fn test_equality_conditions() {
        let reg = ConditionRegistry::with_builtins();
        assert!(check(&reg, ValueKind::String, "is", &json!("a"), &json!("a")));
        assert!(!check(&reg, ValueKind::String, "is", &json!("a"), &json!("b")));
        assert!(check(&reg, ValueKind::Number, "is_not", &json!(1), &json!(2)));
    }

    #[test]
    fn test_inclusion_conditions() {
        let reg = ConditionRegistry::with_builtins();
        assert!(check(&reg, ValueKind::String, "in", &json!("eu"), &json!(["eu", "us"])));
        assert!(!check(&reg, ValueKind::String, "in", &json!("jp"), &json!(["eu", "us"])));
        // an array value requires every element included
        assert!(check(&reg, ValueKind::Array, "in", &json!(["a", "b"]), &json!(["a", "b", "c"])));
        assert!(!check(&reg, ValueKind::Array, "in", &json!(["a", "x"]), &json!(["a", "b", "c"])));
        assert!(check(&reg, ValueKind::String, "not_in", &json!("jp"), &json!(["eu", "us"])));
        // malformed args never satisfy the condition
        assert!(!check(&reg, ValueKind::String, "in", &json!("eu"), &json!("eu")));
    }

    #[test]
    fn test_national_id_checksum() {
        let reg = ConditionRegistry::with_builtins();
        assert!(check(&reg, ValueKind::String, "national_id", &json!("0499370899"), &Value::Null));
        assert!(!check(&reg, ValueKind::String, "national_id", &json!("0499370891"), &Value::Null));
        assert!(!check(&reg, ValueKind::String, "national_id", &json!("1111111111"), &Value::Null));
        assert!(!check(&reg, ValueKind::String, "national_id", &json!("123"), &Value::Null));
    }

    #[test]
    fn test_class_fallback_to_any() {
        let reg = ConditionRegistry::with_builtins();
        // `filled` is registered under Any but resolves for every kind
        assert!(reg.knows(ValueKind::Number, "filled"));
        assert!(reg.knows(ValueKind::Mixed, "filled"));
        // `national_id` is Text-only
        assert!(reg.knows(ValueKind::String, "national_id"));
        assert!(!reg.knows(ValueKind::Number, "national_id"));
    }

    #[test]
    fn test_builtin_names_are_protected() {
        let mut reg = ConditionRegistry::with_builtins();
        let err = reg
            .register(KindClass::Any, "filled", |_, _, _| true)
            .unwrap_err();
        assert_eq!(err, ConditionError::ReservedName("filled".to_string()));
    }

    #[test]
    fn test_custom_conditions_may_be_replaced() {
        let mut reg = ConditionRegistry::with_builtins();
        reg.register(KindClass::Numeric, "lucky", |value, _, _| {
            value.as_f64() == Some(7.0)
        })
        .unwrap();
        assert!(check(&reg, ValueKind::Number, "lucky", &json!(7), &Value::Null));

        reg.register(KindClass::Numeric, "lucky", |value, _, _| {
            value.as_f64() == Some(13.0)
        })
        .unwrap();
        assert!(check(&reg, ValueKind::Number, "lucky", &json!(13), &Value::Null));
    }

    #[test]
    fn test_snapshot_is_passed_through() {
        let mut reg = ConditionRegistry::with_builtins();
        reg.register(KindClass::Any, "matches_sibling", |value, args, all| {
            args.as_str()
                .and_then(|id| all.get(id))
                .is_some_and(|other| other == value)
        })
        .unwrap();

        let mut all = ValueMap::new();
        all.insert("password".to_string(), json!("hunter2"));
        let cond = reg.lookup(ValueKind::String, "matches_sibling").unwrap();
        assert!(cond(&json!("hunter2"), &json!("password"), &all));
        assert!(!cond(&json!("other"), &json!("password"), &all));
    }
}
