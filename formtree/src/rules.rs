//! The rule vocabulary: validation rules and render (visibility) rules.
//!
//! Rules are authored as an ordered list where each entry is either a bare
//! string (`"required"`, `"email"`, or a named condition) or a single-tag
//! object with an optional `errorMessage` sibling key:
//!
//! ```json
//! [
//!   "required",
//!   { "length": 5, "errorMessage": "pick a longer handle" },
//!   { "matches": "/^[a-z0-9_]+$/i" },
//!   { "when": { "plan": { "is": "custom", "then": [ "required" ] } } }
//! ]
//! ```
//!
//! Unknown tags parse as [`RuleSpec::Named`] instead of failing: dispatch
//! problems are reported (and the rule skipped) when the schema is composed,
//! not when it is read.

use std::collections::HashMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::SchemaError;

/// Which threshold a [`RuleSpec::Bound`] enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundKind {
    /// Minimum length in characters (text) or elements (lists).
    Length,
    /// Minimum numeric value or length.
    Min,
    /// Maximum numeric value or length.
    Max,
}

impl BoundKind {
    /// The authoring tag for this bound.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Length => "length",
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

/// Built-in format checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatKind {
    /// RFC-compliant email address.
    Email,
    /// Absolute URL.
    Url,
    /// UUID in any accepted textual form.
    Uuid,
}

impl FormatKind {
    /// Parse an authoring tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "email" => Some(Self::Email),
            "url" => Some(Self::Url),
            "uuid" => Some(Self::Uuid),
            _ => None,
        }
    }

    /// The authoring tag for this format.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Url => "url",
            Self::Uuid => "uuid",
        }
    }
}

/// One declarative validation rule. Order within a rule list is significant.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleSpec {
    /// The value must be present (non-null, non-blank, non-empty).
    Required {
        /// Message override.
        message: Option<String>,
    },
    /// A threshold check. Thresholds only apply when positive.
    Bound {
        /// Which bound.
        kind: BoundKind,
        /// The threshold.
        value: f64,
        /// Message override.
        message: Option<String>,
    },
    /// The value must match a `/body/flags` pattern literal.
    Pattern {
        /// The raw literal as authored.
        literal: String,
        /// Message override.
        message: Option<String>,
    },
    /// The value must satisfy a built-in format check.
    Format {
        /// Which format.
        kind: FormatKind,
        /// Message override.
        message: Option<String>,
    },
    /// Dispatch to a registered named condition.
    Named {
        /// Condition name.
        name: String,
        /// Arguments, passed through verbatim.
        args: Value,
        /// Message override.
        message: Option<String>,
    },
    /// Branch between two sub-rule lists on another field's current value.
    When {
        /// Id of the field whose value selects the branch.
        dependency: String,
        /// The value that selects the `then` branch.
        expected: Value,
        /// Rules applied while the dependency equals `expected`.
        then: Vec<RuleSpec>,
        /// Rules applied otherwise.
        otherwise: Vec<RuleSpec>,
    },
}

impl RuleSpec {
    /// Parse one authored rule entry.
    pub fn from_value(value: &Value) -> Result<Self, SchemaError> {
        match value {
            Value::String(tag) => Ok(Self::from_bare_tag(tag)),
            Value::Object(map) => {
                let message = map
                    .get("errorMessage")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                let mut tags = map.iter().filter(|(key, _)| key.as_str() != "errorMessage");
                let Some((tag, args)) = tags.next() else {
                    return Err(SchemaError::BadRuleShape);
                };
                if tags.next().is_some() {
                    return Err(SchemaError::AmbiguousRule);
                }
                Self::from_tagged(tag, args, message)
            }
            _ => Err(SchemaError::BadRuleShape),
        }
    }

    fn from_bare_tag(tag: &str) -> Self {
        if tag == "required" {
            return Self::Required { message: None };
        }
        if let Some(kind) = FormatKind::from_tag(tag) {
            return Self::Format {
                kind,
                message: None,
            };
        }
        Self::Named {
            name: tag.to_string(),
            args: Value::Null,
            message: None,
        }
    }

    fn from_tagged(tag: &str, args: &Value, message: Option<String>) -> Result<Self, SchemaError> {
        match tag {
            "required" => Ok(Self::Required { message }),
            "length" => Self::bound(BoundKind::Length, args, message),
            "min" => Self::bound(BoundKind::Min, args, message),
            "max" => Self::bound(BoundKind::Max, args, message),
            "matches" => {
                let literal = args.as_str().ok_or(SchemaError::BadRuleArgs {
                    tag: tag.to_string(),
                    expected: "a pattern literal string",
                })?;
                Ok(Self::Pattern {
                    literal: literal.to_string(),
                    message,
                })
            }
            "format" => {
                let name = args.as_str().ok_or(SchemaError::BadRuleArgs {
                    tag: tag.to_string(),
                    expected: "a format name",
                })?;
                match FormatKind::from_tag(name) {
                    Some(kind) => Ok(Self::Format { kind, message }),
                    // An unknown format name from a newer vocabulary: carry
                    // it as a named rule so composition can report it.
                    None => Ok(Self::Named {
                        name: format!("format:{name}"),
                        args: args.clone(),
                        message,
                    }),
                }
            }
            "when" => Self::parse_when(args),
            _ => Ok(Self::Named {
                name: tag.to_string(),
                args: args.clone(),
                message,
            }),
        }
    }

    fn bound(kind: BoundKind, args: &Value, message: Option<String>) -> Result<Self, SchemaError> {
        let value = args.as_f64().ok_or(SchemaError::BadRuleArgs {
            tag: kind.tag().to_string(),
            expected: "a numeric threshold",
        })?;
        Ok(Self::Bound {
            kind,
            value,
            message,
        })
    }

    fn parse_when(args: &Value) -> Result<Self, SchemaError> {
        let Value::Object(map) = args else {
            return Err(SchemaError::BadWhenShape);
        };
        let mut entries = map.iter();
        let Some((dependency, clause)) = entries.next() else {
            return Err(SchemaError::BadWhenShape);
        };
        if entries.next().is_some() {
            return Err(SchemaError::BadWhenShape);
        }
        let Value::Object(clause) = clause else {
            return Err(SchemaError::BadWhenShape);
        };

        let expected = clause.get("is").cloned().unwrap_or(Value::Null);
        let branch = |key: &'static str| -> Result<Vec<RuleSpec>, SchemaError> {
            match clause.get(key) {
                None => Ok(Vec::new()),
                Some(Value::Array(items)) => items.iter().map(RuleSpec::from_value).collect(),
                Some(_) => Err(SchemaError::BadRuleArgs {
                    tag: "when".to_string(),
                    expected: "`then`/`otherwise` to be rule lists",
                }),
            }
        };

        Ok(Self::When {
            dependency: dependency.clone(),
            expected,
            then: branch("then")?,
            otherwise: branch("otherwise")?,
        })
    }
}

impl<'de> Deserialize<'de> for RuleSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value).map_err(D::Error::custom)
    }
}

/// A conjunction: every referenced field must pass every listed rule.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RuleGroup(pub HashMap<String, Vec<RuleSpec>>);

impl RuleGroup {
    /// Parse one authored group object.
    pub fn from_value(value: &Value) -> Result<Self, SchemaError> {
        let Value::Object(map) = value else {
            return Err(SchemaError::BadRenderRule);
        };
        let mut group = HashMap::new();
        for (field_id, specs) in map {
            let Value::Array(items) = specs else {
                return Err(SchemaError::BadRenderRule);
            };
            let specs = items
                .iter()
                .map(RuleSpec::from_value)
                .collect::<Result<Vec<_>, _>>()?;
            group.insert(field_id.clone(), specs);
        }
        Ok(Self(group))
    }
}

/// A disjunction of [`RuleGroup`]s controlling a field's renderability.
///
/// The field is renderable iff at least one group is satisfied; an empty
/// rule means "always renderable".
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderRule(pub Vec<RuleGroup>);

impl RenderRule {
    /// Whether this rule imposes no condition at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse an authored `showIf` list.
    pub fn from_value(value: &Value) -> Result<Self, SchemaError> {
        let Value::Array(groups) = value else {
            return Err(SchemaError::BadRenderRule);
        };
        let groups = groups
            .iter()
            .map(RuleGroup::from_value)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self(groups))
    }

    /// Every field id referenced by any group.
    pub fn referenced_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .0
            .iter()
            .flat_map(|group| group.0.keys().map(String::as_str))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

impl<'de> Deserialize<'de> for RenderRule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value).map_err(D::Error::custom)
    }
}
