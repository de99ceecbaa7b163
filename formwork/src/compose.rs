//! Schema composer: folds a declarative rule list into an executable
//! per-field schema.
//!
//! Composition is pure: it produces a [`FieldSchema`] and nothing else.
//! Authoring mistakes (unregistered condition names, malformed pattern
//! literals) never fail composition: the offending rule is skipped with a
//! diagnostic so newer schemas degrade gracefully on older engines.

use std::fmt;
use std::sync::Arc;

use formtree::{BoundKind, FormatKind, PatternLiteral, RuleSpec, ValueKind};
use serde_json::Value;

use crate::conditions::SharedConditions;
use crate::store::ValueMap;
use crate::value::{NULL, magnitude, present};

type Check = Box<dyn Fn(&Value, &ValueMap) -> Result<(), String> + Send + Sync>;

/// How a composed schema treats transient input states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ComposeMode {
    /// Registered-fragment semantics: values must match the base kind.
    #[default]
    Strict,
    /// Visibility-resolution semantics: an empty string on a numeric field
    /// counts as absent instead of a type mismatch, because numeric inputs
    /// transiently hold empty text.
    Lenient,
}

/// Executable validation schema for one field: the base kind's type check
/// followed by the composed rule checks, in authored order.
pub struct FieldSchema {
    kind: ValueKind,
    mode: ComposeMode,
    checks: Vec<Check>,
}

impl FieldSchema {
    /// The base kind this schema validates against.
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Validate one value against this schema. `None` means the field is
    /// absent from the snapshot, which fails `required`-style checks but
    /// passes the type check. Returns the first failing message.
    pub fn validate(&self, value: Option<&Value>, snapshot: &ValueMap) -> Result<(), String> {
        let mut value = value.unwrap_or(&NULL);
        if self.mode == ComposeMode::Lenient
            && self.kind == ValueKind::Number
            && value.as_str().is_some_and(|s| s.trim().is_empty())
        {
            value = &NULL;
        }
        if !self.kind.matches(value) {
            return Err(self.kind.mismatch_message().to_string());
        }
        self.run_checks(value, snapshot)
    }

    /// Run the rule checks without the type check. Conditional sub-schemas
    /// use this so the base kind is not re-checked per branch.
    pub(crate) fn run_checks(&self, value: &Value, snapshot: &ValueMap) -> Result<(), String> {
        for check in &self.checks {
            check(value, snapshot)?;
        }
        Ok(())
    }
}

impl fmt::Debug for FieldSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSchema")
            .field("kind", &self.kind)
            .field("mode", &self.mode)
            .field("checks", &self.checks.len())
            .finish()
    }
}

/// Compose a field's executable schema with strict semantics.
pub fn compose(kind: ValueKind, rules: &[RuleSpec], conditions: &SharedConditions) -> FieldSchema {
    compose_with(kind, rules, conditions, ComposeMode::Strict)
}

/// Compose with an explicit [`ComposeMode`].
pub fn compose_with(
    kind: ValueKind,
    rules: &[RuleSpec],
    conditions: &SharedConditions,
    mode: ComposeMode,
) -> FieldSchema {
    let mut checks = Vec::new();
    for rule in rules {
        fold_rule(&mut checks, kind, rule, conditions, mode);
    }
    FieldSchema { kind, mode, checks }
}

fn fold_rule(
    checks: &mut Vec<Check>,
    kind: ValueKind,
    rule: &RuleSpec,
    conditions: &SharedConditions,
    mode: ComposeMode,
) {
    match rule {
        RuleSpec::Required { message } => {
            let message = message
                .clone()
                .unwrap_or_else(|| "this field is required".to_string());
            checks.push(Box::new(move |value, _| {
                if present(value) {
                    Ok(())
                } else {
                    Err(message.clone())
                }
            }));
        }

        RuleSpec::Bound {
            kind: bound,
            value: threshold,
            message,
        } => {
            // Thresholds only apply when positive; zero (or negative) means
            // the rule is absent, not "the threshold is zero".
            if *threshold <= 0.0 {
                log::debug!("ignoring `{}` rule with non-positive threshold", bound.tag());
                return;
            }
            let threshold = *threshold;
            let bound = *bound;
            let message = message.clone().unwrap_or_else(|| match bound {
                BoundKind::Length => format!("must have a length of at least {threshold}"),
                BoundKind::Min => format!("must be at least {threshold}"),
                BoundKind::Max => format!("must be at most {threshold}"),
            });
            checks.push(Box::new(move |value, _| {
                let Some(size) = magnitude(value) else {
                    return Ok(());
                };
                let passes = match bound {
                    BoundKind::Length | BoundKind::Min => size >= threshold,
                    BoundKind::Max => size <= threshold,
                };
                if passes { Ok(()) } else { Err(message.clone()) }
            }));
        }

        RuleSpec::Pattern { literal, message } => {
            let parsed = match PatternLiteral::parse(literal) {
                Ok(parsed) => parsed,
                Err(err) => {
                    log::warn!("skipping pattern rule: {err}");
                    return;
                }
            };
            let regex = match regex::Regex::new(&parsed.to_regex_source()) {
                Ok(regex) => regex,
                Err(err) => {
                    log::warn!("skipping pattern rule `{literal}`: {err}");
                    return;
                }
            };
            let message = message
                .clone()
                .unwrap_or_else(|| "value does not match the expected pattern".to_string());
            checks.push(Box::new(move |value, _| match value.as_str() {
                None => Ok(()),
                Some(s) if s.is_empty() => Ok(()),
                Some(s) => {
                    if regex.is_match(s) {
                        Ok(())
                    } else {
                        Err(message.clone())
                    }
                }
            }));
        }

        RuleSpec::Format {
            kind: format,
            message,
        } => {
            let format = *format;
            let message = message.clone().unwrap_or_else(|| {
                match format {
                    FormatKind::Email => "must be a valid email address",
                    FormatKind::Url => "must be a valid URL",
                    FormatKind::Uuid => "must be a valid UUID",
                }
                .to_string()
            });
            checks.push(Box::new(move |value, _| {
                // blank values pass; presence is `required`'s job
                let Some(s) = value.as_str().filter(|s| !s.is_empty()) else {
                    return Ok(());
                };
                let ok = match format {
                    FormatKind::Email => email_address::EmailAddress::is_valid(s),
                    FormatKind::Url => url::Url::parse(s).is_ok(),
                    FormatKind::Uuid => uuid::Uuid::parse_str(s).is_ok(),
                };
                if ok { Ok(()) } else { Err(message.clone()) }
            }));
        }

        RuleSpec::Named {
            name,
            args,
            message,
        } => {
            {
                let registry = conditions
                    .read()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                if !registry.knows(kind, name) {
                    log::warn!("skipping unregistered condition `{name}` for {kind:?} field");
                    return;
                }
            }
            let conditions = Arc::clone(conditions);
            let name = name.clone();
            let args = args.clone();
            let message = message
                .clone()
                .unwrap_or_else(|| format!("condition `{name}` failed"));
            checks.push(Box::new(move |value, snapshot| {
                let registry = conditions
                    .read()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                // registered at compose time; a later replacement is picked
                // up here, a vanished entry passes vacuously
                let Some(condition) = registry.lookup(kind, &name) else {
                    return Ok(());
                };
                if condition(value, &args, snapshot) {
                    Ok(())
                } else {
                    Err(message.clone())
                }
            }));
        }

        RuleSpec::When {
            dependency,
            expected,
            then,
            otherwise,
        } => {
            let then_schema = Arc::new(compose_with(kind, then, conditions, mode));
            let otherwise_schema = Arc::new(compose_with(kind, otherwise, conditions, mode));
            let dependency = dependency.clone();
            let expected = expected.clone();
            checks.push(Box::new(move |value, snapshot| {
                let current = snapshot.get(&dependency).unwrap_or(&NULL);
                let branch = if *current == expected {
                    &then_schema
                } else {
                    &otherwise_schema
                };
                branch.run_checks(value, snapshot)
            }));
        }
    }
}
