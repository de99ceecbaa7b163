use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Base value kind a field's value is checked against before any rules run.
///
/// `Mixed` is the untyped marker: a node that declares no kind (or declares
/// one this engine does not know) accepts any value shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// Text values.
    String,
    /// Numeric values.
    Number,
    /// Boolean values.
    Boolean,
    /// List values.
    Array,
    /// Object values.
    Object,
    /// Untyped: the type check is vacuous.
    #[default]
    Mixed,
}

impl<'de> Deserialize<'de> for ValueKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(Self::from_tag(&tag))
    }
}

impl ValueKind {
    /// Parse an authoring tag. Unknown tags fall back to `Mixed`.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "string" => Self::String,
            "number" => Self::Number,
            "boolean" => Self::Boolean,
            "array" => Self::Array,
            "object" => Self::Object,
            "mixed" => Self::Mixed,
            other => {
                log::debug!("unknown value kind `{other}`, treating as mixed");
                Self::Mixed
            }
        }
    }

    /// The kind-specific type-mismatch message.
    pub fn mismatch_message(self) -> &'static str {
        match self {
            Self::String => "only text values are allowed",
            Self::Number => "only number values are allowed",
            Self::Boolean => "only boolean values are allowed",
            Self::Array => "only list values are allowed",
            Self::Object => "only object values are allowed",
            Self::Mixed => "value has an unexpected type",
        }
    }

    /// Whether `value` satisfies this kind. `Null` always passes: absence is
    /// the concern of `required`-style rules, not of the type check.
    pub fn matches(self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) | (Self::Mixed, _) => true,
            (Self::String, Value::String(_)) => true,
            (Self::Number, Value::Number(_)) => true,
            (Self::Boolean, Value::Bool(_)) => true,
            (Self::Array, Value::Array(_)) => true,
            (Self::Object, Value::Object(_)) => true,
            _ => false,
        }
    }
}
