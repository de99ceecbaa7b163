pub mod error;
pub mod kind;
pub mod node;
pub mod pattern;
pub mod rules;

pub use error::SchemaError;
pub use kind::ValueKind;
pub use node::{FieldNode, FormSchema, NodeKind, OptionEntry};
pub use pattern::{PatternError, PatternLiteral};
pub use rules::{BoundKind, FormatKind, RenderRule, RuleGroup, RuleSpec};
