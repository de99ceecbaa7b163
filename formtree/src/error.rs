use thiserror::Error;

/// Hard errors raised while parsing an authored schema tree.
///
/// Rule-level authoring mistakes (unknown rule tags, unknown format names,
/// unregistered condition names) are deliberately *not* represented here:
/// they survive parsing as [`crate::RuleSpec::Named`] and are skipped with a
/// diagnostic at composition time, so a schema authored against a newer rule
/// vocabulary degrades gracefully on an older engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The input was not valid JSON at all.
    #[error("invalid schema JSON: {0}")]
    Json(String),

    /// The schema root must be an object keyed by field id.
    #[error("schema root must be an object keyed by field id")]
    RootNotObject,

    /// A field entry must itself be an object.
    #[error("field `{0}` must be an object")]
    NodeNotObject(String),

    /// Every field entry needs a `kind` tag.
    #[error("field `{0}` has no `kind` tag")]
    MissingKind(String),

    /// A well-known key held a value of the wrong shape.
    #[error("field `{id}`: `{key}` must be {expected}")]
    BadEntry {
        /// Id of the offending field.
        id: String,
        /// Authoring key that failed to parse.
        key: &'static str,
        /// What the key was expected to hold.
        expected: &'static str,
    },

    /// A validation rule was neither a string nor a single-tag object.
    #[error("validation rule must be a string or a single-tag object")]
    BadRuleShape,

    /// A validation rule object carried more than one tag key.
    #[error("validation rule object carries more than one tag")]
    AmbiguousRule,

    /// A recognized rule tag carried arguments of the wrong shape.
    #[error("`{tag}` rule expects {expected}")]
    BadRuleArgs {
        /// The rule tag.
        tag: String,
        /// What its arguments were expected to be.
        expected: &'static str,
    },

    /// A `when` rule must reference exactly one dependency field.
    #[error("`when` rule must reference exactly one dependency field")]
    BadWhenShape,

    /// `showIf` groups must be objects mapping field ids to rule lists.
    #[error("showIf groups must be objects mapping field ids to rule lists")]
    BadRenderRule,
}
