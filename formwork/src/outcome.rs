//! Validation outcomes reported to the embedding application.

use serde::Serialize;

/// A single field's validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Field id the failure belongs to.
    pub field_id: String,
    /// The failing rule's own message, else a kind-specific default.
    pub message: String,
}

/// Result of validating a value snapshot against a composite schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub enum ValidationOutcome {
    /// Every field passed.
    #[default]
    Valid,
    /// One or more fields failed.
    Invalid(Vec<FieldError>),
}

impl ValidationOutcome {
    /// Whether every field passed.
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    /// Whether any field failed.
    pub fn is_invalid(&self) -> bool {
        !self.is_valid()
    }

    /// All failures, ordered by field id.
    pub fn errors(&self) -> &[FieldError] {
        match self {
            Self::Valid => &[],
            Self::Invalid(errors) => errors,
        }
    }

    /// The first failure, if any.
    pub fn first_error(&self) -> Option<&FieldError> {
        self.errors().first()
    }

    /// The failure message for one field, if it failed.
    pub fn error_for(&self, field_id: &str) -> Option<&str> {
        self.errors()
            .iter()
            .find(|error| error.field_id == field_id)
            .map(|error| error.message.as_str())
    }
}
