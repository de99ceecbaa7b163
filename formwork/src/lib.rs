//! Formwork: the dynamic validation & conditional visibility engine behind
//! declaratively authored forms.
//!
//! A form instance owns a [`registry::ValidationRegistry`] of per-field rule
//! fragments, composed into a *soft* schema (live, as-you-type validation)
//! and a *hard* schema (submit gating). The [`visibility`] resolver decides,
//! per field, whether it exists in the rendered tree and the submitted
//! payload, deregistering whole sub-trees when a field hides. The
//! [`store`] keeps the value snapshot and tells the embedding application
//! when values or overall validity actually change.
//!
//! [`engine::FormEngine`] ties the pieces together for one mounted form.

pub mod compose;
pub mod conditions;
pub mod engine;
pub mod outcome;
pub mod registry;
pub mod store;
pub mod visibility;

mod value;

pub use engine::FormEngine;

pub mod prelude {
    //! Everything an embedder typically needs.

    pub use crate::compose::{ComposeMode, FieldSchema, compose};
    pub use crate::conditions::{ConditionError, ConditionRegistry, KindClass};
    pub use crate::engine::FormEngine;
    pub use crate::outcome::{FieldError, ValidationOutcome};
    pub use crate::registry::{CompositeSchema, Fragment, ValidationRegistry};
    pub use crate::store::{ChangeEmitter, ValueMap, ValueStore};
    pub use crate::visibility::{Visibility, resolve};

    pub use formtree::{
        BoundKind, FieldNode, FormSchema, FormatKind, NodeKind, RenderRule, RuleGroup, RuleSpec,
        ValueKind,
    };
}
