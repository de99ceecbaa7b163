//! The authored field tree.
//!
//! A form schema is a tree of [`FieldNode`]s, authored as nested JSON
//! objects keyed by field id. Most nodes keep their sub-fields under
//! `children`, but some kinds smuggle fields in non-standard positions:
//! checkbox and radio nodes attach sub-trees under individual *options*,
//! and a chips node implicitly owns a free-text companion field named
//! `<id>-textarea`. Descendant enumeration therefore dispatches on
//! [`NodeKind`] instead of sniffing for a `children` key.

use serde_json::Value;

use crate::error::SchemaError;
use crate::kind::ValueKind;
use crate::rules::{RenderRule, RuleSpec};

/// Widget kind tag. Drives the default value kind and the shape of
/// descendant enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Single-line text field.
    Text,
    /// Multi-line text field.
    Textarea,
    /// Numeric field.
    Number,
    /// On/off switch.
    Toggle,
    /// Multi-select with per-option sub-trees.
    Checkbox,
    /// Single-select with per-option sub-trees.
    Radio,
    /// Drop-down select.
    Select,
    /// Tag list with an implicit `<id>-textarea` companion field.
    Chips,
    /// Structural container; carries no value of its own.
    Group,
    /// Unrecognized tag, preserved verbatim.
    Custom(String),
}

impl NodeKind {
    /// Parse an authoring tag. Unknown tags are preserved as `Custom`.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "text" => Self::Text,
            "textarea" => Self::Textarea,
            "number" => Self::Number,
            "toggle" => Self::Toggle,
            "checkbox" => Self::Checkbox,
            "radio" => Self::Radio,
            "select" => Self::Select,
            "chips" => Self::Chips,
            "group" => Self::Group,
            other => Self::Custom(other.to_string()),
        }
    }

    /// The authoring tag for this kind.
    pub fn tag(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::Textarea => "textarea",
            Self::Number => "number",
            Self::Toggle => "toggle",
            Self::Checkbox => "checkbox",
            Self::Radio => "radio",
            Self::Select => "select",
            Self::Chips => "chips",
            Self::Group => "group",
            Self::Custom(tag) => tag,
        }
    }

    /// The value kind a node of this kind holds unless it declares one.
    pub fn default_value_kind(&self) -> ValueKind {
        match self {
            Self::Text | Self::Textarea | Self::Select | Self::Radio => ValueKind::String,
            Self::Number => ValueKind::Number,
            Self::Toggle => ValueKind::Boolean,
            Self::Checkbox | Self::Chips => ValueKind::Array,
            Self::Group | Self::Custom(_) => ValueKind::Mixed,
        }
    }

    /// Whether nodes of this kind carry no value of their own.
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Group)
    }
}

/// One option of a checkbox/radio/select node. Checkbox and radio options
/// may own whole sub-trees of their own.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OptionEntry {
    /// The value this option contributes when picked.
    pub value: Value,
    /// Display label.
    pub label: Option<String>,
    /// Sub-fields revealed by this option.
    pub children: Vec<FieldNode>,
}

/// One node of the authored schema tree, immutable per render pass.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldNode {
    /// Field id, unique across the whole rendered tree at any instant.
    pub id: String,
    /// Widget kind.
    pub kind: NodeKind,
    /// Base value kind the field's value is validated against.
    pub value_kind: ValueKind,
    /// Display label.
    pub label: Option<String>,
    /// Validation rules, in authored order.
    pub rules: Vec<RuleSpec>,
    /// Visibility conditions; absent means always renderable.
    pub show_if: Option<RenderRule>,
    /// Whether the field participates in live (as-you-type) validation.
    pub live: bool,
    /// Generic sub-fields.
    pub children: Vec<FieldNode>,
    /// Options, for kinds that have them.
    pub options: Vec<OptionEntry>,
}

impl FieldNode {
    /// Create a node with the kind's default value kind and no rules.
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        let value_kind = kind.default_value_kind();
        Self {
            id: id.into(),
            kind,
            value_kind,
            label: None,
            rules: Vec::new(),
            show_if: None,
            live: true,
            children: Vec::new(),
            options: Vec::new(),
        }
    }

    /// Override the value kind.
    pub fn value_kind(mut self, kind: ValueKind) -> Self {
        self.value_kind = kind;
        self
    }

    /// Set the display label.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Append a validation rule.
    pub fn rule(mut self, rule: RuleSpec) -> Self {
        self.rules.push(rule);
        self
    }

    /// Set the visibility rule.
    pub fn show_if(mut self, rule: RenderRule) -> Self {
        self.show_if = Some(rule);
        self
    }

    /// Opt the field out of live validation.
    pub fn deferred(mut self) -> Self {
        self.live = false;
        self
    }

    /// Append a generic child.
    pub fn child(mut self, child: FieldNode) -> Self {
        self.children.push(child);
        self
    }

    /// Append an option.
    pub fn option(mut self, option: OptionEntry) -> Self {
        self.options.push(option);
        self
    }

    /// Implicit companion field ids owned by this node.
    pub fn auxiliary_ids(&self) -> Vec<String> {
        match self.kind {
            NodeKind::Chips => vec![format!("{}-textarea", self.id)],
            _ => Vec::new(),
        }
    }

    /// Every field id in this node's subtree: the node itself, its implicit
    /// companions, and all descendants however deeply nested, including
    /// the ones option entries smuggle in. This is the deregistration set
    /// used when the node transitions to hidden.
    pub fn subtree_ids(&self) -> Vec<String> {
        let mut ids = Vec::new();
        self.collect_ids(&mut ids);
        ids
    }

    fn collect_ids(&self, ids: &mut Vec<String>) {
        ids.push(self.id.clone());
        ids.extend(self.auxiliary_ids());
        match self.kind {
            NodeKind::Checkbox | NodeKind::Radio => {
                for option in &self.options {
                    for child in &option.children {
                        child.collect_ids(ids);
                    }
                }
            }
            _ => {}
        }
        for child in &self.children {
            child.collect_ids(ids);
        }
    }

    /// Parse one authored `(id, entry)` pair.
    pub fn from_entry(id: &str, entry: &Value) -> Result<Self, SchemaError> {
        let Value::Object(map) = entry else {
            return Err(SchemaError::NodeNotObject(id.to_string()));
        };

        let kind = map
            .get("kind")
            .and_then(Value::as_str)
            .map(NodeKind::from_tag)
            .ok_or_else(|| SchemaError::MissingKind(id.to_string()))?;

        let value_kind = match map.get("valueKind") {
            None => kind.default_value_kind(),
            Some(value) => {
                let tag = value.as_str().ok_or(SchemaError::BadEntry {
                    id: id.to_string(),
                    key: "valueKind",
                    expected: "a kind name",
                })?;
                ValueKind::from_tag(tag)
            }
        };

        let rules = match map.get("validation") {
            None => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(RuleSpec::from_value)
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => {
                return Err(SchemaError::BadEntry {
                    id: id.to_string(),
                    key: "validation",
                    expected: "a list of rules",
                });
            }
        };

        let show_if = map.get("showIf").map(RenderRule::from_value).transpose()?;

        let children = match map.get("children") {
            None => Vec::new(),
            Some(value) => parse_children(id, value)?,
        };

        let options = match map.get("options") {
            None => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| parse_option(id, item))
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => {
                return Err(SchemaError::BadEntry {
                    id: id.to_string(),
                    key: "options",
                    expected: "a list of option entries",
                });
            }
        };

        Ok(Self {
            id: id.to_string(),
            kind,
            value_kind,
            label: map.get("label").and_then(Value::as_str).map(str::to_string),
            rules,
            show_if,
            live: map
                .get("liveValidation")
                .and_then(Value::as_bool)
                .unwrap_or(true),
            children,
            options,
        })
    }
}

fn parse_children(parent_id: &str, value: &Value) -> Result<Vec<FieldNode>, SchemaError> {
    let Value::Object(map) = value else {
        return Err(SchemaError::BadEntry {
            id: parent_id.to_string(),
            key: "children",
            expected: "an object keyed by field id",
        });
    };
    map.iter()
        .map(|(id, entry)| FieldNode::from_entry(id, entry))
        .collect()
}

fn parse_option(parent_id: &str, value: &Value) -> Result<OptionEntry, SchemaError> {
    let Value::Object(map) = value else {
        return Err(SchemaError::BadEntry {
            id: parent_id.to_string(),
            key: "options",
            expected: "a list of option entries",
        });
    };
    let children = match map.get("children") {
        None => Vec::new(),
        Some(value) => parse_children(parent_id, value)?,
    };
    Ok(OptionEntry {
        value: map.get("value").cloned().unwrap_or(Value::Null),
        label: map.get("label").and_then(Value::as_str).map(str::to_string),
        children,
    })
}

/// The whole authored form: a list of root nodes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormSchema {
    /// Root nodes.
    pub fields: Vec<FieldNode>,
}

impl FormSchema {
    /// Parse an authored schema root: an object keyed by field id.
    pub fn from_value(root: &Value) -> Result<Self, SchemaError> {
        let Value::Object(map) = root else {
            return Err(SchemaError::RootNotObject);
        };
        let fields = map
            .iter()
            .map(|(id, entry)| FieldNode::from_entry(id, entry))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { fields })
    }

    /// Parse a schema from JSON text.
    pub fn from_json(input: &str) -> Result<Self, SchemaError> {
        let value: Value =
            serde_json::from_str(input).map_err(|err| SchemaError::Json(err.to_string()))?;
        Self::from_value(&value)
    }

    /// Every node in the tree, depth-first, parents before descendants.
    pub fn nodes(&self) -> Vec<&FieldNode> {
        fn walk<'a>(node: &'a FieldNode, out: &mut Vec<&'a FieldNode>) {
            out.push(node);
            for option in &node.options {
                for child in &option.children {
                    walk(child, out);
                }
            }
            for child in &node.children {
                walk(child, out);
            }
        }
        let mut out = Vec::new();
        for field in &self.fields {
            walk(field, &mut out);
        }
        out
    }

    /// Find a node anywhere in the tree.
    pub fn node(&self, id: &str) -> Option<&FieldNode> {
        self.nodes().into_iter().find(|node| node.id == id)
    }
}
