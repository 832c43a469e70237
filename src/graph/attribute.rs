//! Attribute declarations and input/output classification

use super::path::AttributePath;
use serde::{Deserialize, Serialize};

/// Reserved name prefix for input attributes
pub const INPUT_PREFIX: &str = "inputs:";
/// Reserved name prefix for output attributes
pub const OUTPUT_PREFIX: &str = "outputs:";

/// Value types that can flow through attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    /// Floating point number
    Float,
    /// 3D vector (x, y, z)
    Vector3,
    /// RGB color value
    Color,
    /// Symbolic token (shader terminals, enum-like values)
    Token,
    /// Boolean value
    Boolean,
    /// Any type (for generic attributes)
    Any,
}

impl ValueType {
    /// Check if this value type can connect to another
    pub fn can_connect_to(&self, other: &ValueType) -> bool {
        self == other || *self == ValueType::Any || *other == ValueType::Any
    }

    /// Get a human-readable name for this value type
    pub fn name(&self) -> &'static str {
        match self {
            ValueType::Float => "Float",
            ValueType::Vector3 => "Vector3",
            ValueType::Color => "Color",
            ValueType::Token => "Token",
            ValueType::Boolean => "Boolean",
            ValueType::Any => "Any",
        }
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Data-flow classification of an attribute within a node graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeKind {
    Input,
    Output,
}

impl AttributeKind {
    /// Checks if this kind is an input
    pub fn is_input(&self) -> bool {
        matches!(self, AttributeKind::Input)
    }

    /// Checks if this kind is an output
    pub fn is_output(&self) -> bool {
        matches!(self, AttributeKind::Output)
    }

    /// The reserved name prefix for this kind
    pub fn prefix(&self) -> &'static str {
        match self {
            AttributeKind::Input => INPUT_PREFIX,
            AttributeKind::Output => OUTPUT_PREFIX,
        }
    }

    /// Prepend this kind's prefix to a base name
    pub fn qualify(&self, base_name: &str) -> String {
        format!("{}{}", self.prefix(), base_name)
    }
}

/// Splits a full attribute name into its base name and kind.
///
/// Classification is purely prefix-driven so that creation-time and
/// query-time logic always agree. Names without a recognized prefix
/// classify as outputs.
pub fn base_name_and_kind(name: &str) -> (&str, AttributeKind) {
    if let Some(base) = name.strip_prefix(INPUT_PREFIX) {
        (base, AttributeKind::Input)
    } else if let Some(base) = name.strip_prefix(OUTPUT_PREFIX) {
        (base, AttributeKind::Output)
    } else {
        (name, AttributeKind::Output)
    }
}

/// An authored attribute declaration on a node.
///
/// Connections are not standalone objects: a directed edge exists iff the
/// destination attribute's `sources` list contains the source's address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// Full prefixed name, e.g. `inputs:diffuseColor`
    pub name: String,
    pub value_type: ValueType,
    /// Whether this is a free-form custom property (raw-created) as opposed
    /// to a schema-native typed input/output
    pub custom: bool,
    /// Ordered list of authored upstream sources feeding this attribute
    pub sources: Vec<AttributePath>,
}

impl Attribute {
    /// Creates a schema-native attribute declaration
    pub fn native(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            custom: false,
            sources: vec![],
        }
    }

    /// Creates a free-form custom attribute declaration
    pub fn custom(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            custom: true,
            sources: vec![],
        }
    }

    /// The data-flow kind derived from this attribute's name prefix
    pub fn kind(&self) -> AttributeKind {
        base_name_and_kind(&self.name).1
    }

    /// The base name with the kind prefix stripped
    pub fn base_name(&self) -> &str {
        base_name_and_kind(&self.name).0
    }
}
