//! Node types and attribute storage

use super::attribute::{Attribute, ValueType};
use super::path::NodePath;
use serde::{Deserialize, Serialize};

/// Type of node - shading node or material container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Shading node with an optionally declared shader identifier that
    /// resolves against a shader registry
    Shader {
        /// Declared identifier, e.g. `UsdPreviewSurface`
        id: Option<String>,
    },
    /// Material container node exposing reserved terminal outputs
    /// (surface, volume, displacement)
    Material,
}

/// A node in the shading graph, addressed by its scene path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub path: NodePath,
    pub kind: NodeKind,
    /// Attribute declarations in authoring order
    pub attributes: Vec<Attribute>,
}

impl Node {
    /// Creates a new shading node
    pub fn shader(path: impl Into<NodePath>) -> Self {
        Self {
            path: path.into(),
            kind: NodeKind::Shader { id: None },
            attributes: vec![],
        }
    }

    /// Creates a new shading node with a declared shader identifier
    pub fn shader_with_id(path: impl Into<NodePath>, id: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: NodeKind::Shader { id: Some(id.into()) },
            attributes: vec![],
        }
    }

    /// Creates a new material container node
    pub fn material(path: impl Into<NodePath>) -> Self {
        Self {
            path: path.into(),
            kind: NodeKind::Material,
            attributes: vec![],
        }
    }

    /// Check if this is a material container
    pub fn is_material(&self) -> bool {
        matches!(self.kind, NodeKind::Material)
    }

    /// Get the declared shader identifier if this is a shader node
    pub fn shader_id(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Shader { id } => id.as_deref(),
            NodeKind::Material => None,
        }
    }

    /// Set the declared shader identifier on a shader node
    pub fn set_shader_id(&mut self, new_id: impl Into<String>) {
        if let NodeKind::Shader { id } = &mut self.kind {
            *id = Some(new_id.into());
        }
    }

    /// Find an attribute declaration by its full name
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Find a mutable attribute declaration by its full name
    pub fn attribute_mut(&mut self, name: &str) -> Option<&mut Attribute> {
        self.attributes.iter_mut().find(|a| a.name == name)
    }

    /// Author a new attribute declaration, returning a reference to it
    pub fn add_attribute(&mut self, attribute: Attribute) -> &mut Attribute {
        self.attributes.push(attribute);
        self.attributes.last_mut().unwrap()
    }

    /// Declared value type of an attribute, if authored
    pub fn attribute_type(&self, name: &str) -> Option<ValueType> {
        self.attribute(name).map(|a| a.value_type)
    }
}
