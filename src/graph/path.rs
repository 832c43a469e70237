//! Scene addressing for nodes and their attributes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Absolute, slash-separated address of a node in the scene,
/// e.g. `/materials/previewMtl/diffuseTex`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodePath {
    path: String,
}

impl NodePath {
    /// Creates a node path from a slash-separated string
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// Get the full path as a string slice
    pub fn as_str(&self) -> &str {
        &self.path
    }

    /// Get the node name (last path component)
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or("")
    }

    /// Get the parent path, if this is not a root-level path
    pub fn parent(&self) -> Option<NodePath> {
        let idx = self.path.rfind('/')?;
        if idx == 0 {
            None
        } else {
            Some(NodePath::new(&self.path[..idx]))
        }
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

impl From<&str> for NodePath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

/// Address of a single attribute: owning node path plus the full
/// (prefixed) attribute name. This is what authored connection lists store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributePath {
    pub node: NodePath,
    pub name: String,
}

impl AttributePath {
    /// Creates an attribute path
    pub fn new(node: impl Into<NodePath>, name: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node, self.name)
    }
}

impl From<String> for NodePath {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}
