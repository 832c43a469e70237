//! Stage - in-process storage of the shading graph and its authoring
//! primitives
//!
//! The stage owns every node and attribute declaration. Connections are
//! authored metadata on the destination attribute (an ordered list of
//! upstream addresses), never standalone objects. All typed input/output
//! authoring goes through the connectable factory (`create_input` /
//! `create_output`); the raw `create_attribute` path exists for free-form
//! custom properties and deliberately does not mark declarations as native.

use super::attribute::{Attribute, AttributeKind, ValueType};
use super::node::Node;
use super::path::{AttributePath, NodePath};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a stage's runtime domain. Handles carry the id of
/// the stage they were minted for; a stage rejects handles from any other.
pub type RuntimeId = u64;

static NEXT_RUNTIME_ID: AtomicU64 = AtomicU64::new(1);

fn alloc_runtime_id() -> RuntimeId {
    NEXT_RUNTIME_ID.fetch_add(1, Ordering::Relaxed)
}

/// Errors from stage authoring primitives
// Display and Error are implemented by hand: several variants carry an
// `AttributePath` field named `source`, which thiserror's derive would
// misinterpret as the error's cause.
#[derive(Debug, PartialEq)]
pub enum GraphError {
    NodeNotFound(NodePath),
    NodeAlreadyExists(NodePath),
    AttributeNotFound(AttributePath),
    TypeMismatch {
        attr: AttributePath,
        declared: ValueType,
        requested: ValueType,
    },
    IncompatibleTypes {
        source: AttributePath,
        source_type: ValueType,
        destination: AttributePath,
        destination_type: ValueType,
    },
    AlreadyConnected {
        source: AttributePath,
        destination: AttributePath,
    },
    NotConnected {
        source: AttributePath,
        destination: AttributePath,
    },
    NotAMaterial(NodePath),
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::NodeNotFound(path) => write!(f, "node '{}' does not exist", path),
            GraphError::NodeAlreadyExists(path) => write!(f, "node '{}' already exists", path),
            GraphError::AttributeNotFound(attr) => {
                write!(f, "attribute '{}' does not exist", attr)
            }
            GraphError::TypeMismatch {
                attr,
                declared,
                requested,
            } => write!(
                f,
                "attribute '{}' is declared {}, not {}",
                attr, declared, requested
            ),
            GraphError::IncompatibleTypes {
                source,
                source_type,
                destination,
                destination_type,
            } => write!(
                f,
                "cannot connect '{}' ({}) to '{}' ({})",
                source, source_type, destination, destination_type
            ),
            GraphError::AlreadyConnected {
                source,
                destination,
            } => write!(f, "'{}' is already connected to '{}'", destination, source),
            GraphError::NotConnected {
                source,
                destination,
            } => write!(f, "'{}' is not connected to '{}'", destination, source),
            GraphError::NotAMaterial(path) => {
                write!(f, "node '{}' is not a material container", path)
            }
        }
    }
}

impl std::error::Error for GraphError {}

pub type GraphResult<T> = Result<T, GraphError>;

/// Reserved terminal output slots on a material container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Terminal {
    Surface,
    Volume,
    Displacement,
}

impl Terminal {
    /// The reserved base name for this terminal
    pub fn token(&self) -> &'static str {
        match self {
            Terminal::Surface => "surface",
            Terminal::Volume => "volume",
            Terminal::Displacement => "displacement",
        }
    }

    /// Match a base name against the reserved terminal names
    pub fn from_token(token: &str) -> Option<Terminal> {
        match token {
            "surface" => Some(Terminal::Surface),
            "volume" => Some(Terminal::Volume),
            "displacement" => Some(Terminal::Displacement),
            _ => None,
        }
    }
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Qualifier selecting which evaluation backend a material terminal
/// targets. The universal context carries no name qualifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenderContext {
    Universal,
    Named(String),
}

impl RenderContext {
    /// Full attribute name of a terminal under this render context:
    /// `outputs:surface` for the universal context,
    /// `outputs:<context>:surface` otherwise
    pub fn terminal_name(&self, terminal: Terminal) -> String {
        match self {
            RenderContext::Universal => AttributeKind::Output.qualify(terminal.token()),
            RenderContext::Named(context) => {
                AttributeKind::Output.qualify(&format!("{}:{}", context, terminal.token()))
            }
        }
    }
}

impl fmt::Display for RenderContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderContext::Universal => f.write_str("universal"),
            RenderContext::Named(context) => f.write_str(context),
        }
    }
}

/// Opaque handle to a named attribute on a node.
///
/// A handle is valid for attributes that are not yet authored; creating a
/// connection materializes the declaration. The handle carries the runtime
/// id of the stage it was minted for so foreign handles can be rejected.
#[derive(Debug, Clone, PartialEq)]
pub struct AttrRef {
    pub runtime_id: RuntimeId,
    pub path: AttributePath,
    pub value_type: ValueType,
}

impl AttrRef {
    /// Creates a handle for an attribute, authored or not
    pub fn new(
        runtime_id: RuntimeId,
        node: impl Into<NodePath>,
        name: impl Into<String>,
        value_type: ValueType,
    ) -> Self {
        Self {
            runtime_id,
            path: AttributePath::new(node, name),
            value_type,
        }
    }

    /// The owning node's scene address
    pub fn node(&self) -> &NodePath {
        &self.path.node
    }

    /// The full (prefixed) attribute name
    pub fn name(&self) -> &str {
        &self.path.name
    }
}

const NO_SOURCES: &[AttributePath] = &[];

/// The shading graph: node storage plus authoring primitives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    #[serde(skip, default = "alloc_runtime_id")]
    runtime_id: RuntimeId,
    nodes: HashMap<NodePath, Node>,
}

impl Stage {
    /// Creates a new empty stage with a fresh runtime domain
    pub fn new() -> Self {
        Self {
            runtime_id: alloc_runtime_id(),
            nodes: HashMap::new(),
        }
    }

    /// This stage's runtime domain identifier
    pub fn runtime_id(&self) -> RuntimeId {
        self.runtime_id
    }

    /// Whether a handle belongs to this stage's runtime domain
    pub fn owns(&self, handle: &AttrRef) -> bool {
        handle.runtime_id == self.runtime_id
    }

    /// Adds a node to the stage
    pub fn add_node(&mut self, node: Node) -> GraphResult<NodePath> {
        let path = node.path.clone();
        if self.nodes.contains_key(&path) {
            return Err(GraphError::NodeAlreadyExists(path));
        }
        self.nodes.insert(path.clone(), node);
        Ok(path)
    }

    /// Removes a node and its attribute declarations. Authored references
    /// from other nodes' attributes are left dangling, as in the backing
    /// asset model.
    pub fn remove_node(&mut self, path: &NodePath) -> Option<Node> {
        self.nodes.remove(path)
    }

    /// Get a node by path
    pub fn node(&self, path: &NodePath) -> Option<&Node> {
        self.nodes.get(path)
    }

    /// Get a mutable node by path
    pub fn node_mut(&mut self, path: &NodePath) -> Option<&mut Node> {
        self.nodes.get_mut(path)
    }

    /// Capability-checked resolution of a handle to its authored
    /// declaration. None for foreign-domain handles, unknown nodes, and
    /// unauthored attributes.
    pub fn resolve_attr(&self, handle: &AttrRef) -> Option<&Attribute> {
        if !self.owns(handle) {
            return None;
        }
        self.nodes.get(handle.node())?.attribute(handle.name())
    }

    /// Mint a handle for an authored attribute
    pub fn attr_ref(&self, node: &NodePath, name: &str) -> Option<AttrRef> {
        let attribute = self.nodes.get(node)?.attribute(name)?;
        Some(AttrRef::new(
            self.runtime_id,
            node.clone(),
            name,
            attribute.value_type,
        ))
    }

    /// Raw attribute creation. The declaration is marked as a free-form
    /// custom property, not a schema-native typed port; connection authoring
    /// must use the connectable factory instead.
    pub fn create_attribute(
        &mut self,
        node: &NodePath,
        name: &str,
        value_type: ValueType,
    ) -> GraphResult<AttributePath> {
        let node_entry = self
            .nodes
            .get_mut(node)
            .ok_or_else(|| GraphError::NodeNotFound(node.clone()))?;
        if let Some(existing) = node_entry.attribute(name) {
            if existing.value_type != value_type {
                return Err(GraphError::TypeMismatch {
                    attr: AttributePath::new(node.clone(), name),
                    declared: existing.value_type,
                    requested: value_type,
                });
            }
            return Ok(AttributePath::new(node.clone(), name));
        }
        node_entry.add_attribute(Attribute::custom(name, value_type));
        Ok(AttributePath::new(node.clone(), name))
    }

    /// Create-or-fetch a schema-native input declaration by base name
    pub fn create_input(
        &mut self,
        node: &NodePath,
        base_name: &str,
        value_type: ValueType,
    ) -> GraphResult<AttributePath> {
        self.create_connectable(node, AttributeKind::Input.qualify(base_name), value_type)
    }

    /// Create-or-fetch a schema-native output declaration by base name
    pub fn create_output(
        &mut self,
        node: &NodePath,
        base_name: &str,
        value_type: ValueType,
    ) -> GraphResult<AttributePath> {
        self.create_connectable(node, AttributeKind::Output.qualify(base_name), value_type)
    }

    /// Create-or-fetch a material's reserved terminal output qualified by a
    /// render context. Identity is (terminal, render context): a matching
    /// declaration is reused, never duplicated.
    pub fn create_terminal_output(
        &mut self,
        material: &NodePath,
        terminal: Terminal,
        context: &RenderContext,
    ) -> GraphResult<AttributePath> {
        let node_entry = self
            .nodes
            .get(material)
            .ok_or_else(|| GraphError::NodeNotFound(material.clone()))?;
        if !node_entry.is_material() {
            return Err(GraphError::NotAMaterial(material.clone()));
        }
        self.create_connectable(material, context.terminal_name(terminal), ValueType::Token)
    }

    fn create_connectable(
        &mut self,
        node: &NodePath,
        name: String,
        value_type: ValueType,
    ) -> GraphResult<AttributePath> {
        let node_entry = self
            .nodes
            .get_mut(node)
            .ok_or_else(|| GraphError::NodeNotFound(node.clone()))?;
        if let Some(existing) = node_entry.attribute_mut(&name) {
            if existing.value_type != value_type {
                return Err(GraphError::TypeMismatch {
                    attr: AttributePath::new(node.clone(), name),
                    declared: existing.value_type,
                    requested: value_type,
                });
            }
            // Repair raw-created declarations on reuse
            existing.custom = false;
            return Ok(AttributePath::new(node.clone(), name));
        }
        node_entry.add_attribute(Attribute::native(name.clone(), value_type));
        Ok(AttributePath::new(node.clone(), name))
    }

    /// Author a directed edge: append the source's address to the
    /// destination's upstream list. Both declarations must exist and their
    /// value types must be compatible.
    pub fn connect(
        &mut self,
        source: &AttributePath,
        destination: &AttributePath,
    ) -> GraphResult<()> {
        let source_type = self
            .attribute_at(source)
            .ok_or_else(|| GraphError::AttributeNotFound(source.clone()))?
            .value_type;
        let destination_attr = self
            .attribute_at_mut(destination)
            .ok_or_else(|| GraphError::AttributeNotFound(destination.clone()))?;
        if !source_type.can_connect_to(&destination_attr.value_type) {
            return Err(GraphError::IncompatibleTypes {
                source: source.clone(),
                source_type,
                destination: destination.clone(),
                destination_type: destination_attr.value_type,
            });
        }
        if destination_attr.sources.contains(source) {
            return Err(GraphError::AlreadyConnected {
                source: source.clone(),
                destination: destination.clone(),
            });
        }
        destination_attr.sources.push(source.clone());
        log::debug!("connected {} -> {}", source, destination);
        Ok(())
    }

    /// Remove the destination's authored reference to the source. The
    /// attribute declarations themselves are left untouched.
    pub fn disconnect(
        &mut self,
        source: &AttributePath,
        destination: &AttributePath,
    ) -> GraphResult<()> {
        let destination_attr = self
            .attribute_at_mut(destination)
            .ok_or_else(|| GraphError::AttributeNotFound(destination.clone()))?;
        let before = destination_attr.sources.len();
        destination_attr.sources.retain(|s| s != source);
        if destination_attr.sources.len() == before {
            return Err(GraphError::NotConnected {
                source: source.clone(),
                destination: destination.clone(),
            });
        }
        log::debug!("disconnected {} -> {}", source, destination);
        Ok(())
    }

    /// The ordered list of authored sources feeding an attribute. Empty for
    /// unauthored attributes and attributes with no upstream references.
    pub fn sources(&self, attr: &AttributePath) -> &[AttributePath] {
        self.attribute_at(attr)
            .map(|a| a.sources.as_slice())
            .unwrap_or(NO_SOURCES)
    }

    fn attribute_at(&self, attr: &AttributePath) -> Option<&Attribute> {
        self.nodes.get(&attr.node)?.attribute(&attr.name)
    }

    fn attribute_at_mut(&mut self, attr: &AttributePath) -> Option<&mut Attribute> {
        self.nodes.get_mut(&attr.node)?.attribute_mut(&attr.name)
    }

    /// Serialize the whole stage to JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize a stage from JSON. The loaded stage gets a fresh runtime
    /// domain; handles minted before the round-trip do not carry over.
    pub fn from_json(json: &str) -> serde_json::Result<Stage> {
        serde_json::from_str(json)
    }
}

impl Default for Stage {
    fn default() -> Self {
        Self::new()
    }
}
