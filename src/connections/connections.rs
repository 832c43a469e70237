//! Per-node connection enumeration

use crate::graph::{AttributePath, NodePath, Stage};
use serde::{Deserialize, Serialize};

/// A directed edge: source attribute feeding a destination attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub source: AttributePath,
    pub destination: AttributePath,
}

impl Connection {
    /// Creates a new connection record
    pub fn new(source: AttributePath, destination: AttributePath) -> Self {
        Self {
            source,
            destination,
        }
    }
}

/// Collection of the connections terminating on one node's attributes.
///
/// Construction only stores the node's address. Enumeration walks the live
/// authored state on every call, so edges added or removed after the
/// collection was obtained are visible; freshness is preferred over a
/// snapshotted view.
#[derive(Debug, Clone)]
pub struct NodeConnections {
    node: NodePath,
}

impl NodeConnections {
    /// Creates a connection collection scoped to one node
    pub fn new(node: impl Into<NodePath>) -> Self {
        Self { node: node.into() }
    }

    /// The node this collection is scoped to
    pub fn node(&self) -> &NodePath {
        &self.node
    }

    /// Enumerate the edges whose destination attribute belongs to this
    /// node, in attribute authoring order
    pub fn list(&self, stage: &Stage) -> Vec<Connection> {
        let Some(node) = stage.node(&self.node) else {
            return vec![];
        };
        let mut connections = Vec::new();
        for attribute in &node.attributes {
            let destination = AttributePath::new(self.node.clone(), attribute.name.clone());
            for source in &attribute.sources {
                connections.push(Connection::new(source.clone(), destination.clone()));
            }
        }
        connections
    }
}
