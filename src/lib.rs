//! Shadegraph - a shading node graph library with connection resolution
//!
//! This library provides the data model for shading networks (nodes,
//! typed input/output attributes, material containers) and the engine
//! that resolves, creates, and deletes directed connections between
//! attributes following node-graph authoring conventions.

// Public modules
pub mod connections;
pub mod graph;
pub mod registry;

// Re-export commonly used types
pub use connections::{Connection, ConnectionHandler, NodeConnections};
pub use graph::{
    AttrRef, Attribute, AttributeKind, AttributePath, GraphError, GraphResult, Node, NodeKind,
    NodePath, RenderContext, Stage, Terminal, ValueType,
};
pub use registry::{ShaderDefinition, ShaderRegistry};
