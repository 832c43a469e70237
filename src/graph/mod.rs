//! Shading graph data model - nodes, attributes, and the stage that owns them

pub mod attribute;
pub mod node;
pub mod path;
pub mod stage;

// Re-export core types
pub use attribute::{base_name_and_kind, Attribute, AttributeKind, ValueType};
pub use node::{Node, NodeKind};
pub use path::{AttributePath, NodePath};
pub use stage::{
    AttrRef, GraphError, GraphResult, RenderContext, RuntimeId, Stage, Terminal,
};
