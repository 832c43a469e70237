//! Shader definition registry
//!
//! Maps declared shader identifiers to registered definitions. The registry
//! is passed explicitly to the code that needs lookups; there is no
//! process-wide instance, so tests can build throwaway registries.

use crate::graph::RenderContext;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Source type declared by definitions written against the universal
/// preview shading language
pub const GLSLFX_SOURCE_TYPE: &str = "glslfx";

/// Registry-resolved description of a shading node type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShaderDefinition {
    /// The identifier shader nodes declare to reference this definition
    pub identifier: String,
    /// Declared source family, e.g. `glslfx` or a renderer-specific tag
    pub source_type: String,
}

impl ShaderDefinition {
    /// Creates a shader definition
    pub fn new(identifier: impl Into<String>, source_type: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            source_type: source_type.into(),
        }
    }

    /// The render context a terminal fed by this shader targets: the
    /// universal context for `glslfx` definitions, otherwise the source
    /// type verbatim
    pub fn render_context(&self) -> RenderContext {
        if self.source_type == GLSLFX_SOURCE_TYPE {
            RenderContext::Universal
        } else {
            RenderContext::Named(self.source_type.clone())
        }
    }
}

/// Registry of shader definitions keyed by identifier
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShaderRegistry {
    definitions: BTreeMap<String, ShaderDefinition>,
}

impl ShaderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a shader definition, replacing any previous entry with the
    /// same identifier
    pub fn register(&mut self, definition: ShaderDefinition) {
        self.definitions
            .insert(definition.identifier.clone(), definition);
    }

    /// Look up a definition by identifier
    pub fn definition(&self, identifier: &str) -> Option<&ShaderDefinition> {
        self.definitions.get(identifier)
    }

    /// Number of registered definitions
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether the registry has no definitions
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
