//! Connection resolution and mutation
//!
//! The handler decides, from the data-flow kinds of the two endpoints and
//! the destination node's type, which declarations to materialize before
//! delegating the edge itself to the stage's connect primitive. All
//! materialization goes through the stage's connectable factory so the
//! authored declarations stay schema-native rather than free-form custom
//! properties.

use super::connections::NodeConnections;
use crate::graph::{base_name_and_kind, AttrRef, AttributeKind, NodePath, Stage, Terminal};
use crate::registry::ShaderRegistry;

/// Stateless engine for querying, creating, and deleting directed
/// connections between shading attributes
#[derive(Debug, Default)]
pub struct ConnectionHandler;

impl ConnectionHandler {
    /// Creates a connection handler
    pub fn new() -> Self {
        Self
    }

    /// Validates a handle against the stage: it must belong to the stage's
    /// runtime domain and address a node that exists. Failures are reported
    /// as diagnostics, never panics.
    fn checked(&self, stage: &Stage, attr: &AttrRef) -> bool {
        if !stage.owns(attr) {
            log::error!(
                "Invalid runtime identifier for the attribute '{}' in the node '{}'.",
                attr.name(),
                attr.node()
            );
            return false;
        }
        if stage.node(attr.node()).is_none() {
            log::error!(
                "Unknown node '{}' for the attribute '{}'.",
                attr.node(),
                attr.name()
            );
            return false;
        }
        true
    }

    /// Reports whether the source attribute feeds the destination, by
    /// scanning the destination's authored upstream list. False for foreign
    /// handles and for attributes with no authored sources.
    pub fn connection_exists(&self, stage: &Stage, source: &AttrRef, destination: &AttrRef) -> bool {
        if !stage.owns(source) || !stage.owns(destination) {
            return false;
        }
        stage.sources(&destination.path).contains(&source.path)
    }

    /// Collection of the connections terminating on one node. Construction
    /// is cheap; enumeration recomputes from the live stage on each call.
    pub fn source_connections(&self, node: &NodePath) -> NodeConnections {
        NodeConnections::new(node.clone())
    }

    /// Establishes a directed connection from `source` to `destination`,
    /// materializing the endpoint declarations as needed.
    ///
    /// Returns false when either handle is invalid, when the edge already
    /// exists (nothing to do), when a declaration cannot be materialized
    /// (e.g. reuse with a conflicting type), when the source's shader
    /// identifier has no registered definition while connecting to a
    /// material terminal, or when the stage refuses the final connect.
    pub fn create_connection(
        &self,
        stage: &mut Stage,
        registry: &ShaderRegistry,
        source: &AttrRef,
        destination: &AttrRef,
    ) -> bool {
        if !self.checked(stage, source) || !self.checked(stage, destination) {
            return false;
        }
        if self.connection_exists(stage, source, destination) {
            log::debug!("{} already feeds {}", source.path, destination.path);
            return false;
        }

        let (source_base, source_kind) = base_name_and_kind(source.name());
        let (destination_base, destination_kind) = base_name_and_kind(destination.name());

        let source_attr = match source_kind {
            AttributeKind::Input => {
                stage.create_input(source.node(), source_base, source.value_type)
            }
            AttributeKind::Output => {
                stage.create_output(source.node(), source_base, source.value_type)
            }
        };
        let source_attr = match source_attr {
            Ok(attr) => attr,
            Err(err) => {
                log::debug!("cannot materialize source '{}': {}", source.path, err);
                return false;
            }
        };

        let destination_attr = match (source_kind, destination_kind) {
            // An input can feed another input (container pass-through) and
            // an upstream output feeds a downstream input; both materialize
            // the destination as an input.
            (AttributeKind::Input, AttributeKind::Input)
            | (AttributeKind::Output, AttributeKind::Input) => {
                stage.create_input(destination.node(), destination_base, destination.value_type)
            }
            // An input feeding a pass-through output on a container node
            (AttributeKind::Input, AttributeKind::Output) => {
                stage.create_output(destination.node(), destination_base, destination.value_type)
            }
            (AttributeKind::Output, AttributeKind::Output) => {
                // Special case when connecting to material terminals: the
                // output to materialize depends on the source shader's
                // registered definition.
                let terminal = Terminal::from_token(destination_base).filter(|_| {
                    stage
                        .node(destination.node())
                        .map(|n| n.is_material())
                        .unwrap_or(false)
                });
                match terminal {
                    Some(terminal) => {
                        let identifier = stage
                            .node(source.node())
                            .and_then(|n| n.shader_id())
                            .unwrap_or("")
                            .to_string();
                        let Some(definition) = registry.definition(&identifier) else {
                            log::error!(
                                "Could not find shader definition '{}' for node '{}'.",
                                identifier,
                                source.node()
                            );
                            return false;
                        };
                        stage.create_terminal_output(
                            destination.node(),
                            terminal,
                            &definition.render_context(),
                        )
                    }
                    None => stage.create_output(
                        destination.node(),
                        destination_base,
                        destination.value_type,
                    ),
                }
            }
        };
        let destination_attr = match destination_attr {
            Ok(attr) => attr,
            Err(err) => {
                log::debug!(
                    "cannot materialize destination '{}': {}",
                    destination.path,
                    err
                );
                return false;
            }
        };

        match stage.connect(&source_attr, &destination_attr) {
            Ok(()) => true,
            Err(err) => {
                log::debug!("stage refused the connection: {}", err);
                false
            }
        }
    }

    /// Removes the directed connection from `source` to `destination`.
    ///
    /// Returns false when either handle is invalid or no such edge exists.
    /// Only the authored reference is removed; the attribute declarations
    /// survive.
    pub fn delete_connection(
        &self,
        stage: &mut Stage,
        source: &AttrRef,
        destination: &AttrRef,
    ) -> bool {
        if !self.checked(stage, source) || !self.checked(stage, destination) {
            return false;
        }
        if !self.connection_exists(stage, source, destination) {
            log::debug!("{} does not feed {}", source.path, destination.path);
            return false;
        }
        stage.disconnect(&source.path, &destination.path).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{AttributeKind, Node, ValueType};
    use crate::registry::ShaderDefinition;

    fn test_registry() -> ShaderRegistry {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut registry = ShaderRegistry::new();
        registry.register(ShaderDefinition::new("UsdPreviewSurface", "glslfx"));
        registry.register(ShaderDefinition::new("MyToolkitSurface", "mytoolkit"));
        registry
    }

    /// Texture shader feeding a surface shader inside a material container
    fn test_stage() -> Stage {
        let mut stage = Stage::new();
        stage.add_node(Node::material("/mtl/previewMtl")).unwrap();
        stage
            .add_node(Node::shader_with_id(
                "/mtl/previewMtl/surf1",
                "UsdPreviewSurface",
            ))
            .unwrap();
        stage
            .add_node(Node::shader_with_id(
                "/mtl/previewMtl/tex1",
                "UsdUVTexture",
            ))
            .unwrap();
        stage
    }

    fn handle(stage: &Stage, node: &str, name: &str, value_type: ValueType) -> AttrRef {
        AttrRef::new(stage.runtime_id(), node, name, value_type)
    }

    #[test]
    fn test_exists_false_then_true_after_create() {
        let mut stage = test_stage();
        let registry = test_registry();
        let handler = ConnectionHandler::new();

        let src = handle(&stage, "/mtl/previewMtl/tex1", "outputs:rgb", ValueType::Color);
        let dst = handle(
            &stage,
            "/mtl/previewMtl/surf1",
            "inputs:diffuseColor",
            ValueType::Color,
        );

        assert!(!handler.connection_exists(&stage, &src, &dst));
        assert!(handler.create_connection(&mut stage, &registry, &src, &dst));
        assert!(handler.connection_exists(&stage, &src, &dst));
    }

    #[test]
    fn test_create_is_not_idempotent_success() {
        let mut stage = test_stage();
        let registry = test_registry();
        let handler = ConnectionHandler::new();

        let src = handle(&stage, "/mtl/previewMtl/tex1", "outputs:rgb", ValueType::Color);
        let dst = handle(
            &stage,
            "/mtl/previewMtl/surf1",
            "inputs:diffuseColor",
            ValueType::Color,
        );

        assert!(handler.create_connection(&mut stage, &registry, &src, &dst));
        // Second create signals "nothing to do" and authors no duplicate
        assert!(!handler.create_connection(&mut stage, &registry, &src, &dst));
        assert_eq!(stage.sources(&dst.path).len(), 1);
    }

    #[test]
    fn test_delete_connection() {
        let mut stage = test_stage();
        let registry = test_registry();
        let handler = ConnectionHandler::new();

        let src = handle(&stage, "/mtl/previewMtl/tex1", "outputs:rgb", ValueType::Color);
        let dst = handle(
            &stage,
            "/mtl/previewMtl/surf1",
            "inputs:diffuseColor",
            ValueType::Color,
        );

        // Nothing to remove yet
        assert!(!handler.delete_connection(&mut stage, &src, &dst));

        assert!(handler.create_connection(&mut stage, &registry, &src, &dst));
        assert!(handler.delete_connection(&mut stage, &src, &dst));
        assert!(!handler.connection_exists(&stage, &src, &dst));

        // Declarations survive the deletion
        let surf = stage.node(dst.node()).unwrap();
        assert!(surf.attribute("inputs:diffuseColor").is_some());
    }

    #[test]
    fn test_output_to_input_classifies_destination_as_input() {
        let mut stage = test_stage();
        let registry = test_registry();
        let handler = ConnectionHandler::new();

        let src = handle(&stage, "/mtl/previewMtl/tex1", "outputs:rgb", ValueType::Color);
        let dst = handle(
            &stage,
            "/mtl/previewMtl/surf1",
            "inputs:diffuseColor",
            ValueType::Color,
        );
        assert!(handler.create_connection(&mut stage, &registry, &src, &dst));

        let authored = stage.resolve_attr(&dst).unwrap();
        assert_eq!(authored.kind(), AttributeKind::Input);
        assert!(!authored.custom, "factory-authored ports are native");
    }

    #[test]
    fn test_input_to_input_pass_through() {
        let mut stage = test_stage();
        let registry = test_registry();
        let handler = ConnectionHandler::new();

        // Container input forwarded to a child shader input
        let src = handle(&stage, "/mtl/previewMtl", "inputs:scale", ValueType::Float);
        let dst = handle(
            &stage,
            "/mtl/previewMtl/tex1",
            "inputs:scale",
            ValueType::Float,
        );
        assert!(handler.create_connection(&mut stage, &registry, &src, &dst));

        assert_eq!(stage.resolve_attr(&src).unwrap().kind(), AttributeKind::Input);
        assert_eq!(stage.resolve_attr(&dst).unwrap().kind(), AttributeKind::Input);
        assert!(handler.connection_exists(&stage, &src, &dst));
    }

    #[test]
    fn test_input_to_output_pass_through() {
        let mut stage = test_stage();
        let registry = test_registry();
        let handler = ConnectionHandler::new();

        let src = handle(
            &stage,
            "/mtl/previewMtl/tex1",
            "inputs:fallback",
            ValueType::Color,
        );
        let dst = handle(&stage, "/mtl/previewMtl/tex1", "outputs:rgb", ValueType::Color);
        assert!(handler.create_connection(&mut stage, &registry, &src, &dst));

        assert_eq!(stage.resolve_attr(&src).unwrap().kind(), AttributeKind::Input);
        assert_eq!(stage.resolve_attr(&dst).unwrap().kind(), AttributeKind::Output);
    }

    #[test]
    fn test_surface_terminal_universal_render_context() {
        let mut stage = test_stage();
        let registry = test_registry();
        let handler = ConnectionHandler::new();

        // surf1 declares UsdPreviewSurface, a glslfx definition
        let src = handle(
            &stage,
            "/mtl/previewMtl/surf1",
            "outputs:surface",
            ValueType::Token,
        );
        let dst = handle(&stage, "/mtl/previewMtl", "outputs:surface", ValueType::Token);
        assert!(handler.create_connection(&mut stage, &registry, &src, &dst));

        let material = stage.node(dst.node()).unwrap();
        let terminal = material.attribute("outputs:surface").unwrap();
        assert!(!terminal.custom);
        assert_eq!(terminal.sources.len(), 1);
        assert_eq!(terminal.sources[0].name, "outputs:surface");
    }

    #[test]
    fn test_surface_terminal_named_render_context() {
        let mut stage = test_stage();
        stage
            .add_node(Node::shader_with_id(
                "/mtl/previewMtl/toolkitSurf",
                "MyToolkitSurface",
            ))
            .unwrap();
        let registry = test_registry();
        let handler = ConnectionHandler::new();

        let src = handle(
            &stage,
            "/mtl/previewMtl/toolkitSurf",
            "outputs:surface",
            ValueType::Token,
        );
        let dst = handle(&stage, "/mtl/previewMtl", "outputs:surface", ValueType::Token);
        assert!(handler.create_connection(&mut stage, &registry, &src, &dst));

        // The terminal is qualified by the definition's source type
        let material = stage.node(dst.node()).unwrap();
        assert!(material.attribute("outputs:mytoolkit:surface").is_some());
        assert!(material.attribute("outputs:surface").is_none());
    }

    #[test]
    fn test_displacement_and_volume_terminals() {
        let mut stage = test_stage();
        let registry = test_registry();
        let handler = ConnectionHandler::new();

        for terminal in ["displacement", "volume"] {
            let src = handle(
                &stage,
                "/mtl/previewMtl/surf1",
                &AttributeKind::Output.qualify(terminal),
                ValueType::Token,
            );
            let dst = handle(
                &stage,
                "/mtl/previewMtl",
                &AttributeKind::Output.qualify(terminal),
                ValueType::Token,
            );
            assert!(handler.create_connection(&mut stage, &registry, &src, &dst));
            let material = stage.node(dst.node()).unwrap();
            assert!(material
                .attribute(&AttributeKind::Output.qualify(terminal))
                .is_some());
        }
    }

    #[test]
    fn test_unregistered_identifier_creates_no_terminal() {
        let mut stage = test_stage();
        let registry = test_registry();
        let handler = ConnectionHandler::new();

        // tex1 declares UsdUVTexture, which is not registered
        let src = handle(
            &stage,
            "/mtl/previewMtl/tex1",
            "outputs:surface",
            ValueType::Token,
        );
        let dst = handle(&stage, "/mtl/previewMtl", "outputs:surface", ValueType::Token);
        assert!(!handler.create_connection(&mut stage, &registry, &src, &dst));

        let material = stage.node(dst.node()).unwrap();
        assert!(material.attribute("outputs:surface").is_none());
        assert!(stage.sources(&dst.path).is_empty());
    }

    #[test]
    fn test_output_to_output_on_non_material_is_ordinary() {
        let mut stage = test_stage();
        let registry = test_registry();
        let handler = ConnectionHandler::new();

        // "surface" destination base name, but the destination node is a
        // shader, so no terminal semantics apply
        let src = handle(&stage, "/mtl/previewMtl/tex1", "outputs:rgb", ValueType::Color);
        let dst = handle(
            &stage,
            "/mtl/previewMtl/surf1",
            "outputs:surface",
            ValueType::Color,
        );
        assert!(handler.create_connection(&mut stage, &registry, &src, &dst));

        let surf = stage.node(dst.node()).unwrap();
        let authored = surf.attribute("outputs:surface").unwrap();
        assert_eq!(authored.value_type, ValueType::Color);
        assert_eq!(authored.sources.len(), 1);
    }

    #[test]
    fn test_foreign_handle_is_rejected() {
        let mut stage = test_stage();
        let registry = test_registry();
        let handler = ConnectionHandler::new();

        let foreign = Stage::new();
        let src = handle(
            &foreign,
            "/mtl/previewMtl/tex1",
            "outputs:rgb",
            ValueType::Color,
        );
        let dst = handle(
            &stage,
            "/mtl/previewMtl/surf1",
            "inputs:diffuseColor",
            ValueType::Color,
        );
        assert!(!handler.create_connection(&mut stage, &registry, &src, &dst));
        assert!(!handler.connection_exists(&stage, &src, &dst));
        assert!(!handler.delete_connection(&mut stage, &src, &dst));
    }

    #[test]
    fn test_unknown_node_is_rejected() {
        let mut stage = test_stage();
        let registry = test_registry();
        let handler = ConnectionHandler::new();

        let src = handle(&stage, "/mtl/missing", "outputs:rgb", ValueType::Color);
        let dst = handle(
            &stage,
            "/mtl/previewMtl/surf1",
            "inputs:diffuseColor",
            ValueType::Color,
        );
        assert!(!handler.create_connection(&mut stage, &registry, &src, &dst));
    }

    #[test]
    fn test_type_conflict_on_reuse_fails() {
        let mut stage = test_stage();
        let registry = test_registry();
        let handler = ConnectionHandler::new();

        let surf = NodePath::new("/mtl/previewMtl/surf1");
        stage
            .create_input(&surf, "diffuseColor", ValueType::Color)
            .unwrap();

        // Handle claims Float for an attribute declared Color
        let src = handle(&stage, "/mtl/previewMtl/tex1", "outputs:r", ValueType::Float);
        let dst = handle(
            &stage,
            "/mtl/previewMtl/surf1",
            "inputs:diffuseColor",
            ValueType::Float,
        );
        assert!(!handler.create_connection(&mut stage, &registry, &src, &dst));
        assert!(!handler.connection_exists(&stage, &src, &dst));
    }

    #[test]
    fn test_incompatible_endpoint_types_propagate_as_failure() {
        let mut stage = test_stage();
        let registry = test_registry();
        let handler = ConnectionHandler::new();

        let src = handle(&stage, "/mtl/previewMtl/tex1", "outputs:rgb", ValueType::Color);
        let dst = handle(
            &stage,
            "/mtl/previewMtl/surf1",
            "inputs:roughness",
            ValueType::Float,
        );
        assert!(!handler.create_connection(&mut stage, &registry, &src, &dst));
        assert!(stage.sources(&dst.path).is_empty());
    }

    #[test]
    fn test_source_connections_lazy_enumeration() {
        let mut stage = test_stage();
        let registry = test_registry();
        let handler = ConnectionHandler::new();

        let surf = NodePath::new("/mtl/previewMtl/surf1");
        let collection = handler.source_connections(&surf);
        assert!(collection.list(&stage).is_empty());

        let src = handle(&stage, "/mtl/previewMtl/tex1", "outputs:rgb", ValueType::Color);
        let dst = handle(
            &stage,
            "/mtl/previewMtl/surf1",
            "inputs:diffuseColor",
            ValueType::Color,
        );
        assert!(handler.create_connection(&mut stage, &registry, &src, &dst));

        // The collection obtained before the edge was authored sees it
        let listed = collection.list(&stage);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].source, src.path);
        assert_eq!(listed[0].destination, dst.path);
    }
}
