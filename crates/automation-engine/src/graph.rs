//! Graph model: nodes, edges and their invariants
//!
//! [`GraphModel`] exclusively owns node and edge instances and checks every
//! mutation against the [`ModuleRegistry`]:
//!
//! - node ids are unique
//! - edges run from a declared output port to a declared input port
//! - self-loops are rejected, duplicate edges are silently ignored
//! - removing a node cascades to its incident edges
//!
//! Graphs loaded through [`GraphModel::deserialize`] may still contain
//! dangling edges or undeclared ports; [`GraphModel::validate`] reports
//! them without mutating anything.

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{Result, StructuralError, ValidationError};
use crate::registry::{ModuleDescriptor, ModuleRegistry};
use crate::types::{
    Edge, EdgeId, GraphData, Node, NodeConfig, NodeId, NodeRecord, Point, PortDirection, PortRef,
};

/// An outgoing edge paired with the node it leads to
#[derive(Debug, Clone, Copy)]
pub struct Outgoing<'a> {
    pub edge: &'a Edge,
    pub target: &'a Node,
}

/// Owns the nodes and edges of one automation graph
#[derive(Clone)]
pub struct GraphModel {
    registry: Arc<ModuleRegistry>,
    nodes: IndexMap<NodeId, Node>,
    edges: Vec<Edge>,
    next_node: u64,
    next_edge: u64,
}

impl GraphModel {
    /// Create an empty graph validated against `registry`
    pub fn new(registry: Arc<ModuleRegistry>) -> Self {
        Self {
            registry,
            nodes: IndexMap::new(),
            edges: Vec::new(),
            next_node: 1,
            next_edge: 1,
        }
    }

    /// The registry this graph validates against
    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }

    fn descriptor(&self, module_id: &str) -> std::result::Result<&ModuleDescriptor, ValidationError> {
        self.registry
            .descriptor(module_id)
            .ok_or_else(|| ValidationError::UnknownModule(module_id.to_string()))
    }

    fn generate_node_id(&mut self) -> NodeId {
        loop {
            let id = format!("node-{}", self.next_node);
            self.next_node += 1;
            if !self.nodes.contains_key(&id) {
                return id;
            }
        }
    }

    fn generate_edge_id(&mut self) -> EdgeId {
        loop {
            let id = format!("edge-{}", self.next_edge);
            self.next_edge += 1;
            if !self.edges.iter().any(|e| e.id == id) {
                return id;
            }
        }
    }

    /// Add a node for `module_id`; config starts from the module default
    pub fn add_node(
        &mut self,
        module_id: &str,
        position: Point,
    ) -> std::result::Result<NodeId, ValidationError> {
        let config = self.descriptor(module_id)?.default_config.clone();
        let id = self.generate_node_id();
        self.insert_node(id.clone(), module_id, position, config)?;
        Ok(id)
    }

    /// Add a node with an explicit id and config
    pub fn insert_node(
        &mut self,
        id: impl Into<String>,
        module_id: &str,
        position: Point,
        config: NodeConfig,
    ) -> std::result::Result<(), ValidationError> {
        let id = id.into();
        if self.nodes.contains_key(&id) {
            return Err(ValidationError::DuplicateNodeId(id));
        }
        let type_class = self.descriptor(module_id)?.type_class;
        if let Some(n) = numeric_suffix(&id, "node-") {
            self.next_node = self.next_node.max(n + 1);
        }

        log::debug!("Adding node '{}' ({})", id, module_id);
        self.nodes.insert(
            id.clone(),
            Node {
                id,
                type_class,
                module_id: module_id.to_string(),
                position,
                config,
            },
        );
        Ok(())
    }

    /// Remove a node and every edge touching it
    ///
    /// Returns the removed node and the cascaded edges.
    pub fn remove_node(
        &mut self,
        id: &str,
    ) -> std::result::Result<(Node, Vec<Edge>), ValidationError> {
        let node = self
            .nodes
            .shift_remove(id)
            .ok_or_else(|| ValidationError::UnknownNode(id.to_string()))?;

        let (removed, kept): (Vec<Edge>, Vec<Edge>) =
            std::mem::take(&mut self.edges).into_iter().partition(|e| e.touches(id));
        self.edges = kept;

        log::debug!("Removed node '{}' with {} edge(s)", id, removed.len());
        Ok((node, removed))
    }

    /// Connect an output port to an input port
    ///
    /// Returns `Ok(None)` when an identical edge already exists.
    pub fn add_edge(
        &mut self,
        source: &str,
        source_port: &str,
        target: &str,
        target_port: &str,
    ) -> std::result::Result<Option<EdgeId>, ValidationError> {
        self.check_port(source, source_port, PortDirection::Output)?;
        self.check_port(target, target_port, PortDirection::Input)?;
        if source == target {
            return Err(ValidationError::SelfLoop(source.to_string()));
        }

        let candidate = Edge {
            id: String::new(),
            source: source.to_string(),
            source_port: source_port.to_string(),
            target: target.to_string(),
            target_port: target_port.to_string(),
        };
        if self.edges.iter().any(|e| e.same_endpoints(&candidate)) {
            log::debug!(
                "Ignoring duplicate edge {}.{} -> {}.{}",
                source,
                source_port,
                target,
                target_port
            );
            return Ok(None);
        }

        let id = self.generate_edge_id();
        self.edges.push(Edge {
            id: id.clone(),
            ..candidate
        });
        Ok(Some(id))
    }

    /// Connect two ports given in either order
    ///
    /// The stored edge always runs output → input.
    pub fn connect(
        &mut self,
        a: &PortRef,
        b: &PortRef,
    ) -> std::result::Result<Option<EdgeId>, ValidationError> {
        let (source, target) = match (a.direction, b.direction) {
            (PortDirection::Output, _) => (a, b),
            (PortDirection::Input, _) => (b, a),
        };
        self.add_edge(&source.node_id, &source.port, &target.node_id, &target.port)
    }

    fn check_port(
        &self,
        node_id: &str,
        port: &str,
        direction: PortDirection,
    ) -> std::result::Result<(), ValidationError> {
        let node = self
            .nodes
            .get(node_id)
            .ok_or_else(|| ValidationError::UnknownNode(node_id.to_string()))?;
        let descriptor = self.descriptor(&node.module_id)?;
        if descriptor.has_port(port, direction) {
            Ok(())
        } else {
            Err(ValidationError::UnknownPort {
                node_id: node_id.to_string(),
                port: port.to_string(),
                direction: direction.label(),
            })
        }
    }

    /// Remove a single edge
    pub fn remove_edge(&mut self, id: &str) -> std::result::Result<Edge, ValidationError> {
        let pos = self
            .edges
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| ValidationError::UnknownEdge(id.to_string()))?;
        Ok(self.edges.remove(pos))
    }

    /// Find a node by ID
    pub fn get_node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Find an edge by ID
    pub fn get_edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    /// Update a node's position
    pub fn move_node(&mut self, id: &str, position: Point) -> std::result::Result<(), ValidationError> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| ValidationError::UnknownNode(id.to_string()))?;
        node.position = position;
        Ok(())
    }

    /// Set one config entry on a node
    pub fn set_config(
        &mut self,
        id: &str,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> std::result::Result<(), ValidationError> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| ValidationError::UnknownNode(id.to_string()))?;
        node.config.insert(key.into(), value.into());
        Ok(())
    }

    /// Outgoing edges of a node with their target nodes, in edge order
    ///
    /// Edges whose target does not exist are skipped.
    pub fn outgoing(&self, node_id: &str) -> Vec<Outgoing<'_>> {
        self.edges
            .iter()
            .filter(|e| e.source == node_id)
            .filter_map(|edge| {
                self.nodes
                    .get(&edge.target)
                    .map(|target| Outgoing { edge, target })
            })
            .collect()
    }

    /// Edges coming into a node
    pub fn incoming(&self, node_id: &str) -> Vec<&Edge> {
        self.edges.iter().filter(|e| e.target == node_id).collect()
    }

    /// All nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// All edges in insertion order
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Trigger nodes in insertion order, classified by the graph's registry
    pub fn triggers(&self) -> Vec<&Node> {
        self.triggers_in(&self.registry)
    }

    /// Trigger nodes in insertion order, classified by `registry`
    ///
    /// Nodes whose module `registry` does not know are not triggers.
    pub fn triggers_in(&self, registry: &ModuleRegistry) -> Vec<&Node> {
        self.nodes
            .values()
            .filter(|n| {
                registry
                    .descriptor(&n.module_id)
                    .map(|d| d.type_class == crate::types::TypeClass::Trigger)
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Ids reachable from `start` along outgoing edges, including `start`
    ///
    /// Targets of dangling edges are included so structural errors about
    /// them can be scoped to the triggers that reach them.
    pub fn reachable_from(&self, start: &str) -> HashSet<NodeId> {
        let mut seen: HashSet<NodeId> = HashSet::new();
        let mut stack = vec![start.to_string()];
        while let Some(id) = stack.pop() {
            if !seen.insert(id.clone()) {
                continue;
            }
            for edge in self.edges.iter().filter(|e| e.source == id) {
                if !seen.contains(&edge.target) {
                    stack.push(edge.target.clone());
                }
            }
        }
        seen
    }

    /// Report structural problems without mutating the graph
    pub fn validate(&self) -> Vec<StructuralError> {
        let mut errors = Vec::new();

        for node in self.nodes.values() {
            if !self.registry.contains(&node.module_id) {
                errors.push(StructuralError::UnknownModule {
                    node_id: node.id.clone(),
                    module_id: node.module_id.clone(),
                });
            }
        }

        let mut edge_ids = HashSet::new();
        for edge in &self.edges {
            if !edge_ids.insert(edge.id.as_str()) {
                errors.push(StructuralError::DuplicateEdgeId {
                    edge_id: edge.id.clone(),
                    node_id: edge.source.clone(),
                });
            }
            self.validate_endpoint(edge, &edge.source, &edge.source_port, PortDirection::Output, &mut errors);
            self.validate_endpoint(edge, &edge.target, &edge.target_port, PortDirection::Input, &mut errors);
        }

        errors
    }

    fn validate_endpoint(
        &self,
        edge: &Edge,
        node_id: &str,
        port: &str,
        direction: PortDirection,
        errors: &mut Vec<StructuralError>,
    ) {
        let Some(node) = self.nodes.get(node_id) else {
            errors.push(StructuralError::DanglingEdge {
                edge_id: edge.id.clone(),
                node_id: node_id.to_string(),
            });
            return;
        };
        // Unknown modules are already reported per node
        if let Some(descriptor) = self.registry.descriptor(&node.module_id) {
            if !descriptor.has_port(port, direction) {
                errors.push(StructuralError::UndeclaredPort {
                    edge_id: edge.id.clone(),
                    node_id: node_id.to_string(),
                    port: port.to_string(),
                    direction: direction.label(),
                });
            }
        }
    }

    /// Serialize to the transport-neutral `{nodes, edges}` structure
    pub fn serialize(&self) -> GraphData {
        GraphData {
            nodes: self.nodes.values().map(NodeRecord::from).collect(),
            edges: self.edges.clone(),
        }
    }

    /// Rebuild a graph from serialized data
    ///
    /// Nodes must reference registered modules and have unique ids. Edges
    /// are loaded as-is; use [`GraphModel::validate`] to find dangling
    /// endpoints, undeclared ports or repeated edge ids.
    pub fn deserialize(
        registry: Arc<ModuleRegistry>,
        data: GraphData,
    ) -> std::result::Result<Self, ValidationError> {
        let mut graph = Self::new(registry);
        for record in data.nodes {
            graph.insert_node(record.id, &record.module_id, record.position, record.config)?;
        }
        for edge in data.edges {
            if let Some(n) = numeric_suffix(&edge.id, "edge-") {
                graph.next_edge = graph.next_edge.max(n + 1);
            }
            graph.edges.push(edge);
        }
        Ok(graph)
    }

    /// Replace this graph's contents with serialized data
    pub fn restore(&mut self, data: GraphData) -> std::result::Result<(), ValidationError> {
        *self = Self::deserialize(self.registry.clone(), data)?;
        Ok(())
    }

    /// Serialize to a JSON string
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.serialize())?)
    }

    /// Parse a graph from a JSON string
    pub fn from_json(registry: Arc<ModuleRegistry>, json: &str) -> Result<Self> {
        let data: GraphData = serde_json::from_str(json)?;
        Ok(Self::deserialize(registry, data)?)
    }
}

fn numeric_suffix(id: &str, prefix: &str) -> Option<u64> {
    id.strip_prefix(prefix).and_then(|n| n.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{ModuleDefinition, PassThroughHandler};
    use crate::types::{Edge, TypeClass};

    pub(crate) fn test_registry() -> Arc<ModuleRegistry> {
        let defs = [
            ModuleDescriptor::new("trigger", TypeClass::Trigger)
                .with_outputs(["out"])
                .with_default("text", "seed"),
            ModuleDescriptor::new("proc", TypeClass::Processor)
                .with_inputs(["in"])
                .with_outputs(["out"]),
            ModuleDescriptor::new("sink", TypeClass::Output).with_inputs(["in"]),
        ];
        Arc::new(
            ModuleRegistry::from_definitions(
                defs.into_iter()
                    .map(|d| ModuleDefinition::new(d, Arc::new(PassThroughHandler))),
            )
            .unwrap(),
        )
    }

    fn chain() -> (GraphModel, NodeId, NodeId, NodeId) {
        let mut graph = GraphModel::new(test_registry());
        let t = graph.add_node("trigger", Point::new(0.0, 0.0)).unwrap();
        let p = graph.add_node("proc", Point::new(200.0, 0.0)).unwrap();
        let s = graph.add_node("sink", Point::new(400.0, 0.0)).unwrap();
        graph.add_edge(&t, "out", &p, "in").unwrap();
        graph.add_edge(&p, "out", &s, "in").unwrap();
        (graph, t, p, s)
    }

    #[test]
    fn test_add_node_uses_default_config() {
        let mut graph = GraphModel::new(test_registry());
        let id = graph.add_node("trigger", Point::new(1.0, 2.0)).unwrap();

        let node = graph.get_node(&id).unwrap();
        assert_eq!(node.type_class, TypeClass::Trigger);
        assert_eq!(node.config.get("text").map(String::as_str), Some("seed"));
        assert_eq!(node.position, Point::new(1.0, 2.0));
    }

    #[test]
    fn test_add_node_unknown_module() {
        let mut graph = GraphModel::new(test_registry());
        assert_eq!(
            graph.add_node("nope", Point::default()),
            Err(ValidationError::UnknownModule("nope".to_string()))
        );
    }

    #[test]
    fn test_duplicate_node_id_rejected() {
        let mut graph = GraphModel::new(test_registry());
        graph
            .insert_node("a", "proc", Point::default(), NodeConfig::new())
            .unwrap();
        assert_eq!(
            graph.insert_node("a", "proc", Point::default(), NodeConfig::new()),
            Err(ValidationError::DuplicateNodeId("a".to_string()))
        );
    }

    #[test]
    fn test_self_loop_rejected() {
        let mut graph = GraphModel::new(test_registry());
        let p = graph.add_node("proc", Point::default()).unwrap();

        let result = graph.add_edge(&p, "out", &p, "in");
        assert_eq!(result, Err(ValidationError::SelfLoop(p.clone())));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_duplicate_edge_is_noop() {
        let (mut graph, t, p, _) = chain();
        let before = graph.edge_count();

        assert_eq!(graph.add_edge(&t, "out", &p, "in"), Ok(None));
        assert_eq!(graph.edge_count(), before);
    }

    #[test]
    fn test_edge_direction_and_ports_validated() {
        let (mut graph, t, p, s) = chain();

        // Input used as source
        assert!(matches!(
            graph.add_edge(&s, "in", &p, "in"),
            Err(ValidationError::UnknownPort { direction: "output", .. })
        ));
        // Undeclared port
        assert!(matches!(
            graph.add_edge(&t, "missing", &s, "in"),
            Err(ValidationError::UnknownPort { .. })
        ));
        // Missing node
        assert_eq!(
            graph.add_edge(&t, "out", "ghost", "in"),
            Err(ValidationError::UnknownNode("ghost".to_string()))
        );
    }

    #[test]
    fn test_connect_orders_ports() {
        let mut graph = GraphModel::new(test_registry());
        let t = graph.add_node("trigger", Point::default()).unwrap();
        let s = graph.add_node("sink", Point::default()).unwrap();

        let id = graph
            .connect(&PortRef::input(&s, "in"), &PortRef::output(&t, "out"))
            .unwrap()
            .unwrap();
        let edge = graph.get_edge(&id).unwrap();
        assert_eq!(edge.source, t);
        assert_eq!(edge.target, s);
    }

    #[test]
    fn test_remove_node_cascades() {
        let (mut graph, _, p, _) = chain();

        let (node, removed) = graph.remove_node(&p).unwrap();
        assert_eq!(node.id, p);
        assert_eq!(removed.len(), 2);
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.node_count(), 2);
        assert!(graph.remove_node(&p).is_err());
    }

    #[test]
    fn test_outgoing_order() {
        let mut graph = GraphModel::new(test_registry());
        let t = graph.add_node("trigger", Point::default()).unwrap();
        let a = graph.add_node("sink", Point::default()).unwrap();
        let b = graph.add_node("sink", Point::default()).unwrap();
        graph.add_edge(&t, "out", &b, "in").unwrap();
        graph.add_edge(&t, "out", &a, "in").unwrap();

        let targets: Vec<&str> = graph
            .outgoing(&t)
            .iter()
            .map(|o| o.target.id.as_str())
            .collect();
        assert_eq!(targets, vec![b.as_str(), a.as_str()]);
    }

    #[test]
    fn test_validate_clean_graph() {
        let (graph, ..) = chain();
        assert!(graph.validate().is_empty());
    }

    #[test]
    fn test_validate_reports_dangling_and_undeclared() {
        let (graph, t, p, _) = chain();
        let mut data = graph.serialize();
        data.edges.push(Edge {
            id: "edge-90".to_string(),
            source: p.clone(),
            source_port: "out".to_string(),
            target: "ghost".to_string(),
            target_port: "in".to_string(),
        });
        data.edges.push(Edge {
            id: "edge-91".to_string(),
            source: t.clone(),
            source_port: "nope".to_string(),
            target: p.clone(),
            target_port: "in".to_string(),
        });

        let loaded = GraphModel::deserialize(test_registry(), data).unwrap();
        let before = loaded.serialize();
        let errors = loaded.validate();

        assert_eq!(errors.len(), 2);
        assert!(errors.contains(&StructuralError::DanglingEdge {
            edge_id: "edge-90".to_string(),
            node_id: "ghost".to_string(),
        }));
        assert!(errors.iter().any(|e| matches!(
            e,
            StructuralError::UndeclaredPort { edge_id, .. } if edge_id == "edge-91"
        )));
        // validate() does not mutate
        assert_eq!(loaded.serialize(), before);
    }

    #[test]
    fn test_validate_reports_duplicate_edge_id() {
        let (graph, t, p, s) = chain();
        let mut data = graph.serialize();
        let reused = data.edges[0].id.clone();
        data.edges.push(Edge {
            id: reused.clone(),
            source: t.clone(),
            source_port: "out".to_string(),
            target: s.clone(),
            target_port: "in".to_string(),
        });

        let loaded = GraphModel::deserialize(test_registry(), data).unwrap();
        assert_eq!(loaded.edge_count(), 3);
        assert_eq!(
            loaded.validate(),
            vec![StructuralError::DuplicateEdgeId {
                edge_id: reused,
                node_id: t,
            }]
        );

        // Fresh edges never collide with loaded ids
        let mut loaded = loaded;
        let fresh = loaded.add_edge(&p, "out", &s, "in").unwrap();
        assert!(fresh.is_none());
        let q = loaded.add_node("proc", Point::default()).unwrap();
        let fresh = loaded.add_edge(&p, "out", &q, "in").unwrap().unwrap();
        assert_eq!(loaded.edges().iter().filter(|e| e.id == fresh).count(), 1);
    }

    #[test]
    fn test_serialize_roundtrip_idempotent() {
        let (mut graph, t, ..) = chain();
        graph.set_config(&t, "text", "hello").unwrap();
        graph.move_node(&t, Point::new(-5.5, 12.25)).unwrap();

        let first = graph.serialize();
        let restored = GraphModel::deserialize(test_registry(), first.clone()).unwrap();
        assert_eq!(restored.serialize(), first);

        let json = graph.to_json().unwrap();
        let reparsed = GraphModel::from_json(test_registry(), &json).unwrap();
        assert_eq!(reparsed.serialize(), first);
    }

    #[test]
    fn test_ids_continue_after_restore() {
        let (graph, ..) = chain();
        let mut restored = GraphModel::deserialize(test_registry(), graph.serialize()).unwrap();

        let id = restored.add_node("proc", Point::default()).unwrap();
        assert_eq!(id, "node-4");
    }

    #[test]
    fn test_deserialize_rejects_unknown_module() {
        let data = GraphData {
            nodes: vec![NodeRecord {
                id: "x".to_string(),
                module_id: "unregistered".to_string(),
                position: Point::default(),
                config: NodeConfig::new(),
            }],
            edges: vec![],
        };
        assert!(matches!(
            GraphModel::deserialize(test_registry(), data),
            Err(ValidationError::UnknownModule(_))
        ));
    }

    #[test]
    fn test_reachable_from_handles_cycles() {
        let mut graph = GraphModel::new(test_registry());
        let t = graph.add_node("trigger", Point::default()).unwrap();
        let a = graph.add_node("proc", Point::default()).unwrap();
        let b = graph.add_node("proc", Point::default()).unwrap();
        let lone = graph.add_node("proc", Point::default()).unwrap();
        graph.add_edge(&t, "out", &a, "in").unwrap();
        graph.add_edge(&a, "out", &b, "in").unwrap();
        graph.add_edge(&b, "out", &a, "in").unwrap();

        let reach = graph.reachable_from(&t);
        assert_eq!(reach.len(), 3);
        assert!(!reach.contains(&lone));
        assert_eq!(graph.triggers().len(), 1);
    }

    #[test]
    fn test_triggers_in_uses_given_registry() {
        let (graph, t, p, _) = chain();
        assert_eq!(graph.triggers_in(graph.registry()).len(), 1);

        // A registry that classifies "proc" as a trigger and lacks "trigger"
        let reclassified = ModuleRegistry::from_definitions([ModuleDefinition::new(
            ModuleDescriptor::new("proc", TypeClass::Trigger).with_outputs(["out"]),
            Arc::new(PassThroughHandler),
        )])
        .unwrap();
        let ids: Vec<&str> = graph
            .triggers_in(&reclassified)
            .iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(ids, vec![p.as_str()]);
        assert!(!ids.contains(&t.as_str()));
    }
}
