//! Interactive editor: pointer state machine over a graph
//!
//! The editor owns a [`GraphModel`] and its [`HistoryManager`]. Input is
//! toolkit-neutral ([`PointerEvent`], [`WheelEvent`] in screen space); the
//! editor answers with [`SceneUpdate`]s for the renderer and
//! [`EditorEvent`]s for the host.
//!
//! # Interaction Modes
//!
//! ```text
//! Idle ──primary down on canvas──▶ Panning ──up──▶ Idle
//!      ──primary down on node────▶ DraggingNode ──up (commit)──▶ Idle
//!      ──primary down on port────▶ ConnectingEdge ──up──▶ Idle
//! ```
//!
//! Panning and zooming are never recorded in history. A drag commits one
//! snapshot when released; connecting commits only if an edge was added.

mod layout;
mod scene;
mod transform;

pub use layout::{Hit, NodeLayout, Rect};
pub use scene::{EdgePath, SceneRenderer, SceneUpdate};
pub use transform::ViewTransform;

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};

use crate::config::{AutomationConfig, EditorConfig};
use crate::error::Result;
use crate::events::{EditorEvent, EventSink};
use crate::graph::GraphModel;
use crate::history::HistoryManager;
use crate::types::{Edge, EdgeId, NodeId, Point, PortDirection, PortRef};

/// Pointer button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

/// Keyboard modifiers held during an input event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    /// Selection extends rather than replaces
    pub fn additive(&self) -> bool {
        self.shift || self.ctrl || self.meta
    }

    /// Wheel zooms rather than pans
    pub fn zoom(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// Pointer input in screen coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub position: Point,
    pub button: PointerButton,
    pub modifiers: Modifiers,
}

impl PointerEvent {
    pub fn primary(x: f64, y: f64) -> Self {
        Self {
            position: Point::new(x, y),
            button: PointerButton::Primary,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// Wheel input in screen coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelEvent {
    pub position: Point,
    pub delta_y: f64,
    pub modifiers: Modifiers,
}

/// Current pointer interaction
#[derive(Debug, Clone, PartialEq)]
pub enum Interaction {
    Idle,
    Panning {
        last: Point,
    },
    DraggingNode {
        node_id: NodeId,
        /// Graph-space offset from the node origin to the grab point
        grab_offset: Point,
        moved: bool,
    },
    ConnectingEdge {
        from: PortRef,
        /// Graph-space cursor position
        cursor: Point,
    },
}

/// Editor over one graph
pub struct InteractiveEditor {
    graph: GraphModel,
    history: HistoryManager,
    config: EditorConfig,
    layout: NodeLayout,
    transform: ViewTransform,
    interaction: Interaction,
    selection: IndexSet<NodeId>,
    dirty_nodes: IndexSet<NodeId>,
    frame_requested: bool,
    path_computations: usize,
    scene: Vec<SceneUpdate>,
    events: Arc<dyn EventSink<EditorEvent>>,
}

impl InteractiveEditor {
    /// Create an editor and record the initial snapshot
    pub fn new(
        graph: GraphModel,
        config: &AutomationConfig,
        events: Arc<dyn EventSink<EditorEvent>>,
    ) -> Result<Self> {
        config.editor.validate()?;
        let mut history = HistoryManager::with_config(&config.history);
        history.push(&graph.serialize())?;

        let mut editor = Self {
            graph,
            history,
            config: config.editor.clone(),
            layout: NodeLayout::new(&config.editor),
            transform: ViewTransform::default(),
            interaction: Interaction::Idle,
            selection: IndexSet::new(),
            dirty_nodes: IndexSet::new(),
            frame_requested: false,
            path_computations: 0,
            scene: Vec::new(),
            events,
        };
        editor.queue_full_scene();
        Ok(editor)
    }

    pub fn graph(&self) -> &GraphModel {
        &self.graph
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn transform(&self) -> ViewTransform {
        self.transform
    }

    pub fn interaction(&self) -> &Interaction {
        &self.interaction
    }

    pub fn layout(&self) -> &NodeLayout {
        &self.layout
    }

    /// Selected node ids in selection order
    pub fn selection(&self) -> Vec<NodeId> {
        self.selection.iter().cloned().collect()
    }

    pub fn is_selected(&self, node_id: &str) -> bool {
        self.selection.contains(node_id)
    }

    /// Whether moves are waiting for [`InteractiveEditor::render_frame`]
    pub fn frame_requested(&self) -> bool {
        self.frame_requested
    }

    /// Total edge paths recomputed by frames so far
    pub fn path_computations(&self) -> usize {
        self.path_computations
    }

    /// Take all queued scene updates
    pub fn drain_scene(&mut self) -> Vec<SceneUpdate> {
        std::mem::take(&mut self.scene)
    }

    /// Hand all queued scene updates to a renderer
    pub fn flush(&mut self, renderer: &mut dyn SceneRenderer) {
        for update in self.scene.drain(..) {
            renderer.apply(&update);
        }
    }

    fn emit(&self, event: EditorEvent) {
        if let Err(e) = self.events.send(event) {
            log::warn!("Failed to deliver editor event: {}", e);
        }
    }

    fn commit(&mut self) -> Result<()> {
        self.history.push(&self.graph.serialize())
    }

    // --- Graph edits -------------------------------------------------------

    /// Add a node at a screen position
    pub fn add_node(&mut self, module_id: &str, screen: Point) -> Result<NodeId> {
        let position = self.transform.to_graph(screen);
        let id = self.graph.add_node(module_id, position)?;
        self.commit()?;

        self.queue_node_added(&id);
        self.emit(EditorEvent::NodeAdd {
            node_id: id.clone(),
            module_id: module_id.to_string(),
        });
        Ok(id)
    }

    /// Connect two ports given in either order
    ///
    /// Returns `Ok(None)` when the edge already exists.
    pub fn connect(&mut self, a: &PortRef, b: &PortRef) -> Result<Option<EdgeId>> {
        let Some(id) = self.graph.connect(a, b)? else {
            return Ok(None);
        };
        self.commit()?;
        self.announce_edge(&id);
        Ok(Some(id))
    }

    fn announce_edge(&mut self, edge_id: &str) {
        let Some(edge) = self.graph.get_edge(edge_id).cloned() else {
            return;
        };
        if let Some(path) = self.edge_path(&edge) {
            self.scene.push(SceneUpdate::EdgeAdded {
                edge_id: edge.id.clone(),
                path,
            });
        }
        self.emit(EditorEvent::ConnectionAdd { edge });
    }

    /// Remove one edge
    pub fn remove_edge(&mut self, edge_id: &str) -> Result<()> {
        let edge = self.graph.remove_edge(edge_id)?;
        self.commit()?;
        self.scene.push(SceneUpdate::EdgeRemoved {
            edge_id: edge.id.clone(),
        });
        self.emit(EditorEvent::ConnectionRemove { edge_id: edge.id });
        Ok(())
    }

    /// Remove a node and its incident edges
    pub fn remove_node(&mut self, node_id: &str) -> Result<()> {
        let (node, edges) = self.graph.remove_node(node_id)?;
        self.commit()?;

        for edge in edges {
            self.scene.push(SceneUpdate::EdgeRemoved {
                edge_id: edge.id.clone(),
            });
            self.emit(EditorEvent::ConnectionRemove { edge_id: edge.id });
        }
        self.dirty_nodes.shift_remove(&node.id);
        self.scene.push(SceneUpdate::NodeRemoved {
            node_id: node.id.clone(),
        });
        self.emit(EditorEvent::NodeRemove {
            node_id: node.id.clone(),
        });

        if self.selection.shift_remove(&node.id) {
            self.selection_changed();
        }
        Ok(())
    }

    /// Delete every selected node, one snapshot per node
    pub fn delete_selection(&mut self) -> Result<usize> {
        let targets: Vec<NodeId> = self.selection.iter().cloned().collect();
        for id in &targets {
            self.remove_node(id)?;
        }
        Ok(targets.len())
    }

    /// Set a config entry on a node
    pub fn set_config(&mut self, node_id: &str, key: &str, value: &str) -> Result<()> {
        self.graph.set_config(node_id, key, value)?;
        self.commit()
    }

    // --- Selection ---------------------------------------------------------

    /// Select a node, replacing the selection unless `additive`
    ///
    /// Additive selection toggles the node.
    pub fn select(&mut self, node_id: &str, additive: bool) {
        if self.graph.get_node(node_id).is_none() {
            return;
        }
        if additive {
            if !self.selection.shift_remove(node_id) {
                self.selection.insert(node_id.to_string());
            }
        } else {
            if self.selection.len() == 1 && self.selection.contains(node_id) {
                return;
            }
            self.selection.clear();
            self.selection.insert(node_id.to_string());
        }
        self.selection_changed();
    }

    pub fn clear_selection(&mut self) {
        if !self.selection.is_empty() {
            self.selection.clear();
            self.selection_changed();
        }
    }

    fn selection_changed(&mut self) {
        let selected = self.selection();
        self.scene.push(SceneUpdate::Selection {
            selected: selected.clone(),
        });
        self.emit(EditorEvent::SelectionChange { selected });
    }

    // --- Pointer input -----------------------------------------------------

    pub fn pointer_down(&mut self, event: &PointerEvent) -> Result<()> {
        if event.button != PointerButton::Primary {
            return Ok(());
        }
        if self.interaction != Interaction::Idle {
            self.cancel_interaction()?;
        }

        let point = self.transform.to_graph(event.position);
        match self.layout.hit_test(&self.graph, point) {
            Hit::Port(from) => {
                log::trace!("Connecting from {}.{}", from.node_id, from.port);
                self.interaction = Interaction::ConnectingEdge {
                    from,
                    cursor: point,
                };
                self.queue_ghost();
            }
            Hit::Node(node_id) => {
                let origin = self
                    .graph
                    .get_node(&node_id)
                    .map(|n| n.position)
                    .unwrap_or(point);
                if event.modifiers.additive() {
                    self.select(&node_id, true);
                } else if !self.is_selected(&node_id) {
                    self.select(&node_id, false);
                }
                self.interaction = Interaction::DraggingNode {
                    node_id,
                    grab_offset: point - origin,
                    moved: false,
                };
            }
            Hit::Canvas => {
                if !event.modifiers.additive() {
                    self.clear_selection();
                }
                self.interaction = Interaction::Panning {
                    last: event.position,
                };
            }
        }
        Ok(())
    }

    pub fn pointer_move(&mut self, event: &PointerEvent) -> Result<()> {
        let point = self.transform.to_graph(event.position);
        match &mut self.interaction {
            Interaction::Idle => {}
            Interaction::Panning { last } => {
                let delta = event.position - *last;
                *last = event.position;
                self.transform.pan_by(delta);
                self.transform_changed();
            }
            Interaction::DraggingNode {
                node_id,
                grab_offset,
                moved,
            } => {
                *moved = true;
                let node_id = node_id.clone();
                let position = point - *grab_offset;
                self.graph.move_node(&node_id, position)?;
                if let Some(node) = self.graph.get_node(&node_id) {
                    let rect = self
                        .layout
                        .node_rect(node, self.graph.registry().descriptor(&node.module_id));
                    self.scene.push(SceneUpdate::NodeMoved {
                        node_id: node_id.clone(),
                        rect,
                    });
                }
                self.dirty_nodes.insert(node_id);
                self.frame_requested = true;
            }
            Interaction::ConnectingEdge { cursor, .. } => {
                *cursor = point;
                self.queue_ghost();
            }
        }
        Ok(())
    }

    /// Finish the current interaction
    ///
    /// Returns the id of an edge created by a connection drop.
    pub fn pointer_up(&mut self, event: &PointerEvent) -> Result<Option<EdgeId>> {
        if event.button != PointerButton::Primary {
            return Ok(None);
        }

        match std::mem::replace(&mut self.interaction, Interaction::Idle) {
            Interaction::Idle | Interaction::Panning { .. } => Ok(None),
            Interaction::DraggingNode { moved, .. } => {
                if moved {
                    self.commit()?;
                }
                Ok(None)
            }
            Interaction::ConnectingEdge { from, .. } => {
                self.scene.push(SceneUpdate::GhostEdge { path: None });
                let point = self.transform.to_graph(event.position);
                let Hit::Port(target) = self.layout.hit_test(&self.graph, point) else {
                    return Ok(None);
                };
                if target.node_id == from.node_id || target.direction != from.direction.opposite() {
                    return Ok(None);
                }
                match self.connect(&from, &target) {
                    Ok(id) => Ok(id),
                    Err(crate::error::AutomationError::Validation(e)) => {
                        log::debug!("Connection dropped: {}", e);
                        Ok(None)
                    }
                    Err(e) => Err(e),
                }
            }
        }
    }

    /// Abort the current interaction
    ///
    /// A moved node keeps its position and is committed; a pending
    /// connection is discarded.
    pub fn cancel_interaction(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.interaction, Interaction::Idle) {
            Interaction::DraggingNode { moved: true, .. } => self.commit()?,
            Interaction::ConnectingEdge { .. } => {
                self.scene.push(SceneUpdate::GhostEdge { path: None });
            }
            _ => {}
        }
        Ok(())
    }

    /// Wheel input: pans, or zooms about the cursor with a zoom modifier
    pub fn wheel(&mut self, event: &WheelEvent) {
        if event.modifiers.zoom() {
            if event.delta_y == 0.0 {
                return;
            }
            let factor = self.config.zoom_step.powf(-event.delta_y.signum());
            let changed = self.transform.zoom_about(
                event.position,
                factor,
                self.config.min_zoom,
                self.config.max_zoom,
            );
            if changed {
                self.transform_changed();
            }
        } else {
            self.transform.pan_by(Point::new(0.0, -event.delta_y));
            self.transform_changed();
        }
    }

    fn transform_changed(&mut self) {
        self.scene.push(SceneUpdate::Transform {
            transform: self.transform,
        });
        self.emit(EditorEvent::TransformChange {
            transform: self.transform,
        });
    }

    // --- History -----------------------------------------------------------

    /// Restore the previous snapshot; `false` at the earliest entry
    pub fn undo(&mut self) -> Result<bool> {
        match self.history.undo() {
            Some(data) => {
                self.restore(data?)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Restore the next snapshot; `false` at the latest entry
    pub fn redo(&mut self) -> Result<bool> {
        match self.history.redo() {
            Some(data) => {
                self.restore(data?)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn restore(&mut self, data: crate::types::GraphData) -> Result<()> {
        self.graph.restore(data)?;
        self.interaction = Interaction::Idle;
        self.dirty_nodes.clear();
        self.frame_requested = false;
        self.clear_selection();
        self.queue_full_scene();
        Ok(())
    }

    // --- Rendering ---------------------------------------------------------

    /// Current path of an edge, if both ports can be located
    pub fn edge_path(&self, edge: &Edge) -> Option<EdgePath> {
        let registry = self.graph.registry();
        let source = self.graph.get_node(&edge.source)?;
        let target = self.graph.get_node(&edge.target)?;
        let start = self.layout.port_position(
            source,
            registry.descriptor(&source.module_id)?,
            &edge.source_port,
            PortDirection::Output,
        )?;
        let end = self.layout.port_position(
            target,
            registry.descriptor(&target.module_id)?,
            &edge.target_port,
            PortDirection::Input,
        )?;
        Some(EdgePath::between(start, end, self.config.edge_curvature))
    }

    /// Recompute paths of edges touching moved nodes
    ///
    /// Each affected edge is recomputed once per frame no matter how many
    /// moves happened since the last frame. Returns the number of paths
    /// recomputed.
    pub fn render_frame(&mut self) -> usize {
        if !self.frame_requested {
            return 0;
        }
        self.frame_requested = false;

        let dirty: HashSet<NodeId> = self.dirty_nodes.drain(..).collect();
        let mut affected: IndexMap<EdgeId, Edge> = IndexMap::new();
        for edge in self.graph.edges() {
            if dirty.contains(&edge.source) || dirty.contains(&edge.target) {
                affected.entry(edge.id.clone()).or_insert_with(|| edge.clone());
            }
        }

        let mut computed = 0;
        for (edge_id, edge) in affected {
            if let Some(path) = self.edge_path(&edge) {
                computed += 1;
                self.scene.push(SceneUpdate::EdgePathChanged { edge_id, path });
            }
        }
        self.path_computations += computed;
        computed
    }

    fn queue_node_added(&mut self, node_id: &str) {
        if let Some(node) = self.graph.get_node(node_id) {
            let rect = self
                .layout
                .node_rect(node, self.graph.registry().descriptor(&node.module_id));
            self.scene.push(SceneUpdate::NodeAdded {
                node_id: node.id.clone(),
                module_id: node.module_id.clone(),
                rect,
            });
        }
    }

    fn queue_full_scene(&mut self) {
        self.scene.push(SceneUpdate::Reset);
        let ids: Vec<NodeId> = self.graph.nodes().map(|n| n.id.clone()).collect();
        for id in &ids {
            self.queue_node_added(id);
        }
        let edges: Vec<Edge> = self.graph.edges().to_vec();
        for edge in edges {
            if let Some(path) = self.edge_path(&edge) {
                self.scene.push(SceneUpdate::EdgeAdded {
                    edge_id: edge.id,
                    path,
                });
            }
        }
        self.scene.push(SceneUpdate::Transform {
            transform: self.transform,
        });
    }

    fn queue_ghost(&mut self) {
        let Interaction::ConnectingEdge { from, cursor } = &self.interaction else {
            return;
        };
        let Some(node) = self.graph.get_node(&from.node_id) else {
            return;
        };
        let Some(descriptor) = self.graph.registry().descriptor(&node.module_id) else {
            return;
        };
        let Some(anchor) = self
            .layout
            .port_position(node, descriptor, &from.port, from.direction)
        else {
            return;
        };
        let path = match from.direction {
            PortDirection::Output => EdgePath::between(anchor, *cursor, self.config.edge_curvature),
            PortDirection::Input => EdgePath::between(*cursor, anchor, self.config.edge_curvature),
        };
        self.scene.push(SceneUpdate::GhostEdge { path: Some(path) });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::VecEventSink;
    use crate::registry::{ModuleDefinition, ModuleDescriptor, ModuleRegistry, PassThroughHandler};
    use crate::types::TypeClass;

    fn registry() -> Arc<ModuleRegistry> {
        let defs = [
            ModuleDescriptor::new("trigger", TypeClass::Trigger).with_outputs(["out"]),
            ModuleDescriptor::new("proc", TypeClass::Processor)
                .with_inputs(["in"])
                .with_outputs(["out"]),
        ];
        Arc::new(
            ModuleRegistry::from_definitions(
                defs.into_iter()
                    .map(|d| ModuleDefinition::new(d, Arc::new(PassThroughHandler))),
            )
            .unwrap(),
        )
    }

    fn editor() -> (InteractiveEditor, Arc<VecEventSink<EditorEvent>>) {
        let sink = Arc::new(VecEventSink::new());
        let editor = InteractiveEditor::new(
            GraphModel::new(registry()),
            &AutomationConfig::default(),
            sink.clone(),
        )
        .unwrap();
        (editor, sink)
    }

    fn out_port(editor: &InteractiveEditor, node_id: &str) -> Point {
        let node = editor.graph().get_node(node_id).unwrap();
        let descriptor = editor.graph().registry().descriptor(&node.module_id).unwrap();
        editor
            .layout()
            .port_position(node, descriptor, "out", PortDirection::Output)
            .unwrap()
    }

    fn in_port(editor: &InteractiveEditor, node_id: &str) -> Point {
        let node = editor.graph().get_node(node_id).unwrap();
        let descriptor = editor.graph().registry().descriptor(&node.module_id).unwrap();
        editor
            .layout()
            .port_position(node, descriptor, "in", PortDirection::Input)
            .unwrap()
    }

    #[test]
    fn test_add_node_emits_event_and_snapshot() {
        let (mut editor, sink) = editor();
        let id = editor.add_node("trigger", Point::new(10.0, 10.0)).unwrap();

        assert_eq!(editor.history().len(), 2);
        assert!(sink.events().contains(&EditorEvent::NodeAdd {
            node_id: id,
            module_id: "trigger".to_string(),
        }));
    }

    #[test]
    fn test_drag_commits_single_snapshot() {
        let (mut editor, _) = editor();
        let id = editor.add_node("proc", Point::new(0.0, 0.0)).unwrap();
        let before = editor.history().len();

        editor.pointer_down(&PointerEvent::primary(20.0, 10.0)).unwrap();
        assert!(matches!(editor.interaction(), Interaction::DraggingNode { .. }));
        for step in 1..=5 {
            editor
                .pointer_move(&PointerEvent::primary(20.0 + step as f64 * 10.0, 10.0))
                .unwrap();
        }
        editor.pointer_up(&PointerEvent::primary(70.0, 10.0)).unwrap();

        assert_eq!(editor.history().len(), before + 1);
        assert_eq!(editor.graph().get_node(&id).unwrap().position, Point::new(50.0, 0.0));
        assert_eq!(editor.interaction(), &Interaction::Idle);
        assert!(editor.is_selected(&id));
    }

    #[test]
    fn test_click_without_move_records_nothing() {
        let (mut editor, _) = editor();
        editor.add_node("proc", Point::new(0.0, 0.0)).unwrap();
        let before = editor.history().len();

        editor.pointer_down(&PointerEvent::primary(20.0, 10.0)).unwrap();
        editor.pointer_up(&PointerEvent::primary(20.0, 10.0)).unwrap();
        assert_eq!(editor.history().len(), before);
    }

    #[test]
    fn test_connect_by_drag_either_direction() {
        let (mut editor, sink) = editor();
        let t = editor.add_node("trigger", Point::new(0.0, 0.0)).unwrap();
        let p = editor.add_node("proc", Point::new(400.0, 0.0)).unwrap();
        let from_input = in_port(&editor, &p);
        let to_output = out_port(&editor, &t);

        // Start at the input port and drop on the output port
        editor
            .pointer_down(&PointerEvent::primary(from_input.x, from_input.y))
            .unwrap();
        assert!(matches!(editor.interaction(), Interaction::ConnectingEdge { .. }));
        editor
            .pointer_move(&PointerEvent::primary(200.0, 20.0))
            .unwrap();
        let id = editor
            .pointer_up(&PointerEvent::primary(to_output.x, to_output.y))
            .unwrap()
            .unwrap();

        let edge = editor.graph().get_edge(&id).unwrap();
        assert_eq!(edge.source, t);
        assert_eq!(edge.target, p);
        assert!(sink
            .events()
            .iter()
            .any(|e| matches!(e, EditorEvent::ConnectionAdd { .. })));
    }

    #[test]
    fn test_connection_dropped_on_canvas_is_cancelled() {
        let (mut editor, _) = editor();
        let t = editor.add_node("trigger", Point::new(0.0, 0.0)).unwrap();
        let start = out_port(&editor, &t);
        let before = editor.history().len();

        editor
            .pointer_down(&PointerEvent::primary(start.x, start.y))
            .unwrap();
        let result = editor
            .pointer_up(&PointerEvent::primary(900.0, 900.0))
            .unwrap();

        assert!(result.is_none());
        assert_eq!(editor.graph().edge_count(), 0);
        assert_eq!(editor.history().len(), before);
        assert!(editor
            .drain_scene()
            .contains(&SceneUpdate::GhostEdge { path: None }));
    }

    fn assert_drop_cancelled(editor: &mut InteractiveEditor, start: Point, drop: Point) {
        let before = editor.history().len();
        editor.drain_scene();

        editor
            .pointer_down(&PointerEvent::primary(start.x, start.y))
            .unwrap();
        assert!(matches!(editor.interaction(), Interaction::ConnectingEdge { .. }));
        let result = editor
            .pointer_up(&PointerEvent::primary(drop.x, drop.y))
            .unwrap();

        assert!(result.is_none());
        assert_eq!(editor.graph().edge_count(), 0);
        assert_eq!(editor.history().len(), before);
        assert_eq!(editor.interaction(), &Interaction::Idle);
        assert!(editor
            .drain_scene()
            .contains(&SceneUpdate::GhostEdge { path: None }));
    }

    #[test]
    fn test_connection_dropped_on_same_node_is_cancelled() {
        let (mut editor, _) = editor();
        let p = editor.add_node("proc", Point::new(0.0, 0.0)).unwrap();
        let start = out_port(&editor, &p);
        let drop = in_port(&editor, &p);
        assert_drop_cancelled(&mut editor, start, drop);
    }

    #[test]
    fn test_connection_dropped_on_same_direction_is_cancelled() {
        let (mut editor, _) = editor();
        let t = editor.add_node("trigger", Point::new(0.0, 0.0)).unwrap();
        let p = editor.add_node("proc", Point::new(400.0, 0.0)).unwrap();
        let start = out_port(&editor, &t);
        let drop = out_port(&editor, &p);
        assert_drop_cancelled(&mut editor, start, drop);
    }

    #[test]
    fn test_invalid_zoom_config_rejected() {
        let config = AutomationConfig {
            editor: crate::config::EditorConfig {
                min_zoom: 4.0,
                max_zoom: 2.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let result = InteractiveEditor::new(
            GraphModel::new(registry()),
            &config,
            Arc::new(VecEventSink::<EditorEvent>::new()),
        );
        assert!(matches!(result, Err(crate::error::AutomationError::Config(_))));
    }

    #[test]
    fn test_panning_is_not_undoable() {
        let (mut editor, _) = editor();
        let before = editor.history().len();

        editor.pointer_down(&PointerEvent::primary(500.0, 500.0)).unwrap();
        editor.pointer_move(&PointerEvent::primary(520.0, 490.0)).unwrap();
        editor.pointer_move(&PointerEvent::primary(530.0, 480.0)).unwrap();
        editor.pointer_up(&PointerEvent::primary(530.0, 480.0)).unwrap();

        assert_eq!(editor.transform().pan(), Point::new(30.0, -20.0));
        assert_eq!(editor.history().len(), before);
    }

    #[test]
    fn test_secondary_button_ignored() {
        let (mut editor, _) = editor();
        let event = PointerEvent {
            button: PointerButton::Secondary,
            ..PointerEvent::primary(500.0, 500.0)
        };
        editor.pointer_down(&event).unwrap();
        assert_eq!(editor.interaction(), &Interaction::Idle);
    }

    #[test]
    fn test_wheel_zoom_and_pan() {
        let (mut editor, _) = editor();
        let ctrl = Modifiers {
            ctrl: true,
            ..Modifiers::NONE
        };
        let cursor = Point::new(120.0, 80.0);
        let anchor = editor.transform().to_graph(cursor);

        editor.wheel(&WheelEvent {
            position: cursor,
            delta_y: -1.0,
            modifiers: ctrl,
        });
        assert!((editor.transform().scale - 1.1).abs() < 1e-9);
        assert!(editor.transform().to_graph(cursor).distance(anchor) < 1e-9);

        for _ in 0..100 {
            editor.wheel(&WheelEvent {
                position: cursor,
                delta_y: -1.0,
                modifiers: ctrl,
            });
        }
        assert_eq!(editor.transform().scale, crate::constants::zoom::MAX_ZOOM);

        let scale = editor.transform().scale;
        editor.wheel(&WheelEvent {
            position: cursor,
            delta_y: 15.0,
            modifiers: Modifiers::NONE,
        });
        assert_eq!(editor.transform().scale, scale);
    }

    #[test]
    fn test_selection_modes() {
        let (mut editor, _) = editor();
        let a = editor.add_node("proc", Point::new(0.0, 0.0)).unwrap();
        let b = editor.add_node("proc", Point::new(0.0, 300.0)).unwrap();

        editor.select(&a, false);
        editor.select(&b, false);
        assert_eq!(editor.selection(), vec![b.clone()]);

        editor.select(&a, true);
        assert_eq!(editor.selection(), vec![b.clone(), a.clone()]);

        editor.select(&b, true);
        assert_eq!(editor.selection(), vec![a.clone()]);

        // Clicking empty canvas clears
        editor.pointer_down(&PointerEvent::primary(900.0, 900.0)).unwrap();
        editor.pointer_up(&PointerEvent::primary(900.0, 900.0)).unwrap();
        assert!(editor.selection().is_empty());
    }

    #[test]
    fn test_delete_selection_snapshots_each_node() {
        let (mut editor, sink) = editor();
        let t = editor.add_node("trigger", Point::new(0.0, 0.0)).unwrap();
        let a = editor.add_node("proc", Point::new(400.0, 0.0)).unwrap();
        let b = editor.add_node("proc", Point::new(400.0, 300.0)).unwrap();
        editor
            .connect(&PortRef::output(&t, "out"), &PortRef::input(&a, "in"))
            .unwrap();
        editor.select(&a, false);
        editor.select(&b, true);
        let before = editor.history().len();

        assert_eq!(editor.delete_selection().unwrap(), 2);
        assert_eq!(editor.history().len(), before + 2);
        assert_eq!(editor.graph().node_count(), 1);
        assert_eq!(editor.graph().edge_count(), 0);
        assert!(editor.selection().is_empty());
        assert!(sink
            .events()
            .iter()
            .any(|e| matches!(e, EditorEvent::ConnectionRemove { .. })));
    }

    #[test]
    fn test_undo_redo_restores_graph() {
        let (mut editor, _) = editor();
        let a = editor.add_node("proc", Point::new(0.0, 0.0)).unwrap();
        editor.select(&a, false);
        editor.add_node("proc", Point::new(0.0, 300.0)).unwrap();
        assert_eq!(editor.graph().node_count(), 2);

        assert!(editor.undo().unwrap());
        assert_eq!(editor.graph().node_count(), 1);
        assert!(editor.selection().is_empty());
        assert!(editor.drain_scene().contains(&SceneUpdate::Reset));

        assert!(editor.undo().unwrap());
        assert_eq!(editor.graph().node_count(), 0);
        assert!(!editor.undo().unwrap());

        assert!(editor.redo().unwrap());
        assert!(editor.redo().unwrap());
        assert_eq!(editor.graph().node_count(), 2);
        assert!(!editor.redo().unwrap());
    }

    #[test]
    fn test_render_frame_coalesces_moves() {
        let (mut editor, _) = editor();
        let t = editor.add_node("trigger", Point::new(0.0, 0.0)).unwrap();
        let a = editor.add_node("proc", Point::new(400.0, 0.0)).unwrap();
        let b = editor.add_node("proc", Point::new(400.0, 300.0)).unwrap();
        editor
            .connect(&PortRef::output(&t, "out"), &PortRef::input(&a, "in"))
            .unwrap();
        editor
            .connect(&PortRef::output(&t, "out"), &PortRef::input(&b, "in"))
            .unwrap();
        editor.drain_scene();

        // Drag the trigger through many moves before a single frame
        editor.pointer_down(&PointerEvent::primary(20.0, 10.0)).unwrap();
        for step in 1..=20 {
            editor
                .pointer_move(&PointerEvent::primary(20.0, 10.0 + step as f64))
                .unwrap();
        }
        assert!(editor.frame_requested());

        assert_eq!(editor.render_frame(), 2);
        assert_eq!(editor.path_computations(), 2);
        assert!(!editor.frame_requested());
        assert_eq!(editor.render_frame(), 0);

        let changed = editor
            .drain_scene()
            .into_iter()
            .filter(|u| matches!(u, SceneUpdate::EdgePathChanged { .. }))
            .count();
        assert_eq!(changed, 2);
    }

    #[test]
    fn test_flush_to_renderer() {
        let (mut editor, _) = editor();
        editor.add_node("proc", Point::new(0.0, 0.0)).unwrap();

        let mut rendered: Vec<SceneUpdate> = Vec::new();
        editor.flush(&mut rendered);
        assert_eq!(rendered.first(), Some(&SceneUpdate::Reset));
        assert!(rendered
            .iter()
            .any(|u| matches!(u, SceneUpdate::NodeAdded { .. })));
        assert!(editor.drain_scene().is_empty());
    }
}
