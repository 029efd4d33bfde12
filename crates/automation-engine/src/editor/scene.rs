//! Declarative scene updates for renderer adapters
//!
//! The editor never draws. It queues [`SceneUpdate`]s which a toolkit
//! adapter implementing [`SceneRenderer`] turns into widgets.

use serde::{Deserialize, Serialize};

use super::layout::Rect;
use super::transform::ViewTransform;
use crate::types::{EdgeId, NodeId, Point};

/// Cubic Bézier with horizontal tangents at both ends
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgePath {
    pub start: Point,
    pub control1: Point,
    pub control2: Point,
    pub end: Point,
}

impl EdgePath {
    pub fn between(start: Point, end: Point, curvature: f64) -> Self {
        Self {
            start,
            control1: Point::new(start.x + curvature, start.y),
            control2: Point::new(end.x - curvature, end.y),
            end,
        }
    }

    /// Point on the curve for `t` in `[0, 1]`
    pub fn point_at(&self, t: f64) -> Point {
        let u = 1.0 - t;
        self.start * (u * u * u)
            + self.control1 * (3.0 * u * u * t)
            + self.control2 * (3.0 * u * t * t)
            + self.end * (t * t * t)
    }

    /// SVG path data
    pub fn to_svg(&self) -> String {
        format!(
            "M {} {} C {} {}, {} {}, {} {}",
            self.start.x,
            self.start.y,
            self.control1.x,
            self.control1.y,
            self.control2.x,
            self.control2.y,
            self.end.x,
            self.end.y
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SceneUpdate {
    #[serde(rename_all = "camelCase")]
    NodeAdded {
        node_id: NodeId,
        module_id: String,
        rect: Rect,
    },
    #[serde(rename_all = "camelCase")]
    NodeMoved { node_id: NodeId, rect: Rect },
    #[serde(rename_all = "camelCase")]
    NodeRemoved { node_id: NodeId },
    #[serde(rename_all = "camelCase")]
    EdgeAdded { edge_id: EdgeId, path: EdgePath },
    #[serde(rename_all = "camelCase")]
    EdgePathChanged { edge_id: EdgeId, path: EdgePath },
    #[serde(rename_all = "camelCase")]
    EdgeRemoved { edge_id: EdgeId },
    /// Preview of a connection being dragged; `None` hides it
    GhostEdge { path: Option<EdgePath> },
    Selection { selected: Vec<NodeId> },
    Transform { transform: ViewTransform },
    /// Drop everything; the updates that follow describe the whole scene
    Reset,
}

/// Consumer of scene updates
pub trait SceneRenderer {
    fn apply(&mut self, update: &SceneUpdate);
}

impl SceneRenderer for Vec<SceneUpdate> {
    fn apply(&mut self, update: &SceneUpdate) {
        self.push(update.clone());
    }
}
