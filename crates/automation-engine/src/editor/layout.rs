//! Node geometry and hit testing
//!
//! Input ports sit on the left edge of a node and output ports on the
//! right, one row per port below the header.

use serde::{Deserialize, Serialize};

use crate::config::EditorConfig;
use crate::graph::GraphModel;
use crate::registry::ModuleDescriptor;
use crate::types::{Node, NodeId, Point, PortDirection, PortRef};

/// Axis-aligned rectangle in graph space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }
}

/// What lies under a point
#[derive(Debug, Clone, PartialEq)]
pub enum Hit {
    Port(PortRef),
    Node(NodeId),
    Canvas,
}

/// Geometry rules shared by rendering and hit testing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeLayout {
    pub node_width: f64,
    pub header_height: f64,
    pub port_spacing: f64,
    pub port_hit_radius: f64,
}

impl NodeLayout {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            node_width: config.node_width,
            header_height: config.header_height,
            port_spacing: config.port_spacing,
            port_hit_radius: config.port_hit_radius,
        }
    }

    /// Body rectangle; at least one port row tall
    pub fn node_rect(&self, node: &Node, descriptor: Option<&ModuleDescriptor>) -> Rect {
        let rows = descriptor
            .map(|d| d.input_ports.len().max(d.output_ports.len()))
            .unwrap_or(0)
            .max(1);
        Rect {
            x: node.position.x,
            y: node.position.y,
            width: self.node_width,
            height: self.header_height + rows as f64 * self.port_spacing,
        }
    }

    /// Center of a port handle, if the module declares the port
    pub fn port_position(
        &self,
        node: &Node,
        descriptor: &ModuleDescriptor,
        port: &str,
        direction: PortDirection,
    ) -> Option<Point> {
        let index = descriptor.ports(direction).iter().position(|p| p == port)?;
        let x = match direction {
            PortDirection::Input => node.position.x,
            PortDirection::Output => node.position.x + self.node_width,
        };
        let y = node.position.y + self.header_height + self.port_spacing * (index as f64 + 0.5);
        Some(Point::new(x, y))
    }

    /// Find what lies under a graph-space point
    ///
    /// Port handles win over node bodies; among overlapping nodes the most
    /// recently added is on top.
    pub fn hit_test(&self, graph: &GraphModel, point: Point) -> Hit {
        let registry = graph.registry();
        let topmost_first: Vec<&Node> = graph.nodes().collect::<Vec<_>>().into_iter().rev().collect();

        for node in &topmost_first {
            let Some(descriptor) = registry.descriptor(&node.module_id) else {
                continue;
            };
            for direction in [PortDirection::Input, PortDirection::Output] {
                for port in descriptor.ports(direction) {
                    let hit = self
                        .port_position(node, descriptor, port, direction)
                        .map(|center| center.distance(point) <= self.port_hit_radius)
                        .unwrap_or(false);
                    if hit {
                        return Hit::Port(PortRef {
                            node_id: node.id.clone(),
                            port: port.clone(),
                            direction,
                        });
                    }
                }
            }
        }

        topmost_first
            .iter()
            .find(|node| {
                self.node_rect(node, registry.descriptor(&node.module_id))
                    .contains(point)
            })
            .map(|node| Hit::Node(node.id.clone()))
            .unwrap_or(Hit::Canvas)
    }
}

impl Default for NodeLayout {
    fn default() -> Self {
        Self::new(&EditorConfig::default())
    }
}
