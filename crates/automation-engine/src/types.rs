//! Core types for automation graphs
//!
//! These types define the structure of automation graphs, including
//! nodes, edges, ports and the transport-neutral persisted form.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

/// Unique identifier for a node
pub type NodeId = String;

/// Unique identifier for an edge
pub type EdgeId = String;

/// Name of a port declared by a module
pub type PortId = String;

/// Per-node configuration (ordered for deterministic serialization)
pub type NodeConfig = BTreeMap<String, String>;

/// Value threaded along one branch of an execution
pub type Payload = serde_json::Value;

/// Capability class of a module, fixing its port cardinality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeClass {
    /// Seeds an execution; no input ports
    Trigger,
    /// Transforms a payload
    Processor,
    /// Control flow (gate, merge, delay)
    Utility,
    /// Terminal side effect; no output ports
    Output,
}

impl TypeClass {
    /// Whether modules of this class may declare input ports
    pub fn allows_inputs(&self) -> bool {
        !matches!(self, TypeClass::Trigger)
    }

    /// Whether modules of this class may declare output ports
    pub fn allows_outputs(&self) -> bool {
        !matches!(self, TypeClass::Output)
    }
}

impl fmt::Display for TypeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeClass::Trigger => "trigger",
            TypeClass::Processor => "processor",
            TypeClass::Utility => "utility",
            TypeClass::Output => "output",
        };
        f.write_str(name)
    }
}

/// Direction of a port relative to its node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortDirection {
    Input,
    Output,
}

impl PortDirection {
    /// The direction a port must have to connect to this one
    pub fn opposite(&self) -> Self {
        match self {
            PortDirection::Input => PortDirection::Output,
            PortDirection::Output => PortDirection::Input,
        }
    }

    pub(crate) fn label(&self) -> &'static str {
        match self {
            PortDirection::Input => "input",
            PortDirection::Output => "output",
        }
    }
}

/// A 2D point, used for both graph space and screen space
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;

    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

/// A node instance in a graph
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Unique identifier for this node instance
    pub id: NodeId,
    /// Capability class, derived from the module definition
    pub type_class: TypeClass,
    /// Module this node instantiates
    pub module_id: String,
    /// Position in graph space
    pub position: Point,
    /// Instance configuration
    pub config: NodeConfig,
}

/// An edge connecting an output port to an input port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    /// Unique identifier for this edge
    pub id: EdgeId,
    /// Source node ID
    pub source: NodeId,
    /// Source (output) port
    pub source_port: PortId,
    /// Target node ID
    pub target: NodeId,
    /// Target (input) port
    pub target_port: PortId,
}

impl Edge {
    /// Whether this edge connects the same endpoints as another
    pub fn same_endpoints(&self, other: &Edge) -> bool {
        self.source == other.source
            && self.source_port == other.source_port
            && self.target == other.target
            && self.target_port == other.target_port
    }

    /// Whether the edge touches the given node
    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }
}

/// Reference to a port on a specific node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PortRef {
    pub node_id: NodeId,
    pub port: PortId,
    pub direction: PortDirection,
}

impl PortRef {
    pub fn output(node_id: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            port: port.into(),
            direction: PortDirection::Output,
        }
    }

    pub fn input(node_id: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            port: port.into(),
            direction: PortDirection::Input,
        }
    }
}

/// Persisted form of a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub id: NodeId,
    pub module_id: String,
    pub position: Point,
    #[serde(default)]
    pub config: NodeConfig,
}

impl From<&Node> for NodeRecord {
    fn from(node: &Node) -> Self {
        Self {
            id: node.id.clone(),
            module_id: node.module_id.clone(),
            position: node.position,
            config: node.config.clone(),
        }
    }
}

/// Transport-neutral graph structure: `{nodes: [...], edges: [...]}`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraphData {
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}
