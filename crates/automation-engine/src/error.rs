//! Error types for the automation engine
//!
//! Three families are kept apart because callers treat them differently:
//!
//! - [`ValidationError`] is raised synchronously by registry/graph APIs and
//!   must be fixed by the caller before retrying.
//! - [`StructuralError`] is reported (never raised) by `GraphModel::validate`;
//!   the engine skips triggers whose reachable subgraph is affected.
//! - [`AutomationError`] covers everything else, including handler failures
//!   which the engine contains to their branch.

use thiserror::Error;

use crate::types::{EdgeId, NodeId, PortId, TypeClass};

/// Result type alias using AutomationError
pub type Result<T> = std::result::Result<T, AutomationError>;

/// Malformed module or graph definition, or direct API misuse
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Module definition without an id
    #[error("Module definition is missing an id")]
    MissingModuleId,

    /// Port name is empty after trimming
    #[error("Module '{module_id}' declares an empty port name")]
    EmptyPortName { module_id: String },

    /// A capability class declared ports it may not have
    #[error("Module '{module_id}' of class {class} may not declare {direction} ports")]
    IllegalPortCardinality {
        module_id: String,
        class: TypeClass,
        direction: &'static str,
    },

    /// Module id not present in the registry
    #[error("Unknown module '{0}'")]
    UnknownModule(String),

    /// Node id not present in the graph
    #[error("Unknown node '{0}'")]
    UnknownNode(NodeId),

    /// Edge id not present in the graph
    #[error("Unknown edge '{0}'")]
    UnknownEdge(EdgeId),

    /// Node id already used in the graph
    #[error("Node id '{0}' already exists")]
    DuplicateNodeId(NodeId),

    /// Port not declared by the node's module in the required direction
    #[error("Node '{node_id}' has no {direction} port '{port}'")]
    UnknownPort {
        node_id: NodeId,
        port: PortId,
        direction: &'static str,
    },

    /// Edge whose source and target are the same node
    #[error("Self-loop on node '{0}' is not allowed")]
    SelfLoop(NodeId),
}

/// Problems found by `GraphModel::validate` before execution
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    /// An edge references a node that does not exist
    #[error("Edge '{edge_id}' references missing node '{node_id}'")]
    DanglingEdge { edge_id: EdgeId, node_id: NodeId },

    /// An edge references a port the module does not declare
    #[error("Edge '{edge_id}' references undeclared {direction} port '{port}' on node '{node_id}'")]
    UndeclaredPort {
        edge_id: EdgeId,
        node_id: NodeId,
        port: PortId,
        direction: &'static str,
    },

    /// A node references a module that is not registered
    #[error("Node '{node_id}' references unregistered module '{module_id}'")]
    UnknownModule { node_id: NodeId, module_id: String },

    /// A second edge reuses an id; `node_id` is that edge's source
    #[error("Edge id '{edge_id}' is used more than once (again from node '{node_id}')")]
    DuplicateEdgeId { edge_id: EdgeId, node_id: NodeId },
}

impl StructuralError {
    /// Node ids this error touches, used to scope it to triggers
    pub fn node_ids(&self) -> Vec<&str> {
        match self {
            Self::DanglingEdge { node_id, .. }
            | Self::UndeclaredPort { node_id, .. }
            | Self::UnknownModule { node_id, .. }
            | Self::DuplicateEdgeId { node_id, .. } => vec![node_id.as_str()],
        }
    }

    /// Edge id this error touches, if any
    pub fn edge_id(&self) -> Option<&str> {
        match self {
            Self::DanglingEdge { edge_id, .. }
            | Self::UndeclaredPort { edge_id, .. }
            | Self::DuplicateEdgeId { edge_id, .. } => Some(edge_id.as_str()),
            Self::UnknownModule { .. } => None,
        }
    }
}

/// Errors from the gate expression language
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpressionError {
    /// Unexpected character while tokenizing
    #[error("Unexpected character '{ch}' at {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    /// String literal without closing quote
    #[error("Unterminated string starting at {0}")]
    UnterminatedString(usize),

    /// Parser found a token it did not expect
    #[error("Unexpected token '{found}', expected {expected}")]
    UnexpectedToken { found: String, expected: String },

    /// Operator applied to values it does not support
    #[error("Cannot apply '{op}' to {left} and {right}")]
    TypeMismatch {
        op: String,
        left: String,
        right: String,
    },

    /// Division or modulo by zero
    #[error("Division by zero")]
    DivisionByZero,

    /// Parentheses or prefix operators nested past the limit
    #[error("Expression nests deeper than {0} levels")]
    TooDeep(usize),

    /// More operators than an expression may contain
    #[error("Expression has more than {0} operators")]
    TooLong(usize),
}

/// Errors that can occur in the automation engine
#[derive(Debug, Error)]
pub enum AutomationError {
    /// Definition or API misuse
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Configuration rejected
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    /// Handler execution failed
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    /// Handler execution failed for a specific node
    #[error("Node '{node_id}' failed: {message}")]
    NodeExecution { node_id: NodeId, message: String },

    /// A capability hook the caller required is not provided by the host
    #[error("Capability hook '{0}' is not available")]
    HookUnavailable(&'static str),

    /// A capability hook reported a failure
    #[error("Capability hook error: {0}")]
    Hook(String),

    /// Gate expression failed to parse or evaluate
    #[error("Expression error: {0}")]
    Expression(#[from] ExpressionError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Compression error
    #[error("Compression error: {0}")]
    Compression(String),

    /// Execution was cancelled by the host
    #[error("Execution cancelled")]
    Cancelled,

    /// A handler exceeded the configured node timeout
    #[error("Node timed out after {0} ms")]
    Timeout(u64),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AutomationError {
    /// Create an execution failed error with a message
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::ExecutionFailed(msg.into())
    }

    /// Create a hook failure with a message
    pub fn hook(msg: impl Into<String>) -> Self {
        Self::Hook(msg.into())
    }
}
