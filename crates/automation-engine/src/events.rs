//! Event types for editor changes and execution progress
//!
//! Both the editor and the engine report to an [`EventSink`], which hides
//! the transport (UI bridge, channel, test buffer) from the core.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::editor::ViewTransform;
use crate::types::{Edge, EdgeId, NodeId, Payload};

/// Destination for events of type `E`
///
/// Returns an error if the event could not be delivered (e.g., channel
/// closed). Emitters log delivery failures and carry on.
pub trait EventSink<E>: Send + Sync {
    fn send(&self, event: E) -> Result<(), EventError>;
}

/// Error when sending events fails
#[derive(Debug, Clone, Error)]
#[error("Event error: {message}")]
pub struct EventError {
    pub message: String,
}

impl EventError {
    pub fn channel_closed() -> Self {
        Self {
            message: "Channel closed".to_string(),
        }
    }
}

/// Host-facing editor notifications
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EditorEvent {
    #[serde(rename = "node:add", rename_all = "camelCase")]
    NodeAdd { node_id: NodeId, module_id: String },

    #[serde(rename = "node:remove", rename_all = "camelCase")]
    NodeRemove { node_id: NodeId },

    #[serde(rename = "connection:add")]
    ConnectionAdd { edge: Edge },

    #[serde(rename = "connection:remove", rename_all = "camelCase")]
    ConnectionRemove { edge_id: EdgeId },

    #[serde(rename = "selection:change")]
    SelectionChange { selected: Vec<NodeId> },

    #[serde(rename = "transform:change")]
    TransformChange { transform: ViewTransform },
}

/// Events emitted while an execution runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ExecutionEvent {
    #[serde(rename_all = "camelCase")]
    ExecutionStarted {
        execution_id: String,
        trigger_count: usize,
    },

    #[serde(rename_all = "camelCase")]
    TriggerStarted {
        execution_id: String,
        trigger_id: NodeId,
    },

    /// Trigger skipped because its reachable subgraph is malformed
    #[serde(rename_all = "camelCase")]
    TriggerSkipped {
        execution_id: String,
        trigger_id: NodeId,
        reason: String,
    },

    #[serde(rename_all = "camelCase")]
    NodeStarted {
        execution_id: String,
        trigger_id: NodeId,
        node_id: NodeId,
        module_id: String,
    },

    #[serde(rename_all = "camelCase")]
    NodeCompleted {
        execution_id: String,
        trigger_id: NodeId,
        node_id: NodeId,
        output: Payload,
    },

    #[serde(rename_all = "camelCase")]
    NodeFailed {
        execution_id: String,
        trigger_id: NodeId,
        node_id: NodeId,
        error: String,
    },

    #[serde(rename_all = "camelCase")]
    ExecutionSettled {
        execution_id: String,
        cancelled: bool,
        diagnostics: usize,
    },
}

/// A no-op event sink that discards all events
pub struct NullEventSink;

impl<E> EventSink<E> for NullEventSink {
    fn send(&self, _event: E) -> Result<(), EventError> {
        Ok(())
    }
}

/// A vector-based event sink that collects events
///
/// Useful for testing to verify events were emitted correctly.
pub struct VecEventSink<E> {
    events: Mutex<Vec<E>>,
}

impl<E: Clone> VecEventSink<E> {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    /// Get all collected events
    pub fn events(&self) -> Vec<E> {
        self.lock().clone()
    }

    /// Remove and return all collected events
    pub fn drain(&self) -> Vec<E> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<E>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<E: Clone> Default for VecEventSink<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Clone + Send> EventSink<E> for VecEventSink<E> {
    fn send(&self, event: E) -> Result<(), EventError> {
        self.lock().push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_event_sink() {
        let sink = VecEventSink::new();
        sink.send(EditorEvent::NodeRemove {
            node_id: "node-1".to_string(),
        })
        .unwrap();

        let events = sink.drain();
        assert_eq!(events.len(), 1);
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_null_event_sink() {
        let sink = NullEventSink;
        EventSink::<ExecutionEvent>::send(
            &sink,
            ExecutionEvent::ExecutionStarted {
                execution_id: "x".to_string(),
                trigger_count: 0,
            },
        )
        .unwrap();
    }

    #[test]
    fn test_editor_event_wire_names() {
        let json = serde_json::to_value(EditorEvent::NodeAdd {
            node_id: "node-1".to_string(),
            module_id: "gate".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "node:add");
        assert_eq!(json["nodeId"], "node-1");

        let json = serde_json::to_value(EditorEvent::SelectionChange { selected: vec![] }).unwrap();
        assert_eq!(json["type"], "selection:change");
    }

    #[test]
    fn test_execution_event_wire_names() {
        let json = serde_json::to_value(ExecutionEvent::NodeFailed {
            execution_id: "e".to_string(),
            trigger_id: "t".to_string(),
            node_id: "n".to_string(),
            error: "boom".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "nodeFailed");
        assert_eq!(json["triggerId"], "t");
    }
}
