//! Automation Engine - visual automation graphs for desktop hosts
//!
//! This crate provides the core of a node-based automation tool:
//!
//! - A module registry of node types with fixed capability classes
//! - A validated graph model with a transport-neutral persisted form
//! - Compressed snapshot-based undo/redo
//! - A toolkit-neutral interactive editor emitting declarative scene updates
//! - A trigger-driven, depth-first execution engine
//!
//! # Architecture
//!
//! Nothing here touches the outside world directly. Node handlers reach
//! the clipboard, network and processes through [`CapabilityHooks`], which
//! the host injects into the [`ExecutionEngine`]. Built-in node types live
//! in the `automation-nodes` crate and are collected at link time via
//! [`BuiltinModule`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use automation_engine::{
//!     EngineConfig, ExecutionContext, ExecutionEngine, GraphModel, ModuleRegistry, NoHooks, Point,
//! };
//!
//! let registry = Arc::new(ModuleRegistry::with_builtins());
//! let mut graph = GraphModel::new(registry.clone());
//! let trigger = graph.add_node("manual-trigger", Point::new(0.0, 0.0))?;
//! let notify = graph.add_node("notify", Point::new(240.0, 0.0))?;
//! graph.add_edge(&trigger, "out", &notify, "in")?;
//!
//! let engine = ExecutionEngine::new(Arc::new(NoHooks), EngineConfig::default());
//! let context = engine.execute(&graph, &registry, ExecutionContext::new()).await;
//! ```

pub mod config;
pub mod constants;
pub mod context;
pub mod editor;
pub mod engine;
pub mod error;
pub mod events;
pub mod expression;
pub mod graph;
pub mod history;
pub mod hooks;
pub mod registry;
pub mod types;

// Re-export key types
pub use config::{AutomationConfig, ConfigError, EditorConfig, EngineConfig, HistoryConfig, HookConfig};
pub use context::{ContextKeys, Diagnostic, DiagnosticKind, ExecutionContext};
pub use editor::{
    EdgePath, Hit, InteractiveEditor, Interaction, Modifiers, NodeLayout, PointerButton,
    PointerEvent, SceneRenderer, SceneUpdate, ViewTransform, WheelEvent,
};
pub use engine::{ExecutionEngine, ExecutionState};
pub use error::{AutomationError, ExpressionError, Result, StructuralError, ValidationError};
pub use events::{EditorEvent, EventError, EventSink, ExecutionEvent, NullEventSink, VecEventSink};
pub use expression::{is_truthy, Expression};
pub use graph::{GraphModel, Outgoing};
pub use history::HistoryManager;
pub use hooks::{CapabilityHooks, CommandOutput, HookCall, NoHooks, RecordingHooks};
pub use registry::{
    payload_to_text, BuiltinModule, CallbackHandler, HandlerCall, ModuleDefinition,
    ModuleDescriptor, ModuleHandler, ModuleRegistry, NodeInvocation, PassThroughHandler,
};
pub use types::{
    Edge, EdgeId, GraphData, Node, NodeConfig, NodeId, NodeRecord, Payload, Point, PortDirection,
    PortId, PortRef, TypeClass,
};

pub use tokio_util::sync::CancellationToken;
