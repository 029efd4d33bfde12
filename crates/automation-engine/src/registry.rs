//! Module registry for node-type definitions
//!
//! This module maps module ids to their descriptors (capability class,
//! ports, default config) and handlers. The graph model validates
//! mutations against it and the execution engine dispatches through it.
//!
//! # Usage
//!
//! ```ignore
//! use automation_engine::{ModuleDescriptor, ModuleRegistry, TypeClass};
//!
//! let mut registry = ModuleRegistry::new();
//! registry.register_fn(
//!     ModuleDescriptor::new("upper", TypeClass::Processor)
//!         .with_inputs(["in"])
//!         .with_outputs(["out"]),
//!     |call| async move {
//!         let text = call.payload_text();
//!         Ok(serde_json::json!(text.to_uppercase()))
//!     },
//! )?;
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::context::ExecutionContext;
use crate::error::{Result, ValidationError};
use crate::hooks::CapabilityHooks;
use crate::types::{NodeConfig, NodeId, Payload, PortDirection, PortId, TypeClass};

/// Everything a handler may know about the node it runs for
pub struct NodeInvocation<'a> {
    pub node_id: &'a str,
    /// Trigger whose branch is running this node
    pub trigger_id: &'a str,
    pub module_id: &'a str,
    pub config: &'a NodeConfig,
    pub hooks: &'a dyn CapabilityHooks,
    pub cancel: &'a CancellationToken,
    pub settings: &'a EngineConfig,
}

impl NodeInvocation<'_> {
    /// Config value for `key`, or `default` when unset
    pub fn config_or<'b>(&'b self, key: &str, default: &'b str) -> &'b str {
        self.config.get(key).map(|s| s.as_str()).unwrap_or(default)
    }
}

/// Per-module handler
///
/// A handler receives the node's config, the incoming payload (`None` for
/// triggers) and the shared context, and returns the payload to propagate.
#[async_trait]
pub trait ModuleHandler: Send + Sync {
    async fn execute(
        &self,
        node: &NodeInvocation<'_>,
        payload: Option<Payload>,
        context: &ExecutionContext,
    ) -> Result<Payload>;
}

/// Owned arguments passed to closure handlers
pub struct HandlerCall {
    pub node_id: NodeId,
    pub trigger_id: NodeId,
    pub config: NodeConfig,
    pub payload: Option<Payload>,
    pub context: ExecutionContext,
}

impl HandlerCall {
    /// The incoming payload rendered as text (`""` when absent)
    pub fn payload_text(&self) -> String {
        payload_to_text(self.payload.as_ref())
    }
}

/// Render a payload as text: strings verbatim, other values as JSON
pub fn payload_to_text(payload: Option<&Payload>) -> String {
    match payload {
        None | Some(Payload::Null) => String::new(),
        Some(Payload::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

type BoxedHandlerFuture = Pin<Box<dyn Future<Output = Result<Payload>> + Send>>;

/// Async callback-based handler
///
/// Wraps an async closure as a [`ModuleHandler`]. Used by hosts that
/// define modules outside Rust and by tests.
pub struct CallbackHandler {
    callback: Box<dyn Fn(HandlerCall) -> BoxedHandlerFuture + Send + Sync>,
}

impl CallbackHandler {
    pub fn new<F, Fut>(callback: F) -> Self
    where
        F: Fn(HandlerCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Payload>> + Send + 'static,
    {
        Self {
            callback: Box::new(move |call| Box::pin(callback(call))),
        }
    }
}

#[async_trait]
impl ModuleHandler for CallbackHandler {
    async fn execute(
        &self,
        node: &NodeInvocation<'_>,
        payload: Option<Payload>,
        context: &ExecutionContext,
    ) -> Result<Payload> {
        (self.callback)(HandlerCall {
            node_id: node.node_id.to_string(),
            trigger_id: node.trigger_id.to_string(),
            config: node.config.clone(),
            payload,
            context: context.clone(),
        })
        .await
    }
}

/// Handler that forwards its payload unchanged
pub struct PassThroughHandler;

#[async_trait]
impl ModuleHandler for PassThroughHandler {
    async fn execute(
        &self,
        _node: &NodeInvocation<'_>,
        payload: Option<Payload>,
        _context: &ExecutionContext,
    ) -> Result<Payload> {
        Ok(payload.unwrap_or(Payload::Null))
    }
}

/// Serializable description of a module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDescriptor {
    /// Unique module id (e.g., "format-text")
    pub id: String,
    /// Capability class
    pub type_class: TypeClass,
    /// Human-readable label
    #[serde(default)]
    pub label: String,
    /// Description of what the module does
    #[serde(default)]
    pub description: String,
    /// Ordered input port names
    #[serde(default)]
    pub input_ports: Vec<PortId>,
    /// Ordered output port names
    #[serde(default)]
    pub output_ports: Vec<PortId>,
    /// Config copied into new nodes
    #[serde(default)]
    pub default_config: NodeConfig,
}

impl ModuleDescriptor {
    pub fn new(id: impl Into<String>, type_class: TypeClass) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            type_class,
            description: String::new(),
            input_ports: Vec::new(),
            output_ports: Vec::new(),
            default_config: NodeConfig::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_inputs<I, S>(mut self, ports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.input_ports = ports.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_outputs<I, S>(mut self, ports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_ports = ports.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_default(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_config.insert(key.into(), value.into());
        self
    }

    /// Whether the module declares `port` in the given direction
    pub fn has_port(&self, port: &str, direction: PortDirection) -> bool {
        self.ports(direction).iter().any(|p| p == port)
    }

    /// Ports in the given direction, in declaration order
    pub fn ports(&self, direction: PortDirection) -> &[PortId] {
        match direction {
            PortDirection::Input => &self.input_ports,
            PortDirection::Output => &self.output_ports,
        }
    }

    /// Trim names, drop duplicate ports and check the class rules
    fn normalize(mut self) -> std::result::Result<Self, ValidationError> {
        self.id = self.id.trim().to_string();
        if self.id.is_empty() {
            return Err(ValidationError::MissingModuleId);
        }
        if self.label.trim().is_empty() {
            self.label = self.id.clone();
        }

        self.input_ports = normalize_ports(&self.id, self.input_ports)?;
        self.output_ports = normalize_ports(&self.id, self.output_ports)?;

        if !self.type_class.allows_inputs() && !self.input_ports.is_empty() {
            return Err(ValidationError::IllegalPortCardinality {
                module_id: self.id,
                class: self.type_class,
                direction: "input",
            });
        }
        if !self.type_class.allows_outputs() && !self.output_ports.is_empty() {
            return Err(ValidationError::IllegalPortCardinality {
                module_id: self.id,
                class: self.type_class,
                direction: "output",
            });
        }
        Ok(self)
    }
}

fn normalize_ports(
    module_id: &str,
    ports: Vec<PortId>,
) -> std::result::Result<Vec<PortId>, ValidationError> {
    let mut normalized: Vec<PortId> = Vec::with_capacity(ports.len());
    for port in ports {
        let port = port.trim().to_string();
        if port.is_empty() {
            return Err(ValidationError::EmptyPortName {
                module_id: module_id.to_string(),
            });
        }
        if !normalized.contains(&port) {
            normalized.push(port);
        }
    }
    Ok(normalized)
}

/// A module descriptor paired with its handler
#[derive(Clone)]
pub struct ModuleDefinition {
    pub descriptor: ModuleDescriptor,
    pub handler: Arc<dyn ModuleHandler>,
}

impl ModuleDefinition {
    pub fn new(descriptor: ModuleDescriptor, handler: Arc<dyn ModuleHandler>) -> Self {
        Self {
            descriptor,
            handler,
        }
    }

    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    pub fn type_class(&self) -> TypeClass {
        self.descriptor.type_class
    }
}

impl std::fmt::Debug for ModuleDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleDefinition")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// Link-time registration of a built-in module
///
/// ```ignore
/// inventory::submit!(automation_engine::BuiltinModule(delay_module));
/// ```
pub struct BuiltinModule(pub fn() -> ModuleDefinition);

inventory::collect!(BuiltinModule);

/// Catalog of module definitions
///
/// Definitions are kept in registration order; re-registering an id
/// replaces the previous definition in place.
#[derive(Clone, Default)]
pub struct ModuleRegistry {
    entries: IndexMap<String, ModuleDefinition>,
}

impl ModuleRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Create a registry seeded with an ordered list of definitions
    pub fn from_definitions(
        definitions: impl IntoIterator<Item = ModuleDefinition>,
    ) -> std::result::Result<Self, ValidationError> {
        let mut registry = Self::new();
        for definition in definitions {
            registry.register(definition)?;
        }
        Ok(registry)
    }

    /// Create a registry with every module submitted via [`BuiltinModule`]
    ///
    /// Link order is unspecified, so built-ins are sorted by class and id.
    pub fn with_builtins() -> Self {
        let mut definitions: Vec<ModuleDefinition> = inventory::iter::<BuiltinModule>
            .into_iter()
            .map(|builtin| (builtin.0)())
            .collect();
        definitions.sort_by(|a, b| {
            (a.type_class(), a.id()).cmp(&(b.type_class(), b.id()))
        });

        let mut registry = Self::new();
        for definition in definitions {
            let id = definition.id().to_string();
            if let Err(e) = registry.register(definition) {
                log::warn!("Skipping invalid built-in module '{}': {}", id, e);
            }
        }
        registry
    }

    /// Normalize and store a definition
    pub fn register(
        &mut self,
        definition: ModuleDefinition,
    ) -> std::result::Result<(), ValidationError> {
        let descriptor = definition.descriptor.normalize()?;
        log::debug!(
            "Registering module '{}' ({}, {} in / {} out)",
            descriptor.id,
            descriptor.type_class,
            descriptor.input_ports.len(),
            descriptor.output_ports.len()
        );
        self.entries.insert(
            descriptor.id.clone(),
            ModuleDefinition {
                descriptor,
                handler: definition.handler,
            },
        );
        Ok(())
    }

    /// Register a module backed by an async closure
    pub fn register_fn<F, Fut>(
        &mut self,
        descriptor: ModuleDescriptor,
        callback: F,
    ) -> std::result::Result<(), ValidationError>
    where
        F: Fn(HandlerCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Payload>> + Send + 'static,
    {
        self.register(ModuleDefinition::new(
            descriptor,
            Arc::new(CallbackHandler::new(callback)),
        ))
    }

    /// Get a definition by id
    pub fn get(&self, id: &str) -> Option<&ModuleDefinition> {
        self.entries.get(id)
    }

    /// Get a descriptor by id
    pub fn descriptor(&self, id: &str) -> Option<&ModuleDescriptor> {
        self.entries.get(id).map(|e| &e.descriptor)
    }

    /// Check if a module id is registered
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// All definitions in registration order
    pub fn definitions(&self) -> impl Iterator<Item = &ModuleDefinition> {
        self.entries.values()
    }

    /// Descriptors of one capability class, in registration order
    pub fn by_class(&self, class: TypeClass) -> Vec<&ModuleDescriptor> {
        self.entries
            .values()
            .map(|e| &e.descriptor)
            .filter(|d| d.type_class == class)
            .collect()
    }

    /// Number of registered modules
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge another registry into this one
    ///
    /// Entries from `other` override entries in `self` with the same id.
    pub fn merge(&mut self, other: ModuleRegistry) {
        self.entries.extend(other.entries);
    }
}
