//! Shared execution context
//!
//! All nodes of one run see the same [`ExecutionContext`]. It is a thin
//! wrapper over graph-flow's key/value [`Context`] with typed helpers for
//! the well-known keys the engine and built-in handlers use.
//!
//! # Key Conventions
//!
//! - Node payloads: `{node_id}.output.payload`
//! - Node metadata: `{node_id}.meta.{field}`
//! - Branch results: `branches.{trigger_id}`
//! - Diagnostics: `diagnostics`

use graph_flow::Context;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::types::{NodeId, Payload};

/// Helper for building context keys
pub struct ContextKeys;

impl ContextKeys {
    /// Key holding the ordered diagnostics list
    pub const DIAGNOSTICS: &'static str = "diagnostics";
    /// Key holding editor-provided test input for triggers
    pub const TEST_INPUT: &'static str = "testInput";
    /// Key holding the current execution id
    pub const EXECUTION_ID: &'static str = "execution.id";

    /// Build an output key: `{node_id}.output.{port}`
    pub fn output(node_id: &str, port: &str) -> String {
        format!("{}.output.{}", node_id, port)
    }

    /// Build a metadata key: `{node_id}.meta.{field}`
    pub fn meta(node_id: &str, field: &str) -> String {
        format!("{}.meta.{}", node_id, field)
    }

    /// Build a branch key: `branches.{trigger_id}`
    pub fn branch(trigger_id: &str) -> String {
        format!("branches.{}", trigger_id)
    }
}

/// What kind of problem a diagnostic records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DiagnosticKind {
    /// A handler failed; its branch continued with the prior payload
    NodeExecution,
    /// A trigger was skipped because its subgraph failed validation
    Structural,
    /// The run was cancelled by the host
    Cancelled,
}

/// A problem recorded during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_id: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_id: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            trigger_id: None,
            node_id: None,
            module_id: None,
            message: message.into(),
        }
    }

    pub fn with_trigger(mut self, trigger_id: impl Into<String>) -> Self {
        self.trigger_id = Some(trigger_id.into());
        self
    }

    pub fn with_node(mut self, node_id: impl Into<String>, module_id: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self.module_id = Some(module_id.into());
        self
    }
}

/// Shared mutable state visible to all nodes within one run
#[derive(Clone)]
pub struct ExecutionContext {
    inner: Context,
}

impl ExecutionContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self {
            inner: Context::new(),
        }
    }

    /// Wrap an existing graph-flow context
    pub fn from_context(inner: Context) -> Self {
        Self { inner }
    }

    /// The underlying graph-flow context
    pub fn inner(&self) -> &Context {
        &self.inner
    }

    /// Set a value in the context
    pub async fn set<T: Serialize + Send + Sync>(&self, key: &str, value: T) {
        self.inner.set(key, value).await;
    }

    /// Get a value from the context
    pub async fn get<T: DeserializeOwned + Send + Sync>(&self, key: &str) -> Option<T> {
        self.inner.get(key).await
    }

    /// Get a raw JSON value from the context
    pub async fn get_value(&self, key: &str) -> Option<Payload> {
        self.inner.get::<Payload>(key).await
    }

    /// Append a value to the ordered collection stored under `key`
    ///
    /// A missing or non-array value is replaced by a new collection.
    pub async fn append(&self, key: &str, value: Payload) {
        let mut items: Vec<Payload> = self.get(key).await.unwrap_or_default();
        items.push(value);
        self.set(key, items).await;
    }

    /// Get the ordered collection stored under `key`
    pub async fn collection(&self, key: &str) -> Vec<Payload> {
        self.get(key).await.unwrap_or_default()
    }

    /// Record a diagnostic
    pub async fn record_diagnostic(&self, diagnostic: Diagnostic) {
        let mut all = self.diagnostics().await;
        all.push(diagnostic);
        self.set(ContextKeys::DIAGNOSTICS, all).await;
    }

    /// All diagnostics recorded so far, in order
    pub async fn diagnostics(&self) -> Vec<Diagnostic> {
        self.get(ContextKeys::DIAGNOSTICS).await.unwrap_or_default()
    }

    /// Record the payload a node produced
    pub async fn set_node_payload(&self, node_id: &str, payload: &Payload) {
        self.set(&ContextKeys::output(node_id, "payload"), payload.clone())
            .await;
    }

    /// The payload a node produced in this run
    pub async fn node_payload(&self, node_id: &str) -> Option<Payload> {
        self.get_value(&ContextKeys::output(node_id, "payload")).await
    }

    /// Record a terminal payload for a trigger's run
    pub async fn push_branch_payload(&self, trigger_id: &str, payload: Payload) {
        self.append(&ContextKeys::branch(trigger_id), payload).await;
    }

    /// Terminal payloads of a trigger's run, in traversal order
    pub async fn branch_payloads(&self, trigger_id: &str) -> Vec<Payload> {
        self.collection(&ContextKeys::branch(trigger_id)).await
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_keys() {
        assert_eq!(ContextKeys::output("n1", "payload"), "n1.output.payload");
        assert_eq!(ContextKeys::meta("n1", "gate"), "n1.meta.gate");
        assert_eq!(ContextKeys::branch("t1"), "branches.t1");
    }

    #[tokio::test]
    async fn test_append_preserves_order() {
        let ctx = ExecutionContext::new();
        ctx.append("merged", serde_json::json!("a")).await;
        ctx.append("merged", serde_json::json!("b")).await;

        assert_eq!(
            ctx.collection("merged").await,
            vec![serde_json::json!("a"), serde_json::json!("b")]
        );
    }

    #[tokio::test]
    async fn test_diagnostics_accumulate() {
        let ctx = ExecutionContext::new();
        assert!(ctx.diagnostics().await.is_empty());

        ctx.record_diagnostic(
            Diagnostic::new(DiagnosticKind::NodeExecution, "boom")
                .with_trigger("t1")
                .with_node("n1", "format-text"),
        )
        .await;

        let diagnostics = ctx.diagnostics().await;
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].node_id.as_deref(), Some("n1"));
        assert_eq!(diagnostics[0].kind, DiagnosticKind::NodeExecution);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let ctx = ExecutionContext::new();
        let other = ctx.clone();
        other.set_node_payload("n1", &serde_json::json!("x")).await;

        assert_eq!(ctx.node_payload("n1").await, Some(serde_json::json!("x")));
    }
}
