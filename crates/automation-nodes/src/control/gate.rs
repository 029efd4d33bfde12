//! Gate
//!
//! Evaluates an expression over the payload and context and records the
//! result. The gate does not alter topology; downstream nodes read the
//! recorded boolean.

use std::sync::Arc;

use async_trait::async_trait;
use automation_engine::constants::defaults;
use automation_engine::{
    is_truthy, ContextKeys, Diagnostic, DiagnosticKind, ExecutionContext, Expression,
    ExpressionError, ModuleDefinition, ModuleDescriptor, ModuleHandler, NodeInvocation, Payload,
    Result, TypeClass,
};

/// Gate
///
/// # Config
/// - `expression` - condition; empty tests the payload's truthiness
/// - `resultKey` - context key the boolean is also written to
///
/// # Outputs (to context)
/// - `{node_id}.meta.gate` - last result
/// - `{resultKey}` - last result
///
/// An expression that fails to parse or evaluate records `false` and a
/// diagnostic.
pub struct Gate;

impl Gate {
    pub const ID: &'static str = "gate";

    pub fn definition() -> ModuleDefinition {
        ModuleDefinition::new(
            ModuleDescriptor::new(Self::ID, TypeClass::Utility)
                .with_label("Gate")
                .with_description("Records whether a condition holds")
                .with_inputs(["in"])
                .with_outputs(["out"])
                .with_default("expression", "")
                .with_default("resultKey", defaults::GATE_RESULT_KEY),
            Arc::new(Self),
        )
    }

    async fn decide(
        source: &str,
        payload: &Payload,
        context: &ExecutionContext,
    ) -> std::result::Result<bool, ExpressionError> {
        if source.trim().is_empty() {
            return Ok(is_truthy(payload));
        }
        Expression::parse(source)?.test(payload, context).await
    }
}

inventory::submit!(automation_engine::BuiltinModule(Gate::definition));

#[async_trait]
impl ModuleHandler for Gate {
    async fn execute(
        &self,
        node: &NodeInvocation<'_>,
        payload: Option<Payload>,
        context: &ExecutionContext,
    ) -> Result<Payload> {
        let payload = payload.unwrap_or(Payload::Null);
        let source = node.config_or("expression", "");

        let passed = match Self::decide(source, &payload, context).await {
            Ok(passed) => passed,
            Err(e) => {
                log::warn!("Gate {}: '{}' failed: {}", node.node_id, source, e);
                context
                    .record_diagnostic(
                        Diagnostic::new(DiagnosticKind::NodeExecution, e.to_string())
                            .with_trigger(node.trigger_id)
                            .with_node(node.node_id, node.module_id),
                    )
                    .await;
                false
            }
        };

        context
            .set(&ContextKeys::meta(node.node_id, "gate"), passed)
            .await;
        let result_key = match node.config_or("resultKey", "").trim() {
            "" => defaults::GATE_RESULT_KEY,
            key => key,
        };
        context.set(result_key, passed).await;

        log::debug!("Gate {}: {}", node.node_id, passed);
        Ok(payload)
    }
}
