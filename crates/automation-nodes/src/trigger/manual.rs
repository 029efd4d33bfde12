//! Manual Trigger
//!
//! Seeds a run with editor-provided test input, falling back to the text
//! configured on the node.

use std::sync::Arc;

use async_trait::async_trait;
use automation_engine::{
    ContextKeys, ExecutionContext, ModuleDefinition, ModuleDescriptor, ModuleHandler,
    NodeInvocation, Payload, Result, TypeClass,
};

/// Manual Trigger
///
/// # Config
/// - `text` - payload used when the context carries no `testInput`
pub struct ManualTrigger;

impl ManualTrigger {
    pub const ID: &'static str = "manual-trigger";
    /// Port ID for the seeded payload
    pub const PORT_OUT: &'static str = "out";

    pub fn definition() -> ModuleDefinition {
        ModuleDefinition::new(
            ModuleDescriptor::new(Self::ID, TypeClass::Trigger)
                .with_label("Manual Trigger")
                .with_description("Starts a run with test input or fixed text")
                .with_outputs([Self::PORT_OUT])
                .with_default("text", ""),
            Arc::new(Self),
        )
    }
}

inventory::submit!(automation_engine::BuiltinModule(ManualTrigger::definition));

#[async_trait]
impl ModuleHandler for ManualTrigger {
    async fn execute(
        &self,
        node: &NodeInvocation<'_>,
        _payload: Option<Payload>,
        context: &ExecutionContext,
    ) -> Result<Payload> {
        if let Some(input) = context.get_value(ContextKeys::TEST_INPUT).await {
            log::debug!("ManualTrigger {}: seeding from test input", node.node_id);
            return Ok(input);
        }
        Ok(Payload::String(node.config_or("text", "").to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Harness;
    use serde_json::json;

    #[tokio::test]
    async fn test_test_input_wins() {
        let harness = Harness::new().with("text", "configured");
        harness
            .context
            .set(ContextKeys::TEST_INPUT, json!({"a": 1}))
            .await;

        let out = harness.run(ManualTrigger::definition(), None).await.unwrap();
        assert_eq!(out, json!({"a": 1}));
    }

    #[tokio::test]
    async fn test_falls_back_to_config_text() {
        let harness = Harness::new().with("text", "configured");
        let out = harness.run(ManualTrigger::definition(), None).await.unwrap();
        assert_eq!(out, json!("configured"));

        let out = Harness::new().run(ManualTrigger::definition(), None).await.unwrap();
        assert_eq!(out, json!(""));
    }
}
