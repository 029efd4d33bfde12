//! Render Panel
//!
//! Hands the payload to the host's result panel.

use std::sync::Arc;

use async_trait::async_trait;
use automation_engine::{
    ExecutionContext, ModuleDefinition, ModuleDescriptor, ModuleHandler, NodeInvocation, Payload,
    Result, TypeClass,
};

pub struct RenderPanel;

impl RenderPanel {
    pub const ID: &'static str = "render-panel";

    pub fn definition() -> ModuleDefinition {
        ModuleDefinition::new(
            ModuleDescriptor::new(Self::ID, TypeClass::Output)
                .with_label("Show Result")
                .with_description("Displays the payload in a panel")
                .with_inputs(["in"]),
            Arc::new(Self),
        )
    }
}

inventory::submit!(automation_engine::BuiltinModule(RenderPanel::definition));

#[async_trait]
impl ModuleHandler for RenderPanel {
    async fn execute(
        &self,
        node: &NodeInvocation<'_>,
        payload: Option<Payload>,
        _context: &ExecutionContext,
    ) -> Result<Payload> {
        let payload = payload.unwrap_or(Payload::Null);
        if let Some(result) = node.hooks.render_panel(&payload) {
            result?;
        }
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Harness;
    use automation_engine::{HookCall, RecordingHooks};
    use serde_json::json;

    #[tokio::test]
    async fn test_renders_structured_payload() {
        let hooks = Arc::new(RecordingHooks::new());
        let harness = Harness::new().with_hooks(hooks.clone());
        let payload = json!({"rows": [1, 2]});
        harness
            .run(RenderPanel::definition(), Some(payload.clone()))
            .await
            .unwrap();
        assert_eq!(hooks.calls(), vec![HookCall::RenderPanel(payload)]);
    }
}
