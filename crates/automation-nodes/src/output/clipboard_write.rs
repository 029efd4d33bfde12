//! Clipboard Write
//!
//! Copies the payload text to the clipboard.

use std::sync::Arc;

use async_trait::async_trait;
use automation_engine::{
    payload_to_text, ExecutionContext, ModuleDefinition, ModuleDescriptor, ModuleHandler,
    NodeInvocation, Payload, Result, TypeClass,
};

pub struct ClipboardWrite;

impl ClipboardWrite {
    pub const ID: &'static str = "clipboard-write";

    pub fn definition() -> ModuleDefinition {
        ModuleDefinition::new(
            ModuleDescriptor::new(Self::ID, TypeClass::Output)
                .with_label("Copy to Clipboard")
                .with_description("Copies the payload to the clipboard")
                .with_inputs(["in"]),
            Arc::new(Self),
        )
    }
}

inventory::submit!(automation_engine::BuiltinModule(ClipboardWrite::definition));

#[async_trait]
impl ModuleHandler for ClipboardWrite {
    async fn execute(
        &self,
        node: &NodeInvocation<'_>,
        payload: Option<Payload>,
        _context: &ExecutionContext,
    ) -> Result<Payload> {
        let text = payload_to_text(payload.as_ref());
        match node.hooks.clipboard_write(&text).await {
            Some(result) => result?,
            None => log::debug!("ClipboardWrite {}: no clipboard hook", node.node_id),
        }
        Ok(payload.unwrap_or(Payload::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Harness;
    use automation_engine::RecordingHooks;
    use serde_json::json;

    #[tokio::test]
    async fn test_writes_payload_text() {
        let hooks = Arc::new(RecordingHooks::new());
        let harness = Harness::new().with_hooks(hooks.clone());
        harness
            .run(ClipboardWrite::definition(), Some(json!({"n": 1})))
            .await
            .unwrap();
        assert_eq!(hooks.clipboard().as_deref(), Some(r#"{"n":1}"#));
    }
}
