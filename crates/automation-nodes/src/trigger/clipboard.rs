//! Clipboard Trigger
//!
//! Seeds a run with the current clipboard text.

use std::sync::Arc;

use async_trait::async_trait;
use automation_engine::{
    ExecutionContext, ModuleDefinition, ModuleDescriptor, ModuleHandler, NodeInvocation, Payload,
    Result, TypeClass,
};

/// Clipboard Trigger
///
/// Reads the clipboard through the host. When the host has no clipboard
/// the configured `fallback` text is used instead; a clipboard read that
/// fails is an error, so the trigger's branch does not run.
pub struct ClipboardTrigger;

impl ClipboardTrigger {
    pub const ID: &'static str = "clipboard-trigger";

    pub fn definition() -> ModuleDefinition {
        ModuleDefinition::new(
            ModuleDescriptor::new(Self::ID, TypeClass::Trigger)
                .with_label("Clipboard")
                .with_description("Starts a run with the clipboard contents")
                .with_outputs(["out"])
                .with_default("fallback", ""),
            Arc::new(Self),
        )
    }
}

inventory::submit!(automation_engine::BuiltinModule(ClipboardTrigger::definition));

#[async_trait]
impl ModuleHandler for ClipboardTrigger {
    async fn execute(
        &self,
        node: &NodeInvocation<'_>,
        _payload: Option<Payload>,
        _context: &ExecutionContext,
    ) -> Result<Payload> {
        match node.hooks.clipboard_read().await {
            Some(text) => Ok(Payload::String(text?)),
            None => {
                log::debug!(
                    "ClipboardTrigger {}: no clipboard hook, using fallback",
                    node.node_id
                );
                Ok(Payload::String(node.config_or("fallback", "").to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Harness;
    use automation_engine::RecordingHooks;
    use serde_json::json;

    #[tokio::test]
    async fn test_reads_clipboard() {
        let harness = Harness::new()
            .with("fallback", "unused")
            .with_hooks(Arc::new(RecordingHooks::new().with_clipboard("copied")));
        let out = harness.run(ClipboardTrigger::definition(), None).await.unwrap();
        assert_eq!(out, json!("copied"));
    }

    #[tokio::test]
    async fn test_fallback_without_hook() {
        let harness = Harness::new().with("fallback", "nothing copied");
        let out = harness.run(ClipboardTrigger::definition(), None).await.unwrap();
        assert_eq!(out, json!("nothing copied"));
    }
}
