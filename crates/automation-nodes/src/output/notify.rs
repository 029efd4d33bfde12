//! Notify
//!
//! Shows the payload as a host notification.

use std::sync::Arc;

use async_trait::async_trait;
use automation_engine::{
    payload_to_text, ExecutionContext, ModuleDefinition, ModuleDescriptor, ModuleHandler,
    NodeInvocation, Payload, Result, TypeClass,
};

const DEFAULT_TITLE: &str = "Automation";

pub struct Notify;

impl Notify {
    pub const ID: &'static str = "notify";

    pub fn definition() -> ModuleDefinition {
        ModuleDefinition::new(
            ModuleDescriptor::new(Self::ID, TypeClass::Output)
                .with_label("Notify")
                .with_description("Shows the payload as a notification")
                .with_inputs(["in"])
                .with_default("title", DEFAULT_TITLE),
            Arc::new(Self),
        )
    }
}

inventory::submit!(automation_engine::BuiltinModule(Notify::definition));

#[async_trait]
impl ModuleHandler for Notify {
    async fn execute(
        &self,
        node: &NodeInvocation<'_>,
        payload: Option<Payload>,
        _context: &ExecutionContext,
    ) -> Result<Payload> {
        let title = match node.config_or("title", "").trim() {
            "" => DEFAULT_TITLE,
            title => title,
        };
        if let Some(result) = node.hooks.notify(title, &payload_to_text(payload.as_ref())) {
            result?;
        }
        Ok(payload.unwrap_or(Payload::Null))
    }
}
