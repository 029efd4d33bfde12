//! Open URL
//!
//! Opens a URL or path with the host's default handler.

use std::sync::Arc;

use async_trait::async_trait;
use automation_engine::{
    payload_to_text, ExecutionContext, ModuleDefinition, ModuleDescriptor, ModuleHandler,
    NodeInvocation, Payload, Result, TypeClass,
};

use crate::template::fill_payload;

/// Open URL
///
/// # Config
/// - `url` - target; `{payload}` is replaced by the payload text. An empty
///   URL opens the payload text itself.
pub struct OpenUrl;

impl OpenUrl {
    pub const ID: &'static str = "open-url";

    pub fn definition() -> ModuleDefinition {
        ModuleDefinition::new(
            ModuleDescriptor::new(Self::ID, TypeClass::Output)
                .with_label("Open URL")
                .with_description("Opens a link in the default application")
                .with_inputs(["in"])
                .with_default("url", ""),
            Arc::new(Self),
        )
    }
}

inventory::submit!(automation_engine::BuiltinModule(OpenUrl::definition));

#[async_trait]
impl ModuleHandler for OpenUrl {
    async fn execute(
        &self,
        node: &NodeInvocation<'_>,
        payload: Option<Payload>,
        _context: &ExecutionContext,
    ) -> Result<Payload> {
        let text = payload_to_text(payload.as_ref());
        let url = match node.config_or("url", "").trim() {
            "" => text.trim().to_string(),
            template => fill_payload(template, &text),
        };
        if let Some(result) = node.hooks.open_external_resource(&url) {
            result?;
        }
        Ok(payload.unwrap_or(Payload::Null))
    }
}
