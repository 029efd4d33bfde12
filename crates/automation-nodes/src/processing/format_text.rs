//! Format Text
//!
//! Renders a template with the incoming payload and context fields.

use std::sync::Arc;

use async_trait::async_trait;
use automation_engine::{
    payload_to_text, ExecutionContext, ModuleDefinition, ModuleDescriptor, ModuleHandler,
    NodeInvocation, Payload, Result, TypeClass,
};

use crate::template::{fill_context_fields, fill_payload, PAYLOAD_PLACEHOLDER};

/// Format Text
///
/// # Config
/// - `template` - text with `{payload}` and `{{context.key}}` placeholders
///
/// Context fields are substituted first, so a context value containing
/// `{payload}` is filled as well.
pub struct FormatText;

impl FormatText {
    pub const ID: &'static str = "format-text";

    pub fn definition() -> ModuleDefinition {
        ModuleDefinition::new(
            ModuleDescriptor::new(Self::ID, TypeClass::Processor)
                .with_label("Format Text")
                .with_description("Builds text from a template")
                .with_inputs(["in"])
                .with_outputs(["out"])
                .with_default("template", PAYLOAD_PLACEHOLDER),
            Arc::new(Self),
        )
    }
}

inventory::submit!(automation_engine::BuiltinModule(FormatText::definition));

#[async_trait]
impl ModuleHandler for FormatText {
    async fn execute(
        &self,
        node: &NodeInvocation<'_>,
        payload: Option<Payload>,
        context: &ExecutionContext,
    ) -> Result<Payload> {
        let template = node.config_or("template", PAYLOAD_PLACEHOLDER);
        let text = payload_to_text(payload.as_ref());
        let with_fields = fill_context_fields(template, context).await;
        Ok(Payload::String(fill_payload(&with_fields, &text)))
    }
}
