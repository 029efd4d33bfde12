//! HTTP Fetch
//!
//! Fetches a URL through the host and emits the response body.

use std::sync::Arc;

use async_trait::async_trait;
use automation_engine::{
    payload_to_text, ExecutionContext, ModuleDefinition, ModuleDescriptor, ModuleHandler,
    NodeInvocation, Payload, Result, TypeClass,
};

use crate::template::fill_payload;

/// HTTP Fetch
///
/// # Config
/// - `url` - target URL; `{payload}` is replaced by the payload text. An
///   empty URL fetches the payload text itself.
///
/// Without an HTTP hook the payload passes through unchanged.
pub struct HttpFetch;

impl HttpFetch {
    pub const ID: &'static str = "http-fetch";

    pub fn definition() -> ModuleDefinition {
        ModuleDefinition::new(
            ModuleDescriptor::new(Self::ID, TypeClass::Processor)
                .with_label("HTTP Fetch")
                .with_description("Downloads a URL and outputs the body")
                .with_inputs(["in"])
                .with_outputs(["out"])
                .with_default("url", ""),
            Arc::new(Self),
        )
    }
}

inventory::submit!(automation_engine::BuiltinModule(HttpFetch::definition));

#[async_trait]
impl ModuleHandler for HttpFetch {
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

        log::debug!("HttpFetch {}: GET {}", node.node_id, url);
        match node.hooks.http_get(&url).await {
            Some(body) => Ok(Payload::String(body?)),
            None => Ok(payload.unwrap_or(Payload::Null)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Harness;
    use automation_engine::{HookCall, RecordingHooks};
    use serde_json::json;

    #[tokio::test]
    async fn test_fetches_templated_url() {
        let hooks = Arc::new(RecordingHooks::new().with_http_response("body"));
        let harness = Harness::new()
            .with("url", "https://example.com/search?q={payload}")
            .with_hooks(hooks.clone());

        let out = harness
            .run(HttpFetch::definition(), Some(json!("rust")))
            .await
            .unwrap();
        assert_eq!(out, json!("body"));
        assert_eq!(
            hooks.calls(),
            vec![HookCall::HttpGet("https://example.com/search?q=rust".to_string())]
        );
    }

    #[tokio::test]
    async fn test_empty_url_uses_payload() {
        let hooks = Arc::new(RecordingHooks::new().with_http_response("ok"));
        let harness = Harness::new().with_hooks(hooks.clone());
        harness
            .run(HttpFetch::definition(), Some(json!(" https://example.org \n")))
            .await
            .unwrap();
        assert_eq!(
            hooks.calls(),
            vec![HookCall::HttpGet("https://example.org".to_string())]
        );
    }

    #[tokio::test]
    async fn test_passes_through_without_hook() {
        let out = Harness::new()
            .with("url", "https://example.com")
            .run(HttpFetch::definition(), Some(json!(42)))
            .await
            .unwrap();
        assert_eq!(out, json!(42));
    }
}
