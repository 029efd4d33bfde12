//! JSON Extract
//!
//! Extracts a value from structured payloads using path expressions.
//! Supports simple dot notation and array indexing.

use std::sync::Arc;

use async_trait::async_trait;
use automation_engine::{
    ExecutionContext, ModuleDefinition, ModuleDescriptor, ModuleHandler, NodeInvocation, Payload,
    Result, TypeClass,
};
use serde_json::Value;

/// JSON Extract
///
/// String payloads holding JSON text are parsed first. When the path does
/// not resolve the original payload is returned.
///
/// # Path Syntax Examples
/// - `"name"` - Get the "name" field
/// - `"data.items"` - Get nested field
/// - `"[0]"` - Get first array element
/// - `"items[0].name"` - Combined access
pub struct JsonExtract;

impl JsonExtract {
    pub const ID: &'static str = "json-extract";

    pub fn definition() -> ModuleDefinition {
        ModuleDefinition::new(
            ModuleDescriptor::new(Self::ID, TypeClass::Processor)
                .with_label("JSON Extract")
                .with_description("Extracts a field from JSON data")
                .with_inputs(["in"])
                .with_outputs(["out"])
                .with_default("path", ""),
            Arc::new(Self),
        )
    }

    /// Walk `path` through `json`
    pub fn extract_path<'a>(json: &'a Value, path: &str) -> Option<&'a Value> {
        let mut current = json;
        let mut remaining = path.trim();

        while !remaining.is_empty() {
            if let Some(rest) = remaining.strip_prefix('[') {
                let end = rest.find(']')?;
                let index = rest[..end].trim().parse::<usize>().ok()?;
                current = current.get(index)?;
                remaining = &rest[end + 1..];
                remaining = remaining.strip_prefix('.').unwrap_or(remaining);
                continue;
            }

            let split = remaining.find(['.', '[']).unwrap_or(remaining.len());
            let field = &remaining[..split];
            remaining = &remaining[split..];
            remaining = remaining.strip_prefix('.').unwrap_or(remaining);

            if !field.is_empty() {
                current = current.get(field)?;
            }
        }

        Some(current)
    }
}

inventory::submit!(automation_engine::BuiltinModule(JsonExtract::definition));

#[async_trait]
impl ModuleHandler for JsonExtract {
    async fn execute(
        &self,
        node: &NodeInvocation<'_>,
        payload: Option<Payload>,
        _context: &ExecutionContext,
    ) -> Result<Payload> {
        let payload = payload.unwrap_or(Payload::Null);
        let parsed = match &payload {
            Payload::String(text) => serde_json::from_str::<Value>(text).ok(),
            _ => None,
        };
        let document = parsed.as_ref().unwrap_or(&payload);
        let path = node.config_or("path", "");

        match Self::extract_path(document, path) {
            Some(value) => Ok(value.clone()),
            None => {
                log::debug!(
                    "JsonExtract {}: path '{}' not found, keeping payload",
                    node.node_id,
                    path
                );
                Ok(payload)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Harness;
    use serde_json::json;

    #[test]
    fn test_extract_path() {
        let doc = json!({"data": {"items": [{"name": "a"}, {"name": "b"}]}, "list": [[1, 2]]});
        assert_eq!(JsonExtract::extract_path(&doc, "data.items[1].name"), Some(&json!("b")));
        assert_eq!(JsonExtract::extract_path(&doc, "list[0][1]"), Some(&json!(2)));
        assert_eq!(JsonExtract::extract_path(&doc, ""), Some(&doc));
        assert_eq!(JsonExtract::extract_path(&doc, "data.missing"), None);
        assert_eq!(JsonExtract::extract_path(&doc, "list[x]"), None);
        assert_eq!(JsonExtract::extract_path(&json!([{"v": 1}]), "[0].v"), Some(&json!(1)));
    }

    #[tokio::test]
    async fn test_parses_json_text() {
        let harness = Harness::new().with("path", "user.id");
        let out = harness
            .run(JsonExtract::definition(), Some(json!(r#"{"user": {"id": 7}}"#)))
            .await
            .unwrap();
        assert_eq!(out, json!(7));
    }

    #[tokio::test]
    async fn test_not_found_returns_original() {
        let harness = Harness::new().with("path", "nope");
        let out = harness
            .run(JsonExtract::definition(), Some(json!("plain text")))
            .await
            .unwrap();
        assert_eq!(out, json!("plain text"));
    }
}
