//! Regex Replace
//!
//! Substitutes every match of a pattern in the payload text.

use std::sync::Arc;

use async_trait::async_trait;
use automation_engine::{
    payload_to_text, ExecutionContext, ModuleDefinition, ModuleDescriptor, ModuleHandler,
    NodeInvocation, Payload, Result, TypeClass,
};
use regex::Regex;

/// Regex Replace
///
/// # Config
/// - `pattern` - regular expression (`regex` crate syntax)
/// - `replacement` - replacement text; `$1` / `${name}` refer to groups
///
/// An invalid pattern leaves the payload untouched.
pub struct RegexReplace;

impl RegexReplace {
    pub const ID: &'static str = "regex-replace";

    pub fn definition() -> ModuleDefinition {
        ModuleDefinition::new(
            ModuleDescriptor::new(Self::ID, TypeClass::Processor)
                .with_label("Regex Replace")
                .with_description("Replaces every match of a pattern")
                .with_inputs(["in"])
                .with_outputs(["out"])
                .with_default("pattern", "")
                .with_default("replacement", ""),
            Arc::new(Self),
        )
    }
}

inventory::submit!(automation_engine::BuiltinModule(RegexReplace::definition));

#[async_trait]
impl ModuleHandler for RegexReplace {
    async fn execute(
        &self,
        node: &NodeInvocation<'_>,
        payload: Option<Payload>,
        _context: &ExecutionContext,
    ) -> Result<Payload> {
        let payload = payload.unwrap_or(Payload::Null);
        let pattern = node.config_or("pattern", "");
        if pattern.is_empty() {
            return Ok(payload);
        }

        let regex = match Regex::new(pattern) {
            Ok(regex) => regex,
            Err(e) => {
                log::warn!(
                    "RegexReplace {}: invalid pattern '{}': {}",
                    node.node_id,
                    pattern,
                    e
                );
                return Ok(payload);
            }
        };

        let text = payload_to_text(Some(&payload));
        let replaced = regex.replace_all(&text, node.config_or("replacement", ""));
        Ok(Payload::String(replaced.into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Harness;
    use serde_json::json;

    #[tokio::test]
    async fn test_replaces_all_matches() {
        let harness = Harness::new()
            .with("pattern", r"(\d+)")
            .with("replacement", "<$1>");
        let out = harness
            .run(RegexReplace::definition(), Some(json!("a1 b22 c333")))
            .await
            .unwrap();
        assert_eq!(out, json!("a<1> b<22> c<333>"));
    }

    #[tokio::test]
    async fn test_bad_pattern_returns_original() {
        let harness = Harness::new().with("pattern", "(unclosed");
        let out = harness
            .run(RegexReplace::definition(), Some(json!({"keep": true})))
            .await
            .unwrap();
        assert_eq!(out, json!({"keep": true}));
    }
}
