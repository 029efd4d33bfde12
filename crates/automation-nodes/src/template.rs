//! Placeholder substitution shared by the built-in modules

use std::collections::HashMap;
use std::sync::LazyLock;

use automation_engine::{payload_to_text, ExecutionContext};
use regex::{Captures, Regex};

/// Placeholder replaced by the incoming payload's text
pub const PAYLOAD_PLACEHOLDER: &str = "{payload}";

static CONTEXT_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([^{}\s]+)\s*\}\}").expect("context field pattern is valid")
});

/// Replace every `{payload}` in `template`
pub fn fill_payload(template: &str, payload: &str) -> String {
    template.replace(PAYLOAD_PLACEHOLDER, payload)
}

/// Split whitespace-separated arguments, filling `{payload}` in each
///
/// The payload is substituted after splitting, so a payload containing
/// spaces stays a single argument.
pub fn split_args(args: &str, payload: &str) -> Vec<String> {
    args.split_whitespace()
        .map(|arg| fill_payload(arg, payload))
        .collect()
}

/// Replace every `{{key}}` with the text of context key `key`
///
/// Missing keys render as the empty string.
pub async fn fill_context_fields(template: &str, context: &ExecutionContext) -> String {
    let keys: Vec<String> = CONTEXT_FIELD
        .captures_iter(template)
        .map(|caps| caps[1].to_string())
        .collect();
    if keys.is_empty() {
        return template.to_string();
    }

    let mut values: HashMap<String, String> = HashMap::new();
    for key in keys {
        if !values.contains_key(&key) {
            let value = context.get_value(&key).await;
            values.insert(key, payload_to_text(value.as_ref()));
        }
    }

    CONTEXT_FIELD
        .replace_all(template, |caps: &Captures| {
            values.get(&caps[1]).cloned().unwrap_or_default()
        })
        .into_owned()
}
