//! Host capability hooks
//!
//! Node handlers reach the outside world (clipboard, network, processes,
//! notification surfaces) only through [`CapabilityHooks`], which the host
//! injects into the engine. Every hook is optional: the default
//! implementation returns `None`, and handlers treat `None` as "degrade to
//! pass-through".

use std::sync::Mutex;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::Payload;

/// Output of an external command
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandOutput {
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    #[serde(default)]
    pub exit_code: Option<i32>,
}

/// Capabilities a host grants to node handlers
///
/// Methods return `None` when the host does not provide the capability,
/// and `Some(Err(..))` when it does but the call failed.
#[async_trait]
pub trait CapabilityHooks: Send + Sync {
    async fn clipboard_read(&self) -> Option<Result<String>> {
        None
    }

    async fn clipboard_write(&self, _text: &str) -> Option<Result<()>> {
        None
    }

    async fn http_get(&self, _url: &str) -> Option<Result<String>> {
        None
    }

    async fn run_external_command(
        &self,
        _cmd: &str,
        _args: &[String],
    ) -> Option<Result<CommandOutput>> {
        None
    }

    fn open_external_resource(&self, _url: &str) -> Option<Result<()>> {
        None
    }

    fn notify(&self, _title: &str, _body: &str) -> Option<Result<()>> {
        None
    }

    fn render_panel(&self, _payload: &Payload) -> Option<Result<()>> {
        None
    }
}

/// Host that provides no capabilities
pub struct NoHooks;

impl CapabilityHooks for NoHooks {}

/// Calls observed by [`RecordingHooks`]
#[derive(Debug, Clone, PartialEq)]
pub enum HookCall {
    ClipboardWrite(String),
    HttpGet(String),
    RunCommand { cmd: String, args: Vec<String> },
    Open(String),
    Notify { title: String, body: String },
    RenderPanel(Payload),
}

/// In-memory hooks that record every call
///
/// Useful for testing and for headless hosts. The clipboard is a plain
/// string buffer; `http_get` and `run_external_command` answer from canned
/// responses when set and are otherwise unavailable.
#[derive(Default)]
pub struct RecordingHooks {
    clipboard: Mutex<Option<String>>,
    http_response: Option<String>,
    command_stdout: Option<String>,
    calls: Mutex<Vec<HookCall>>,
}

impl RecordingHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the clipboard buffer
    pub fn with_clipboard(self, text: impl Into<String>) -> Self {
        *lock(&self.clipboard) = Some(text.into());
        self
    }

    /// Answer every `http_get` with this body
    pub fn with_http_response(mut self, body: impl Into<String>) -> Self {
        self.http_response = Some(body.into());
        self
    }

    /// Answer every `run_external_command` with this stdout
    pub fn with_command_stdout(mut self, stdout: impl Into<String>) -> Self {
        self.command_stdout = Some(stdout.into());
        self
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<HookCall> {
        lock(&self.calls).clone()
    }

    /// Current clipboard contents
    pub fn clipboard(&self) -> Option<String> {
        lock(&self.clipboard).clone()
    }

    fn record(&self, call: HookCall) {
        lock(&self.calls).push(call);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl CapabilityHooks for RecordingHooks {
    async fn clipboard_read(&self) -> Option<Result<String>> {
        lock(&self.clipboard).clone().map(Ok)
    }

    async fn clipboard_write(&self, text: &str) -> Option<Result<()>> {
        *lock(&self.clipboard) = Some(text.to_string());
        self.record(HookCall::ClipboardWrite(text.to_string()));
        Some(Ok(()))
    }

    async fn http_get(&self, url: &str) -> Option<Result<String>> {
        let body = self.http_response.clone()?;
        self.record(HookCall::HttpGet(url.to_string()));
        Some(Ok(body))
    }

    async fn run_external_command(
        &self,
        cmd: &str,
        args: &[String],
    ) -> Option<Result<CommandOutput>> {
        let stdout = self.command_stdout.clone()?;
        self.record(HookCall::RunCommand {
            cmd: cmd.to_string(),
            args: args.to_vec(),
        });
        Some(Ok(CommandOutput {
            stdout,
            stderr: String::new(),
            exit_code: Some(0),
        }))
    }

    fn open_external_resource(&self, url: &str) -> Option<Result<()>> {
        self.record(HookCall::Open(url.to_string()));
        Some(Ok(()))
    }

    fn notify(&self, title: &str, body: &str) -> Option<Result<()>> {
        self.record(HookCall::Notify {
            title: title.to_string(),
            body: body.to_string(),
        });
        Some(Ok(()))
    }

    fn render_panel(&self, payload: &Payload) -> Option<Result<()>> {
        self.record(HookCall::RenderPanel(payload.clone()));
        Some(Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_hooks_are_unavailable() {
        let hooks = NoHooks;
        assert!(hooks.clipboard_read().await.is_none());
        assert!(hooks.http_get("https://example.com").await.is_none());
        assert!(hooks.notify("t", "b").is_none());
        assert!(hooks.render_panel(&serde_json::json!(1)).is_none());
    }

    #[tokio::test]
    async fn test_recording_hooks_clipboard_roundtrip() {
        let hooks = RecordingHooks::new().with_clipboard("seed");
        assert_eq!(hooks.clipboard_read().await.unwrap().unwrap(), "seed");

        hooks.clipboard_write("next").await.unwrap().unwrap();
        assert_eq!(hooks.clipboard().as_deref(), Some("next"));
        assert_eq!(hooks.calls(), vec![HookCall::ClipboardWrite("next".to_string())]);
    }

    #[tokio::test]
    async fn test_recording_hooks_without_canned_http() {
        let hooks = RecordingHooks::new();
        assert!(hooks.http_get("https://example.com").await.is_none());
        assert!(hooks.calls().is_empty());
    }
}
