//! Run Command
//!
//! Runs an external program through the host and emits its stdout.

use std::sync::Arc;

use async_trait::async_trait;
use automation_engine::{
    payload_to_text, AutomationError, ExecutionContext, ModuleDefinition, ModuleDescriptor,
    ModuleHandler, NodeInvocation, Payload, Result, TypeClass,
};

use crate::template::split_args;

/// Run Command
///
/// # Config
/// - `command` - program to run (required)
/// - `args` - whitespace separated arguments; `{payload}` is replaced by
///   the payload text after splitting
///
/// Trailing newlines are trimmed from stdout. A non-zero exit status is an
/// error. Without a command hook the payload passes through unchanged.
pub struct RunCommand;

impl RunCommand {
    pub const ID: &'static str = "run-command";

    pub fn definition() -> ModuleDefinition {
        ModuleDefinition::new(
            ModuleDescriptor::new(Self::ID, TypeClass::Processor)
                .with_label("Run Command")
                .with_description("Runs a program and outputs what it prints")
                .with_inputs(["in"])
                .with_outputs(["out"])
                .with_default("command", "")
                .with_default("args", ""),
            Arc::new(Self),
        )
    }
}

inventory::submit!(automation_engine::BuiltinModule(RunCommand::definition));

#[async_trait]
impl ModuleHandler for RunCommand {
    async fn execute(
        &self,
        node: &NodeInvocation<'_>,
        payload: Option<Payload>,
        _context: &ExecutionContext,
    ) -> Result<Payload> {
        let command = node.config_or("command", "").trim();
        if command.is_empty() {
            return Err(AutomationError::failed("No command configured"));
        }

        let text = payload_to_text(payload.as_ref());
        let args = split_args(node.config_or("args", ""), &text);

        log::debug!(
            "RunCommand {}: {} {:?}",
            node.node_id,
            command,
            args
        );

        let output = match node.hooks.run_external_command(command, &args).await {
            Some(output) => output?,
            None => return Ok(payload.unwrap_or(Payload::Null)),
        };

        match output.exit_code {
            Some(0) | None => Ok(Payload::String(
                output.stdout.trim_end_matches(['\n', '\r']).to_string(),
            )),
            Some(code) => Err(AutomationError::failed(format!(
                "'{}' exited with code {}: {}",
                command,
                code,
                output.stderr.trim()
            ))),
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
    async fn test_runs_with_payload_argument() {
        let hooks = Arc::new(RecordingHooks::new().with_command_stdout("done\n\n"));
        let harness = Harness::new()
            .with("command", "echo")
            .with("args", "-n {payload}")
            .with_hooks(hooks.clone());

        let out = harness
            .run(RunCommand::definition(), Some(json!("hello world")))
            .await
            .unwrap();
        assert_eq!(out, json!("done"));
        assert_eq!(
            hooks.calls(),
            vec![HookCall::RunCommand {
                cmd: "echo".to_string(),
                args: vec!["-n".to_string(), "hello world".to_string()],
            }]
        );
    }

    #[tokio::test]
    async fn test_missing_command_is_an_error() {
        let result = Harness::new()
            .run(RunCommand::definition(), Some(json!("x")))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_passes_through_without_hook() {
        let out = Harness::new()
            .with("command", "ls")
            .run(RunCommand::definition(), Some(json!("x")))
            .await
            .unwrap();
        assert_eq!(out, json!("x"));
    }
}
