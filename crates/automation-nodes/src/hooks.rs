//! Capability hooks for desktop hosts
//!
//! [`DesktopHooks`] backs the engine's capability hooks with real system
//! access: the system clipboard through `arboard`, HTTP through `reqwest`,
//! processes through `tokio::process`, and the platform opener for URLs.
//! Notifications go to the log and rendered panels to stdout, so headless
//! runs still show their results.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use automation_engine::{AutomationError, CapabilityHooks, CommandOutput, HookConfig, Payload};
use thiserror::Error;
use tokio::process::Command;

/// Failures raised by [`DesktopHooks`]
#[derive(Debug, Error)]
pub enum DesktopHookError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("Failed to run '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' timed out after {secs}s")]
    CommandTimeout { command: String, secs: u64 },

    #[error("Clipboard error: {0}")]
    Clipboard(#[from] arboard::Error),

    #[error("Clipboard task failed: {0}")]
    ClipboardTask(#[from] tokio::task::JoinError),

    #[error("No async runtime to supervise '{0}'")]
    NoRuntime(String),
}

impl From<DesktopHookError> for AutomationError {
    fn from(e: DesktopHookError) -> Self {
        AutomationError::hook(e.to_string())
    }
}

/// Program plus leading arguments; the URL is appended last
type OpenerCandidate = (&'static str, &'static [&'static str]);

#[cfg(target_os = "macos")]
const OPENERS: &[OpenerCandidate] = &[("open", &[])];
#[cfg(target_os = "windows")]
const OPENERS: &[OpenerCandidate] = &[("cmd", &["/C", "start", ""])];
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const OPENERS: &[OpenerCandidate] = &[("xdg-open", &[]), ("gio", &["open"])];

/// Command used to open URLs and paths
#[derive(Debug, Clone, PartialEq)]
pub struct Opener {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl Opener {
    /// First platform opener found on `PATH`
    pub fn detect() -> Option<Self> {
        OPENERS.iter().find_map(|(name, args)| {
            which::which(name).ok().map(|program| Self {
                program,
                args: args.iter().map(|a| a.to_string()).collect(),
            })
        })
    }
}

/// Hooks backed by the local machine
pub struct DesktopHooks {
    config: HookConfig,
    http_client: reqwest::Client,
    opener: Option<Opener>,
}

impl DesktopHooks {
    pub fn new(config: HookConfig) -> Result<Self, DesktopHookError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .map_err(DesktopHookError::Client)?;

        let opener = Opener::detect();
        match &opener {
            Some(opener) => log::debug!("Using opener {}", opener.program.display()),
            None => log::warn!("No system opener found; open-url nodes will pass through"),
        }

        Ok(Self {
            config,
            http_client,
            opener,
        })
    }

    /// Replace the detected opener; `None` disables opening
    pub fn with_opener(mut self, opener: Option<Opener>) -> Self {
        self.opener = opener;
        self
    }

    pub fn config(&self) -> &HookConfig {
        &self.config
    }

    async fn read_clipboard() -> Result<String, DesktopHookError> {
        tokio::task::spawn_blocking(|| arboard::Clipboard::new()?.get_text())
            .await?
            .map_err(Into::into)
    }

    async fn write_clipboard(text: String) -> Result<(), DesktopHookError> {
        tokio::task::spawn_blocking(move || arboard::Clipboard::new()?.set_text(text))
            .await?
            .map_err(Into::into)
    }

    /// Launch the opener and reap it in the background
    fn open(&self, opener: &Opener, url: &str) -> Result<(), DesktopHookError> {
        let command_name = opener.program.display().to_string();
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| DesktopHookError::NoRuntime(command_name.clone()))?;

        let mut child = Command::new(&opener.program)
            .args(&opener.args)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| DesktopHookError::Spawn {
                command: command_name.clone(),
                source,
            })?;

        runtime.spawn(async move {
            match child.wait().await {
                Ok(status) if !status.success() => {
                    log::warn!("Opener '{}' exited with {}", command_name, status)
                }
                Ok(_) => {}
                Err(e) => log::warn!("Failed to wait for opener '{}': {}", command_name, e),
            }
        });
        Ok(())
    }

    async fn fetch(&self, url: &str) -> Result<String, DesktopHookError> {
        let request_error = |source| DesktopHookError::Request {
            url: url.to_string(),
            source,
        };

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(request_error)?;

        if !response.status().is_success() {
            return Err(DesktopHookError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        response.text().await.map_err(request_error)
    }

    async fn run(&self, cmd: &str, args: &[String]) -> Result<CommandOutput, DesktopHookError> {
        let mut command = Command::new(cmd);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let spawn_error = |source| DesktopHookError::Spawn {
            command: cmd.to_string(),
            source,
        };
        let secs = self.config.command_timeout_secs;

        let output = tokio::time::timeout(Duration::from_secs(secs), command.output())
            .await
            .map_err(|_| DesktopHookError::CommandTimeout {
                command: cmd.to_string(),
                secs,
            })?
            .map_err(spawn_error)?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code(),
        })
    }
}

#[async_trait]
impl CapabilityHooks for DesktopHooks {
    async fn clipboard_read(&self) -> Option<automation_engine::Result<String>> {
        Some(Self::read_clipboard().await.map_err(Into::into))
    }

    async fn clipboard_write(&self, text: &str) -> Option<automation_engine::Result<()>> {
        Some(Self::write_clipboard(text.to_string()).await.map_err(Into::into))
    }

    async fn http_get(&self, url: &str) -> Option<automation_engine::Result<String>> {
        Some(self.fetch(url).await.map_err(Into::into))
    }

    async fn run_external_command(
        &self,
        cmd: &str,
        args: &[String],
    ) -> Option<automation_engine::Result<CommandOutput>> {
        if !self.config.allow_commands {
            log::debug!("External commands are disabled; skipping '{}'", cmd);
            return None;
        }
        Some(self.run(cmd, args).await.map_err(Into::into))
    }

    fn open_external_resource(&self, url: &str) -> Option<automation_engine::Result<()>> {
        let opener = self.opener.as_ref()?;
        Some(self.open(opener, url).map_err(Into::into))
    }

    fn notify(&self, title: &str, body: &str) -> Option<automation_engine::Result<()>> {
        log::info!("[{}] {}", title, body);
        Some(Ok(()))
    }

    fn render_panel(&self, payload: &Payload) -> Option<automation_engine::Result<()>> {
        let rendered = serde_json::to_string_pretty(payload).map_err(AutomationError::from);
        Some(rendered.map(|text| println!("{}", text)))
    }
}
