//! Write File
//!
//! Writes the payload text to a file, creating parent directories.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use automation_engine::{
    payload_to_text, AutomationError, ExecutionContext, ModuleDefinition, ModuleDescriptor,
    ModuleHandler, NodeInvocation, Payload, Result, TypeClass,
};
use tokio::io::AsyncWriteExt;

/// Write File
///
/// # Config
/// - `path` - destination file (required)
/// - `append` - `true` appends the payload plus a newline instead of
///   replacing the file
pub struct WriteFile;

impl WriteFile {
    pub const ID: &'static str = "write-file";

    pub fn definition() -> ModuleDefinition {
        ModuleDefinition::new(
            ModuleDescriptor::new(Self::ID, TypeClass::Output)
                .with_label("Write File")
                .with_description("Saves the payload to a file")
                .with_inputs(["in"])
                .with_default("path", "")
                .with_default("append", "false"),
            Arc::new(Self),
        )
    }

    fn is_append(node: &NodeInvocation<'_>) -> bool {
        matches!(
            node.config_or("append", "false").trim().to_ascii_lowercase().as_str(),
            "true" | "yes" | "1"
        )
    }
}

inventory::submit!(automation_engine::BuiltinModule(WriteFile::definition));

#[async_trait]
impl ModuleHandler for WriteFile {
    async fn execute(
        &self,
        node: &NodeInvocation<'_>,
        payload: Option<Payload>,
        _context: &ExecutionContext,
    ) -> Result<Payload> {
        let path = node.config_or("path", "").trim();
        if path.is_empty() {
            return Err(AutomationError::failed("No file path configured"));
        }
        let path = Path::new(path);

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let text = payload_to_text(payload.as_ref());
        if Self::is_append(node) {
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .await?;
            file.write_all(text.as_bytes()).await?;
            file.write_all(b"\n").await?;
            file.flush().await?;
        } else {
            tokio::fs::write(path, text.as_bytes()).await?;
        }

        log::debug!(
            "WriteFile {}: wrote {} bytes to {}",
            node.node_id,
            text.len(),
            path.display()
        );
        Ok(payload.unwrap_or(Payload::Null))
    }
}
