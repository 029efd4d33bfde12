//! Delay
//!
//! Suspends the branch for a configured duration.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use automation_engine::{
    AutomationError, ExecutionContext, ModuleDefinition, ModuleDescriptor, ModuleHandler,
    NodeInvocation, Payload, Result, TypeClass,
};

/// Delay
///
/// # Config
/// - `ms` - milliseconds to wait, capped by the engine's `max_delay_ms`
///
/// The wait ends early with [`AutomationError::Cancelled`] when the run is
/// cancelled.
pub struct Delay;

impl Delay {
    pub const ID: &'static str = "delay";

    pub fn definition() -> ModuleDefinition {
        ModuleDefinition::new(
            ModuleDescriptor::new(Self::ID, TypeClass::Utility)
                .with_label("Delay")
                .with_description("Waits before passing the payload on")
                .with_inputs(["in"])
                .with_outputs(["out"])
                .with_default("ms", "1000"),
            Arc::new(Self),
        )
    }

    fn duration(node: &NodeInvocation<'_>) -> Duration {
        let raw = node.config_or("ms", "0");
        let ms = raw.trim().parse::<u64>().unwrap_or_else(|_| {
            log::warn!("Delay {}: invalid ms '{}', not waiting", node.node_id, raw);
            0
        });
        Duration::from_millis(ms.min(node.settings.max_delay_ms))
    }
}

inventory::submit!(automation_engine::BuiltinModule(Delay::definition));

#[async_trait]
impl ModuleHandler for Delay {
    async fn execute(
        &self,
        node: &NodeInvocation<'_>,
        payload: Option<Payload>,
        _context: &ExecutionContext,
    ) -> Result<Payload> {
        let duration = Self::duration(node);
        log::debug!("Delay {}: waiting {:?}", node.node_id, duration);

        tokio::select! {
            biased;
            _ = node.cancel.cancelled() => Err(AutomationError::Cancelled),
            _ = tokio::time::sleep(duration) => Ok(payload.unwrap_or(Payload::Null)),
        }
    }
}
