//! Collect
//!
//! Terminal counterpart of merge: appends the payload to a context
//! collection the host reads after the run.

use std::sync::Arc;

use async_trait::async_trait;
use automation_engine::constants::defaults;
use automation_engine::{
    ExecutionContext, ModuleDefinition, ModuleDescriptor, ModuleHandler, NodeInvocation, Payload,
    Result, TypeClass,
};

pub struct Collect;

impl Collect {
    pub const ID: &'static str = "collect";

    pub fn definition() -> ModuleDefinition {
        ModuleDefinition::new(
            ModuleDescriptor::new(Self::ID, TypeClass::Output)
                .with_label("Collect")
                .with_description("Adds the payload to a result list")
                .with_inputs(["in"])
                .with_default("collection", defaults::COLLECT_COLLECTION),
            Arc::new(Self),
        )
    }
}

inventory::submit!(automation_engine::BuiltinModule(Collect::definition));

#[async_trait]
impl ModuleHandler for Collect {
    async fn execute(
        &self,
        node: &NodeInvocation<'_>,
        payload: Option<Payload>,
        context: &ExecutionContext,
    ) -> Result<Payload> {
        let payload = payload.unwrap_or(Payload::Null);
        let key = match node.config_or("collection", "").trim() {
            "" => defaults::COLLECT_COLLECTION,
            key => key,
        };
        context.append(key, payload.clone()).await;
        Ok(payload)
    }
}
