//! Merge
//!
//! Appends every payload that reaches it to an ordered context collection,
//! so several branches can feed one list.

use std::sync::Arc;

use async_trait::async_trait;
use automation_engine::constants::defaults;
use automation_engine::{
    ExecutionContext, ModuleDefinition, ModuleDescriptor, ModuleHandler, NodeInvocation, Payload,
    Result, TypeClass,
};

pub struct Merge;

impl Merge {
    pub const ID: &'static str = "merge";

    pub fn definition() -> ModuleDefinition {
        ModuleDefinition::new(
            ModuleDescriptor::new(Self::ID, TypeClass::Utility)
                .with_label("Merge")
                .with_description("Gathers payloads into a context list")
                .with_inputs(["in"])
                .with_outputs(["out"])
                .with_default("collection", defaults::MERGE_COLLECTION),
            Arc::new(Self),
        )
    }
}

inventory::submit!(automation_engine::BuiltinModule(Merge::definition));

#[async_trait]
impl ModuleHandler for Merge {
    async fn execute(
        &self,
        node: &NodeInvocation<'_>,
        payload: Option<Payload>,
        context: &ExecutionContext,
    ) -> Result<Payload> {
        let payload = payload.unwrap_or(Payload::Null);
        let key = match node.config_or("collection", "").trim() {
            "" => defaults::MERGE_COLLECTION,
            key => key,
        };
        context.append(key, payload.clone()).await;
        Ok(payload)
    }
}
