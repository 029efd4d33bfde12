//! Automation Nodes
//!
//! Built-in modules for the automation engine, plus the capability hooks a
//! desktop host injects into it.
//!
//! Every module submits a [`BuiltinModule`](automation_engine::BuiltinModule)
//! seed at link time, so linking this crate is enough for
//! [`ModuleRegistry::with_builtins`](automation_engine::ModuleRegistry::with_builtins)
//! to see the whole catalogue.
//!
//! # Categories
//!
//! - **Trigger**: nodes that seed a run (manual input, clipboard)
//! - **Processing**: payload transforms (templates, regex, HTTP, JSON, commands)
//! - **Control**: gate, merge and delay utilities
//! - **Output**: terminal side effects (notify, clipboard, files, URLs, panels)

pub mod control;
pub mod hooks;
pub mod output;
pub mod processing;
mod template;
pub mod trigger;

pub use control::*;
pub use hooks::{DesktopHookError, DesktopHooks, Opener};
pub use output::*;
pub use processing::*;
pub use trigger::*;


#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use automation_engine::{
        ContextKeys, EngineConfig, ExecutionContext, ExecutionEngine, GraphModel, ModuleRegistry,
        Point, RecordingHooks, TypeClass,
    };
    use serde_json::json;

    #[test]
    fn test_inventory_collects_all_builtins() {
        let registry = ModuleRegistry::with_builtins();
        assert_eq!(registry.len(), 16, "Expected 16 built-in modules");

        // Spot-check known types
        assert!(registry.contains("manual-trigger"));
        assert!(registry.contains("format-text"));
        assert!(registry.contains("gate"));
        assert!(registry.contains("write-file"));
        assert!(registry.contains("collect"));

        // Class order first, then id
        let ids: Vec<&str> = registry.definitions().map(|d| d.id()).collect();
        assert_eq!(&ids[..2], &["clipboard-trigger", "manual-trigger"]);
        assert_eq!(ids.last().copied(), Some("write-file"));
        let classes: Vec<TypeClass> = registry.definitions().map(|d| d.type_class()).collect();
        let mut sorted = classes.clone();
        sorted.sort();
        assert_eq!(classes, sorted);
    }

    #[tokio::test]
    async fn test_manual_format_collect_pipeline() {
        let registry = Arc::new(ModuleRegistry::with_builtins());
        let mut graph = GraphModel::new(registry.clone());
        let trigger = graph.add_node("manual-trigger", Point::new(0.0, 0.0)).unwrap();
        let format = graph.add_node("format-text", Point::new(240.0, 0.0)).unwrap();
        let collect = graph.add_node("collect", Point::new(480.0, 0.0)).unwrap();
        graph.set_config(&format, "template", "<{payload}>").unwrap();
        graph.add_edge(&trigger, "out", &format, "in").unwrap();
        graph.add_edge(&format, "out", &collect, "in").unwrap();

        let context = ExecutionContext::new();
        context.set(ContextKeys::TEST_INPUT, "hi").await;

        let engine = ExecutionEngine::new(Arc::new(RecordingHooks::new()), EngineConfig::default());
        let context = engine.execute(&graph, &registry, context).await;

        assert!(context.diagnostics().await.is_empty());
        assert_eq!(context.collection("collected").await, vec![json!("<hi>")]);
        assert_eq!(context.branch_payloads(&trigger).await, vec![json!("<hi>")]);
    }
}
