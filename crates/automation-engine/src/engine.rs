//! Trigger-driven depth-first execution
//!
//! For every trigger node (in insertion order) the engine obtains a seed
//! payload and propagates it depth-first along outgoing edges. Each node
//! fires at most once per trigger run, so cycles terminate. A failing
//! handler never aborts the run: its branch continues with the payload it
//! received and a diagnostic is recorded in the context.
//!
//! # Context Layout
//!
//! - `{node}.output.payload` - payload each node produced (or carried)
//! - `branches.{trigger}` - terminal payloads of that trigger's run
//! - `diagnostics` - ordered [`Diagnostic`] list
//! - `execution.id` - id of the last run

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::config::EngineConfig;
use crate::context::{ContextKeys, Diagnostic, DiagnosticKind, ExecutionContext};
use crate::error::{AutomationError, Result, StructuralError};
use crate::events::{EventSink, ExecutionEvent};
use crate::graph::GraphModel;
use crate::hooks::CapabilityHooks;
use crate::registry::{ModuleRegistry, NodeInvocation};
use crate::types::{Node, NodeId, Payload};

/// Lifecycle of an engine's current run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExecutionState {
    Idle,
    Running,
    Settled,
}

/// Outcome of one trigger run
enum RunOutcome {
    Finished,
    Cancelled,
}

/// Per-run values threaded through propagation
struct Run<'a> {
    execution_id: String,
    registry: &'a ModuleRegistry,
    context: &'a ExecutionContext,
    cancel: &'a CancellationToken,
}

/// Executes automation graphs against injected host capabilities
pub struct ExecutionEngine {
    hooks: Arc<dyn CapabilityHooks>,
    config: EngineConfig,
    events: Option<Arc<dyn EventSink<ExecutionEvent>>>,
    state: watch::Sender<ExecutionState>,
}

impl ExecutionEngine {
    pub fn new(hooks: Arc<dyn CapabilityHooks>, config: EngineConfig) -> Self {
        let (state, _) = watch::channel(ExecutionState::Idle);
        Self {
            hooks,
            config,
            events: None,
            state,
        }
    }

    /// Report progress to an event sink
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink<ExecutionEvent>>) -> Self {
        self.events = Some(sink);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current execution state
    pub fn state(&self) -> ExecutionState {
        *self.state.borrow()
    }

    /// Watch execution state changes
    pub fn subscribe_state(&self) -> watch::Receiver<ExecutionState> {
        self.state.subscribe()
    }

    fn emit(&self, event: ExecutionEvent) {
        if let Some(sink) = &self.events {
            if let Err(e) = sink.send(event) {
                log::warn!("Failed to deliver execution event: {}", e);
            }
        }
    }

    /// Run every trigger of `graph` and return the shared context
    pub async fn execute(
        &self,
        graph: &GraphModel,
        registry: &ModuleRegistry,
        context: ExecutionContext,
    ) -> ExecutionContext {
        self.execute_with_cancel(graph, registry, context, CancellationToken::new())
            .await
    }

    /// Like [`ExecutionEngine::execute`], stopping early once `cancel` fires
    ///
    /// A cancelled run still returns the context, with a `cancelled`
    /// diagnostic recorded.
    pub async fn execute_with_cancel(
        &self,
        graph: &GraphModel,
        registry: &ModuleRegistry,
        context: ExecutionContext,
        cancel: CancellationToken,
    ) -> ExecutionContext {
        self.state.send_replace(ExecutionState::Running);

        let triggers = graph.triggers_in(registry);
        if triggers.is_empty() {
            log::debug!("Graph has no triggers, nothing to execute");
            self.state.send_replace(ExecutionState::Settled);
            return context;
        }

        let execution_id = uuid::Uuid::new_v4().to_string();
        context
            .set(ContextKeys::EXECUTION_ID, execution_id.clone())
            .await;
        log::info!(
            "Execution {} started with {} trigger(s)",
            execution_id,
            triggers.len()
        );
        self.emit(ExecutionEvent::ExecutionStarted {
            execution_id: execution_id.clone(),
            trigger_count: triggers.len(),
        });

        let structural = structural_errors(graph, registry);
        let run = Run {
            execution_id: execution_id.clone(),
            registry,
            context: &context,
            cancel: &cancel,
        };

        let mut cancelled = false;
        for trigger in triggers {
            if cancel.is_cancelled() {
                record_cancelled(&context, Some(trigger.id.as_str()), None).await;
                cancelled = true;
                break;
            }

            let affecting = scoped_errors(graph, &trigger.id, &structural);
            if !affecting.is_empty() {
                self.skip_trigger(&run, &trigger.id, &affecting).await;
                continue;
            }

            self.emit(ExecutionEvent::TriggerStarted {
                execution_id: execution_id.clone(),
                trigger_id: trigger.id.clone(),
            });
            if let RunOutcome::Cancelled = self.run_trigger(&run, graph, trigger).await {
                cancelled = true;
                break;
            }
        }

        let diagnostics = context.diagnostics().await.len();
        log::info!(
            "Execution {} settled ({} diagnostic(s){})",
            execution_id,
            diagnostics,
            if cancelled { ", cancelled" } else { "" }
        );
        self.emit(ExecutionEvent::ExecutionSettled {
            execution_id,
            cancelled,
            diagnostics,
        });
        self.state.send_replace(ExecutionState::Settled);
        context
    }

    async fn skip_trigger(&self, run: &Run<'_>, trigger_id: &str, errors: &[&StructuralError]) {
        log::warn!(
            "Skipping trigger '{}': {} structural error(s)",
            trigger_id,
            errors.len()
        );
        for error in errors {
            run.context
                .record_diagnostic(
                    Diagnostic::new(DiagnosticKind::Structural, error.to_string())
                        .with_trigger(trigger_id),
                )
                .await;
        }
        self.emit(ExecutionEvent::TriggerSkipped {
            execution_id: run.execution_id.clone(),
            trigger_id: trigger_id.to_string(),
            reason: errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; "),
        });
    }

    /// Seed from one trigger and propagate depth-first
    async fn run_trigger(&self, run: &Run<'_>, graph: &GraphModel, trigger: &Node) -> RunOutcome {
        let trigger_id = trigger.id.as_str();
        let mut visited: HashSet<NodeId> = HashSet::new();
        visited.insert(trigger.id.clone());

        let seed = match self.invoke(run, trigger_id, trigger, None).await {
            Ok(payload) => payload,
            Err(AutomationError::Cancelled) => {
                record_cancelled(run.context, Some(trigger_id), Some(trigger)).await;
                return RunOutcome::Cancelled;
            }
            Err(e) => {
                // A trigger without a seed has nothing to propagate
                self.record_failure(run, trigger_id, trigger, &e).await;
                return RunOutcome::Finished;
            }
        };
        run.context.set_node_payload(trigger_id, &seed).await;

        let mut stack: Vec<(NodeId, Payload)> = Vec::new();
        if !push_children(graph, trigger_id, &seed, &visited, &mut stack) {
            run.context.push_branch_payload(trigger_id, seed).await;
        }

        while let Some((node_id, incoming)) = stack.pop() {
            if visited.contains(&node_id) {
                continue;
            }
            if run.cancel.is_cancelled() {
                record_cancelled(run.context, Some(trigger_id), graph.get_node(&node_id)).await;
                return RunOutcome::Cancelled;
            }
            let Some(node) = graph.get_node(&node_id) else {
                continue;
            };
            visited.insert(node_id.clone());

            let output = match self.invoke(run, trigger_id, node, Some(incoming.clone())).await {
                Ok(payload) => payload,
                Err(AutomationError::Cancelled) => {
                    record_cancelled(run.context, Some(trigger_id), Some(node)).await;
                    return RunOutcome::Cancelled;
                }
                Err(e) => {
                    self.record_failure(run, trigger_id, node, &e).await;
                    incoming
                }
            };
            run.context.set_node_payload(&node_id, &output).await;

            if !push_children(graph, &node_id, &output, &visited, &mut stack) {
                run.context.push_branch_payload(trigger_id, output).await;
            }
        }

        RunOutcome::Finished
    }

    /// Call one handler, racing the cancellation token and the node timeout
    async fn invoke(
        &self,
        run: &Run<'_>,
        trigger_id: &str,
        node: &Node,
        payload: Option<Payload>,
    ) -> Result<Payload> {
        let definition = run.registry.get(&node.module_id).ok_or_else(|| {
            AutomationError::failed(format!("Module '{}' is not registered", node.module_id))
        })?;

        log::debug!("Running node '{}' ({})", node.id, node.module_id);
        self.emit(ExecutionEvent::NodeStarted {
            execution_id: run.execution_id.clone(),
            trigger_id: trigger_id.to_string(),
            node_id: node.id.clone(),
            module_id: node.module_id.clone(),
        });

        let invocation = NodeInvocation {
            node_id: &node.id,
            trigger_id,
            module_id: &node.module_id,
            config: &node.config,
            hooks: self.hooks.as_ref(),
            cancel: run.cancel,
            settings: &self.config,
        };
        let call = async {
            let fut = definition.handler.execute(&invocation, payload, run.context);
            match self.config.node_timeout_ms {
                Some(ms) => tokio::time::timeout(Duration::from_millis(ms), fut)
                    .await
                    .unwrap_or(Err(AutomationError::Timeout(ms))),
                None => fut.await,
            }
        };

        let result = tokio::select! {
            biased;
            _ = run.cancel.cancelled() => Err(AutomationError::Cancelled),
            result = call => result,
        };

        if let Ok(output) = &result {
            self.emit(ExecutionEvent::NodeCompleted {
                execution_id: run.execution_id.clone(),
                trigger_id: trigger_id.to_string(),
                node_id: node.id.clone(),
                output: output.clone(),
            });
        }
        result
    }

    async fn record_failure(
        &self,
        run: &Run<'_>,
        trigger_id: &str,
        node: &Node,
        error: &AutomationError,
    ) {
        let error = AutomationError::NodeExecution {
            node_id: node.id.clone(),
            message: error.to_string(),
        };
        log::warn!("{}", error);

        run.context
            .record_diagnostic(
                Diagnostic::new(DiagnosticKind::NodeExecution, error.to_string())
                    .with_trigger(trigger_id)
                    .with_node(&node.id, &node.module_id),
            )
            .await;
        self.emit(ExecutionEvent::NodeFailed {
            execution_id: run.execution_id.clone(),
            trigger_id: trigger_id.to_string(),
            node_id: node.id.clone(),
            error: error.to_string(),
        });
    }
}

/// Push unvisited successors so the first edge is popped first
///
/// Returns `false` if the node has no unvisited successors.
fn push_children(
    graph: &GraphModel,
    node_id: &str,
    payload: &Payload,
    visited: &HashSet<NodeId>,
    stack: &mut Vec<(NodeId, Payload)>,
) -> bool {
    let children: Vec<&Node> = graph
        .outgoing(node_id)
        .into_iter()
        .map(|o| o.target)
        .filter(|target| !visited.contains(&target.id))
        .collect();
    for child in children.iter().rev() {
        stack.push((child.id.clone(), payload.clone()));
    }
    !children.is_empty()
}

/// Structural errors against the registry used for this run
fn structural_errors(graph: &GraphModel, registry: &ModuleRegistry) -> Vec<StructuralError> {
    let mut errors = graph.validate();
    for node in graph.nodes() {
        let missing = !registry.contains(&node.module_id);
        let reported = errors.iter().any(|e| {
            matches!(e, StructuralError::UnknownModule { node_id, .. } if *node_id == node.id)
        });
        if missing && !reported {
            errors.push(StructuralError::UnknownModule {
                node_id: node.id.clone(),
                module_id: node.module_id.clone(),
            });
        }
    }
    errors
}

/// Errors inside the subgraph reachable from `trigger_id`
fn scoped_errors<'e>(
    graph: &GraphModel,
    trigger_id: &str,
    errors: &'e [StructuralError],
) -> Vec<&'e StructuralError> {
    if errors.is_empty() {
        return Vec::new();
    }
    let reachable = graph.reachable_from(trigger_id);
    errors
        .iter()
        .filter(|error| {
            let node_hit = error.node_ids().iter().any(|id| reachable.contains(*id));
            let edge_hit = error
                .edge_id()
                .and_then(|id| graph.get_edge(id))
                .map(|edge| reachable.contains(&edge.source))
                .unwrap_or(false);
            node_hit || edge_hit
        })
        .collect()
}

async fn record_cancelled(context: &ExecutionContext, trigger_id: Option<&str>, node: Option<&Node>) {
    log::info!("Execution cancelled");
    let mut diagnostic = Diagnostic::new(DiagnosticKind::Cancelled, AutomationError::Cancelled.to_string());
    if let Some(trigger_id) = trigger_id {
        diagnostic = diagnostic.with_trigger(trigger_id);
    }
    if let Some(node) = node {
        diagnostic = diagnostic.with_node(&node.id, &node.module_id);
    }
    context.record_diagnostic(diagnostic).await;
}
