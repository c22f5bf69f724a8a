//! Execution engine: drives one run over a flow graph.
//!
//! A run is a sequential state machine: `Idle → Running → {AwaitingInput ⇄
//! Running} → {Completed | Failed}`. Non-interactive nodes never pause the
//! run — the engine auto-chains through them until an interactive node is
//! reached, the graph completes, or the cycle guard trips. A single bad
//! action is recorded and routed around, never aborting the whole run.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use botflow_core::config::{AppConfig, EngineConfig, RoutingConfig, SimulatorConfig};
use botflow_core::error::{FlowError, Result};
use botflow_core::types::{FlowStatus, RunStatus, TranscriptMessage};

use crate::catalog::Catalog;
use crate::graph::{FlowGraph, NodeKind};
use crate::resolver::{self, Routing};
use crate::snapshot::FlowSnapshot;
use crate::trace::{FlowExecutionReport, NodeExecutionResult, NodeExecutionStatus};

/// Mutable state of one run.
#[derive(Debug, Default)]
pub struct RunState {
    /// Node awaiting execution or input; `None` before start / after completion.
    pub current_node_id: Option<String>,
    /// Accumulated key/value data (e.g. `lastUserInput`).
    pub variables: HashMap<String, serde_json::Value>,
    /// Ordered conversation transcript.
    pub transcript: Vec<TranscriptMessage>,
    pub status: RunStatus,
    /// Reason string when `status == Failed`.
    pub failure_reason: Option<String>,
    /// Per-node execution results in visit order.
    pub results: Vec<NodeExecutionResult>,
    /// Visit counts since the last accepted input (cycle guard).
    visits: HashMap<String, usize>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Outcome of offering input to a run.
///
/// Rejection is data, not an error: callers check the session status and
/// retry when the run is actually waiting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputOutcome {
    Accepted,
    Rejected { status: RunStatus },
}

/// Executes runs over a shared, immutable flow graph.
#[derive(Debug)]
pub struct ExecutionEngine {
    graph: Arc<FlowGraph>,
    catalog: Catalog,
    engine: EngineConfig,
    routing: RoutingConfig,
    simulator: SimulatorConfig,
}

impl ExecutionEngine {
    pub fn new(graph: Arc<FlowGraph>, catalog: Catalog, config: &AppConfig) -> Self {
        Self {
            graph,
            catalog,
            engine: config.engine.clone(),
            routing: config.routing.clone(),
            simulator: config.simulator.clone(),
        }
    }

    pub fn graph(&self) -> &Arc<FlowGraph> {
        &self.graph
    }

    /// Begin (or restart) a run from the start node and auto-chain until the
    /// first pause point or completion.
    pub async fn start(&self, state: &mut RunState) -> Result<()> {
        let start_id = self.graph.start_node().id.clone();
        info!(flow_nodes = self.graph.node_count(), start_node = %start_id, "Starting flow run");

        state.status = RunStatus::Running;
        state.current_node_id = Some(start_id.clone());
        state.failure_reason = None;
        state.visits.clear();
        state.visits.insert(start_id.clone(), 1);

        self.execute_node(state, &start_id).await?;
        self.chain(state, None, None).await
    }

    /// Resume an awaiting run with user input.
    pub async fn feed_input(&self, state: &mut RunState, text: &str) -> Result<InputOutcome> {
        if state.status != RunStatus::AwaitingInput {
            debug!(status = %state.status, "Input rejected, run is not awaiting input");
            return Ok(InputOutcome::Rejected {
                status: state.status,
            });
        }

        let node_id = state
            .current_node_id
            .clone()
            .ok_or_else(|| FlowError::NodeNotFound("<none>".to_string()))?;
        let node = self.graph.node_or_err(&node_id)?;

        state.transcript.push(TranscriptMessage::user(text));
        state
            .variables
            .insert("lastUserInput".to_string(), serde_json::json!(text));
        // Accepted input resets the cycle guard: interactive loops are legal.
        state.visits.clear();
        state.status = RunStatus::Running;

        let branch_key = node
            .interactive_action()
            .and_then(|action| {
                resolver::branch_key_for(action, text, &state.variables, &self.routing)
            });

        self.chain(state, Some(text.to_string()), branch_key).await?;
        Ok(InputOutcome::Accepted)
    }

    /// Auto-chain from the current node until pause, completion, or failure.
    ///
    /// `input` and `branch_key` apply only to the first routing decision;
    /// subsequent hops may pick up branch keys from executed actions
    /// (e.g. `ai-transition`).
    async fn chain(
        &self,
        state: &mut RunState,
        mut input: Option<String>,
        mut branch_key: Option<String>,
    ) -> Result<()> {
        loop {
            let Some(current_id) = state.current_node_id.clone() else {
                return Ok(());
            };
            let node = self.graph.node_or_err(&current_id)?;

            if node.requires_input() && input.is_none() {
                debug!(node_id = %current_id, "Pausing run for user input");
                state.status = RunStatus::AwaitingInput;
                return Ok(());
            }

            let routing = resolver::resolve(
                &self.graph,
                &self.routing,
                node,
                branch_key.as_deref(),
                input.as_deref(),
            );
            input = None;
            branch_key = None;

            let next_id = match routing {
                Routing::Complete => {
                    debug!(node_id = %current_id, "No outgoing edges, flow complete");
                    state.transcript.push(TranscriptMessage::bot(
                        self.simulator.completion_message.clone(),
                        Some(current_id),
                    ));
                    state.status = RunStatus::Completed;
                    state.current_node_id = None;
                    return Ok(());
                }
                Routing::Next(id) => id,
            };

            let count = state.visits.entry(next_id.clone()).or_insert(0);
            *count += 1;
            if *count > self.engine.cycle_limit {
                let err = FlowError::CycleLimitExceeded {
                    node: next_id.clone(),
                    limit: self.engine.cycle_limit,
                };
                warn!(node_id = %next_id, limit = self.engine.cycle_limit, "Cycle limit exceeded, failing run");
                state
                    .transcript
                    .push(TranscriptMessage::system(err.to_string(), Some(next_id)));
                state.status = RunStatus::Failed;
                state.failure_reason = Some("cycle-limit-exceeded".to_string());
                state.current_node_id = None;
                return Ok(());
            }

            state.current_node_id = Some(next_id.clone());
            branch_key = self.execute_node(state, &next_id).await?;
        }
    }

    /// Execute one node's actions, appending transcript messages and a
    /// `NodeExecutionResult`. Action failures are caught here; the returned
    /// branch key (if any) feeds the next routing decision.
    async fn execute_node(&self, state: &mut RunState, node_id: &str) -> Result<Option<String>> {
        let node = self.graph.node_or_err(node_id)?;
        let node_start = Instant::now();
        info!(node_id = %node.id, node_kind = node.kind.as_str(), "Executing flow node");

        let (output, branch_key, failure) = match node.kind {
            NodeKind::Start => {
                let label = non_empty_or(&node.label, "Inicio del flujo");
                (Some(format!("✅ Flow iniciado: {label}")), None, None)
            }
            NodeKind::End => {
                let label = non_empty_or(&node.label, "Fin del flujo");
                (Some(format!("✅ Flow completado: {label}")), None, None)
            }
            NodeKind::Action => {
                let mut messages: Vec<String> = Vec::new();
                let mut branch_key = None;
                let mut failure = None;

                for action in &node.actions {
                    match self.catalog.execute(node_id, action).await {
                        Ok(result) => {
                            if let Some(text) = result.message {
                                state
                                    .transcript
                                    .push(TranscriptMessage::bot(text.clone(), Some(node.id.clone())));
                                messages.push(text);
                            }
                            if result.branch_key.is_some() {
                                branch_key = result.branch_key;
                            }
                        }
                        Err(e) => {
                            error!(node_id = %node.id, action_id = %action.id, error = %e, "Action failed");
                            state
                                .transcript
                                .push(TranscriptMessage::system(e.to_string(), Some(node.id.clone())));
                            failure = Some(e.to_string());
                            // Remaining actions of this node are skipped;
                            // traversal continues from here.
                            break;
                        }
                    }
                }

                let output = if messages.is_empty() {
                    if failure.is_none() && node.actions.is_empty() {
                        Some(format!(
                            "✅ Nodo ejecutado: {}",
                            non_empty_or(&node.label, "Nodo sin acciones")
                        ))
                    } else {
                        None
                    }
                } else {
                    Some(messages.join("\n"))
                };
                (output, branch_key, failure)
            }
        };

        let elapsed_ms = node_start.elapsed().as_millis() as u64;
        let result = match failure {
            Some(err) => NodeExecutionResult::error(&node.id, node.kind.as_str(), err, elapsed_ms),
            None => NodeExecutionResult::success(&node.id, node.kind.as_str(), output, elapsed_ms),
        };
        debug!(
            node_id = %node.id,
            status = ?result.status,
            elapsed_ms,
            "Node execution complete"
        );
        state.results.push(result);

        Ok(branch_key)
    }

    /// Stateless test execution: run a full graph snapshot to the first
    /// pause point or completion, with no prior session.
    ///
    /// Interchangeable with the remote `POST /execute/test` contract: the
    /// report is equivalent to what a live session would produce up to the
    /// first pause, and identical across repeated calls modulo timestamps.
    pub async fn test_execute(
        snapshot: FlowSnapshot,
        flow_id: &str,
        flow_name: &str,
        catalog: Catalog,
        config: &AppConfig,
    ) -> FlowExecutionReport {
        let started_at = Utc::now();
        let report = |status, results, err: Option<String>| {
            FlowExecutionReport::new(flow_id, flow_name, status, results, started_at, err)
        };

        if snapshot.is_empty() {
            return report(
                FlowStatus::Empty,
                vec![],
                Some("No nodes to execute".to_string()),
            );
        }

        let graph = match snapshot.into_graph() {
            Ok(graph) => graph,
            Err(e) => return report(FlowStatus::Error, vec![], Some(e.to_string())),
        };

        if graph.end_node_ids().is_empty() {
            return report(
                FlowStatus::Error,
                vec![],
                Some(FlowError::MissingEndNode.to_string()),
            );
        }

        let engine = Self::new(Arc::new(graph), catalog, config);
        let mut state = RunState::new();
        if let Err(e) = engine.start(&mut state).await {
            return report(FlowStatus::Error, state.results, Some(e.to_string()));
        }

        let (status, error) = match state.status {
            RunStatus::Failed => (FlowStatus::Failed, state.failure_reason.clone()),
            _ => match state
                .results
                .iter()
                .find(|r| r.status == NodeExecutionStatus::Error)
            {
                Some(r) => (
                    FlowStatus::Failed,
                    Some(format!(
                        "Node {} failed: {}",
                        r.node_id,
                        r.error.as_deref().unwrap_or("unknown error")
                    )),
                ),
                None => (FlowStatus::Success, None),
            },
        };

        report(status, state.results, error)
    }
}

fn non_empty_or<'a>(label: &'a str, fallback: &'a str) -> &'a str {
    if label.is_empty() {
        fallback
    } else {
        label
    }
}
