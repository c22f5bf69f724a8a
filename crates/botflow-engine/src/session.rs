//! Live chat sessions over a flow graph.
//!
//! A [`Session`] wraps one [`RunState`] behind an async mutex, so concurrent
//! inputs are applied one at a time in arrival order. Observable changes are
//! published on the shared [`EventBus`]; the [`SessionManager`] caches one
//! session per project/flow pair and loads graphs through the [`FlowStore`]
//! collaborator.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::info;

use botflow_core::config::AppConfig;
use botflow_core::error::Result;
use botflow_core::event::{EventBus, SessionEvent};
use botflow_core::traits::FlowStore;
use botflow_core::types::{MessageOrigin, PendingChoice, RunStatus, SessionId, TranscriptMessage};

use crate::catalog::{ActionKind, Catalog};
use crate::engine::{ExecutionEngine, InputOutcome, RunState};
use crate::snapshot::FlowSnapshot;
use crate::trace::NodeExecutionStatus;

/// A live conversation over one flow graph.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    engine: Arc<ExecutionEngine>,
    greeting: String,
    bus: Arc<EventBus>,
    state: Mutex<RunState>,
}

impl Session {
    pub fn new(engine: Arc<ExecutionEngine>, greeting: impl Into<String>, bus: Arc<EventBus>) -> Self {
        let mut state = RunState::new();
        let greeting = greeting.into();
        state.transcript.push(TranscriptMessage::bot(greeting.clone(), None));
        Self {
            id: SessionId::new(),
            engine,
            greeting,
            bus,
            state: Mutex::new(state),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Begin (or restart) the run from the start node.
    pub async fn start(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        info!(session_id = %self.id, "Starting session run");
        self.bus.publish(SessionEvent::SessionStarted {
            session_id: self.id.clone(),
        });

        let seen = state.transcript.len();
        let seen_results = state.results.len();
        self.engine.start(&mut state).await?;
        self.publish_progress(&state, seen, seen_results);
        Ok(())
    }

    /// Offer user input to the run. Input is serialized: concurrent callers
    /// are applied one at a time, and input arriving while the run is not
    /// awaiting is rejected rather than queued.
    pub async fn feed_input(&self, text: &str) -> Result<InputOutcome> {
        let mut state = self.state.lock().await;
        let seen = state.transcript.len();
        let seen_results = state.results.len();

        let outcome = self.engine.feed_input(&mut state, text).await?;
        if outcome == InputOutcome::Accepted {
            self.bus.publish(SessionEvent::UserMessage {
                session_id: self.id.clone(),
                content: text.to_string(),
            });
            self.publish_progress(&state, seen, seen_results);
        }
        Ok(outcome)
    }

    /// Halt the run without clearing the transcript.
    pub async fn stop(&self) {
        let mut state = self.state.lock().await;
        state.status = RunStatus::Idle;
        state.current_node_id = None;
    }

    /// Discard all run state and return to the initial greeting.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        *state = RunState::new();
        state
            .transcript
            .push(TranscriptMessage::bot(self.greeting.clone(), None));
        info!(session_id = %self.id, "Session reset");
        self.bus.publish(SessionEvent::SessionReset {
            session_id: self.id.clone(),
        });
    }

    pub async fn status(&self) -> RunStatus {
        self.state.lock().await.status
    }

    pub async fn transcript(&self) -> Vec<TranscriptMessage> {
        self.state.lock().await.transcript.clone()
    }

    /// Choices offered by the node the run is currently paused on.
    pub async fn pending_choices(&self) -> Vec<PendingChoice> {
        let state = self.state.lock().await;
        self.choices_for(&state)
    }

    fn choices_for(&self, state: &RunState) -> Vec<PendingChoice> {
        if state.status != RunStatus::AwaitingInput {
            return vec![];
        }
        let Some(node_id) = state.current_node_id.as_deref() else {
            return vec![];
        };
        let Some(node) = self.engine.graph().node(node_id) else {
            return vec![];
        };
        let Some(action) = node.interactive_action() else {
            return vec![];
        };

        let target_for = |key: &str| {
            self.engine
                .graph()
                .outgoing(node_id)
                .iter()
                .find(|e| e.matches_branch(key))
                .map(|e| e.target.clone())
        };

        match &action.kind {
            ActionKind::SingleOption { options, .. }
            | ActionKind::MultipleOptions { options, .. } => options
                .iter()
                .enumerate()
                .map(|(i, opt)| {
                    let mut choice = PendingChoice::new(opt.clone());
                    if let Some(target) = target_for(&format!("choice-{i}")) {
                        choice = choice.with_target(target);
                    }
                    choice
                })
                .collect(),
            ActionKind::Boolean { .. } | ActionKind::Confirmation { .. } => {
                [("Sí", "yes"), ("No", "no")]
                    .into_iter()
                    .map(|(value, key)| {
                        let mut choice = PendingChoice::new(value);
                        if let Some(target) = target_for(key) {
                            choice = choice.with_target(target);
                        }
                        choice
                    })
                    .collect()
            }
            ActionKind::Intent { intents, .. } => intents
                .iter()
                .map(|intent| PendingChoice::new(intent.name.clone()))
                .collect(),
            _ => vec![],
        }
    }

    /// Publish transcript entries and node results appended since the given
    /// cursors, then the event for the state the run landed in.
    fn publish_progress(&self, state: &RunState, seen: usize, seen_results: usize) {
        for message in &state.transcript[seen..] {
            if message.origin == MessageOrigin::Bot {
                self.bus.publish(SessionEvent::BotMessage {
                    session_id: self.id.clone(),
                    content: message.content.clone(),
                    node_id: message.node_id.clone(),
                });
            }
        }

        for result in &state.results[seen_results..] {
            self.bus.publish(SessionEvent::NodeExecuted {
                session_id: self.id.clone(),
                node_id: result.node_id.clone(),
                succeeded: result.status == NodeExecutionStatus::Success,
            });
        }

        match state.status {
            RunStatus::AwaitingInput => {
                if let Some(node_id) = state.current_node_id.clone() {
                    self.bus.publish(SessionEvent::AwaitingInput {
                        session_id: self.id.clone(),
                        node_id,
                        choices: self.choices_for(state),
                    });
                }
            }
            RunStatus::Completed => self.bus.publish(SessionEvent::RunCompleted {
                session_id: self.id.clone(),
            }),
            RunStatus::Failed => self.bus.publish(SessionEvent::RunFailed {
                session_id: self.id.clone(),
                reason: state
                    .failure_reason
                    .clone()
                    .unwrap_or_else(|| "unknown".to_string()),
            }),
            RunStatus::Idle | RunStatus::Running => {}
        }
    }
}

/// Caches one live session per project/flow pair, loading graphs on demand.
pub struct SessionManager {
    store: Arc<dyn FlowStore>,
    catalog: Catalog,
    config: AppConfig,
    bus: Arc<EventBus>,
    sessions: Mutex<HashMap<String, Arc<Session>>>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn FlowStore>, catalog: Catalog, config: AppConfig) -> Self {
        Self {
            store,
            catalog,
            config,
            bus: Arc::new(EventBus::default()),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Get the live session for a flow, loading and validating the flow
    /// snapshot on first access.
    pub async fn open(&self, project_id: &str, flow_id: &str) -> Result<Arc<Session>> {
        let key = format!("{project_id}:{flow_id}");
        let mut sessions = self.sessions.lock().await;
        if let Some(session) = sessions.get(&key) {
            return Ok(Arc::clone(session));
        }

        let payload = self.store.get_flow(flow_id).await?;
        let graph = FlowSnapshot::from_value(payload)?.into_graph()?;
        info!(project_id, flow_id, nodes = graph.node_count(), "Opened flow session");

        let engine = Arc::new(ExecutionEngine::new(
            Arc::new(graph),
            self.catalog.clone(),
            &self.config,
        ));
        let session = Arc::new(Session::new(
            engine,
            self.config.simulator.greeting.clone(),
            Arc::clone(&self.bus),
        ));
        sessions.insert(key, Arc::clone(&session));
        Ok(session)
    }

    /// Drop the cached session for a flow, if any.
    pub async fn close(&self, project_id: &str, flow_id: &str) -> bool {
        let key = format!("{project_id}:{flow_id}");
        self.sessions.lock().await.remove(&key).is_some()
    }

    /// Keys of all live sessions.
    pub async fn live(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.sessions.lock().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

/// Default catalog wired from config, without collaborators.
pub fn catalog_from_config(config: &AppConfig) -> Catalog {
    Catalog::new(Duration::from_secs(config.engine.action_timeout_secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    use futures::future::BoxFuture;

    use botflow_core::error::FlowError;
    use botflow_core::traits::FlowSummary;

    struct MemoryFlowStore {
        flows: std::sync::Mutex<HashMap<String, serde_json::Value>>,
    }

    impl MemoryFlowStore {
        fn with_flow(flow_id: &str, snapshot: serde_json::Value) -> Self {
            let mut flows = HashMap::new();
            flows.insert(flow_id.to_string(), snapshot);
            Self {
                flows: std::sync::Mutex::new(flows),
            }
        }
    }

    impl FlowStore for MemoryFlowStore {
        fn create_project(&self, _name: &str) -> BoxFuture<'_, Result<String>> {
            Box::pin(async { Ok("p1".to_string()) })
        }

        fn create_flow(
            &self,
            project_id: &str,
            name: &str,
            snapshot: serde_json::Value,
        ) -> BoxFuture<'_, Result<FlowSummary>> {
            let summary = FlowSummary {
                id: name.to_string(),
                name: name.to_string(),
                project_id: project_id.to_string(),
            };
            self.flows
                .lock()
                .unwrap()
                .insert(summary.id.clone(), snapshot);
            Box::pin(async move { Ok(summary) })
        }

        fn update_flow(
            &self,
            flow_id: &str,
            snapshot: serde_json::Value,
        ) -> BoxFuture<'_, Result<()>> {
            self.flows
                .lock()
                .unwrap()
                .insert(flow_id.to_string(), snapshot);
            Box::pin(async { Ok(()) })
        }

        fn flows_by_project(&self, _project_id: &str) -> BoxFuture<'_, Result<Vec<FlowSummary>>> {
            Box::pin(async { Ok(vec![]) })
        }

        fn get_flow(&self, flow_id: &str) -> BoxFuture<'_, Result<serde_json::Value>> {
            let found = self.flows.lock().unwrap().get(flow_id).cloned();
            let id = flow_id.to_string();
            Box::pin(async move { found.ok_or(FlowError::FlowNotFound(id)) })
        }
    }

    fn menu_snapshot() -> serde_json::Value {
        serde_json::json!({
            "nodes": [
                { "id": "1", "type": "start", "data": { "label": "Inicio" } },
                {
                    "id": "2",
                    "type": "defaultNode",
                    "data": {
                        "label": "Menú",
                        "actions": [{
                            "id": "a1",
                            "type": "single-option",
                            "config": { "question": "¿Color?", "options": ["Rojo", "Azul"] }
                        }]
                    }
                },
                { "id": "3", "type": "end", "data": { "label": "Fin" } }
            ],
            "edges": [
                { "id": "e1", "source": "1", "target": "2" },
                { "id": "e2", "source": "2", "sourceHandle": "a1-choice-0", "target": "3" },
                { "id": "e3", "source": "2", "sourceHandle": "a1-choice-1", "target": "3" }
            ]
        })
    }

    fn manager() -> SessionManager {
        let store = Arc::new(MemoryFlowStore::with_flow("f1", menu_snapshot()));
        let config = AppConfig::default();
        let catalog = catalog_from_config(&config);
        SessionManager::new(store, catalog, config)
    }

    #[tokio::test]
    async fn test_session_greets_then_runs_to_pause() {
        let manager = manager();
        let session = manager.open("p1", "f1").await.unwrap();

        let transcript = session.transcript().await;
        assert_eq!(transcript.len(), 1);
        assert!(transcript[0].content.contains("asistente virtual"));

        session.start().await.unwrap();
        assert_eq!(session.status().await, RunStatus::AwaitingInput);

        let choices = session.pending_choices().await;
        assert_eq!(choices.len(), 2);
        assert_eq!(choices[0].value, "Rojo");
        assert_eq!(choices[0].target.as_deref(), Some("3"));
    }

    #[tokio::test]
    async fn test_feed_input_completes_flow() {
        let manager = manager();
        let session = manager.open("p1", "f1").await.unwrap();
        session.start().await.unwrap();

        let outcome = session.feed_input("2").await.unwrap();
        assert_eq!(outcome, InputOutcome::Accepted);
        assert_eq!(session.status().await, RunStatus::Completed);

        let transcript = session.transcript().await;
        let contents: Vec<&str> = transcript.iter().map(|m| m.content.as_str()).collect();
        // greeting, question, user input, completion
        assert!(contents[1].contains("¿Color?"));
        assert_eq!(contents[2], "2");
        assert!(contents.last().unwrap().contains("Flujo completado"));
    }

    #[tokio::test]
    async fn test_input_rejected_after_completion() {
        let manager = manager();
        let session = manager.open("p1", "f1").await.unwrap();
        session.start().await.unwrap();
        session.feed_input("1").await.unwrap();

        let outcome = session.feed_input("1").await.unwrap();
        assert_eq!(
            outcome,
            InputOutcome::Rejected {
                status: RunStatus::Completed
            }
        );
    }

    #[tokio::test]
    async fn test_reset_restores_greeting_only() {
        let manager = manager();
        let session = manager.open("p1", "f1").await.unwrap();
        session.start().await.unwrap();
        session.feed_input("1").await.unwrap();

        session.reset().await;
        assert_eq!(session.status().await, RunStatus::Idle);
        let transcript = session.transcript().await;
        assert_eq!(transcript.len(), 1);
        assert!(transcript[0].content.contains("asistente virtual"));

        // A reset session can run again
        session.start().await.unwrap();
        assert_eq!(session.status().await, RunStatus::AwaitingInput);
    }

    #[tokio::test]
    async fn test_events_published_in_order() {
        let manager = manager();
        let mut rx = manager.bus().subscribe();
        let session = manager.open("p1", "f1").await.unwrap();

        session.start().await.unwrap();

        assert!(matches!(
            rx.recv().await.unwrap(),
            SessionEvent::SessionStarted { .. }
        ));
        assert!(matches!(
            rx.recv().await.unwrap(),
            SessionEvent::BotMessage { ref content, .. } if content.contains("¿Color?")
        ));
        // One NodeExecuted per node run in this burst: start, menu
        for expected in ["1", "2"] {
            match rx.recv().await.unwrap() {
                SessionEvent::NodeExecuted { node_id, succeeded, .. } => {
                    assert_eq!(node_id, expected);
                    assert!(succeeded);
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }
        match rx.recv().await.unwrap() {
            SessionEvent::AwaitingInput { node_id, choices, .. } => {
                assert_eq!(node_id, "2");
                assert_eq!(choices.len(), 2);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_manager_caches_sessions() {
        let manager = manager();
        let a = manager.open("p1", "f1").await.unwrap();
        let b = manager.open("p1", "f1").await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(manager.live().await, vec!["p1:f1"]);

        assert!(manager.close("p1", "f1").await);
        let c = manager.open("p1", "f1").await.unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[tokio::test]
    async fn test_unknown_flow_fails_open() {
        let manager = manager();
        let err = manager.open("p1", "missing").await.unwrap_err();
        assert!(matches!(err, FlowError::FlowNotFound(_)));
    }
}
