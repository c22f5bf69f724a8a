use crate::types::{PendingChoice, SessionId};

/// Session event broadcast to all subscribers.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A run started on a session.
    SessionStarted { session_id: SessionId },
    /// The bot appended a message to the transcript.
    BotMessage { session_id: SessionId, content: String, node_id: Option<String> },
    /// The user's input was accepted into the transcript.
    UserMessage { session_id: SessionId, content: String },
    /// The run paused on an interactive node.
    AwaitingInput { session_id: SessionId, node_id: String, choices: Vec<PendingChoice> },
    /// A node finished executing.
    NodeExecuted { session_id: SessionId, node_id: String, succeeded: bool },
    /// The run reached the end of the graph.
    RunCompleted { session_id: SessionId },
    /// The run failed (e.g. cycle limit exceeded).
    RunFailed { session_id: SessionId, reason: String },
    /// The session was reset to its initial state.
    SessionReset { session_id: SessionId },
}

/// Event bus using tokio broadcast channel.
/// All subscribers receive all events.
#[derive(Debug)]
pub struct EventBus {
    tx: tokio::sync::broadcast::Sender<SessionEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = tokio::sync::broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: SessionEvent) {
        // Ignore error if no receivers
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
