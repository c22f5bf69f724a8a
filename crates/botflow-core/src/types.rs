use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique session identifier.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_str(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who produced a transcript entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageOrigin {
    User,
    Bot,
    System,
}

/// A single entry in a conversation transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptMessage {
    #[serde(rename = "type")]
    pub origin: MessageOrigin,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "nodeId", skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl TranscriptMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            origin: MessageOrigin::User,
            content: text.into(),
            timestamp: Utc::now(),
            node_id: None,
            status: None,
        }
    }

    pub fn bot(text: impl Into<String>, node_id: Option<String>) -> Self {
        Self {
            origin: MessageOrigin::Bot,
            content: text.into(),
            timestamp: Utc::now(),
            node_id,
            status: None,
        }
    }

    pub fn system(text: impl Into<String>, node_id: Option<String>) -> Self {
        Self {
            origin: MessageOrigin::System,
            content: text.into(),
            timestamp: Utc::now(),
            node_id,
            status: Some("error".to_string()),
        }
    }
}

/// Lifecycle state of a live run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RunStatus {
    #[default]
    Idle,
    Running,
    AwaitingInput,
    Completed,
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::AwaitingInput => "awaiting-input",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Overall status of a stateless flow execution report.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FlowStatus {
    Success,
    Failed,
    Error,
    Empty,
}

/// One selectable option offered by an interactive node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingChoice {
    pub value: String,
    /// Target node if this choice is wired to a dedicated edge handle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl PendingChoice {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            target: None,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }
}
