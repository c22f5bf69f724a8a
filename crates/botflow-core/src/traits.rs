use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Summary record for a stored flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowSummary {
    pub id: String,
    pub name: String,
    pub project_id: String,
}

/// AI collaborator — opaque text completion.
///
/// The engine never interprets the result beyond using it as a message.
pub trait AiClient: Send + Sync + 'static {
    /// Run a task/prompt and return the textual result.
    fn complete(&self, prompt: &str) -> BoxFuture<'_, Result<String>>;
}

/// Record store collaborator — database-style CRUD used by record actions.
///
/// Each operation returns a human-readable summary of what happened; the
/// engine forwards that string into the transcript.
pub trait RecordStore: Send + Sync + 'static {
    fn get(&self, entity: &str, id: &str) -> BoxFuture<'_, Result<String>>;

    fn insert(&self, entity: &str, payload: serde_json::Value) -> BoxFuture<'_, Result<String>>;

    fn update(&self, entity: &str, id: &str, payload: serde_json::Value)
        -> BoxFuture<'_, Result<String>>;

    fn delete(&self, entity: &str, id: &str) -> BoxFuture<'_, Result<String>>;

    fn find(&self, entity: &str, query: &str) -> BoxFuture<'_, Result<String>>;
}

/// Flow/project persistence collaborator.
///
/// Flow definitions travel as JSON snapshot payloads (the same shape the
/// editor canvas produces); decoding into a graph happens engine-side.
pub trait FlowStore: Send + Sync + 'static {
    /// Create a project, returning its id.
    fn create_project(&self, name: &str) -> BoxFuture<'_, Result<String>>;

    /// Create a flow under a project, returning its summary.
    fn create_flow(
        &self,
        project_id: &str,
        name: &str,
        snapshot: serde_json::Value,
    ) -> BoxFuture<'_, Result<FlowSummary>>;

    /// Replace the stored snapshot for a flow.
    fn update_flow(&self, flow_id: &str, snapshot: serde_json::Value) -> BoxFuture<'_, Result<()>>;

    /// List flows belonging to a project.
    fn flows_by_project(&self, project_id: &str) -> BoxFuture<'_, Result<Vec<FlowSummary>>>;

    /// Fetch the snapshot payload for a flow.
    fn get_flow(&self, flow_id: &str) -> BoxFuture<'_, Result<serde_json::Value>>;
}
