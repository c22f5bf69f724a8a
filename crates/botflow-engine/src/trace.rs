use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use botflow_core::types::FlowStatus;

/// Per-node execution status in a trace.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NodeExecutionStatus {
    Success,
    Error,
    Skipped,
}

/// Result of executing a single node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeExecutionResult {
    pub node_id: String,
    pub node_type: String,
    pub status: NodeExecutionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub execution_time_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl NodeExecutionResult {
    pub fn success(
        node_id: impl Into<String>,
        node_type: impl Into<String>,
        output: Option<String>,
        execution_time_ms: u64,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            node_type: node_type.into(),
            status: NodeExecutionStatus::Success,
            output,
            error: None,
            execution_time_ms,
            timestamp: Utc::now(),
        }
    }

    pub fn error(
        node_id: impl Into<String>,
        node_type: impl Into<String>,
        error: impl Into<String>,
        execution_time_ms: u64,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            node_type: node_type.into(),
            status: NodeExecutionStatus::Error,
            output: None,
            error: Some(error.into()),
            execution_time_ms,
            timestamp: Utc::now(),
        }
    }
}

/// Full trace of one flow execution, in the external wire shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowExecutionReport {
    pub flow_id: String,
    pub flow_name: String,
    pub status: FlowStatus,
    pub node_results: Vec<NodeExecutionResult>,
    pub total_execution_time_ms: u64,
    pub total_nodes: usize,
    pub successful_nodes: usize,
    pub failed_nodes: usize,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FlowExecutionReport {
    /// Assemble a report; node counts are derived from the results.
    pub fn new(
        flow_id: impl Into<String>,
        flow_name: impl Into<String>,
        status: FlowStatus,
        node_results: Vec<NodeExecutionResult>,
        started_at: DateTime<Utc>,
        error: Option<String>,
    ) -> Self {
        let completed_at = Utc::now();
        let total_execution_time_ms = (completed_at - started_at)
            .num_milliseconds()
            .max(0) as u64;
        let successful_nodes = node_results
            .iter()
            .filter(|r| r.status == NodeExecutionStatus::Success)
            .count();
        let failed_nodes = node_results
            .iter()
            .filter(|r| r.status == NodeExecutionStatus::Error)
            .count();

        Self {
            flow_id: flow_id.into(),
            flow_name: flow_name.into(),
            status,
            total_nodes: node_results.len(),
            successful_nodes,
            failed_nodes,
            node_results,
            total_execution_time_ms,
            started_at,
            completed_at,
            error,
        }
    }
}
