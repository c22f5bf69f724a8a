use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowError {
    // Graph structure errors — fatal, surfaced before any run starts
    #[error("Flow must have at least one start node")]
    MissingStartNode,

    #[error("Flow has {count} start nodes, expected exactly one")]
    DuplicateStartNode { count: usize },

    #[error("Edge '{edge}' references unknown node '{node}'")]
    DanglingEdge { edge: String, node: String },

    #[error("Start node '{node}' has incoming edges")]
    StartNodeHasIncoming { node: String },

    #[error("End node '{node}' has outgoing edges")]
    EndNodeHasOutgoing { node: String },

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Flow must have at least one end node")]
    MissingEndNode,

    // Action errors — non-fatal at the run level
    #[error("Unknown action type: {0}")]
    UnknownAction(String),

    #[error("Action execution failed: {node}: {message}")]
    ActionExecution { node: String, message: String },

    #[error("Action timeout after {timeout_secs}s: {node}")]
    ActionTimeout { node: String, timeout_secs: u64 },

    // Run errors — fatal to the run, not the session
    #[error("Cycle limit exceeded at node '{node}' (limit {limit})")]
    CycleLimitExceeded { node: String, limit: usize },

    // Store errors
    #[error("Flow store error: {0}")]
    Store(String),

    #[error("Flow not found: {0}")]
    FlowNotFound(String),

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FlowError>;
