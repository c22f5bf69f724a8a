//! Flow execution engine for botflow.
//!
//! Decodes editor-exported flow snapshots into validated graphs, executes
//! them as live chat sessions or stateless test runs, and reports per-node
//! execution traces.

pub mod catalog;
pub mod engine;
pub mod graph;
pub mod resolver;
pub mod session;
pub mod snapshot;
pub mod trace;

pub use catalog::{Action, ActionKind, ActionResult, Catalog};
pub use engine::{ExecutionEngine, InputOutcome, RunState};
pub use graph::{Edge, FlowGraph, Node, NodeKind};
pub use resolver::Routing;
pub use session::{Session, SessionManager};
pub use snapshot::FlowSnapshot;
pub use trace::{FlowExecutionReport, NodeExecutionResult, NodeExecutionStatus};
