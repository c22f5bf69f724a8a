//! Flow snapshot decoding: the editor's exported JSON shape.
//!
//! The editor exports graphs in a canvas-oriented format (camelCase keys,
//! `data` envelopes, position metadata, loosely-typed action configs). This
//! module tolerates that looseness — unknown node types become plain action
//! nodes, unknown action types degrade to [`ActionKind::Other`], and missing
//! config fields take catalog defaults — then hands off to [`FlowGraph`]
//! for strict structural validation.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use botflow_core::error::Result;

use crate::catalog::{Action, ActionKind};
use crate::graph::{Edge, FlowGraph, Node, NodeKind};

/// A raw flow graph as exported by the editor, prior to validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlowSnapshot {
    #[serde(default)]
    pub nodes: Vec<SnapshotNode>,
    #[serde(default, alias = "connections")]
    pub edges: Vec<SnapshotEdge>,
}

/// One node in the editor export. Canvas metadata (position, dimensions,
/// selection state) is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotNode {
    pub id: String,
    #[serde(default, alias = "node_type")]
    pub r#type: String,
    #[serde(default)]
    pub data: SnapshotNodeData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnapshotNodeData {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub actions: Vec<Value>,
}

/// One edge in the editor export.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotEdge {
    #[serde(default)]
    pub id: String,
    pub source: String,
    #[serde(default, alias = "source_handle", rename = "sourceHandle")]
    pub source_handle: Option<String>,
    pub target: String,
    #[serde(default, alias = "target_handle", rename = "targetHandle")]
    pub target_handle: Option<String>,
}

impl FlowSnapshot {
    /// Parse an editor export from JSON text.
    pub fn parse(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse an editor export from an already-decoded JSON value.
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Lower the snapshot into a validated [`FlowGraph`].
    pub fn into_graph(self) -> Result<FlowGraph> {
        let nodes: Vec<Node> = self.nodes.into_iter().map(decode_node).collect();
        let edges: Vec<Edge> = self
            .edges
            .into_iter()
            .enumerate()
            .map(|(i, e)| decode_edge(e, i))
            .collect();
        FlowGraph::new(nodes, edges)
    }
}

fn decode_node(raw: SnapshotNode) -> Node {
    let kind = match raw.r#type.as_str() {
        "start" | "startNode" | "StartNode" => NodeKind::Start,
        "end" | "endNode" | "EndNode" => NodeKind::End,
        other => {
            if !matches!(other, "action" | "defaultNode" | "ActionNode") {
                debug!(node_id = %raw.id, node_type = other, "Unrecognized node type, treating as action node");
            }
            NodeKind::Action
        }
    };

    let actions = raw
        .data
        .actions
        .iter()
        .enumerate()
        .map(|(i, v)| decode_action(v, i))
        .collect();

    Node::new(raw.id, kind)
        .with_label(raw.data.label)
        .with_actions(actions)
}

/// Decode one loosely-typed action value.
///
/// Known types parse into their typed config (absent fields take catalog
/// defaults); unknown types degrade to `Other` and never fail the load.
fn decode_action(raw: &Value, idx: usize) -> Action {
    let id = raw
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("action-{idx}"));
    let type_name = raw
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("send-text")
        .to_string();
    let config = raw
        .get("config")
        .cloned()
        .unwrap_or_else(|| serde_json::json!({}));

    let kind = serde_json::from_value::<ActionKind>(
        serde_json::json!({ "type": &type_name, "config": config }),
    )
    // Unit-config types reject a config map; retry without one.
    .or_else(|_| serde_json::from_value(serde_json::json!({ "type": &type_name })))
    .unwrap_or(ActionKind::Other { kind: type_name });

    Action::new(id, kind)
}

fn decode_edge(raw: SnapshotEdge, idx: usize) -> Edge {
    let mut edge = Edge::new(
        if raw.id.is_empty() {
            format!("edge-{idx}")
        } else {
            raw.id
        },
        raw.source,
        raw.target,
    );
    edge.source_handle = raw.source_handle;
    edge.target_handle = raw.target_handle;
    edge
}
