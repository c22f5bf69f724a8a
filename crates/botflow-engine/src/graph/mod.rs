//! Conversation-flow graph model.
//!
//! Pure, immutable-per-run description of a flow: nodes, directed edges, and
//! per-node actions. All structural invariants are checked at construction so
//! a run never has to deal with a malformed graph.

mod edge;
mod node;

pub use edge::Edge;
pub use node::{Node, NodeKind};

use std::collections::HashMap;

use botflow_core::error::{FlowError, Result};

/// A validated conversation flow graph.
///
/// Immutable once built; safe to share read-only across sessions via `Arc`.
/// Edge declaration order is preserved and used as the deterministic
/// tie-break during traversal.
#[derive(Debug, Clone)]
pub struct FlowGraph {
    nodes: HashMap<String, Node>,
    /// Node ids in declaration order.
    order: Vec<String>,
    edges: Vec<Edge>,
    start_id: String,
}

impl FlowGraph {
    /// Build and validate a graph.
    ///
    /// Fails if there is not exactly one start node, if any edge references
    /// an unknown node, if a start node has incoming edges, or if an end
    /// node has outgoing edges. Orphan nodes are legal; they never execute.
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Result<Self> {
        let order: Vec<String> = nodes.iter().map(|n| n.id.clone()).collect();
        let node_map: HashMap<String, Node> =
            nodes.into_iter().map(|n| (n.id.clone(), n)).collect();

        let start_ids: Vec<&String> = order
            .iter()
            .filter(|id| {
                node_map
                    .get(*id)
                    .is_some_and(|n| n.kind == NodeKind::Start)
            })
            .collect();

        let start_id = match start_ids.as_slice() {
            [] => return Err(FlowError::MissingStartNode),
            [one] => (*one).clone(),
            many => {
                return Err(FlowError::DuplicateStartNode { count: many.len() });
            }
        };

        for edge in &edges {
            for endpoint in [&edge.source, &edge.target] {
                if !node_map.contains_key(endpoint) {
                    return Err(FlowError::DanglingEdge {
                        edge: edge.id.clone(),
                        node: endpoint.clone(),
                    });
                }
            }

            if node_map[&edge.target].kind == NodeKind::Start {
                return Err(FlowError::StartNodeHasIncoming {
                    node: edge.target.clone(),
                });
            }
            if node_map[&edge.source].kind == NodeKind::End {
                return Err(FlowError::EndNodeHasOutgoing {
                    node: edge.source.clone(),
                });
            }
        }

        Ok(Self {
            nodes: node_map,
            order,
            edges,
            start_id,
        })
    }

    /// Look up a node by id.
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Look up a node by id, failing with `NodeNotFound`.
    pub fn node_or_err(&self, id: &str) -> Result<&Node> {
        self.nodes
            .get(id)
            .ok_or_else(|| FlowError::NodeNotFound(id.to_string()))
    }

    /// The unique start node.
    pub fn start_node(&self) -> &Node {
        // Invariant: validated at construction
        &self.nodes[&self.start_id]
    }

    /// Outgoing edges of a node, in declaration order.
    pub fn outgoing(&self, node_id: &str) -> Vec<&Edge> {
        self.edges.iter().filter(|e| e.source == node_id).collect()
    }

    /// Number of nodes in the graph (orphans included).
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Ids of all end nodes.
    pub fn end_node_ids(&self) -> Vec<&str> {
        self.order
            .iter()
            .filter(|id| self.nodes[*id].kind == NodeKind::End)
            .map(String::as_str)
            .collect()
    }

    /// All node ids in declaration order.
    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_graph() -> FlowGraph {
        FlowGraph::new(
            vec![
                Node::start("start"),
                Node::action("n1").with_label("Paso 1"),
                Node::end("end"),
            ],
            vec![Edge::new("e1", "start", "n1"), Edge::new("e2", "n1", "end")],
        )
        .unwrap()
    }

    #[test]
    fn test_valid_graph() {
        let g = linear_graph();
        assert_eq!(g.start_node().id, "start");
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.end_node_ids(), vec!["end"]);
        assert_eq!(g.node("n1").unwrap().label, "Paso 1");
    }

    #[test]
    fn test_missing_start_node() {
        let err = FlowGraph::new(vec![Node::end("end")], vec![]).unwrap_err();
        assert!(matches!(err, FlowError::MissingStartNode));
    }

    #[test]
    fn test_duplicate_start_node() {
        let err = FlowGraph::new(
            vec![Node::start("s1"), Node::start("s2")],
            vec![],
        )
        .unwrap_err();
        assert!(matches!(err, FlowError::DuplicateStartNode { count: 2 }));
    }

    #[test]
    fn test_dangling_edge() {
        let err = FlowGraph::new(
            vec![Node::start("start")],
            vec![Edge::new("e1", "start", "ghost")],
        )
        .unwrap_err();
        match err {
            FlowError::DanglingEdge { edge, node } => {
                assert_eq!(edge, "e1");
                assert_eq!(node, "ghost");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_start_with_incoming_rejected() {
        let err = FlowGraph::new(
            vec![Node::start("start"), Node::action("n1")],
            vec![
                Edge::new("e1", "start", "n1"),
                Edge::new("e2", "n1", "start"),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, FlowError::StartNodeHasIncoming { .. }));
    }

    #[test]
    fn test_end_with_outgoing_rejected() {
        let err = FlowGraph::new(
            vec![Node::start("start"), Node::end("end"), Node::action("n1")],
            vec![
                Edge::new("e1", "start", "end"),
                Edge::new("e2", "end", "n1"),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, FlowError::EndNodeHasOutgoing { .. }));
    }

    #[test]
    fn test_orphan_nodes_are_legal() {
        let g = FlowGraph::new(
            vec![
                Node::start("start"),
                Node::end("end"),
                Node::action("orphan"),
            ],
            vec![Edge::new("e1", "start", "end")],
        )
        .unwrap();
        assert_eq!(g.node_count(), 3);
        assert!(g.outgoing("orphan").is_empty());
    }

    #[test]
    fn test_outgoing_preserves_declaration_order() {
        let g = FlowGraph::new(
            vec![
                Node::start("start"),
                Node::action("n1"),
                Node::end("a"),
                Node::end("b"),
                Node::end("c"),
            ],
            vec![
                Edge::new("e0", "start", "n1"),
                Edge::new("e1", "n1", "a"),
                Edge::new("e2", "n1", "b"),
                Edge::new("e3", "n1", "c"),
            ],
        )
        .unwrap();

        let targets: Vec<&str> = g.outgoing("n1").iter().map(|e| e.target.as_str()).collect();
        assert_eq!(targets, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_self_loop_allowed() {
        let g = FlowGraph::new(
            vec![Node::start("start"), Node::action("n1")],
            vec![
                Edge::new("e1", "start", "n1"),
                Edge::new("e2", "n1", "n1"),
            ],
        )
        .unwrap();
        assert_eq!(g.outgoing("n1")[0].target, "n1");
    }
}
