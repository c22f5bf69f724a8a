use serde::{Deserialize, Serialize};

use crate::catalog::Action;

/// Kind of a graph node.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Start,
    End,
    Action,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::End => "end",
            Self::Action => "action",
        }
    }
}

/// A node in a conversation flow graph.
///
/// Nodes are pure serializable data: an ordered list of actions plus a
/// display label. The label is behaviorally irrelevant except as the legacy
/// fallback for affirmative/negative branch routing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier within the graph.
    pub id: String,
    /// Node kind: start, end, or action.
    pub kind: NodeKind,
    /// Human-readable label, carried through unchanged.
    #[serde(default)]
    pub label: String,
    /// Actions executed in order when the node runs (empty for start/end).
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl Node {
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            kind,
            label: String::new(),
            actions: vec![],
        }
    }

    pub fn start(id: impl Into<String>) -> Self {
        Self::new(id, NodeKind::Start)
    }

    pub fn end(id: impl Into<String>) -> Self {
        Self::new(id, NodeKind::End)
    }

    pub fn action(id: impl Into<String>) -> Self {
        Self::new(id, NodeKind::Action)
    }

    /// Set the display label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Append an action.
    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    /// Set the full action list.
    pub fn with_actions(mut self, actions: Vec<Action>) -> Self {
        self.actions = actions;
        self
    }

    /// Whether any of this node's actions pauses the run for user input.
    pub fn requires_input(&self) -> bool {
        self.actions.iter().any(|a| a.kind.is_interactive())
    }

    /// The last interactive action, if any — the one a paused run is
    /// waiting on, and the source of pending choices and branch keys.
    pub fn interactive_action(&self) -> Option<&Action> {
        self.actions.iter().rev().find(|a| a.kind.is_interactive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ActionKind;

    #[test]
    fn test_node_builder() {
        let node = Node::action("n1")
            .with_label("Menú principal")
            .with_action(Action::new(
                "a1",
                ActionKind::SendText {
                    message: "Bienvenido".into(),
                    delay: 0,
                },
            ));

        assert_eq!(node.id, "n1");
        assert_eq!(node.kind, NodeKind::Action);
        assert_eq!(node.label, "Menú principal");
        assert_eq!(node.actions.len(), 1);
        assert!(!node.requires_input());
    }

    #[test]
    fn test_requires_input() {
        let node = Node::action("n1")
            .with_action(Action::new(
                "a1",
                ActionKind::SendText {
                    message: "Elige:".into(),
                    delay: 0,
                },
            ))
            .with_action(Action::new(
                "a2",
                ActionKind::SingleOption {
                    question: "¿Color?".into(),
                    options: vec!["Rojo".into(), "Azul".into()],
                },
            ));

        assert!(node.requires_input());
        let waiting = node.interactive_action().unwrap();
        assert_eq!(waiting.id, "a2");
    }

    #[test]
    fn test_start_end_have_no_actions() {
        assert!(Node::start("start").actions.is_empty());
        assert!(Node::end("end").actions.is_empty());
    }
}
