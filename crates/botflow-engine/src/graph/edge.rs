use serde::{Deserialize, Serialize};

/// A directed connection between two nodes.
///
/// `source_handle` identifies which output port the edge leaves from when a
/// node's action exposes multiple named branches (one handle per choice in a
/// `single-option` action, `yes`/`no` for boolean actions, and so on).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    /// Unique identifier within the graph.
    pub id: String,
    /// Source node id.
    pub source: String,
    /// Named output port on the source node, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    /// Target node id.
    pub target: String,
    /// Named input port on the target node, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
}

impl Edge {
    /// Create a plain edge with no handles.
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            source_handle: None,
            target: target.into(),
            target_handle: None,
        }
    }

    /// Set the source output handle.
    pub fn with_handle(mut self, handle: impl Into<String>) -> Self {
        self.source_handle = Some(handle.into());
        self
    }

    /// Whether this edge leaves from the named branch.
    ///
    /// Exact match, or the handle ends with the key (the editor emits
    /// composite handles like `a2-choice-1`).
    pub fn matches_branch(&self, key: &str) -> bool {
        match &self.source_handle {
            Some(handle) => handle == key || handle.ends_with(key),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_builder() {
        let e = Edge::new("e1", "a", "b");
        assert_eq!(e.source, "a");
        assert_eq!(e.target, "b");
        assert!(e.source_handle.is_none());

        let e = Edge::new("e2", "a", "c").with_handle("choice-0");
        assert_eq!(e.source_handle.as_deref(), Some("choice-0"));
    }

    #[test]
    fn test_matches_branch() {
        let e = Edge::new("e1", "a", "b").with_handle("choice-1");
        assert!(e.matches_branch("choice-1"));
        assert!(!e.matches_branch("choice-0"));

        // Composite editor handles keep the choice key as a suffix
        let e = Edge::new("e2", "a", "c").with_handle("a2-choice-0");
        assert!(e.matches_branch("choice-0"));

        let plain = Edge::new("e3", "a", "d");
        assert!(!plain.matches_branch("choice-0"));
    }

    #[test]
    fn test_self_loop_is_representable() {
        let e = Edge::new("e1", "n1", "n1");
        assert_eq!(e.source, e.target);
    }
}
