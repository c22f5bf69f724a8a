//! Traversal resolver: the canonical next-node decision.
//!
//! Both the live-session path and the stateless test-execution path route
//! through this module, so branch selection behaves identically everywhere.
//! Explicit edge handles win; the affirmative/negative label heuristics and
//! numeric menu indices are the legacy fallback for graphs the editor wired
//! without handles. Ties always break by edge declaration order — a
//! documented policy, not an error.

use std::collections::HashMap;

use botflow_core::config::RoutingConfig;

use crate::catalog::{Action, ActionKind};
use crate::graph::{FlowGraph, Node};

/// Outcome of a routing decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routing {
    /// Transition to this node.
    Next(String),
    /// No outgoing edges — the flow is exhausted.
    Complete,
}

/// Select the next node from `node`.
///
/// `branch_key` is the explicit branch derived from the node's awaiting
/// action (or produced by a branching action like `ai-transition`);
/// `user_input` is the raw text that resumed the run, if any.
pub fn resolve(
    graph: &FlowGraph,
    cfg: &RoutingConfig,
    node: &Node,
    branch_key: Option<&str>,
    user_input: Option<&str>,
) -> Routing {
    let outgoing = graph.outgoing(&node.id);
    if outgoing.is_empty() {
        return Routing::Complete;
    }

    // Explicit branch handles take precedence over every heuristic.
    if let Some(key) = branch_key {
        if let Some(edge) = outgoing.iter().find(|e| e.matches_branch(key)) {
            return Routing::Next(edge.target.clone());
        }
    }

    let input = match user_input {
        Some(text) => normalize(text),
        // No input supplied: deterministic default is the first declared edge.
        None => return Routing::Next(outgoing[0].target.clone()),
    };

    if cfg.affirmative_inputs.iter().any(|a| *a == input) {
        if let Some(edge) = outgoing
            .iter()
            .find(|e| label_has_marker(graph, &e.target, &cfg.affirmative_markers))
        {
            return Routing::Next(edge.target.clone());
        }
    }

    if cfg.negative_inputs.iter().any(|n| *n == input) {
        if let Some(edge) = outgoing
            .iter()
            .find(|e| label_has_marker(graph, &e.target, &cfg.negative_markers))
        {
            return Routing::Next(edge.target.clone());
        }
    }

    // Numbered-menu selection: "n" picks the (n-1)-th declared edge.
    if let Ok(n) = input.parse::<usize>() {
        if (1..=outgoing.len()).contains(&n) {
            return Routing::Next(outgoing[n - 1].target.clone());
        }
    }

    // Every input leads somewhere: fall back to the first declared edge.
    Routing::Next(outgoing[0].target.clone())
}

/// Derive the explicit branch key for an interactive action given the
/// user's input. Returns `None` when the input matches no named branch,
/// letting `resolve` fall through to the label/index heuristics.
pub fn branch_key_for(
    action: &Action,
    input: &str,
    variables: &HashMap<String, serde_json::Value>,
    cfg: &RoutingConfig,
) -> Option<String> {
    let normalized = normalize(input);

    match &action.kind {
        ActionKind::SingleOption { options, .. } => {
            option_index(options, &normalized).map(|i| format!("choice-{i}"))
        }
        ActionKind::MultipleOptions { options, .. } => {
            // Multi-selects route on the first recognized option.
            normalized
                .split([',', ' '])
                .filter(|part| !part.is_empty())
                .find_map(|part| option_index(options, part.trim()))
                .map(|i| format!("choice-{i}"))
        }
        ActionKind::Boolean { .. } | ActionKind::Confirmation { .. } => {
            if cfg.affirmative_inputs.iter().any(|a| *a == normalized) {
                Some("yes".to_string())
            } else if cfg.negative_inputs.iter().any(|n| *n == normalized) {
                Some("no".to_string())
            } else {
                None
            }
        }
        ActionKind::Intent { intents, .. } => intents
            .iter()
            .find(|intent| {
                let name = intent.name.to_lowercase();
                normalized.contains(&name)
                    || intent
                        .examples
                        .iter()
                        .any(|ex| normalized == ex.to_lowercase())
            })
            .map(|intent| intent.name.clone()),
        ActionKind::Expression { expression } => {
            let key = if evaluate_condition(expression, variables) {
                "true"
            } else {
                "false"
            };
            Some(key.to_string())
        }
        _ => None,
    }
}

fn normalize(input: &str) -> String {
    input.trim().to_lowercase()
}

fn label_has_marker(graph: &FlowGraph, node_id: &str, markers: &[String]) -> bool {
    let Some(node) = graph.node(node_id) else {
        return false;
    };
    let label = node.label.to_lowercase();
    markers.iter().any(|m| label.contains(&m.to_lowercase()))
}

/// Match the input against an option list: by 1-based number, or by
/// case-insensitive option text.
fn option_index(options: &[String], input: &str) -> Option<usize> {
    if let Ok(n) = input.parse::<usize>() {
        if (1..=options.len()).contains(&n) {
            return Some(n - 1);
        }
    }
    options.iter().position(|opt| opt.to_lowercase() == input)
}

/// Evaluate a simple conditional expression against run variables.
///
/// Supported expressions:
/// - `key == "value"` — exact match
/// - `key != "value"` — not equal
/// - `key contains "substr"` — substring match
///
/// Returns `false` for unparseable expressions.
pub fn evaluate_condition(
    expr: &str,
    variables: &HashMap<String, serde_json::Value>,
) -> bool {
    let expr = expr.trim();

    // key contains "value"
    if let Some((key, substr)) = parse_operator(expr, "contains") {
        return variables
            .get(key)
            .and_then(|v| v.as_str())
            .is_some_and(|s| s.contains(substr));
    }

    // key != "value"
    if let Some((key, value)) = parse_operator(expr, "!=") {
        return variables
            .get(key)
            .and_then(|v| v.as_str())
            .is_some_and(|s| s != value);
    }

    // key == "value"
    if let Some((key, value)) = parse_operator(expr, "==") {
        return variables
            .get(key)
            .and_then(|v| v.as_str())
            .is_some_and(|s| s == value);
    }

    false
}

/// Parse `key OP "value"` expressions, returning (key, value).
fn parse_operator<'a>(expr: &'a str, op: &str) -> Option<(&'a str, &'a str)> {
    let parts: Vec<&str> = expr.splitn(2, op).collect();
    if parts.len() != 2 {
        return None;
    }
    let key = parts[0].trim();
    let val = parts[1].trim().trim_matches('"');
    Some((key, val))
}
