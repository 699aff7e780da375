use crate::types::{Feedback, UiSpec};
use std::collections::{HashMap, HashSet};

/// Client-local state of one rendered node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeInteraction {
    /// `None` until the user toggles; the node's default applies.
    pub expanded: Option<bool>,
    pub feedback: Option<Feedback>,
}

/// Per-node interaction state, keyed by node id and scoped to the displayed spec.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InteractionState {
    nodes: HashMap<String, NodeInteraction>,
}

impl InteractionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, node_id: &str) -> Option<&NodeInteraction> {
        self.nodes.get(node_id)
    }

    pub fn is_expanded(&self, node_id: &str, default_expanded: bool) -> bool {
        self.nodes
            .get(node_id)
            .and_then(|node| node.expanded)
            .unwrap_or(default_expanded)
    }

    pub fn set_expanded(&mut self, node_id: &str, expanded: bool) {
        self.nodes.entry(node_id.to_string()).or_default().expanded = Some(expanded);
    }

    pub fn feedback(&self, node_id: &str) -> Option<Feedback> {
        self.nodes.get(node_id).and_then(|node| node.feedback)
    }

    pub fn set_feedback(&mut self, node_id: &str, value: Feedback) {
        self.nodes.entry(node_id.to_string()).or_default().feedback = Some(value);
    }

    /// Drops state for nodes that are not part of `spec`.
    pub fn retain_nodes_of(&mut self, spec: &UiSpec) {
        let live: HashSet<&str> = spec.node_ids().into_iter().collect();
        self.nodes.retain(|id, _| live.contains(id.as_str()));
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::spec_parser::parse_spec;

    #[test]
    fn test_expanded_defaults_until_set() {
        let mut state = InteractionState::new();
        assert!(state.is_expanded("card-1", true));
        assert!(!state.is_expanded("card-2", false));

        state.set_expanded("card-1", false);
        assert!(!state.is_expanded("card-1", true));
        state.set_expanded("card-2", true);
        assert!(state.is_expanded("card-2", false));
    }

    #[test]
    fn test_feedback_is_per_node() {
        let mut state = InteractionState::new();
        state.set_feedback("rec-1", Feedback::Positive);
        assert_eq!(state.feedback("rec-1"), Some(Feedback::Positive));
        assert_eq!(state.feedback("rec-2"), None);

        state.set_feedback("rec-1", Feedback::Negative);
        assert_eq!(state.feedback("rec-1"), Some(Feedback::Negative));
    }

    #[test]
    fn test_retain_drops_vanished_ids() {
        let mut state = InteractionState::new();
        state.set_feedback("rec-1", Feedback::Positive);
        state.set_expanded("gone", false);

        let spec = parse_spec(
            r#"{"components":[{"id":"rec-1","type":"recommendation"},{"type":"card"}]}"#,
        )
        .unwrap();
        state.retain_nodes_of(&spec);

        assert_eq!(state.len(), 1);
        assert_eq!(state.feedback("rec-1"), Some(Feedback::Positive));
        assert!(state.get("gone").is_none());
    }
}
