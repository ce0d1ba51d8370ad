use serde::{Deserialize, Serialize};

use autoflow_core::error::Result;

use super::edge::Edge;
use super::node::Node;

/// A user-authored automation. Immutable for the duration of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default, alias = "connections")]
    pub edges: Vec<Edge>,
}

fn default_enabled() -> bool {
    true
}

impl Workflow {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            enabled: true,
            nodes: vec![],
            edges: vec![],
        }
    }

    pub fn with_node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn with_edge(mut self, edge: Edge) -> Self {
        self.edges.push(edge);
        self
    }

    /// Parse a workflow from its JSON form.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GateCondition;

    #[test]
    fn test_builder() {
        let wf = Workflow::new("wf", "Morning routine")
            .with_node(Node::trigger("t", "Tap"))
            .with_node(Node::execute("a", "Say hi", "echo"))
            .with_edge(Edge::always("t", "a"));

        assert!(wf.enabled);
        assert_eq!(wf.nodes.len(), 2);
        assert_eq!(wf.node("a").map(|n| n.name.as_str()), Some("Say hi"));
        assert!(wf.node("zzz").is_none());
    }

    #[test]
    fn test_from_json_accepts_connections_alias() {
        let json = r#"{
            "id": "wf",
            "name": "Test",
            "nodes": [
                {"id": "t", "name": "Trigger", "type": "trigger", "trigger_type": "manual"},
                {"id": "a", "name": "Act", "type": "execute", "action_type": ""}
            ],
            "connections": [
                {"source_node_id": "t", "target_node_id": "a", "condition": "on_success"}
            ]
        }"#;
        let wf = Workflow::from_json(json).unwrap();
        assert!(wf.enabled);
        assert_eq!(wf.edges.len(), 1);
        assert_eq!(wf.edges[0].gate, GateCondition::OnSuccess);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(Workflow::from_json("{\"id\": 3}").is_err());
    }
}
