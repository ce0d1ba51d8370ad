use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use autoflow_core::error::{FlowError, Result};

use super::edge::Edge;
use super::node::Node;
use super::workflow::Workflow;

/// Validated, immutable arena view of a workflow.
pub struct WorkflowGraph {
    workflow_id: String,
    workflow_name: String,
    graph: DiGraph<Node, Edge>,
    node_indices: HashMap<String, NodeIndex>,
    /// Nodes whose output each node reads through references.
    references: Vec<Vec<NodeIndex>>,
    /// Reverse of `references`.
    referenced_by: Vec<Vec<NodeIndex>>,
}

impl WorkflowGraph {
    /// Build and validate the graph for a workflow.
    pub fn build(workflow: &Workflow) -> Result<Self> {
        let mut graph = DiGraph::with_capacity(workflow.nodes.len(), workflow.edges.len());
        let mut node_indices = HashMap::with_capacity(workflow.nodes.len());

        for node in &workflow.nodes {
            if node_indices.contains_key(&node.id) {
                return Err(FlowError::DuplicateNode(node.id.clone()));
            }
            let idx = graph.add_node(node.clone());
            node_indices.insert(node.id.clone(), idx);
        }

        for edge in &workflow.edges {
            let lookup = |id: &str| {
                node_indices
                    .get(id)
                    .copied()
                    .ok_or_else(|| FlowError::DanglingEdge {
                        source_id: edge.source.clone(),
                        target_id: edge.target.clone(),
                        missing: id.to_string(),
                    })
            };
            let source = lookup(&edge.source)?;
            let target = lookup(&edge.target)?;

            if graph[target].is_trigger() {
                return Err(FlowError::EdgeIntoTrigger {
                    source_id: edge.source.clone(),
                    target_id: edge.target.clone(),
                });
            }

            graph.add_edge(source, target, edge.clone());
        }

        let mut references = vec![Vec::new(); graph.node_count()];
        let mut referenced_by = vec![Vec::new(); graph.node_count()];
        for idx in graph.node_indices() {
            let node = &graph[idx];
            for referenced in node.references() {
                let source = node_indices.get(referenced).copied().ok_or_else(|| {
                    FlowError::DanglingReference {
                        node: node.id.clone(),
                        missing: referenced.to_string(),
                    }
                })?;
                references[idx.index()].push(source);
                referenced_by[source.index()].push(idx);
            }
        }

        // References order execution too, so they take part in the cycle check
        let mut dependencies = graph.map(|_, _| (), |_, _| ());
        for (idx, sources) in references.iter().enumerate() {
            for &source in sources {
                dependencies.add_edge(source, NodeIndex::new(idx), ());
            }
        }
        if let Err(cycle) = petgraph::algo::toposort(&dependencies, None) {
            return Err(FlowError::Cycle(graph[cycle.node_id()].id.clone()));
        }

        Ok(Self {
            workflow_id: workflow.id.clone(),
            workflow_name: workflow.name.clone(),
            graph,
            node_indices,
            references,
            referenced_by,
        })
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    pub fn workflow_name(&self) -> &str {
        &self.workflow_name
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Look up a node by id.
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index_of(id).map(|idx| &self.graph[idx])
    }

    pub fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.node_indices.get(id).copied()
    }

    pub fn node_at(&self, idx: NodeIndex) -> &Node {
        &self.graph[idx]
    }

    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    /// Edges leaving `id`.
    pub fn outgoing(&self, id: &str) -> Vec<&Edge> {
        self.index_of(id)
            .map(|idx| self.outgoing_at(idx).map(|(_, e)| e).collect())
            .unwrap_or_default()
    }

    /// Edges entering `id`.
    pub fn incoming(&self, id: &str) -> Vec<&Edge> {
        self.index_of(id)
            .map(|idx| self.incoming_at(idx).map(|(_, e)| e).collect())
            .unwrap_or_default()
    }

    /// Outgoing edges of `idx`, paired with their target.
    pub fn outgoing_at(&self, idx: NodeIndex) -> impl Iterator<Item = (NodeIndex, &Edge)> + '_ {
        self.graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| (e.target(), e.weight()))
    }

    /// Incoming edges of `idx`, paired with their source.
    pub fn incoming_at(&self, idx: NodeIndex) -> impl Iterator<Item = (NodeIndex, &Edge)> + '_ {
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| (e.source(), e.weight()))
    }

    pub fn in_degree(&self, idx: NodeIndex) -> usize {
        self.graph.edges_directed(idx, Direction::Incoming).count()
    }

    /// Distinct sources of the incoming edges of `idx`, in declaration order.
    pub fn predecessors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| (e.id(), e.source()))
            .collect();
        edges.sort_by_key(|(id, _)| *id);

        let mut sources = Vec::with_capacity(edges.len());
        for (_, source) in edges {
            if !sources.contains(&source) {
                sources.push(source);
            }
        }
        sources
    }

    /// Nodes whose output `idx` reads. These must settle before it runs.
    pub fn references_of(&self, idx: NodeIndex) -> &[NodeIndex] {
        &self.references[idx.index()]
    }

    /// Nodes that read the output of `idx`.
    pub fn referenced_by(&self, idx: NodeIndex) -> &[NodeIndex] {
        &self.referenced_by[idx.index()]
    }

    /// All trigger nodes, in declaration order.
    pub fn triggers(&self) -> Vec<NodeIndex> {
        self.graph
            .node_indices()
            .filter(|&idx| self.graph[idx].is_trigger())
            .collect()
    }

    /// Pick the entry triggers for a run.
    ///
    /// With an explicit id, exactly that trigger runs. Without one, every
    /// trigger of type "manual" runs.
    pub fn select_triggers(&self, trigger_node_id: Option<&str>) -> Result<Vec<NodeIndex>> {
        let triggers = self.triggers();
        if triggers.is_empty() {
            return Err(FlowError::NoTrigger);
        }

        match trigger_node_id {
            Some(id) => {
                let idx = self
                    .index_of(id)
                    .ok_or_else(|| FlowError::TriggerNotFound(id.to_string()))?;
                if !self.graph[idx].is_trigger() {
                    return Err(FlowError::NotATrigger(id.to_string()));
                }
                Ok(vec![idx])
            }
            None => {
                let manual: Vec<NodeIndex> = triggers
                    .into_iter()
                    .filter(|&idx| self.graph[idx].is_manual_trigger())
                    .collect();
                if manual.is_empty() {
                    return Err(FlowError::NoManualTrigger);
                }
                Ok(manual)
            }
        }
    }
}
