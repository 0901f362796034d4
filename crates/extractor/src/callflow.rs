use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;
use threatspec_core::Call;

/// Directed caller -> callee graph keyed by qualified function name
#[derive(Debug, Default)]
pub struct CallGraph {
    graph: DiGraph<String, ()>,
    index: HashMap<String, NodeIndex>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn node(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(name.to_string());
        self.index.insert(name.to_string(), idx);
        idx
    }

    /// Record a call; returns false when the edge already existed
    pub fn add_call(&mut self, source: &str, destination: &str) -> bool {
        let from = self.node(source);
        let to = self.node(destination);
        if self.graph.find_edge(from, to).is_some() {
            return false;
        }
        self.graph.add_edge(from, to, ());
        true
    }

    /// Functions called by `name`
    pub fn callees(&self, name: &str) -> Vec<&str> {
        let Some(&idx) = self.index.get(name) else {
            return Vec::new();
        };
        let mut out: Vec<&str> = self
            .graph
            .edges(idx)
            .map(|e| self.graph[e.target()].as_str())
            .collect();
        // petgraph walks outgoing edges newest first
        out.reverse();
        out
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.edge_count() == 0
    }

    /// Edges in insertion order
    pub fn calls(&self) -> Vec<Call> {
        self.graph
            .edge_references()
            .map(|e| Call {
                source: self.graph[e.source()].clone(),
                destination: self.graph[e.target()].clone(),
            })
            .collect()
    }
}
