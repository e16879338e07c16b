//! CallGraph: directed graph over procedures, edges labeled by call-site
//! address and confidence.

use serde::{Deserialize, Serialize};

use crate::core::address::Address;
use crate::core::region::Confidence;

/// A single call relationship: `caller` called through `call_site`, landing
/// at `callee` (or nowhere statically known, for indirect calls).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallGraphEdge {
    pub caller: String,
    pub callee: Option<String>,
    pub call_site: Address,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallGraph {
    edges: Vec<CallGraphEdge>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_edge(&mut self, edge: CallGraphEdge) {
        self.edges.push(edge);
    }

    /// Edges in ascending call-site-address order, matching the
    /// deterministic-iteration rule applied everywhere else in the result
    /// tree.
    pub fn edges(&self) -> Vec<&CallGraphEdge> {
        let mut edges: Vec<&CallGraphEdge> = self.edges.iter().collect();
        edges.sort_by_key(|e| e.call_site);
        edges
    }

    pub fn edges_from(&self, caller: &str) -> Vec<&CallGraphEdge> {
        self.edges().into_iter().filter(|e| e.caller == caller).collect()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}
