//! Dependent-graph representation and reachability marking.

use std::collections::{BTreeMap, BTreeSet};

/// An adjacency-list directed graph over import paths.
///
/// Cycles are tolerated: traversal carries a visited set and never
/// revisits a marked node.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    graph: BTreeMap<String, BTreeSet<String>>,
}

impl Graph {
    pub fn new(graph: BTreeMap<String, BTreeSet<String>>) -> Self {
        Self { graph }
    }

    /// Whether `node` has any outgoing edges in this graph.
    pub fn contains(&self, node: &str) -> bool {
        self.graph.contains_key(node)
    }

    /// The nodes with outgoing edges, in sorted order.
    pub fn nodes(&self) -> impl Iterator<Item = &String> {
        self.graph.keys()
    }

    /// Depth-first traversal from `node`, setting `marked[n] = true` for
    /// every reachable node including `node` itself. An unknown start
    /// node marks only itself.
    pub fn traverse(&self, node: &str, marked: &mut BTreeMap<String, bool>) {
        if marked.get(node).copied().unwrap_or(false) {
            return;
        }
        marked.insert(node.to_owned(), true);

        if let Some(edges) = self.graph.get(node) {
            for edge in edges {
                self.traverse(edge, marked);
            }
        }
    }
}
