//! Target graph builder using petgraph.
//!
//! Builds a directed graph from target declarations so that a plan can
//! be derived from it. Prerequisite names that do not resolve to a
//! declared target are treated as file-path leaves and get no node; the
//! graph only carries declared targets.

use crate::{Error, Result, TargetNode};
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::IntoNodeReferences;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// A node in the target graph.
#[derive(Debug, Clone)]
pub struct GraphNode<T> {
    /// Id of the target.
    pub name: String,
    /// The target data.
    pub target: T,
}

/// Dependency graph over declared targets.
///
/// Generic over any node type implementing [`TargetNode`]. Edges point
/// from a prerequisite to the target that requires it.
pub struct TargetGraph<T: TargetNode> {
    graph: DiGraph<GraphNode<T>, ()>,
    name_to_node: HashMap<String, NodeIndex>,
}

impl<T: TargetNode> TargetGraph<T> {
    /// Create a new empty target graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            name_to_node: HashMap::new(),
        }
    }

    /// Add a single target to the graph.
    ///
    /// If a target with the same name already exists, returns the
    /// existing node index without replacing its data.
    pub fn add_target(&mut self, name: &str, target: T) -> NodeIndex {
        if let Some(&node) = self.name_to_node.get(name) {
            return node;
        }

        let node_index = self.graph.add_node(GraphNode {
            name: name.to_string(),
            target,
        });
        self.name_to_node.insert(name.to_string(), node_index);
        debug!(target = name, "added graph node");
        node_index
    }

    /// Get a reference to a node by target id.
    #[must_use]
    pub fn get_node_by_name(&self, name: &str) -> Option<&GraphNode<T>> {
        self.name_to_node
            .get(name)
            .and_then(|&idx| self.graph.node_weight(idx))
    }

    /// Check if a target has a node in the graph.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.name_to_node.contains_key(name)
    }

    /// Number of declared targets in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Iterate over all nodes in the graph.
    pub fn iter_nodes(&self) -> impl Iterator<Item = &GraphNode<T>> {
        self.graph.node_references().map(|(_, node)| node)
    }

    /// Check if the prerequisite relation has cycles.
    #[must_use]
    pub fn has_cycles(&self) -> bool {
        is_cyclic_directed(&self.graph)
    }

    /// Build the subgraph reachable from the given roots.
    ///
    /// `lookup` resolves a target id to its data; ids it cannot resolve
    /// are file-path prerequisites and are silently left out of the
    /// graph. The roots themselves must resolve.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownRoot`] if a root id does not resolve.
    pub fn build_for_roots<F>(&mut self, roots: &[impl AsRef<str>], mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<T>,
    {
        let mut to_process: Vec<String> = Vec::new();
        for root in roots {
            let root = root.as_ref();
            if lookup(root).is_none() {
                return Err(Error::unknown_root(root));
            }
            to_process.push(root.to_string());
        }

        let mut processed = HashSet::new();
        while let Some(current) = to_process.pop() {
            if !processed.insert(current.clone()) {
                continue;
            }

            let Some(target) = lookup(&current) else {
                debug!(target = %current, "prerequisite is not a declared target, treating as file path");
                continue;
            };

            let prerequisites: Vec<String> =
                target.prerequisite_names().map(String::from).collect();
            self.add_target(&current, target);

            for prerequisite in prerequisites {
                if !processed.contains(&prerequisite) {
                    to_process.push(prerequisite);
                }
            }
        }

        self.add_prerequisite_edges();
        Ok(())
    }

    /// Add prerequisite edges after all targets have been added.
    ///
    /// Prerequisites with no node are file-path leaves and get no edge.
    fn add_prerequisite_edges(&mut self) {
        let mut edges_to_add = Vec::new();

        for (node_index, node) in self.graph.node_references() {
            for prerequisite in node.target.prerequisite_names() {
                if let Some(&prereq_index) = self.name_to_node.get(prerequisite) {
                    edges_to_add.push((prereq_index, node_index));
                }
            }
        }

        for (from, to) in edges_to_add {
            self.graph.add_edge(from, to, ());
        }
    }
}

impl<T: TargetNode> Default for TargetGraph<T> {
    fn default() -> Self {
        Self::new()
    }
}
