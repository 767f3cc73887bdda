//! Graph algorithms for diagram validation and deployment ordering.
//!
//! Containment (`parentId`) must form a forest; edges only contribute
//! ordering hints. Uses petgraph for cycle detection and traversal.

use crate::models::{DiagramEdge, DiagramNode};
use petgraph::Direction;
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// Structural problems in a diagram
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopologyError {
    #[error("Duplicate node id: {0}")]
    DuplicateNode(String),
    #[error("Node {node} references missing parent {parent}")]
    MissingParent { node: String, parent: String },
    #[error("Node {node} is nested in {parent}, which is not a container")]
    ParentNotContainer { node: String, parent: String },
    #[error("Containment cycle detected at node {0}")]
    ContainmentCycle(String),
}

/// Validated containment forest, indexed by position in the node slice
#[derive(Debug, Clone)]
pub struct ContainmentTree {
    /// Root node indices, in insertion order
    pub roots: Vec<usize>,
    /// Direct children per node, in insertion order
    pub children: Vec<Vec<usize>>,
}

impl ContainmentTree {
    /// Build and validate the containment forest
    pub fn build(nodes: &[DiagramNode]) -> Result<Self, TopologyError> {
        let mut index: HashMap<&str, usize> = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            if index.insert(node.id.as_str(), i).is_some() {
                return Err(TopologyError::DuplicateNode(node.id.clone()));
            }
        }

        let mut graph = DiGraph::<usize, ()>::with_capacity(nodes.len(), nodes.len());
        let handles: Vec<NodeIndex> = (0..nodes.len()).map(|i| graph.add_node(i)).collect();

        let mut roots = Vec::new();
        let mut children = vec![Vec::new(); nodes.len()];

        for (i, node) in nodes.iter().enumerate() {
            match node.parent_id.as_deref() {
                None => roots.push(i),
                Some(parent_id) => {
                    let parent = *index.get(parent_id).ok_or_else(|| {
                        TopologyError::MissingParent {
                            node: node.id.clone(),
                            parent: parent_id.to_string(),
                        }
                    })?;
                    if parent == i {
                        return Err(TopologyError::ContainmentCycle(node.id.clone()));
                    }
                    if !nodes[parent].is_container() {
                        return Err(TopologyError::ParentNotContainer {
                            node: node.id.clone(),
                            parent: parent_id.to_string(),
                        });
                    }
                    graph.add_edge(handles[parent], handles[i], ());
                    children[parent].push(i);
                }
            }
        }

        if is_cyclic_directed(&graph) {
            // Every node on a cycle has a parent, so it never shows up as a root
            let reachable = reachable_from(&roots, &children);
            let culprit = (0..nodes.len())
                .find(|i| !reachable[*i])
                .map(|i| nodes[i].id.clone())
                .unwrap_or_default();
            return Err(TopologyError::ContainmentCycle(culprit));
        }

        Ok(Self { roots, children })
    }

    /// Node indices with every node after all of its descendants
    pub fn post_order(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.children.len());
        let mut stack: Vec<(usize, bool)> = self.roots.iter().rev().map(|r| (*r, false)).collect();

        while let Some((node, expanded)) = stack.pop() {
            if expanded {
                order.push(node);
                continue;
            }
            stack.push((node, true));
            for child in self.children[node].iter().rev() {
                stack.push((*child, false));
            }
        }
        order
    }
}

fn reachable_from(roots: &[usize], children: &[Vec<usize>]) -> Vec<bool> {
    let mut seen = vec![false; children.len()];
    let mut stack: Vec<usize> = roots.to_vec();
    while let Some(node) = stack.pop() {
        if seen[node] {
            continue;
        }
        seen[node] = true;
        stack.extend(children[node].iter().copied());
    }
    seen
}

/// Validate the containment structure of a diagram
pub fn validate_containment(nodes: &[DiagramNode]) -> Result<(), TopologyError> {
    ContainmentTree::build(nodes).map(|_| ())
}

/// Order nodes for submission to the provider.
///
/// Containers come before their children and edge targets before edge
/// sources (a source depends on what it sends traffic to). Ties keep
/// insertion order. Nodes caught in an edge cycle are appended in insertion
/// order.
pub fn deployment_order(nodes: &[DiagramNode], edges: &[DiagramEdge]) -> Vec<usize> {
    let index: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, node)| (node.id.as_str(), i))
        .collect();

    let mut graph = DiGraph::<usize, ()>::with_capacity(nodes.len(), nodes.len() + edges.len());
    let handles: Vec<NodeIndex> = (0..nodes.len()).map(|i| graph.add_node(i)).collect();

    for (i, node) in nodes.iter().enumerate() {
        if let Some(parent) = node.parent_id.as_deref().and_then(|p| index.get(p)) {
            if *parent != i {
                graph.add_edge(handles[*parent], handles[i], ());
            }
        }
    }
    for edge in edges {
        let source = index.get(edge.source_node_id.as_str());
        let target = index.get(edge.target_node_id.as_str());
        if let (Some(&source), Some(&target)) = (source, target) {
            if source != target {
                graph.add_edge(handles[target], handles[source], ());
            }
        }
    }

    // Kahn's algorithm with a min-heap on insertion index for stable ties
    let mut in_degree: Vec<usize> = handles
        .iter()
        .map(|h| graph.neighbors_directed(*h, Direction::Incoming).count())
        .collect();
    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, degree)| **degree == 0)
        .map(|(i, _)| Reverse(i))
        .collect();

    let mut order = Vec::with_capacity(nodes.len());
    let mut placed = vec![false; nodes.len()];
    while let Some(Reverse(i)) = ready.pop() {
        order.push(i);
        placed[i] = true;
        for next in graph.neighbors_directed(handles[i], Direction::Outgoing) {
            let j = graph[next];
            in_degree[j] -= 1;
            if in_degree[j] == 0 {
                ready.push(Reverse(j));
            }
        }
    }

    order.extend((0..nodes.len()).filter(|i| !placed[*i]));
    order
}
