//! Hierarchy builder: flat node list → rooted tree.
//!
//! Parent pointers are loaded into a `petgraph` DAG (edges parent → child).
//! A forest with more than one top-level node gets a synthetic
//! `virtual-root` above it so single-root layout algorithms can run. The
//! virtual root lives only inside the hierarchy; every rendering, link, and
//! hit-test output strips it.

use crate::id::NodeId;
use crate::model::MindNode;
use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use smallvec::SmallVec;
use std::collections::{HashMap, VecDeque};

/// Why a node list could not be turned into a tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HierarchyError {
    #[error("parent pointers form a cycle through node `{node}`")]
    Cycle { node: NodeId },
    #[error("node `{node}` references missing parent `{parent}`")]
    DanglingParent { node: NodeId, parent: NodeId },
    #[error("node id `{node}` appears more than once")]
    DuplicateId { node: NodeId },
    #[error("node id `virtual-root` is reserved")]
    ReservedId,
}

/// A rooted tree derived from one snapshot. Rebuilt on every pass.
#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    graph: DiGraph<NodeId, ()>,
    index: HashMap<NodeId, NodeIndex>,
    root: Option<NodeIndex>,
    virtual_root: bool,
    depth: HashMap<NodeIndex, usize>,
}

/// Build a tree from the nodes' parent pointers.
pub fn build_hierarchy(nodes: &[MindNode]) -> Result<Hierarchy, HierarchyError> {
    let mut h = Hierarchy::default();
    if nodes.is_empty() {
        return Ok(h);
    }

    for node in nodes {
        if node.id.is_virtual_root() {
            return Err(HierarchyError::ReservedId);
        }
        if h.index.contains_key(&node.id) {
            return Err(HierarchyError::DuplicateId { node: node.id });
        }
        let idx = h.graph.add_node(node.id);
        h.index.insert(node.id, idx);
    }

    let mut roots: Vec<NodeIndex> = Vec::new();
    for node in nodes {
        let child = h.index[&node.id];
        match node.parent_id {
            None => roots.push(child),
            Some(parent) => {
                let Some(&p) = h.index.get(&parent) else {
                    return Err(HierarchyError::DanglingParent {
                        node: node.id,
                        parent,
                    });
                };
                h.graph.add_edge(p, child, ());
            }
        }
    }

    // A self-parent is a one-node cycle; toposort reports it too.
    toposort(&h.graph, None).map_err(|cycle| HierarchyError::Cycle {
        node: h.graph[cycle.node_id()],
    })?;

    let root = match roots.as_slice() {
        [] => {
            // Unreachable for acyclic input, kept as a guard.
            return Err(HierarchyError::Cycle { node: nodes[0].id });
        }
        [single] => *single,
        _ => {
            let vr = h.graph.add_node(NodeId::virtual_root());
            for &r in &roots {
                h.graph.add_edge(vr, r, ());
            }
            h.virtual_root = true;
            vr
        }
    };
    h.root = Some(root);
    h.assign_depths(root);
    Ok(h)
}

impl Hierarchy {
    fn assign_depths(&mut self, root: NodeIndex) {
        let mut queue = VecDeque::from([(root, 0usize)]);
        while let Some((idx, d)) = queue.pop_front() {
            self.depth.insert(idx, d);
            for child in self.child_indices(idx) {
                queue.push_back((child, d + 1));
            }
        }
    }

    /// Children in input order. petgraph iterates edges newest-first, so
    /// sort by index (nodes were added in input order).
    fn child_indices(&self, idx: NodeIndex) -> SmallVec<[NodeIndex; 8]> {
        let mut children: SmallVec<[NodeIndex; 8]> = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .collect();
        children.sort();
        children
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Number of real (non-virtual) nodes.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// The tree root, or the virtual root when one was synthesized.
    pub fn root(&self) -> Option<NodeId> {
        self.root.map(|r| self.graph[r])
    }

    pub fn has_virtual_root(&self) -> bool {
        self.virtual_root
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    fn index_of(&self, id: NodeId) -> Option<NodeIndex> {
        if id.is_virtual_root() && self.virtual_root {
            return self.root;
        }
        self.index.get(&id).copied()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        let idx = self.index_of(id)?;
        self.graph
            .neighbors_directed(idx, Direction::Incoming)
            .next()
            .map(|p| self.graph[p])
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.index_of(id)
            .map(|idx| {
                self.child_indices(idx)
                    .into_iter()
                    .map(|c| self.graph[c])
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn depth(&self, id: NodeId) -> Option<usize> {
        self.index_of(id).and_then(|idx| self.depth.get(&idx).copied())
    }

    /// All real node ids in pre-order (virtual root excluded).
    pub fn real_ids(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.len());
        let Some(root) = self.root else {
            return out;
        };
        let mut stack = vec![root];
        while let Some(idx) = stack.pop() {
            let id = self.graph[idx];
            if !id.is_virtual_root() {
                out.push(id);
            }
            stack.extend(self.child_indices(idx).into_iter().rev());
        }
        out
    }

    /// Parent → child edges between real nodes, in pre-order.
    pub fn real_edges(&self) -> Vec<(NodeId, NodeId)> {
        self.real_ids()
            .into_iter()
            .filter_map(|id| {
                let parent = self.parent(id)?;
                (!parent.is_virtual_root()).then_some((parent, id))
            })
            .collect()
    }
}
