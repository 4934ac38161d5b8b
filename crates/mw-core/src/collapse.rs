//! Collapse state: which part of the hierarchy takes part in a layout pass.
//!
//! `visible_tree` is a pure function of the hierarchy and the nodes'
//! persisted `expanded` flags. Collapsed subtrees are not walked; the
//! hierarchy itself is never mutated.

use crate::hierarchy::Hierarchy;
use crate::id::NodeId;
use crate::model::MindNode;
use kurbo::Point;
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};

/// Ids whose subtree is folded away.
pub fn collapsed_set(nodes: &[MindNode]) -> HashSet<NodeId> {
    nodes.iter().filter(|n| !n.expanded).map(|n| n.id).collect()
}

/// One node that participates in the current pass.
#[derive(Debug, Clone)]
pub struct VisibleNode {
    pub id: NodeId,
    pub parent: Option<usize>,
    pub children: SmallVec<[usize; 8]>,
    pub depth: usize,
    /// Has children in the data model, visible or not.
    pub has_children: bool,
    /// Children exist but are folded away.
    pub collapsed: bool,
}

/// The pruned tree handed to the layout strategies. Index 0 is the root.
#[derive(Debug, Clone, Default)]
pub struct VisibleTree {
    nodes: Vec<VisibleNode>,
    index: HashMap<NodeId, usize>,
    virtual_root: bool,
}

/// Walk the hierarchy, skipping the descendants of collapsed nodes.
pub fn visible_tree(hierarchy: &Hierarchy, collapsed: &HashSet<NodeId>) -> VisibleTree {
    let mut tree = VisibleTree {
        virtual_root: hierarchy.has_virtual_root(),
        ..VisibleTree::default()
    };
    let Some(root) = hierarchy.root() else {
        return tree;
    };

    let mut stack: Vec<(NodeId, Option<usize>, usize)> = vec![(root, None, 0)];
    while let Some((id, parent, depth)) = stack.pop() {
        let children = hierarchy.children(id);
        let is_collapsed = !id.is_virtual_root() && collapsed.contains(&id) && !children.is_empty();
        let idx = tree.nodes.len();
        tree.nodes.push(VisibleNode {
            id,
            parent,
            children: SmallVec::new(),
            depth,
            has_children: !children.is_empty(),
            collapsed: is_collapsed,
        });
        tree.index.insert(id, idx);
        if let Some(p) = parent {
            tree.nodes[p].children.push(idx);
        }
        if !is_collapsed {
            for child in children.into_iter().rev() {
                stack.push((child, Some(idx), depth + 1));
            }
        }
    }
    tree
}

impl VisibleTree {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn has_virtual_root(&self) -> bool {
        self.virtual_root
    }

    /// All nodes including the virtual root, in pre-order.
    pub fn nodes(&self) -> &[VisibleNode] {
        &self.nodes
    }

    pub fn node(&self, idx: usize) -> &VisibleNode {
        &self.nodes[idx]
    }

    pub fn get(&self, id: NodeId) -> Option<&VisibleNode> {
        self.index.get(&id).map(|&i| &self.nodes[i])
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.index.contains_key(&id) && !id.is_virtual_root()
    }

    /// Real visible ids in pre-order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .map(|n| n.id)
            .filter(|id| !id.is_virtual_root())
    }

    /// Number of real visible nodes.
    pub fn len(&self) -> usize {
        self.nodes.len() - usize::from(self.virtual_root)
    }

    /// The visible parent, never the virtual root.
    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        let node = self.get(id)?;
        let parent = self.nodes[node.parent?].id;
        (!parent.is_virtual_root()).then_some(parent)
    }

    /// Visible parent → child edges between real nodes.
    pub fn edges(&self) -> Vec<(NodeId, NodeId)> {
        self.nodes
            .iter()
            .filter_map(|n| {
                let parent = self.nodes[n.parent?].id;
                (!parent.is_virtual_root()).then_some((parent, n.id))
            })
            .collect()
    }

    /// Real ids that sit below `id` in the visible tree.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let Some(&start) = self.index.get(&id) else {
            return out;
        };
        let mut stack: Vec<usize> = self.nodes[start].children.to_vec();
        while let Some(idx) = stack.pop() {
            out.push(self.nodes[idx].id);
            stack.extend(self.nodes[idx].children.iter().copied());
        }
        out
    }
}

// ─── Transitions ─────────────────────────────────────────────────────────

/// What changed between two consecutive visible trees.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transition {
    /// Newly visible ids with the position their enter animation starts from.
    pub entered: Vec<(NodeId, Option<Point>)>,
    /// Ids that left the pass, with the nearest ancestor still visible.
    pub exited: Vec<(NodeId, Option<NodeId>)>,
}

/// Remembers the previous pass so re-expanded children reappear near their
/// parent instead of at the origin.
#[derive(Debug, Clone, Default)]
pub struct CollapseTracker {
    previous_parent: HashMap<NodeId, Option<NodeId>>,
    previous_order: Vec<NodeId>,
    last_known: HashMap<NodeId, Point>,
}

impl CollapseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Diff `tree` against the previous pass. `displayed` holds the
    /// positions on screen right before this pass. Positions of ids no
    /// longer in `hierarchy` are forgotten.
    pub fn transition(
        &mut self,
        hierarchy: &Hierarchy,
        tree: &VisibleTree,
        displayed: &HashMap<NodeId, Point>,
    ) -> Transition {
        self.last_known
            .extend(displayed.iter().map(|(id, p)| (*id, *p)));
        self.last_known.retain(|id, _| hierarchy.contains(*id));

        let first_pass = self.previous_order.is_empty();
        let mut entered = Vec::new();
        for id in tree.ids() {
            if self.previous_parent.contains_key(&id) {
                continue;
            }
            if first_pass {
                entered.push((id, None));
                continue;
            }
            let seed = tree
                .parent_of(id)
                .and_then(|p| displayed.get(&p).or_else(|| self.last_known.get(&p)))
                .or_else(|| self.last_known.get(&id))
                .copied();
            entered.push((id, seed));
        }

        let mut exited = Vec::new();
        for &id in &self.previous_order {
            if tree.contains(id) {
                continue;
            }
            let mut ancestor = self.previous_parent.get(&id).copied().flatten();
            while let Some(a) = ancestor {
                if tree.contains(a) {
                    break;
                }
                ancestor = self.previous_parent.get(&a).copied().flatten();
            }
            exited.push((id, ancestor));
        }

        self.previous_parent = tree.ids().map(|id| (id, tree.parent_of(id))).collect();
        self.previous_order = tree.ids().collect();
        Transition { entered, exited }
    }

    /// Number of ids with a remembered position.
    pub fn remembered(&self) -> usize {
        self.last_known.len()
    }
}
