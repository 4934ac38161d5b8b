//! Tidy-tree layout (Buchheim, Jünger & Leipert's linear-time Walker).
//!
//! The tidy pass assigns every visible node a *rank* (its position across
//! siblings) and uses the node's depth for the other axis. Depth grows
//! left to right on screen x and rank spreads along screen y; the mapping
//! lives in exactly one pair of functions, [`depth_rank_to_screen`] and
//! [`screen_to_depth_rank`].
//!
//! Explicit `x/y` on a node replaces that one node's rendered position
//! after the tidy pass. Siblings and descendants keep their computed
//! positions.

use super::{Layout, LayoutFrame, LayoutInput, LayoutKind, NodeShape, PlacedNode};
use crate::camera::ViewTransform;
use crate::collapse::VisibleTree;
use crate::id::NodeId;
use crate::measure::node_box_width;
use crate::model::Viewport;
use kurbo::Point;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};

/// How long a host-written position keeps overriding the tidy pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ManualPositionPolicy {
    /// Honor every explicit position for as long as it is present.
    #[default]
    Retain,
    /// Honor an explicit position until the visible node set or parent
    /// edges change. A new or moved position starts a fresh window.
    ResetOnStructureChange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Spacing between adjacent ranks, in pixels.
    pub rank_spacing: f64,
    /// Spacing between depths, in pixels.
    pub depth_spacing: f64,
    /// Rank gap between siblings sharing a parent.
    pub sibling_separation: f64,
    /// Rank gap between neighbours with different parents.
    pub cousin_separation: f64,
    pub manual_positions: ManualPositionPolicy,
    /// Duration of the enter/update/exit transition.
    pub transition_ms: f64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            rank_spacing: 100.0,
            depth_spacing: 300.0,
            sibling_separation: 1.0,
            cousin_separation: 1.2,
            manual_positions: ManualPositionPolicy::Retain,
            transition_ms: 500.0,
        }
    }
}

// ─── Axis mapping ────────────────────────────────────────────────────────

/// Depth/rank offsets in pixels → canvas point.
pub fn depth_rank_to_screen(depth: f64, rank: f64) -> Point {
    Point::new(depth, rank)
}

/// Inverse of [`depth_rank_to_screen`].
pub fn screen_to_depth_rank(p: Point) -> (f64, f64) {
    (p.x, p.y)
}

// ─── Tidy pass ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Walker {
    parent: usize,
    children: SmallVec<[usize; 8]>,
    /// Index among the parent's children.
    number: usize,
    ancestor: usize,
    default_ancestor: Option<usize>,
    prelim: f64,
    modifier: f64,
    change: f64,
    shift: f64,
    thread: Option<usize>,
}

impl Walker {
    fn new(parent: usize, number: usize, this: usize) -> Self {
        Self {
            parent,
            children: SmallVec::new(),
            number,
            ancestor: this,
            default_ancestor: None,
            prelim: 0.0,
            modifier: 0.0,
            change: 0.0,
            shift: 0.0,
            thread: None,
        }
    }
}

/// Arena of walkers. Slot 0 is a sentinel parent above the root; visible
/// node `i` lives in slot `i + 1`.
struct Tidy {
    w: Vec<Walker>,
    sibling: f64,
    cousin: f64,
}

impl Tidy {
    fn new(tree: &VisibleTree, sibling: f64, cousin: f64) -> Self {
        let mut w = Vec::with_capacity(tree.nodes().len() + 1);
        w.push(Walker::new(0, 0, 0));
        w[0].children.push(1);
        for (i, node) in tree.nodes().iter().enumerate() {
            let slot = i + 1;
            let parent = node.parent.map_or(0, |p| p + 1);
            w.push(Walker::new(parent, 0, slot));
        }
        for (i, node) in tree.nodes().iter().enumerate() {
            for (n, &child) in node.children.iter().enumerate() {
                w[child + 1].number = n;
                w[i + 1].children.push(child + 1);
            }
        }
        Self { w, sibling, cousin }
    }

    fn separation(&self, a: usize, b: usize) -> f64 {
        if self.w[a].parent == self.w[b].parent {
            self.sibling
        } else {
            self.cousin
        }
    }

    fn next_left(&self, v: usize) -> Option<usize> {
        self.w[v].children.first().copied().or(self.w[v].thread)
    }

    fn next_right(&self, v: usize) -> Option<usize> {
        self.w[v].children.last().copied().or(self.w[v].thread)
    }

    fn move_subtree(&mut self, wm: usize, wp: usize, shift: f64) {
        let subtrees = self.w[wp].number.saturating_sub(self.w[wm].number).max(1) as f64;
        let change = shift / subtrees;
        self.w[wp].change -= change;
        self.w[wp].shift += shift;
        self.w[wm].change += change;
        self.w[wp].prelim += shift;
        self.w[wp].modifier += shift;
    }

    fn execute_shifts(&mut self, v: usize) {
        let mut shift = 0.0;
        let mut change = 0.0;
        let children = self.w[v].children.clone();
        for &c in children.iter().rev() {
            self.w[c].prelim += shift;
            self.w[c].modifier += shift;
            change += self.w[c].change;
            shift += self.w[c].shift + change;
        }
    }

    fn next_ancestor(&self, vim: usize, v: usize, ancestor: usize) -> usize {
        let a = self.w[vim].ancestor;
        if self.w[a].parent == self.w[v].parent {
            a
        } else {
            ancestor
        }
    }

    fn first_walk(&mut self, v: usize) {
        let parent = self.w[v].parent;
        let number = self.w[v].number;
        let left = (number > 0).then(|| self.w[parent].children[number - 1]);

        let ends = self.w[v].children.first().copied().zip(self.w[v].children.last().copied());
        if let Some((first, last)) = ends {
            self.execute_shifts(v);
            let midpoint = (self.w[first].prelim + self.w[last].prelim) / 2.0;
            match left {
                Some(l) => {
                    self.w[v].prelim = self.w[l].prelim + self.separation(v, l);
                    self.w[v].modifier = self.w[v].prelim - midpoint;
                }
                None => self.w[v].prelim = midpoint,
            }
        } else if let Some(l) = left {
            self.w[v].prelim = self.w[l].prelim + self.separation(v, l);
        }

        let fallback = self.w[parent].children[0];
        let ancestor = self.w[parent].default_ancestor.unwrap_or(fallback);
        let ancestor = self.apportion(v, left, ancestor);
        self.w[parent].default_ancestor = Some(ancestor);
    }

    /// Push subtree `v` right until its left contour clears the right
    /// contour of its left siblings, threading the shorter contour.
    fn apportion(&mut self, v: usize, left: Option<usize>, mut ancestor: usize) -> usize {
        let Some(left) = left else {
            return ancestor;
        };
        let parent = self.w[v].parent;
        let (mut vip, mut vop, mut vim, mut vom) = (v, v, left, self.w[parent].children[0]);
        let mut sip = self.w[vip].modifier;
        let mut sop = self.w[vop].modifier;
        let mut sim = self.w[vim].modifier;
        let mut som = self.w[vom].modifier;

        let (tail_im, tail_ip) = loop {
            let (next_im, next_ip) = (self.next_right(vim), self.next_left(vip));
            let (Some(im), Some(ip)) = (next_im, next_ip) else {
                break (next_im, next_ip);
            };
            let (Some(om), Some(op)) = (self.next_left(vom), self.next_right(vop)) else {
                break (None, None);
            };
            (vim, vip, vom, vop) = (im, ip, om, op);
            self.w[vop].ancestor = v;
            let shift = self.w[vim].prelim + sim - self.w[vip].prelim - sip + self.separation(vim, vip);
            if shift > 0.0 {
                let a = self.next_ancestor(vim, v, ancestor);
                self.move_subtree(a, v, shift);
                sip += shift;
                sop += shift;
            }
            sim += self.w[vim].modifier;
            sip += self.w[vip].modifier;
            som += self.w[vom].modifier;
            sop += self.w[vop].modifier;
        };

        if let Some(im) = tail_im
            && self.next_right(vop).is_none()
        {
            self.w[vop].thread = Some(im);
            self.w[vop].modifier += sim - sop;
        }
        if let Some(ip) = tail_ip
            && self.next_left(vom).is_none()
        {
            self.w[vom].thread = Some(ip);
            self.w[vom].modifier += sip - som;
            ancestor = v;
        }
        ancestor
    }

    /// Slots in post-order, children left to right.
    fn post_order(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.w.len() - 1);
        let mut stack = vec![(1usize, false)];
        while let Some((v, done)) = stack.pop() {
            if done {
                order.push(v);
                continue;
            }
            stack.push((v, true));
            for &c in self.w[v].children.iter().rev() {
                stack.push((c, false));
            }
        }
        order
    }

    /// Ranks in separation units, indexed like the visible tree. The root
    /// sits at rank 0.
    fn run(mut self) -> Vec<f64> {
        for v in self.post_order() {
            self.first_walk(v);
        }
        self.w[0].modifier = -self.w[1].prelim;
        // Slots 1.. are already in pre-order.
        let mut ranks = Vec::with_capacity(self.w.len() - 1);
        for v in 1..self.w.len() {
            let pm = self.w[self.w[v].parent].modifier;
            ranks.push(self.w[v].prelim + pm);
            self.w[v].modifier += pm;
        }
        ranks
    }
}

/// Tidy ranks for every node of `tree` (virtual root included), in units
/// of separation.
pub fn tidy_ranks(tree: &VisibleTree, sibling: f64, cousin: f64) -> Vec<f64> {
    if tree.is_empty() {
        return Vec::new();
    }
    Tidy::new(tree, sibling, cousin).run()
}

// ─── Strategy ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
struct StructureKey {
    ids: Vec<NodeId>,
    edges: Vec<(NodeId, NodeId)>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ManualOverride {
    position: Point,
    /// Structure generation the position was first seen in.
    generation: u64,
}

pub struct TreeLayout {
    config: TreeConfig,
    viewport: Viewport,
    frame: LayoutFrame,
    structure: Option<StructureKey>,
    generation: u64,
    overrides: HashMap<NodeId, ManualOverride>,
}

impl TreeLayout {
    pub fn new(config: TreeConfig, viewport: Viewport) -> Self {
        Self {
            config,
            viewport,
            frame: LayoutFrame::default(),
            structure: None,
            generation: 0,
            overrides: HashMap::new(),
        }
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    fn observe_structure(&mut self, tree: &VisibleTree) {
        let key = StructureKey {
            ids: tree.ids().collect(),
            edges: tree.edges(),
        };
        if self.structure.as_ref() != Some(&key) {
            if self.structure.is_some() {
                self.generation += 1;
            }
            self.structure = Some(key);
        }
    }

    /// The override to apply for `id`, recording it when new or moved.
    fn manual_position(&mut self, id: NodeId, explicit: Point) -> Option<Point> {
        let generation = self.generation;
        let entry = self
            .overrides
            .entry(id)
            .and_modify(|o| {
                if o.position != explicit {
                    *o = ManualOverride {
                        position: explicit,
                        generation,
                    };
                }
            })
            .or_insert(ManualOverride {
                position: explicit,
                generation,
            });
        match self.config.manual_positions {
            ManualPositionPolicy::Retain => Some(entry.position),
            ManualPositionPolicy::ResetOnStructureChange => {
                (entry.generation == generation).then_some(entry.position)
            }
        }
    }
}

impl Layout for TreeLayout {
    fn kind(&self) -> LayoutKind {
        LayoutKind::Tree
    }

    fn update(&mut self, input: &LayoutInput<'_>) {
        self.viewport = input.viewport;
        let visible = input.visible;
        if visible.is_empty() {
            self.frame = LayoutFrame::default();
            self.overrides.clear();
            return;
        }
        self.observe_structure(visible);

        let nodes = input.node_map();
        let ranks = tidy_ranks(
            visible,
            self.config.sibling_separation,
            self.config.cousin_separation,
        );
        let mut placed = Vec::with_capacity(visible.len());
        let mut seen_overrides = HashSet::new();
        for (vis, rank) in visible.nodes().iter().zip(ranks) {
            if vis.id.is_virtual_root() {
                continue;
            }
            let Some(node) = nodes.get(&vis.id).copied() else {
                continue;
            };
            let computed = depth_rank_to_screen(
                vis.depth as f64 * self.config.depth_spacing,
                rank * self.config.rank_spacing,
            );
            let position = match node.position() {
                Some(explicit) => {
                    seen_overrides.insert(node.id);
                    self.manual_position(node.id, explicit).unwrap_or(computed)
                }
                None => computed,
            };
            let width = node_box_width(input.measurer, &node.text);
            placed.push(PlacedNode::new(node, vis, position, NodeShape::Pill { width }));
        }
        self.overrides.retain(|id, _| seen_overrides.contains(id));

        self.frame.nodes = placed;
        self.frame.link_pairs(visible.edges());
        log::debug!(
            "tree pass: {} nodes, {} links, structure generation {}",
            self.frame.nodes.len(),
            self.frame.links.len(),
            self.generation
        );
    }

    fn step(&mut self) -> bool {
        false
    }

    fn frame(&self) -> &LayoutFrame {
        &self.frame
    }

    fn home(&self) -> Point {
        Point::ZERO
    }

    fn initial_transform(&self) -> ViewTransform {
        ViewTransform::new(0.8, self.viewport.width / 6.0, self.viewport.height / 2.0)
    }

    fn begin_drag(&mut self, ids: &[NodeId]) {
        log::trace!("tree drag start: {} node(s)", ids.len());
    }

    // Visual only: the host persists the final position through the
    // drag-end event and the next pass picks it up as an override.
    fn drag_to(&mut self, positions: &[(NodeId, Point)]) {
        for (id, p) in positions {
            if let Some(node) = self.frame.nodes.iter_mut().find(|n| n.id == *id) {
                node.position = *p;
            }
        }
        self.frame.relink();
    }

    fn end_drag(&mut self, ids: &[NodeId]) {
        log::trace!("tree drag end: {} node(s)", ids.len());
    }

    fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }
}
