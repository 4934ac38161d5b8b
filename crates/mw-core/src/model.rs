//! Mind-map data model.
//!
//! The host hands the engine a complete `MindMapData` snapshot on every
//! render. Nodes form a forest through `parent_id`; links are the visible
//! edges between them. The engine never creates or deletes nodes; it only
//! reads the snapshot and reports drag positions back through events.

use crate::id::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ─── Nodes ───────────────────────────────────────────────────────────────

/// Whether a node started a tree (`root`) or was derived from one (`child`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Root,
    #[default]
    Child,
}

fn default_expanded() -> bool {
    true
}

/// One concept on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MindNode {
    pub id: NodeId,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub explanation: String,

    /// World-space position. `None` until the node has been placed; once
    /// set by a drag it overrides the automatic layout for this node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,

    #[serde(rename = "type", default)]
    pub kind: NodeKind,
    #[serde(default)]
    pub selected: bool,
    #[serde(default = "default_expanded")]
    pub expanded: bool,
    /// An expansion request is in flight; hides the toggle affordance.
    #[serde(default)]
    pub loading: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl MindNode {
    pub fn new(id: NodeId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            explanation: String::new(),
            x: None,
            y: None,
            kind: NodeKind::Root,
            selected: false,
            expanded: true,
            loading: false,
            parent_id: None,
            image_url: None,
        }
    }

    /// A child node hanging off `parent`.
    pub fn child_of(id: NodeId, text: impl Into<String>, parent: NodeId) -> Self {
        Self {
            kind: NodeKind::Child,
            parent_id: Some(parent),
            ..Self::new(id, text)
        }
    }

    /// The explicit position, when both coordinates are present.
    pub fn position(&self) -> Option<kurbo::Point> {
        match (self.x, self.y) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some(kurbo::Point::new(x, y)),
            _ => None,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

// ─── Links ───────────────────────────────────────────────────────────────

/// A directed edge between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    pub source: NodeId,
    pub target: NodeId,
}

impl Link {
    pub fn new(source: NodeId, target: NodeId) -> Self {
        Self { source, target }
    }
}

// ─── Snapshot ────────────────────────────────────────────────────────────

/// The complete node/link list for one render pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MindMapData {
    #[serde(default)]
    pub nodes: Vec<MindNode>,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl MindMapData {
    pub fn new(nodes: Vec<MindNode>, links: Vec<Link>) -> Self {
        Self { nodes, links }
    }

    /// Drop links whose endpoints no longer exist. Returns how many were removed.
    pub fn prune_stale_links(&mut self) -> usize {
        let ids: HashSet<NodeId> = self.nodes.iter().map(|n| n.id).collect();
        let before = self.links.len();
        self.links
            .retain(|l| ids.contains(&l.source) && ids.contains(&l.target));
        let pruned = before - self.links.len();
        if pruned > 0 {
            log::debug!("pruned {pruned} stale link(s)");
        }
        pruned
    }

    /// The selection set, recomputed from the nodes every time.
    pub fn selection(&self) -> HashSet<NodeId> {
        self.nodes
            .iter()
            .filter(|n| n.selected)
            .map(|n| n.id)
            .collect()
    }

    pub fn node(&self, id: NodeId) -> Option<&MindNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

// ─── Viewport ────────────────────────────────────────────────────────────

/// The canvas dimensions in device-independent pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> kurbo::Point {
        kurbo::Point::new(self.width / 2.0, self.height / 2.0)
    }

    /// Whether a screen point lies on the canvas (edges inclusive).
    pub fn contains(&self, p: kurbo::Point) -> bool {
        p.x >= 0.0 && p.y >= 0.0 && p.x <= self.width && p.y <= self.height
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn deserializes_host_json() {
        let json = r#"{
            "id": "c1", "text": "Ocean", "explanation": "water",
            "type": "child", "selected": true, "expanded": false,
            "loading": false, "parentId": "r", "x": 10.5, "y": -3
        }"#;
        let node: MindNode = serde_json::from_str(json).unwrap();
        assert_eq!(node.id, NodeId::intern("c1"));
        assert_eq!(node.kind, NodeKind::Child);
        assert_eq!(node.parent_id, Some(NodeId::intern("r")));
        assert_eq!(node.position(), Some(kurbo::Point::new(10.5, -3.0)));
        assert!(node.selected);
        assert!(!node.expanded);
    }

    #[test]
    fn missing_flags_take_defaults() {
        let node: MindNode = serde_json::from_str(r#"{"id":"solo","type":"root"}"#).unwrap();
        assert!(node.expanded);
        assert!(!node.selected);
        assert!(!node.loading);
        assert_eq!(node.position(), None);
    }

    #[test]
    fn half_position_is_not_a_position() {
        let mut node = MindNode::new(NodeId::intern("half"), "half");
        node.x = Some(4.0);
        assert_eq!(node.position(), None);
    }

    #[test]
    fn prune_drops_links_to_missing_nodes() {
        let r = NodeId::intern("pr_r");
        let a = NodeId::intern("pr_a");
        let gone = NodeId::intern("pr_gone");
        let mut data = MindMapData::new(
            vec![MindNode::new(r, "r"), MindNode::child_of(a, "a", r)],
            vec![Link::new(r, a), Link::new(r, gone), Link::new(gone, a)],
        );
        assert_eq!(data.prune_stale_links(), 2);
        assert_eq!(data.links, vec![Link::new(r, a)]);
    }

    #[test]
    fn selection_is_derived_from_flags() {
        let a = NodeId::intern("sel_a");
        let b = NodeId::intern("sel_b");
        let mut na = MindNode::new(a, "a");
        na.selected = true;
        let data = MindMapData::new(vec![na, MindNode::new(b, "b")], vec![]);
        assert_eq!(data.selection(), HashSet::from([a]));
    }
}
