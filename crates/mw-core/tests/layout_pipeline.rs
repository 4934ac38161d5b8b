//! Integration tests: JSON snapshot → hierarchy → visible tree → layout.
//!
//! Exercises the full `mw-core` pipeline for both strategies.

use mw_core::collapse::{collapsed_set, visible_tree};
use mw_core::hierarchy::{HierarchyError, build_hierarchy};
use mw_core::layout::{Layout, LayoutFrame, LayoutInput, LayoutKind, new_layout};
use mw_core::{ForceConfig, HeuristicMeasurer, MindMapData, NodeId, TreeConfig, Viewport};
use pretty_assertions::assert_eq;
use std::collections::HashSet;

const VIEWPORT: Viewport = Viewport {
    width: 800.0,
    height: 600.0,
};

fn load(json: &str) -> MindMapData {
    serde_json::from_str(json).expect("fixture parses")
}

fn lay_out(kind: LayoutKind, data: &MindMapData) -> Box<dyn Layout> {
    let hierarchy = build_hierarchy(&data.nodes).expect("fixture is a forest");
    let visible = visible_tree(&hierarchy, &collapsed_set(&data.nodes));
    let mut layout = new_layout(kind, &ForceConfig::default(), &TreeConfig::default(), VIEWPORT);
    layout.update(&LayoutInput {
        nodes: &data.nodes,
        visible: &visible,
        links: &data.links,
        viewport: VIEWPORT,
        measurer: &HeuristicMeasurer,
    });
    layout
}

fn ids(frame: &LayoutFrame) -> HashSet<NodeId> {
    frame.nodes.iter().map(|n| n.id).collect()
}

fn link_pairs(frame: &LayoutFrame) -> HashSet<(NodeId, NodeId)> {
    frame.links.iter().map(|l| (l.source, l.target)).collect()
}

fn input_pairs(data: &MindMapData) -> HashSet<(NodeId, NodeId)> {
    data.links.iter().map(|l| (l.source, l.target)).collect()
}

// ─── Single root ─────────────────────────────────────────────────────────

#[test]
fn single_root_tree_has_two_children_at_equal_depth() {
    let data = load(include_str!("fixtures/single_root.json"));
    let hierarchy = build_hierarchy(&data.nodes).unwrap();
    assert!(!hierarchy.has_virtual_root());
    assert_eq!(hierarchy.root(), Some(NodeId::intern("r")));

    let layout = lay_out(LayoutKind::Tree, &data);
    let frame = layout.frame();
    let c1 = frame.position(NodeId::intern("c1")).unwrap();
    let c2 = frame.position(NodeId::intern("c2")).unwrap();
    let r = frame.position(NodeId::intern("r")).unwrap();

    assert_eq!(c1.x, c2.x, "children share a depth");
    assert!(c1.x > r.x, "depth grows to the right");
    assert_ne!(c1.y, c2.y, "children get distinct ranks");
    assert_eq!(link_pairs(frame), input_pairs(&data));
}

#[test]
fn tree_layout_is_idempotent() {
    let data = load(include_str!("fixtures/forest.json"));
    let a = lay_out(LayoutKind::Tree, &data);
    let b = lay_out(LayoutKind::Tree, &data);
    assert_eq!(a.frame().positions(), b.frame().positions());
}

// ─── Forest ──────────────────────────────────────────────────────────────

#[test]
fn forest_output_never_contains_virtual_root() {
    let data = load(include_str!("fixtures/forest.json"));
    assert!(build_hierarchy(&data.nodes).unwrap().has_virtual_root());

    let expected: HashSet<NodeId> = data.nodes.iter().map(|n| n.id).collect();
    for kind in [LayoutKind::Tree, LayoutKind::Force] {
        let layout = lay_out(kind, &data);
        let frame = layout.frame();
        assert_eq!(ids(frame), expected, "{kind} nodes");
        assert_eq!(link_pairs(frame), input_pairs(&data), "{kind} links");
        assert!(
            frame
                .links
                .iter()
                .all(|l| !l.source.is_virtual_root() && !l.target.is_virtual_root())
        );
    }
}

#[test]
fn forest_roots_share_a_depth() {
    let data = load(include_str!("fixtures/forest.json"));
    let layout = lay_out(LayoutKind::Tree, &data);
    let r1 = layout.frame().position(NodeId::intern("r1")).unwrap();
    let r2 = layout.frame().position(NodeId::intern("r2")).unwrap();
    assert_eq!(r1.x, r2.x);
    assert!(r2.y - r1.y >= 100.0);
}

#[test]
fn wide_labels_get_wider_boxes() {
    let data = load(include_str!("fixtures/forest.json"));
    let layout = lay_out(LayoutKind::Tree, &data);
    let width = |id: &str| layout.frame().node(NodeId::intern(id)).unwrap().bounds().width();
    // "Music" is five ASCII glyphs, "音乐" two wide ones.
    assert_eq!(width("r1"), 5.0 * 9.0 + 48.0);
    assert_eq!(width("r2"), 2.0 * 15.0 + 48.0);
}

// ─── Cycles ──────────────────────────────────────────────────────────────

#[test]
fn cycle_is_rejected_without_a_tree() {
    let data = load(include_str!("fixtures/cycle.json"));
    let err = build_hierarchy(&data.nodes).unwrap_err();
    assert!(matches!(err, HierarchyError::Cycle { .. }));
}

// ─── Force ───────────────────────────────────────────────────────────────

#[test]
fn force_layout_settles_and_spreads_children() {
    let data = load(include_str!("fixtures/single_root.json"));
    let mut layout = lay_out(LayoutKind::Force, &data);
    let mut ticks = 0;
    while layout.step() {
        ticks += 1;
        assert!(ticks < 1000);
    }
    let frame = layout.frame();
    let c1 = frame.position(NodeId::intern("c1")).unwrap();
    let c2 = frame.position(NodeId::intern("c2")).unwrap();
    let r = frame.position(NodeId::intern("r")).unwrap();
    assert!((c1 - c2).hypot() > 100.0, "siblings pushed apart");
    assert!((c1 - r).hypot() > 100.0, "child off its parent");
    assert_eq!(layout.home(), VIEWPORT.center());
}
