//! Hit testing: point → node lookup.
//!
//! The cache is rebuilt from each layout frame and walked back-to-front,
//! so the last painted node wins. Positions are layout targets, not the
//! tweened positions on screen.

use kurbo::{Circle, Point, Rect};
use mw_core::id::NodeId;
use mw_core::layout::LayoutFrame;

/// One rendered node's hit regions in canvas space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitEntry {
    pub id: NodeId,
    pub bounds: Rect,
    pub toggle: Option<Circle>,
}

/// Which part of the canvas a point landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitRegion {
    Toggle(NodeId),
    Node(NodeId),
    Background,
}

#[derive(Debug, Clone, Default)]
pub struct HitCache {
    entries: Vec<HitEntry>,
}

// Edges count as inside: a box-select that just touches a node picks it.
fn rect_contains(r: &Rect, p: Point) -> bool {
    p.x >= r.x0 && p.x <= r.x1 && p.y >= r.y0 && p.y <= r.y1
}

fn rects_overlap(a: &Rect, b: &Rect) -> bool {
    a.x0 <= b.x1 && b.x0 <= a.x1 && a.y0 <= b.y1 && b.y0 <= a.y1
}

fn circle_contains(c: &Circle, p: Point) -> bool {
    (p - c.center).hypot() <= c.radius
}

impl HitCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_frame(frame: &LayoutFrame) -> Self {
        let mut cache = Self::new();
        cache.refresh(frame);
        cache
    }

    pub fn refresh(&mut self, frame: &LayoutFrame) {
        self.entries.clear();
        self.entries.extend(
            frame
                .nodes
                .iter()
                .filter(|n| !n.id.is_virtual_root())
                .map(|n| HitEntry {
                    id: n.id,
                    bounds: n.bounds(),
                    toggle: n.toggle(),
                }),
        );
        log::trace!("hit cache refreshed: {} entries", self.entries.len());
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[HitEntry] {
        &self.entries
    }

    pub fn get(&self, id: NodeId) -> Option<&HitEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Topmost node whose box contains `p`.
    pub fn hit_test(&self, p: Point) -> Option<NodeId> {
        self.entries
            .iter()
            .rev()
            .find(|e| rect_contains(&e.bounds, p))
            .map(|e| e.id)
    }

    /// Topmost node whose toggle circle contains `p`.
    pub fn hit_test_toggle(&self, p: Point) -> Option<NodeId> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.toggle.is_some_and(|c| circle_contains(&c, p)))
            .map(|e| e.id)
    }

    /// Every node whose box overlaps `rect` (either corner order).
    pub fn hit_test_rect(&self, rect: Rect) -> Vec<NodeId> {
        let rect = rect.abs();
        self.entries
            .iter()
            .filter(|e| rects_overlap(&e.bounds, &rect))
            .map(|e| e.id)
            .collect()
    }

    /// Toggle first, then node body, then background.
    pub fn region_at(&self, p: Point) -> HitRegion {
        if let Some(id) = self.hit_test_toggle(p) {
            return HitRegion::Toggle(id);
        }
        match self.hit_test(p) {
            Some(id) => HitRegion::Node(id),
            None => HitRegion::Background,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, bounds: Rect) -> HitEntry {
        HitEntry {
            id: NodeId::intern(id),
            bounds,
            toggle: None,
        }
    }

    fn cache(entries: Vec<HitEntry>) -> HitCache {
        HitCache { entries }
    }

    fn sorted(ids: Vec<NodeId>) -> Vec<String> {
        let mut names: Vec<String> = ids.iter().map(|id| id.as_str().to_owned()).collect();
        names.sort();
        names
    }

    #[test]
    fn topmost_wins() {
        let c = cache(vec![
            entry("a", Rect::new(0.0, 0.0, 100.0, 100.0)),
            entry("b", Rect::new(50.0, 50.0, 150.0, 150.0)),
        ]);
        assert_eq!(c.hit_test(Point::new(75.0, 75.0)), Some(NodeId::intern("b")));
        assert_eq!(c.hit_test(Point::new(10.0, 10.0)), Some(NodeId::intern("a")));
        assert_eq!(c.hit_test(Point::new(200.0, 10.0)), None);
    }

    #[test]
    fn rect_select_matches_overlap_exactly() {
        let c = cache(vec![
            entry("a", Rect::new(0.0, 0.0, 10.0, 10.0)),
            entry("b", Rect::new(20.0, 0.0, 30.0, 10.0)),
            entry("c", Rect::new(0.0, 40.0, 10.0, 50.0)),
        ]);
        assert_eq!(sorted(c.hit_test_rect(Rect::new(5.0, 5.0, 25.0, 8.0))), vec!["a", "b"]);
        // Reversed corners normalize.
        assert_eq!(sorted(c.hit_test_rect(Rect::new(25.0, 8.0, 5.0, 5.0))), vec!["a", "b"]);
        assert!(c.hit_test_rect(Rect::new(11.0, 11.0, 19.0, 39.0)).is_empty());
    }

    #[test]
    fn touching_edges_count() {
        let c = cache(vec![entry("a", Rect::new(0.0, 0.0, 10.0, 10.0))]);
        assert_eq!(c.hit_test_rect(Rect::new(10.0, 10.0, 20.0, 20.0)).len(), 1);
        assert_eq!(c.hit_test(Point::new(10.0, 0.0)), Some(NodeId::intern("a")));
    }

    #[test]
    fn degenerate_rect_is_a_point_query() {
        let c = cache(vec![entry("a", Rect::new(0.0, 0.0, 10.0, 10.0))]);
        let p = Point::new(4.0, 4.0);
        assert_eq!(c.hit_test_rect(Rect::from_points(p, p)), vec![NodeId::intern("a")]);
        let q = Point::new(40.0, 4.0);
        assert!(c.hit_test_rect(Rect::from_points(q, q)).is_empty());
    }

    #[test]
    fn toggle_takes_precedence_over_body() {
        let mut a = entry("a", Rect::new(0.0, -21.0, 100.0, 21.0));
        a.toggle = Some(Circle::new(Point::new(112.0, 0.0), 9.0));
        let c = cache(vec![a]);
        assert_eq!(c.region_at(Point::new(105.0, 0.0)), HitRegion::Toggle(a.id));
        assert_eq!(c.region_at(Point::new(50.0, 0.0)), HitRegion::Node(a.id));
        assert_eq!(c.region_at(Point::new(500.0, 0.0)), HitRegion::Background);
    }

    #[test]
    fn refresh_skips_virtual_root() {
        use mw_core::layout::{NodeShape, PlacedNode};
        use mw_core::model::NodeKind;

        let placed = |id: NodeId| PlacedNode {
            id,
            kind: NodeKind::Child,
            text: String::new(),
            explanation: String::new(),
            position: Point::ZERO,
            shape: NodeShape::Circle { radius: 45.0 },
            depth: 0,
            selected: false,
            loading: false,
            expanded: true,
            has_children: false,
            image_url: None,
            enter_from: None,
        };
        let frame = LayoutFrame {
            nodes: vec![placed(NodeId::virtual_root()), placed(NodeId::intern("a"))],
            links: Vec::new(),
        };
        let c = HitCache::from_frame(&frame);
        assert_eq!(c.len(), 1);
        assert_eq!(
            c.hit_test_rect(Rect::new(-1000.0, -1000.0, 1000.0, 1000.0)),
            vec![NodeId::intern("a")]
        );
    }
}
