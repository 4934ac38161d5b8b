//! Layout engine: visible tree + viewport → placed nodes and link curves.
//!
//! Two interchangeable strategies implement [`Layout`]: a force-directed
//! simulation (`force`) and a tidy tree (`tree`). The engine holds one as a
//! `Box<dyn Layout>` and swaps it at runtime; the data model is untouched.

pub mod force;
pub mod tree;

pub use force::{ForceConfig, ForceLayout, SimState};
pub use tree::{ManualPositionPolicy, TreeConfig, TreeLayout};

use crate::camera::ViewTransform;
use crate::collapse::{VisibleNode, VisibleTree};
use crate::id::NodeId;
use crate::measure::TextMeasurer;
use crate::model::{Link, MindNode, NodeKind, Viewport};
use kurbo::{BezPath, Circle, CubicBez, Point, QuadBez, Rect, Shape};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Height of a tree node box.
pub const BOX_HEIGHT: f64 = 42.0;
/// A tree box starts this far left of its node position.
pub const BOX_INSET_X: f64 = 12.0;
/// Radius of the collapse/expand affordance.
pub const TOGGLE_RADIUS: f64 = 9.0;
/// Links attach this far left of a box's anchor on both ends.
const LINK_INSET_X: f64 = 10.0;

// ─── Strategy selection ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    Force,
    #[default]
    Tree,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown layout mode `{0}`")]
pub struct UnknownLayout(pub String);

impl FromStr for LayoutKind {
    type Err = UnknownLayout;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "force" => Ok(LayoutKind::Force),
            "tree" => Ok(LayoutKind::Tree),
            other => Err(UnknownLayout(other.to_string())),
        }
    }
}

impl fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LayoutKind::Force => "force",
            LayoutKind::Tree => "tree",
        })
    }
}

/// Build a fresh strategy of the requested kind.
pub fn new_layout(
    kind: LayoutKind,
    force: &ForceConfig,
    tree: &TreeConfig,
    viewport: Viewport,
) -> Box<dyn Layout> {
    match kind {
        LayoutKind::Force => Box::new(ForceLayout::new(force.clone(), viewport)),
        LayoutKind::Tree => Box::new(TreeLayout::new(tree.clone(), viewport)),
    }
}

// ─── Pass input ──────────────────────────────────────────────────────────

/// Everything one layout pass reads.
pub struct LayoutInput<'a> {
    pub nodes: &'a [MindNode],
    pub visible: &'a VisibleTree,
    pub links: &'a [Link],
    pub viewport: Viewport,
    pub measurer: &'a dyn TextMeasurer,
}

impl<'a> LayoutInput<'a> {
    pub(crate) fn node_map(&self) -> HashMap<NodeId, &'a MindNode> {
        self.nodes.iter().map(|n| (n.id, n)).collect()
    }
}

/// A positioning strategy.
pub trait Layout {
    fn kind(&self) -> LayoutKind;

    /// Run a pass over new input. Existing per-node state is kept for ids
    /// that survive.
    fn update(&mut self, input: &LayoutInput<'_>);

    /// Advance one animation frame. Returns true while more frames are needed.
    fn step(&mut self) -> bool;

    fn frame(&self) -> &LayoutFrame;

    /// Canvas point that `center_view` puts at the viewport center.
    fn home(&self) -> Point;

    /// Transform applied when the strategy is first mounted.
    fn initial_transform(&self) -> ViewTransform;

    fn begin_drag(&mut self, ids: &[NodeId]);
    fn drag_to(&mut self, positions: &[(NodeId, Point)]);
    fn end_drag(&mut self, ids: &[NodeId]);

    fn resize(&mut self, viewport: Viewport);
}

// ─── Pass output ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodeShape {
    /// Tree box anchored `BOX_INSET_X` left of and half its height above
    /// the node position.
    Pill { width: f64 },
    /// Force bubble centered on the node position.
    Circle { radius: f64 },
}

/// A node with its computed position and render attributes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedNode {
    pub id: NodeId,
    pub kind: NodeKind,
    pub text: String,
    pub explanation: String,
    pub position: Point,
    pub shape: NodeShape,
    pub depth: usize,
    pub selected: bool,
    pub loading: bool,
    pub expanded: bool,
    pub has_children: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Where the enter animation starts, when the node just appeared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enter_from: Option<Point>,
}

impl PlacedNode {
    pub(crate) fn new(node: &MindNode, visible: &VisibleNode, position: Point, shape: NodeShape) -> Self {
        Self {
            id: node.id,
            kind: node.kind,
            text: node.text.clone(),
            explanation: node.explanation.clone(),
            position,
            shape,
            depth: visible.depth,
            selected: node.selected,
            loading: node.loading,
            expanded: !visible.collapsed,
            has_children: visible.has_children,
            image_url: node.image_url.clone(),
            enter_from: None,
        }
    }

    pub fn bounds(&self) -> Rect {
        self.bounds_at(self.position)
    }

    /// The node's box if it were drawn at `p`.
    pub fn bounds_at(&self, p: Point) -> Rect {
        match self.shape {
            NodeShape::Pill { width } => Rect::new(
                p.x - BOX_INSET_X,
                p.y - BOX_HEIGHT / 2.0,
                p.x - BOX_INSET_X + width,
                p.y + BOX_HEIGHT / 2.0,
            ),
            NodeShape::Circle { radius } => Circle::new(p, radius).bounding_box(),
        }
    }

    /// Whether the collapse/expand affordance is shown: box nodes with
    /// children, not waiting on an expansion.
    pub fn has_toggle(&self) -> bool {
        matches!(self.shape, NodeShape::Pill { .. }) && self.has_children && !self.loading
    }

    /// Toggle circle at the right edge of the box.
    pub fn toggle_at(&self, p: Point) -> Option<Circle> {
        let NodeShape::Pill { width } = self.shape else {
            return None;
        };
        self.has_toggle()
            .then(|| Circle::new(Point::new(p.x + width, p.y), TOGGLE_RADIUS))
    }

    pub fn toggle(&self) -> Option<Circle> {
        self.toggle_at(self.position)
    }
}

/// A drawable edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LinkCurve {
    Quad(QuadBez),
    Cubic(CubicBez),
}

impl LinkCurve {
    /// Gentle arc: the control point is the midpoint pushed sideways by a
    /// tenth of the segment.
    pub fn arc(from: Point, to: Point) -> Self {
        let d = to - from;
        let mid = from.midpoint(to);
        let ctrl = Point::new(mid.x - d.y * 0.1, mid.y + d.x * 0.1);
        LinkCurve::Quad(QuadBez::new(from, ctrl, to))
    }

    /// Horizontal S-curve with both tangents parallel to the x axis.
    pub fn horizontal(from: Point, to: Point) -> Self {
        let mx = (from.x + to.x) / 2.0;
        LinkCurve::Cubic(CubicBez::new(
            from,
            Point::new(mx, from.y),
            Point::new(mx, to.y),
            to,
        ))
    }

    /// The curve joining two placed nodes drawn at `a` and `b`.
    pub fn between(source: &PlacedNode, a: Point, target: &PlacedNode, b: Point) -> Self {
        match source.shape {
            NodeShape::Pill { width } => LinkCurve::horizontal(
                Point::new(a.x + width - LINK_INSET_X, a.y),
                Point::new(b.x - LINK_INSET_X, b.y),
            ),
            NodeShape::Circle { .. } => LinkCurve::arc(a, b),
        }
    }

    pub fn start(&self) -> Point {
        match self {
            LinkCurve::Quad(q) => q.p0,
            LinkCurve::Cubic(c) => c.p0,
        }
    }

    pub fn end(&self) -> Point {
        match self {
            LinkCurve::Quad(q) => q.p2,
            LinkCurve::Cubic(c) => c.p3,
        }
    }

    pub fn to_path(&self) -> BezPath {
        let mut path = BezPath::new();
        match self {
            LinkCurve::Quad(q) => {
                path.move_to(q.p0);
                path.quad_to(q.p1, q.p2);
            }
            LinkCurve::Cubic(c) => {
                path.move_to(c.p0);
                path.curve_to(c.p1, c.p2, c.p3);
            }
        }
        path
    }

    pub fn to_svg(&self) -> String {
        self.to_path().to_svg()
    }
}

impl Serialize for LinkCurve {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_svg())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinkPath {
    pub source: NodeId,
    pub target: NodeId,
    #[serde(rename = "d")]
    pub curve: LinkCurve,
}

/// The result of a layout pass. Never contains the virtual root.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LayoutFrame {
    pub nodes: Vec<PlacedNode>,
    pub links: Vec<LinkPath>,
}

impl LayoutFrame {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&PlacedNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn position(&self, id: NodeId) -> Option<Point> {
        self.node(id).map(|n| n.position)
    }

    pub fn positions(&self) -> HashMap<NodeId, Point> {
        self.nodes.iter().map(|n| (n.id, n.position)).collect()
    }

    /// Recompute link curves from the current node positions.
    pub fn relink(&mut self) {
        let by_id: HashMap<NodeId, &PlacedNode> = self.nodes.iter().map(|n| (n.id, n)).collect();
        for link in &mut self.links {
            if let Some(s) = by_id.get(&link.source)
                && let Some(t) = by_id.get(&link.target)
            {
                link.curve = LinkCurve::between(s, s.position, t, t.position);
            }
        }
    }

    /// Build links for `pairs`, skipping any whose endpoint is not placed.
    pub(crate) fn link_pairs(&mut self, pairs: impl IntoIterator<Item = (NodeId, NodeId)>) {
        let by_id: HashMap<NodeId, &PlacedNode> = self.nodes.iter().map(|n| (n.id, n)).collect();
        self.links = pairs
            .into_iter()
            .filter_map(|(source, target)| {
                let s = by_id.get(&source)?;
                let t = by_id.get(&target)?;
                Some(LinkPath {
                    source,
                    target,
                    curve: LinkCurve::between(s, s.position, t, t.position),
                })
            })
            .collect();
    }
}
