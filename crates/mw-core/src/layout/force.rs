//! Force-directed layout.
//!
//! The simulation owns an indexed `Vec<Body>` keyed by `NodeId` and never
//! aliases the data model. Each step snapshots every body, computes all
//! force contributions against that snapshot, then writes positions and
//! velocities back in one pass, so the result does not depend on the
//! order bodies are visited in.
//!
//! Forces: many-body repulsion, link springs, collision avoidance, and a
//! weak pull of the free bodies' centroid toward the viewport center.

use super::{Layout, LayoutFrame, LayoutInput, LayoutKind, NodeShape, PlacedNode};
use crate::camera::ViewTransform;
use crate::id::NodeId;
use crate::model::{MindNode, Viewport};
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::f64::consts::PI;

/// Simulation tuning. Defaults reproduce the stock mind-map feel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForceConfig {
    /// Many-body strength; negative repels.
    pub charge_strength: f64,
    pub link_distance: f64,
    pub collide_radius: f64,
    /// Collision radius for selected and root nodes.
    pub collide_radius_emphasis: f64,
    pub collide_iterations: usize,
    pub center_strength: f64,
    pub velocity_decay: f64,
    pub alpha_min: f64,
    pub alpha_decay: f64,
    /// Below this alpha the simulation reports `Settling`.
    pub settle_alpha: f64,
    /// Alpha floor applied by data changes and resizes.
    pub reheat_alpha: f64,
    /// Alpha target held while a drag is in progress.
    pub drag_alpha_target: f64,
    pub node_radius: f64,
    pub node_radius_emphasis: f64,
    pub seed: u32,
}

impl Default for ForceConfig {
    fn default() -> Self {
        Self {
            charge_strength: -600.0,
            link_distance: 140.0,
            collide_radius: 70.0,
            collide_radius_emphasis: 90.0,
            collide_iterations: 2,
            center_strength: 0.05,
            velocity_decay: 0.4,
            alpha_min: 0.001,
            alpha_decay: 1.0 - 0.001f64.powf(1.0 / 300.0),
            settle_alpha: 0.1,
            reheat_alpha: 0.3,
            drag_alpha_target: 0.3,
            node_radius: 45.0,
            node_radius_emphasis: 60.0,
            seed: 1,
        }
    }
}

impl ForceConfig {
    fn emphasized(node: &MindNode) -> bool {
        node.selected || node.is_root()
    }

    fn collide_radius_for(&self, node: &MindNode) -> f64 {
        if Self::emphasized(node) {
            self.collide_radius_emphasis
        } else {
            self.collide_radius
        }
    }

    fn node_radius_for(&self, node: &MindNode) -> f64 {
        if Self::emphasized(node) {
            self.node_radius_emphasis
        } else {
            self.node_radius
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SimState {
    Idle,
    Running,
    Settling,
}

/// Per-node simulation record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Body {
    pub id: NodeId,
    pub position: Point,
    pub velocity: Vec2,
    /// Fixed position while dragged.
    pub pin: Option<Point>,
    collide_radius: f64,
}

#[derive(Debug, Clone, Copy)]
struct Spring {
    source: usize,
    target: usize,
    strength: f64,
    bias: f64,
}

/// Linear congruential generator, same constants as numerical recipes.
#[derive(Debug, Clone)]
struct Lcg(u32);

impl Lcg {
    fn next_f64(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        f64::from(self.0) / 4_294_967_296.0
    }

    /// Tiny nonzero offset used to separate coincident bodies.
    fn jiggle(&mut self) -> f64 {
        (self.next_f64() - 0.5) * 1e-6
    }
}

pub struct ForceLayout {
    config: ForceConfig,
    viewport: Viewport,
    bodies: Vec<Body>,
    index: HashMap<NodeId, usize>,
    springs: Vec<Spring>,
    alpha: f64,
    alpha_target: f64,
    running: bool,
    rng: Lcg,
    spawned: usize,
    frame: LayoutFrame,
}

impl ForceLayout {
    pub fn new(config: ForceConfig, viewport: Viewport) -> Self {
        let rng = Lcg(config.seed);
        Self {
            config,
            viewport,
            bodies: Vec::new(),
            index: HashMap::new(),
            springs: Vec::new(),
            alpha: 1.0,
            alpha_target: 0.0,
            running: false,
            rng,
            spawned: 0,
            frame: LayoutFrame::default(),
        }
    }

    pub fn state(&self) -> SimState {
        if !self.running {
            SimState::Idle
        } else if self.alpha >= self.config.settle_alpha {
            SimState::Running
        } else {
            SimState::Settling
        }
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn body(&self, id: NodeId) -> Option<&Body> {
        self.index.get(&id).map(|&i| &self.bodies[i])
    }

    fn reheat(&mut self) {
        self.alpha = self.alpha.max(self.config.reheat_alpha);
        self.running = true;
    }

    /// Position for a body that has never been simulated.
    fn spawn_position(&mut self, node: &MindNode, parent: Option<Point>) -> Point {
        if let Some(p) = node.position() {
            return p;
        }
        if let Some(p) = parent {
            let angle = self.rng.next_f64() * 2.0 * PI;
            return p + Vec2::from_angle(angle) * 30.0;
        }
        // Phyllotaxis spiral around the viewport center.
        let i = self.spawned as f64;
        self.spawned += 1;
        let radius = 10.0 * (0.5 + i).sqrt();
        let angle = i * PI * (3.0 - 5f64.sqrt());
        self.viewport.center() + Vec2::from_angle(angle) * radius
    }

    fn sync_frame(&mut self) {
        for (placed, body) in self.frame.nodes.iter_mut().zip(&self.bodies) {
            placed.position = body.position;
        }
        self.frame.relink();
    }

    // ─── Forces ──────────────────────────────────────────────────────────

    fn apply_springs(&mut self, snap: &[Body], dv: &mut [Vec2]) {
        for spring in &self.springs {
            let s = &snap[spring.source];
            let t = &snap[spring.target];
            let mut d = (t.position + t.velocity) - (s.position + s.velocity);
            if d.x == 0.0 {
                d.x = self.rng.jiggle();
            }
            if d.y == 0.0 {
                d.y = self.rng.jiggle();
            }
            let len = d.hypot();
            let d = d * ((len - self.config.link_distance) / len * self.alpha * spring.strength);
            dv[spring.target] -= d * spring.bias;
            dv[spring.source] += d * (1.0 - spring.bias);
        }
    }

    fn apply_charge(&mut self, snap: &[Body], dv: &mut [Vec2]) {
        let strength = self.config.charge_strength * self.alpha;
        for i in 0..snap.len() {
            for j in 0..snap.len() {
                if i == j {
                    continue;
                }
                let mut d = snap[j].position - snap[i].position;
                if d.x == 0.0 {
                    d.x = self.rng.jiggle();
                }
                if d.y == 0.0 {
                    d.y = self.rng.jiggle();
                }
                let mut l2 = d.hypot2();
                if l2 < 1.0 {
                    l2 = l2.sqrt();
                }
                dv[i] += d * (strength / l2);
            }
        }
    }

    fn apply_collide(&mut self, snap: &[Body], dv: &mut [Vec2]) {
        for _ in 0..self.config.collide_iterations {
            let predicted: Vec<Point> = snap
                .iter()
                .zip(dv.iter())
                .map(|(b, dv)| b.position + b.velocity + *dv)
                .collect();
            let mut delta = vec![Vec2::ZERO; snap.len()];
            for i in 0..snap.len() {
                let ri = snap[i].collide_radius;
                for j in (i + 1)..snap.len() {
                    let rj = snap[j].collide_radius;
                    let r = ri + rj;
                    let mut d = predicted[i] - predicted[j];
                    if d.hypot2() >= r * r {
                        continue;
                    }
                    if d.x == 0.0 {
                        d.x = self.rng.jiggle();
                    }
                    if d.y == 0.0 {
                        d.y = self.rng.jiggle();
                    }
                    let len = d.hypot();
                    let push = d * ((r - len) / len);
                    let share = (rj * rj) / (ri * ri + rj * rj);
                    delta[i] += push * share;
                    delta[j] -= push * (1.0 - share);
                }
            }
            for (v, d) in dv.iter_mut().zip(delta) {
                *v += d;
            }
        }
    }

    /// Shift that moves the free bodies' centroid toward the viewport center.
    fn center_shift(&self, snap: &[Body]) -> Vec2 {
        let free: Vec<Point> = snap.iter().filter(|b| b.pin.is_none()).map(|b| b.position).collect();
        if free.is_empty() {
            return Vec2::ZERO;
        }
        let n = free.len() as f64;
        let sum = free.iter().fold(Vec2::ZERO, |acc, p| acc + p.to_vec2());
        (sum / n - self.viewport.center().to_vec2()) * self.config.center_strength
    }
}

impl Layout for ForceLayout {
    fn kind(&self) -> LayoutKind {
        LayoutKind::Force
    }

    fn update(&mut self, input: &LayoutInput<'_>) {
        self.viewport = input.viewport;
        let nodes = input.node_map();
        let mut bodies: Vec<Body> = Vec::with_capacity(input.visible.len());
        let mut index: HashMap<NodeId, usize> = HashMap::new();
        let mut placed: Vec<PlacedNode> = Vec::with_capacity(input.visible.len());

        for vis in input.visible.nodes() {
            let Some(node) = nodes.get(&vis.id).copied() else {
                continue;
            };
            let collide_radius = self.config.collide_radius_for(node);
            let existing = self.body(vis.id).copied();
            let body = match existing {
                Some(old) => Body {
                    collide_radius,
                    ..old
                },
                None => {
                    let parent = input
                        .visible
                        .parent_of(vis.id)
                        .and_then(|p| index.get(&p).map(|&i| bodies[i].position));
                    Body {
                        id: vis.id,
                        position: self.spawn_position(node, parent),
                        velocity: Vec2::ZERO,
                        pin: None,
                        collide_radius,
                    }
                }
            };
            index.insert(vis.id, bodies.len());
            placed.push(PlacedNode::new(
                node,
                vis,
                body.position,
                NodeShape::Circle {
                    radius: self.config.node_radius_for(node),
                },
            ));
            bodies.push(body);
        }

        let mut degree = vec![0usize; bodies.len()];
        let pairs: Vec<(usize, usize)> = input
            .links
            .iter()
            .filter(|l| l.source != l.target)
            .filter_map(|l| Some((*index.get(&l.source)?, *index.get(&l.target)?)))
            .collect();
        for &(s, t) in &pairs {
            degree[s] += 1;
            degree[t] += 1;
        }
        self.springs = pairs
            .iter()
            .map(|&(s, t)| {
                let (ds, dt) = (degree[s] as f64, degree[t] as f64);
                Spring {
                    source: s,
                    target: t,
                    strength: 1.0 / ds.min(dt),
                    bias: ds / (ds + dt),
                }
            })
            .collect();

        self.bodies = bodies;
        self.index = index;
        self.frame.nodes = placed;
        let links: Vec<(NodeId, NodeId)> = self
            .springs
            .iter()
            .map(|s| (self.bodies[s.source].id, self.bodies[s.target].id))
            .collect();
        self.frame.link_pairs(links);
        self.reheat();
        log::debug!(
            "force pass: {} bodies, {} springs, alpha {:.3}",
            self.bodies.len(),
            self.springs.len(),
            self.alpha
        );
    }

    fn step(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.alpha += (self.alpha_target - self.alpha) * self.config.alpha_decay;

        let snap = self.bodies.clone();
        let mut dv = vec![Vec2::ZERO; snap.len()];
        self.apply_springs(&snap, &mut dv);
        self.apply_charge(&snap, &mut dv);
        self.apply_collide(&snap, &mut dv);
        let shift = self.center_shift(&snap);

        let keep = 1.0 - self.config.velocity_decay;
        for ((body, old), dv) in self.bodies.iter_mut().zip(&snap).zip(dv) {
            match body.pin {
                Some(pin) => {
                    body.position = pin;
                    body.velocity = Vec2::ZERO;
                }
                None => {
                    body.velocity = (old.velocity + dv) * keep;
                    body.position = old.position - shift + body.velocity;
                }
            }
        }
        self.sync_frame();
        log::trace!("force tick: alpha {:.4}", self.alpha);

        if self.alpha < self.config.alpha_min {
            self.running = false;
            log::debug!("force simulation idle");
        }
        self.running
    }

    fn frame(&self) -> &LayoutFrame {
        &self.frame
    }

    fn home(&self) -> Point {
        self.viewport.center()
    }

    fn initial_transform(&self) -> ViewTransform {
        ViewTransform::IDENTITY
    }

    fn begin_drag(&mut self, ids: &[NodeId]) {
        for id in ids {
            if let Some(&i) = self.index.get(id) {
                self.bodies[i].pin = Some(self.bodies[i].position);
            }
        }
        self.alpha_target = self.config.drag_alpha_target;
        self.running = true;
    }

    fn drag_to(&mut self, positions: &[(NodeId, Point)]) {
        for (id, p) in positions {
            if let Some(&i) = self.index.get(id) {
                self.bodies[i].pin = Some(*p);
                self.bodies[i].position = *p;
            }
        }
        self.sync_frame();
    }

    fn end_drag(&mut self, ids: &[NodeId]) {
        for id in ids {
            if let Some(&i) = self.index.get(id) {
                self.bodies[i].pin = None;
            }
        }
        self.alpha_target = 0.0;
    }

    fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.reheat();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collapse::{VisibleTree, collapsed_set, visible_tree};
    use crate::hierarchy::build_hierarchy;
    use crate::measure::HeuristicMeasurer;
    use crate::model::Link;

    fn id(s: &str) -> NodeId {
        NodeId::intern(s)
    }

    fn tree_of(nodes: &[MindNode]) -> VisibleTree {
        let h = build_hierarchy(nodes).unwrap();
        visible_tree(&h, &collapsed_set(nodes))
    }

    fn run(layout: &mut ForceLayout, nodes: &[MindNode], links: &[Link]) {
        let visible = tree_of(nodes);
        layout.update(&LayoutInput {
            nodes,
            visible: &visible,
            links,
            viewport: Viewport::default(),
            measurer: &HeuristicMeasurer,
        });
    }

    fn star() -> (Vec<MindNode>, Vec<Link>) {
        let nodes = vec![
            MindNode::new(id("fs_r"), "r"),
            MindNode::child_of(id("fs_a"), "a", id("fs_r")),
            MindNode::child_of(id("fs_b"), "b", id("fs_r")),
            MindNode::child_of(id("fs_c"), "c", id("fs_r")),
        ];
        let links = vec![
            Link::new(id("fs_r"), id("fs_a")),
            Link::new(id("fs_r"), id("fs_b")),
            Link::new(id("fs_r"), id("fs_c")),
        ];
        (nodes, links)
    }

    #[test]
    fn runs_are_reproducible() {
        let (nodes, links) = star();
        let mut a = ForceLayout::new(ForceConfig::default(), Viewport::default());
        let mut b = ForceLayout::new(ForceConfig::default(), Viewport::default());
        run(&mut a, &nodes, &links);
        run(&mut b, &nodes, &links);
        for _ in 0..50 {
            a.step();
            b.step();
        }
        assert_eq!(a.frame().positions(), b.frame().positions());
    }

    #[test]
    fn explicit_position_seeds_new_body() {
        let mut node = MindNode::new(id("fe_r"), "r");
        node.x = Some(12.0);
        node.y = Some(34.0);
        let mut layout = ForceLayout::new(ForceConfig::default(), Viewport::default());
        run(&mut layout, &[node], &[]);
        assert_eq!(layout.body(id("fe_r")).unwrap().position, Point::new(12.0, 34.0));
    }

    #[test]
    fn alpha_decays_to_idle() {
        let (nodes, links) = star();
        let mut layout = ForceLayout::new(ForceConfig::default(), Viewport::default());
        run(&mut layout, &nodes, &links);
        assert_eq!(layout.state(), SimState::Running);
        let mut ticks = 0;
        let mut saw_settling = false;
        while layout.step() {
            saw_settling |= layout.state() == SimState::Settling;
            ticks += 1;
            assert!(ticks < 400, "simulation never settled");
        }
        assert!(saw_settling);
        assert_eq!(layout.state(), SimState::Idle);
        assert!(!layout.step());
    }

    #[test]
    fn data_change_reheats_and_keeps_positions() {
        let (mut nodes, links) = star();
        let mut layout = ForceLayout::new(ForceConfig::default(), Viewport::default());
        run(&mut layout, &nodes, &links);
        while layout.step() {}
        let before = layout.body(id("fs_a")).unwrap().position;

        nodes.push(MindNode::child_of(id("fs_d"), "d", id("fs_a")));
        run(&mut layout, &nodes, &links);
        assert_eq!(layout.state(), SimState::Running);
        assert!((layout.alpha() - 0.3).abs() < 1e-12);
        assert_eq!(layout.body(id("fs_a")).unwrap().position, before);
        // The new child spawns near its parent.
        let d = layout.body(id("fs_d")).unwrap().position;
        assert!((d - before).hypot() <= 30.0 + 1e-9);
    }

    #[test]
    fn unlinked_bodies_repel() {
        let mut a = MindNode::new(id("fr_a"), "a");
        a.x = Some(390.0);
        a.y = Some(300.0);
        let mut b = MindNode::new(id("fr_b"), "b");
        b.x = Some(410.0);
        b.y = Some(300.0);
        let mut layout = ForceLayout::new(ForceConfig::default(), Viewport::default());
        run(&mut layout, &[a, b], &[]);
        for _ in 0..10 {
            layout.step();
        }
        let pa = layout.body(id("fr_a")).unwrap().position;
        let pb = layout.body(id("fr_b")).unwrap().position;
        assert!(pb.x - pa.x > 20.0);
    }

    #[test]
    fn pinned_body_holds_until_release() {
        let (nodes, links) = star();
        let mut layout = ForceLayout::new(ForceConfig::default(), Viewport::default());
        run(&mut layout, &nodes, &links);
        layout.begin_drag(&[id("fs_a")]);
        layout.drag_to(&[(id("fs_a"), Point::new(-500.0, -500.0))]);
        for _ in 0..20 {
            layout.step();
        }
        assert_eq!(layout.frame().position(id("fs_a")), Some(Point::new(-500.0, -500.0)));
        assert!(layout.alpha() > 0.1);

        layout.end_drag(&[id("fs_a")]);
        assert_eq!(layout.body(id("fs_a")).unwrap().pin, None);
        layout.step();
        assert_ne!(layout.frame().position(id("fs_a")), Some(Point::new(-500.0, -500.0)));
    }

    #[test]
    fn emphasized_nodes_are_larger() {
        let (mut nodes, links) = star();
        nodes[2].selected = true;
        let mut layout = ForceLayout::new(ForceConfig::default(), Viewport::default());
        run(&mut layout, &nodes, &links);
        let radius = |s: &str| match layout.frame().node(id(s)).unwrap().shape {
            NodeShape::Circle { radius } => radius,
            NodeShape::Pill { .. } => unreachable!(),
        };
        assert_eq!(radius("fs_r"), 60.0);
        assert_eq!(radius("fs_a"), 45.0);
        assert_eq!(radius("fs_b"), 60.0);
    }

    #[test]
    fn links_to_hidden_nodes_are_dropped() {
        let (mut nodes, mut links) = star();
        nodes.push(MindNode::child_of(id("fs_a1"), "a1", id("fs_a")));
        links.push(Link::new(id("fs_a"), id("fs_a1")));
        nodes[1].expanded = false;
        let mut layout = ForceLayout::new(ForceConfig::default(), Viewport::default());
        run(&mut layout, &nodes, &links);
        assert!(layout.frame().node(id("fs_a1")).is_none());
        assert_eq!(layout.frame().links.len(), 3);
    }
}
