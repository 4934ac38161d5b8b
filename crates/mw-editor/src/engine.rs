//! The mind-map engine: one owner for snapshot, layout, camera, hit cache,
//! and gestures.
//!
//! Hosts push snapshots with `set_data`, forward input with `handle_input`,
//! drive animation with `tick`, and draw whatever `render_frame` returns.
//! The engine reports intent through `MapEvent`s and never edits the
//! snapshot itself.

use crate::capture::{NoCapture, PointerCapture};
use crate::events::MapEvent;
use crate::input::InputEvent;
use crate::interaction::{Intent, InteractionConfig, InteractionResolver, SceneQuery};
use kurbo::{Point, Rect};
use mw_core::anim::{Easing, Tween};
use mw_core::camera::{Camera, CameraConfig};
use mw_core::collapse::{CollapseTracker, Transition, VisibleTree, collapsed_set, visible_tree};
use mw_core::hierarchy::{Hierarchy, build_hierarchy};
use mw_core::id::NodeId;
use mw_core::layout::{
    ForceConfig, Layout, LayoutFrame, LayoutInput, LayoutKind, LinkCurve, LinkPath, PlacedNode,
    TreeConfig, new_layout,
};
use mw_core::measure::{HeuristicMeasurer, TextMeasurer};
use mw_core::model::{MindMapData, Viewport};
use mw_render::hit::{HitCache, HitRegion};
use mw_render::raster::{ExportError, export_png_data_url};
use mw_render::scene::{FadingNode, RenderFrame};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// Host-supplied engine settings. `interaction: None` picks the bindings
/// for the active layout and follows layout switches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub layout: LayoutKind,
    pub force: ForceConfig,
    pub tree: TreeConfig,
    pub interaction: Option<InteractionConfig>,
    pub camera: CameraConfig,
}

impl EngineConfig {
    fn interaction_for(&self, kind: LayoutKind) -> InteractionConfig {
        self.interaction
            .clone()
            .unwrap_or_else(|| InteractionConfig::for_layout(kind))
    }
}

/// What the host should do after an input event.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputResponse {
    pub events: Vec<MapEvent>,
    /// Suppress the browser default (context menu, page scroll).
    pub prevent_default: bool,
    pub needs_redraw: bool,
    /// Whether a gesture currently holds pointer capture.
    pub capturing: bool,
}

#[derive(Debug, Clone, Copy)]
struct Motion {
    tween: Tween<Point>,
    entering: bool,
}

#[derive(Debug, Clone)]
struct Exiting {
    node: PlacedNode,
    motion: Tween<Point>,
    fade: Tween<f64>,
}

pub struct MindMapEngine {
    config: EngineConfig,
    viewport: Viewport,
    dark_mode: bool,
    mounted: bool,
    now_ms: f64,

    data: MindMapData,
    hierarchy: Hierarchy,
    visible: VisibleTree,
    layout: Box<dyn Layout>,
    measurer: Box<dyn TextMeasurer>,
    camera: Camera,
    hits: HitCache,
    resolver: InteractionResolver,
    tracker: CollapseTracker,

    motion: HashMap<NodeId, Motion>,
    exiting: Vec<Exiting>,
    marquee: Option<Rect>,
    diagnostic: Option<String>,
}

impl MindMapEngine {
    pub fn new(config: EngineConfig, viewport: Viewport) -> Self {
        Self::with_capture(config, viewport, Rc::new(NoCapture))
    }

    pub fn with_capture(
        config: EngineConfig,
        viewport: Viewport,
        capture: Rc<dyn PointerCapture>,
    ) -> Self {
        let kind = config.layout;
        let layout = new_layout(kind, &config.force, &config.tree, viewport);
        let camera = Camera::new(config.camera, viewport, layout.initial_transform());
        let resolver = InteractionResolver::new(config.interaction_for(kind), capture);
        Self {
            config,
            viewport,
            dark_mode: false,
            mounted: false,
            now_ms: 0.0,
            data: MindMapData::default(),
            hierarchy: Hierarchy::default(),
            visible: VisibleTree::default(),
            layout,
            measurer: Box::new(HeuristicMeasurer),
            camera,
            hits: HitCache::new(),
            resolver,
            tracker: CollapseTracker::new(),
            motion: HashMap::new(),
            exiting: Vec::new(),
            marquee: None,
            diagnostic: None,
        }
    }

    /// Replace the label measurer and re-lay out the current snapshot.
    pub fn set_measurer(&mut self, measurer: Box<dyn TextMeasurer>) {
        self.measurer = measurer;
        if !self.hierarchy.is_empty() {
            self.run_pass();
        }
    }

    // ─── Data & view ─────────────────────────────────────────────────────

    /// Lay out a new snapshot. Returns false when the snapshot's parent
    /// pointers do not form a forest; the previous frame stays on screen and
    /// `last_diagnostic` says why.
    pub fn set_data(&mut self, mut data: MindMapData) -> bool {
        data.prune_stale_links();
        let hierarchy = match build_hierarchy(&data.nodes) {
            Ok(h) => h,
            Err(err) => {
                log::warn!("skipping layout pass: {err}");
                self.diagnostic = Some(err.to_string());
                return false;
            }
        };
        self.diagnostic = None;
        self.hierarchy = hierarchy;
        self.data = data;
        self.refresh_visible();
        self.run_pass();
        true
    }

    /// Tree mode folds collapsed subtrees away; force mode lays out the
    /// whole hierarchy.
    fn refresh_visible(&mut self) {
        let collapsed = match self.layout.kind() {
            LayoutKind::Tree => collapsed_set(&self.data.nodes),
            LayoutKind::Force => HashSet::new(),
        };
        self.visible = visible_tree(&self.hierarchy, &collapsed);
    }

    pub fn data(&self) -> &MindMapData {
        &self.data
    }

    pub fn resize(&mut self, viewport: Viewport) {
        if viewport == self.viewport {
            return;
        }
        self.viewport = viewport;
        self.camera.set_viewport(viewport);
        self.layout.resize(viewport);
        self.hits.refresh(self.layout.frame());
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_dark_mode(&mut self, dark: bool) {
        self.dark_mode = dark;
    }

    pub fn is_dark_mode(&self) -> bool {
        self.dark_mode
    }

    pub fn layout_kind(&self) -> LayoutKind {
        self.layout.kind()
    }

    /// Swap strategies. The view resets to the new strategy's initial
    /// transform and any running gesture is dropped.
    pub fn set_layout(&mut self, kind: LayoutKind) {
        if kind == self.layout.kind() {
            return;
        }
        log::debug!("layout {} → {kind}", self.layout.kind());
        self.config.layout = kind;
        self.layout = new_layout(kind, &self.config.force, &self.config.tree, self.viewport);
        self.camera.set_immediate(self.layout.initial_transform());
        self.resolver.set_config(self.config.interaction_for(kind));
        self.tracker = CollapseTracker::new();
        self.motion.clear();
        self.exiting.clear();
        self.marquee = None;
        self.refresh_visible();
        self.run_pass();
    }

    /// Advance simulation, camera, and transitions to `now_ms`. Returns
    /// true while another frame is needed.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        self.now_ms = now_ms;
        let simulating = self.layout.step();
        if self.layout.kind() == LayoutKind::Force {
            self.hits.refresh(self.layout.frame());
        }
        let camera = self.camera.tick(now_ms);
        self.motion.retain(|_, m| !m.tween.is_finished(now_ms));
        self.exiting.retain(|e| !e.fade.is_finished(now_ms));
        log::trace!(
            "tick {now_ms}: sim={simulating} camera={camera} tweens={} exiting={}",
            self.motion.len(),
            self.exiting.len()
        );
        simulating || camera || !self.motion.is_empty() || !self.exiting.is_empty()
    }

    fn run_pass(&mut self) {
        let displayed = self.displayed_positions();
        let previous: HashMap<NodeId, PlacedNode> = self
            .layout
            .frame()
            .nodes
            .iter()
            .map(|n| (n.id, n.clone()))
            .collect();
        let transition = self.tracker
            .transition(&self.hierarchy, &self.visible, &displayed);

        self.layout.update(&LayoutInput {
            nodes: &self.data.nodes,
            visible: &self.visible,
            links: &self.data.links,
            viewport: self.viewport,
            measurer: self.measurer.as_ref(),
        });
        self.hits.refresh(self.layout.frame());
        log::debug!(
            "{} pass: {} node(s), {} link(s), {} entered, {} exited",
            self.layout.kind(),
            self.layout.frame().nodes.len(),
            self.layout.frame().links.len(),
            transition.entered.len(),
            transition.exited.len()
        );

        if self.layout.kind() == LayoutKind::Tree {
            self.schedule_transitions(&displayed, &previous, transition);
        } else {
            self.motion.clear();
            self.exiting.clear();
        }
    }

    fn schedule_transitions(
        &mut self,
        displayed: &HashMap<NodeId, Point>,
        previous: &HashMap<NodeId, PlacedNode>,
        transition: Transition,
    ) {
        let now = self.now_ms;
        let duration = self.config.tree.transition_ms;
        let entered: HashMap<NodeId, Option<Point>> = transition.entered.into_iter().collect();
        let frame = self.layout.frame();

        let mut motion = HashMap::new();
        for node in &frame.nodes {
            let from = match entered.get(&node.id) {
                Some(seed) => *seed,
                None => displayed.get(&node.id).copied(),
            };
            let Some(from) = from else {
                continue;
            };
            if from == node.position {
                continue;
            }
            motion.insert(
                node.id,
                Motion {
                    tween: Tween::new(from, node.position, now, duration, Easing::CubicInOut),
                    entering: entered.contains_key(&node.id),
                },
            );
        }

        let mut exiting = Vec::new();
        for (id, ancestor) in transition.exited {
            let Some(node) = previous.get(&id) else {
                continue;
            };
            let from = displayed.get(&id).copied().unwrap_or(node.position);
            let to = ancestor.and_then(|a| frame.position(a)).unwrap_or(from);
            exiting.push(Exiting {
                node: node.clone(),
                motion: Tween::new(from, to, now, duration, Easing::CubicInOut),
                fade: Tween::new(1.0, 0.0, now, duration, Easing::Linear),
            });
        }

        self.motion = motion;
        self.exiting.retain(|e| !self.visible.contains(e.node.id));
        self.exiting
            .retain(|e| !exiting.iter().any(|x: &Exiting| x.node.id == e.node.id));
        self.exiting.extend(exiting);
    }

    fn displayed_position(&self, node: &PlacedNode) -> Point {
        self.motion
            .get(&node.id)
            .map(|m| m.tween.sample(self.now_ms))
            .unwrap_or(node.position)
    }

    fn displayed_positions(&self) -> HashMap<NodeId, Point> {
        self.layout
            .frame()
            .nodes
            .iter()
            .map(|n| (n.id, self.displayed_position(n)))
            .collect()
    }

    // ─── Input ───────────────────────────────────────────────────────────

    pub fn handle_input(&mut self, event: InputEvent) -> InputResponse {
        let view = EngineView {
            hits: &self.hits,
            camera: &self.camera,
            frame: self.layout.frame(),
            data: &self.data,
        };
        let intents = self.resolver.handle(event, &view);

        let mut response = InputResponse::default();
        for intent in intents {
            match intent {
                Intent::Emit(e) => {
                    log::debug!("event: {e:?}");
                    response.events.push(e);
                }
                Intent::BeginDrag(ids) => {
                    for id in &ids {
                        self.motion.remove(id);
                    }
                    self.layout.begin_drag(&ids);
                    response.needs_redraw = true;
                }
                Intent::DragTo(moves) => {
                    self.layout.drag_to(&moves);
                    self.hits.refresh(self.layout.frame());
                    response.needs_redraw = true;
                }
                Intent::EndDrag(ids) => self.layout.end_drag(&ids),
                Intent::PanBy(delta) => {
                    self.camera.pan_by(delta);
                    response.needs_redraw = true;
                }
                Intent::ZoomAt { anchor, factor } => {
                    self.camera.zoom_at(anchor, factor);
                    response.needs_redraw = true;
                }
                Intent::ResetView => {
                    self.center_view();
                    response.needs_redraw = true;
                }
                Intent::Marquee(rect) => {
                    self.marquee = rect;
                    response.needs_redraw = true;
                }
                Intent::PreventDefault => response.prevent_default = true,
            }
        }
        response.capturing = self.resolver.is_capturing();
        response
    }

    // ─── Camera ──────────────────────────────────────────────────────────

    pub fn zoom_in(&mut self) {
        self.camera.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.camera.zoom_out();
    }

    pub fn center_view(&mut self) {
        self.camera.center_on(self.layout.home());
    }

    /// Animate to `id`. Returns false (and logs) when it is not on screen.
    pub fn focus_node(&mut self, id: NodeId) -> bool {
        let Some(p) = self.layout.frame().position(id) else {
            log::warn!("focus_node: `{id}` is not in the current frame");
            return false;
        };
        self.camera.focus(p);
        true
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    // ─── Output ──────────────────────────────────────────────────────────

    /// Layout targets. Hit testing runs against these.
    pub fn layout_frame(&self) -> &LayoutFrame {
        self.layout.frame()
    }

    pub fn hit_cache(&self) -> &HitCache {
        &self.hits
    }

    /// Everything a renderer needs, at displayed positions.
    pub fn render_frame(&self) -> RenderFrame {
        let now = self.now_ms;
        let frame = self.layout.frame();
        let nodes: Vec<PlacedNode> = frame
            .nodes
            .iter()
            .map(|n| {
                let mut n = n.clone();
                if let Some(m) = self.motion.get(&n.id) {
                    n.position = m.tween.sample(now);
                    if m.entering {
                        n.enter_from = Some(m.tween.from);
                    }
                }
                n
            })
            .collect();

        let by_id: HashMap<NodeId, &PlacedNode> = nodes.iter().map(|n| (n.id, n)).collect();
        let links = frame
            .links
            .iter()
            .map(|link| {
                let moving = self.motion.contains_key(&link.source)
                    || self.motion.contains_key(&link.target);
                match (by_id.get(&link.source), by_id.get(&link.target)) {
                    (Some(s), Some(t)) if moving => LinkPath {
                        curve: LinkCurve::between(s, s.position, t, t.position),
                        ..*link
                    },
                    _ => *link,
                }
            })
            .collect();

        let exiting = self
            .exiting
            .iter()
            .map(|e| {
                let mut node = e.node.clone();
                node.position = e.motion.sample(now);
                FadingNode {
                    node,
                    opacity: e.fade.sample(now),
                }
            })
            .collect();

        RenderFrame {
            layout: self.layout.kind(),
            nodes,
            links,
            exiting,
            marquee: self.marquee,
            transform: self.camera.transform(),
            viewport: self.viewport,
            dark_mode: self.dark_mode,
        }
    }

    /// Rasterize the current view to a PNG data URL.
    pub fn export_to_image(&self) -> Result<String, ExportError> {
        if !self.mounted {
            return Err(ExportError::NotMounted);
        }
        export_png_data_url(&self.render_frame())
    }

    pub fn last_diagnostic(&self) -> Option<&str> {
        self.diagnostic.as_deref()
    }

    pub fn mount(&mut self) {
        self.mounted = true;
    }

    /// Detach from the surface. A running gesture is dropped, releasing
    /// its capture.
    pub fn unmount(&mut self) {
        self.mounted = false;
        self.resolver.reset();
        self.marquee = None;
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }
}

/// Read-only view of the engine handed to the resolver.
struct EngineView<'a> {
    hits: &'a HitCache,
    camera: &'a Camera,
    frame: &'a LayoutFrame,
    data: &'a MindMapData,
}

impl SceneQuery for EngineView<'_> {
    fn region_at(&self, screen: Point) -> HitRegion {
        self.hits.region_at(self.camera.screen_to_canvas(screen))
    }

    fn nodes_in(&self, screen: Rect) -> Vec<NodeId> {
        let canvas = self.camera.transform().screen_rect_to_canvas(screen);
        self.hits.hit_test_rect(canvas)
    }

    fn drag_group(&self, anchor: NodeId) -> Vec<(NodeId, Point)> {
        let selection = self.data.selection();
        if !selection.contains(&anchor) {
            return self
                .frame
                .position(anchor)
                .map(|p| vec![(anchor, p)])
                .unwrap_or_default();
        }
        self.frame
            .nodes
            .iter()
            .filter(|n| selection.contains(&n.id))
            .map(|n| (n.id, n.position))
            .collect()
    }

    fn scale(&self) -> f64 {
        self.camera.transform().k
    }

    fn is_expanded(&self, id: NodeId) -> bool {
        self.frame.node(id).is_none_or(|n| n.expanded)
    }
}
