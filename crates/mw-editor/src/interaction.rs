//! Interaction resolver: raw input → gestures → intents.
//!
//! A single gesture slot holds whatever the pointer is doing. A press on a
//! node stays `Pressed` until the pointer travels past the drag threshold,
//! so a release without travel is always a click and never a drag. Leave
//! and blur commit the gesture the same way a release does.

use crate::capture::{PointerCapture, Subscription};
use crate::events::{MapEvent, PositionUpdate};
use crate::input::{InputEvent, PointerButton};
use kurbo::{Point, Rect, Vec2};
use mw_core::id::NodeId;
use mw_core::layout::LayoutKind;
use mw_render::hit::HitRegion;
use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};
use std::rc::Rc;

/// Button bindings and thresholds. `for_layout` gives the per-strategy
/// defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Screen-space travel (px) before a node press becomes a drag.
    pub drag_threshold: f64,
    /// Background presses with these buttons start a box-select.
    pub box_select_buttons: SmallVec<[PointerButton; 2]>,
    /// Background presses with these buttons pan the view.
    pub pan_buttons: SmallVec<[PointerButton; 2]>,
    /// Wheel zoom factor is `2^(-delta_y · wheel_sensitivity)`.
    pub wheel_sensitivity: f64,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self::for_layout(LayoutKind::default())
    }
}

impl InteractionConfig {
    pub fn for_layout(kind: LayoutKind) -> Self {
        let (box_select_buttons, pan_buttons) = match kind {
            LayoutKind::Tree => (smallvec![PointerButton::Primary], smallvec![PointerButton::Middle]),
            LayoutKind::Force => (
                SmallVec::new(),
                smallvec![PointerButton::Primary, PointerButton::Middle],
            ),
        };
        Self {
            drag_threshold: 5.0,
            box_select_buttons,
            pan_buttons,
            wheel_sensitivity: 0.002,
        }
    }

    pub fn wheel_factor(&self, delta_y: f64) -> f64 {
        (-delta_y * self.wheel_sensitivity).exp2()
    }
}

/// What the resolver needs to know about the canvas.
pub trait SceneQuery {
    /// Region under a screen point.
    fn region_at(&self, screen: Point) -> HitRegion;
    /// Nodes overlapping a screen rectangle.
    fn nodes_in(&self, screen: Rect) -> Vec<NodeId>;
    /// Nodes that move with `anchor`, with their current canvas positions.
    fn drag_group(&self, anchor: NodeId) -> Vec<(NodeId, Point)>;
    fn scale(&self) -> f64;
    fn is_expanded(&self, id: NodeId) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressTarget {
    Node(NodeId),
    Toggle(NodeId),
}

impl PressTarget {
    pub fn id(self) -> NodeId {
        match self {
            PressTarget::Node(id) | PressTarget::Toggle(id) => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Gesture {
    #[default]
    Idle,
    Pressed {
        target: PressTarget,
        origin: Point,
    },
    Dragging {
        starts: Vec<(NodeId, Point)>,
        origin: Point,
        last: Point,
    },
    BoxSelecting {
        start: Point,
        current: Point,
    },
    Panning {
        last: Point,
    },
}

/// Side effects for the engine to apply.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Emit(MapEvent),
    BeginDrag(Vec<NodeId>),
    DragTo(Vec<(NodeId, Point)>),
    EndDrag(Vec<NodeId>),
    PanBy(Vec2),
    ZoomAt { anchor: Point, factor: f64 },
    ResetView,
    /// Screen-space marquee to draw, or `None` to clear it.
    Marquee(Option<Rect>),
    PreventDefault,
}

pub struct InteractionResolver {
    config: InteractionConfig,
    capture: Rc<dyn PointerCapture>,
    gesture: Gesture,
    subscription: Option<Subscription>,
}

impl InteractionResolver {
    pub fn new(config: InteractionConfig, capture: Rc<dyn PointerCapture>) -> Self {
        Self {
            config,
            capture,
            gesture: Gesture::Idle,
            subscription: None,
        }
    }

    pub fn config(&self) -> &InteractionConfig {
        &self.config
    }

    /// Swap bindings. Any running gesture is dropped without committing.
    pub fn set_config(&mut self, config: InteractionConfig) {
        self.config = config;
        self.reset();
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    pub fn is_capturing(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn reset(&mut self) {
        self.gesture = Gesture::Idle;
        self.subscription = None;
    }

    fn enter(&mut self, gesture: Gesture) {
        if self.subscription.is_none() {
            self.subscription = Some(Subscription::acquire(self.capture.clone()));
        }
        self.gesture = gesture;
    }

    pub fn handle(&mut self, event: InputEvent, scene: &dyn SceneQuery) -> Vec<Intent> {
        match event {
            InputEvent::PointerDown { position, button } => self.press(position, button, scene),
            InputEvent::PointerMove { position } => self.motion(position, scene),
            InputEvent::PointerUp { position } => self.commit(Some(position), scene),
            InputEvent::PointerLeave | InputEvent::Blur => self.commit(None, scene),
            InputEvent::ContextMenu { position } => match scene.region_at(position) {
                HitRegion::Node(id) | HitRegion::Toggle(id) => vec![
                    Intent::Emit(MapEvent::NodeRightClick {
                        id,
                        x: position.x,
                        y: position.y,
                    }),
                    Intent::PreventDefault,
                ],
                HitRegion::Background => Vec::new(),
            },
            InputEvent::DoubleClick { position } => match scene.region_at(position) {
                HitRegion::Background if matches!(self.gesture, Gesture::Idle) => {
                    vec![Intent::ResetView]
                }
                _ => Vec::new(),
            },
            InputEvent::Wheel { position, delta_y } => vec![
                Intent::ZoomAt {
                    anchor: position,
                    factor: self.config.wheel_factor(delta_y),
                },
                Intent::PreventDefault,
            ],
        }
    }

    fn press(&mut self, position: Point, button: PointerButton, scene: &dyn SceneQuery) -> Vec<Intent> {
        if !matches!(self.gesture, Gesture::Idle) || button == PointerButton::Secondary {
            return Vec::new();
        }

        let target = match scene.region_at(position) {
            HitRegion::Toggle(id) => Some(PressTarget::Toggle(id)),
            HitRegion::Node(id) => Some(PressTarget::Node(id)),
            HitRegion::Background => None,
        };
        if let Some(target) = target
            && button == PointerButton::Primary
        {
            self.enter(Gesture::Pressed {
                target,
                origin: position,
            });
            return Vec::new();
        }

        if self.config.box_select_buttons.contains(&button) {
            self.enter(Gesture::BoxSelecting {
                start: position,
                current: position,
            });
            return vec![Intent::Marquee(Some(Rect::from_points(position, position)))];
        }
        if self.config.pan_buttons.contains(&button) {
            self.enter(Gesture::Panning { last: position });
        }
        Vec::new()
    }

    fn motion(&mut self, position: Point, scene: &dyn SceneQuery) -> Vec<Intent> {
        match &mut self.gesture {
            Gesture::Idle => Vec::new(),
            Gesture::Pressed { target, origin } => {
                if (position - *origin).hypot() <= self.config.drag_threshold {
                    return Vec::new();
                }
                if let PressTarget::Toggle(id) = *target {
                    log::debug!("toggle press on {id} travelled, dropping it");
                    self.reset();
                    return Vec::new();
                }
                let origin = *origin;
                let starts = scene.drag_group(target.id());
                let ids = starts.iter().map(|(id, _)| *id).collect();
                log::debug!("drag started on {} with {} node(s)", target.id(), starts.len());
                let moved = translated(&starts, drag_delta(origin, position, scene.scale()));
                self.gesture = Gesture::Dragging {
                    starts,
                    origin,
                    last: position,
                };
                vec![Intent::BeginDrag(ids), Intent::DragTo(moved)]
            }
            Gesture::Dragging { starts, origin, last } => {
                *last = position;
                let delta = drag_delta(*origin, position, scene.scale());
                vec![Intent::DragTo(translated(starts, delta))]
            }
            Gesture::BoxSelecting { start, current } => {
                *current = position;
                vec![Intent::Marquee(Some(Rect::from_points(*start, position)))]
            }
            Gesture::Panning { last } => {
                let delta = position - *last;
                *last = position;
                vec![Intent::PanBy(delta)]
            }
        }
    }

    fn commit(&mut self, at: Option<Point>, scene: &dyn SceneQuery) -> Vec<Intent> {
        let gesture = std::mem::take(&mut self.gesture);
        self.subscription = None;

        match gesture {
            Gesture::Idle | Gesture::Panning { .. } => Vec::new(),
            Gesture::Pressed { target, .. } => {
                let event = match target {
                    PressTarget::Node(id) => MapEvent::NodeClick { id },
                    PressTarget::Toggle(id) => MapEvent::NodeToggle {
                        id,
                        expanded: !scene.is_expanded(id),
                    },
                };
                vec![Intent::Emit(event)]
            }
            Gesture::Dragging { starts, origin, last } => {
                let end = at.unwrap_or(last);
                let moved = translated(&starts, drag_delta(origin, end, scene.scale()));
                let ids = starts.iter().map(|(id, _)| *id).collect();
                let updates = moved
                    .iter()
                    .map(|(id, p)| PositionUpdate {
                        id: *id,
                        x: p.x,
                        y: p.y,
                    })
                    .collect();
                vec![
                    Intent::DragTo(moved),
                    Intent::EndDrag(ids),
                    Intent::Emit(MapEvent::NodeDragEnd { updates }),
                ]
            }
            Gesture::BoxSelecting { start, current } => {
                let end = at.unwrap_or(current);
                let ids = scene.nodes_in(Rect::from_points(start, end));
                let travelled = (end - start).hypot() > self.config.drag_threshold;
                let mut intents = vec![Intent::Marquee(None)];
                if travelled || !ids.is_empty() {
                    intents.push(Intent::Emit(MapEvent::BoxSelect { ids }));
                }
                intents
            }
        }
    }
}

fn drag_delta(origin: Point, pointer: Point, scale: f64) -> Vec2 {
    let k = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };
    (pointer - origin) / k
}

fn translated(starts: &[(NodeId, Point)], delta: Vec2) -> Vec<(NodeId, Point)> {
    starts.iter().map(|(id, p)| (*id, *p + delta)).collect()
}
