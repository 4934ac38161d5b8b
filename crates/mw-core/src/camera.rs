//! Pan/zoom transform and screen ↔ canvas coordinate conversion.
//!
//! `screen = canvas · k + (x, y)`. The scale is clamped to the configured
//! extent on every update, so zooming past a bound just stops at the bound.

use crate::anim::{Easing, Lerp, Tween};
use crate::model::Viewport;
use kurbo::{Affine, Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// A uniform-scale pan/zoom transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    pub k: f64,
    pub x: f64,
    pub y: f64,
}

impl ViewTransform {
    pub const IDENTITY: Self = Self {
        k: 1.0,
        x: 0.0,
        y: 0.0,
    };

    pub fn new(k: f64, x: f64, y: f64) -> Self {
        Self { k, x, y }
    }

    /// The transform that shows canvas point `world` at screen point
    /// `screen` with scale `k`.
    pub fn looking_at(world: Point, screen: Point, k: f64) -> Self {
        Self {
            k,
            x: screen.x - world.x * k,
            y: screen.y - world.y * k,
        }
    }

    pub fn screen_to_canvas(&self, p: Point) -> Point {
        Point::new((p.x - self.x) / self.k, (p.y - self.y) / self.k)
    }

    pub fn canvas_to_screen(&self, p: Point) -> Point {
        Point::new(p.x * self.k + self.x, p.y * self.k + self.y)
    }

    /// Convert a screen rectangle (either corner order) to canvas space.
    pub fn screen_rect_to_canvas(&self, r: Rect) -> Rect {
        let r = r.abs();
        Rect::from_points(
            self.screen_to_canvas(Point::new(r.x0, r.y0)),
            self.screen_to_canvas(Point::new(r.x1, r.y1)),
        )
    }

    /// The canvas → screen affine for renderers.
    pub fn to_affine(&self) -> Affine {
        Affine::new([self.k, 0.0, 0.0, self.k, self.x, self.y])
    }
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Lerp for ViewTransform {
    fn lerp(self, to: Self, t: f64) -> Self {
        Self {
            k: self.k.lerp(to.k, t),
            x: self.x.lerp(to.x, t),
            y: self.y.lerp(to.y, t),
        }
    }
}

/// Zoom bounds, steps, and transition timings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub min_scale: f64,
    pub max_scale: f64,
    pub zoom_in_step: f64,
    pub zoom_out_step: f64,
    pub step_ms: f64,
    pub center_ms: f64,
    pub focus_ms: f64,
    pub focus_scale: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.1,
            max_scale: 4.0,
            zoom_in_step: 1.2,
            zoom_out_step: 0.8,
            step_ms: 300.0,
            center_ms: 750.0,
            focus_ms: 1000.0,
            focus_scale: 1.5,
        }
    }
}

/// Owns the live transform and at most one animated transition.
#[derive(Debug, Clone)]
pub struct Camera {
    config: CameraConfig,
    viewport: Viewport,
    current: ViewTransform,
    transition: Option<Tween<ViewTransform>>,
    now_ms: f64,
}

impl Camera {
    pub fn new(config: CameraConfig, viewport: Viewport, initial: ViewTransform) -> Self {
        let mut camera = Self {
            config,
            viewport,
            current: ViewTransform::IDENTITY,
            transition: None,
            now_ms: 0.0,
        };
        camera.set_immediate(initial);
        camera
    }

    pub fn transform(&self) -> ViewTransform {
        self.current
    }

    /// Where the camera is heading (the current transform when idle).
    pub fn target(&self) -> ViewTransform {
        self.transition.map(|t| t.to).unwrap_or(self.current)
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn is_animating(&self) -> bool {
        self.transition.is_some()
    }

    pub fn screen_to_canvas(&self, p: Point) -> Point {
        self.current.screen_to_canvas(p)
    }

    pub fn canvas_to_screen(&self, p: Point) -> Point {
        self.current.canvas_to_screen(p)
    }

    fn clamp_scale(&self, k: f64) -> f64 {
        if !k.is_finite() {
            return self.config.min_scale;
        }
        k.clamp(self.config.min_scale, self.config.max_scale)
    }

    /// Jump to `t` (scale clamped), cancelling any transition.
    pub fn set_immediate(&mut self, t: ViewTransform) {
        self.transition = None;
        self.current = ViewTransform {
            k: self.clamp_scale(t.k),
            ..t
        };
    }

    fn animate_to(&mut self, to: ViewTransform, duration_ms: f64, easing: Easing) {
        let to = ViewTransform {
            k: self.clamp_scale(to.k),
            ..to
        };
        self.transition = Some(Tween::new(self.current, to, self.now_ms, duration_ms, easing));
    }

    /// Scale about a screen anchor, keeping the canvas point under it fixed.
    fn scaled_about(&self, base: ViewTransform, anchor: Point, factor: f64) -> ViewTransform {
        let world = base.screen_to_canvas(anchor);
        let k = self.clamp_scale(base.k * factor);
        ViewTransform::looking_at(world, anchor, k)
    }

    pub fn zoom_in(&mut self) {
        self.zoom_step(self.config.zoom_in_step);
    }

    pub fn zoom_out(&mut self) {
        self.zoom_step(self.config.zoom_out_step);
    }

    fn zoom_step(&mut self, factor: f64) {
        let to = self.scaled_about(self.target(), self.viewport.center(), factor);
        self.animate_to(to, self.config.step_ms, Easing::CubicInOut);
    }

    /// Immediate zoom about a screen point (wheel / pinch).
    pub fn zoom_at(&mut self, anchor: Point, factor: f64) {
        let to = self.scaled_about(self.current, anchor, factor);
        self.set_immediate(to);
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        let t = self.current;
        self.set_immediate(ViewTransform {
            x: t.x + delta.x,
            y: t.y + delta.y,
            ..t
        });
    }

    /// Animate to scale 1 with canvas point `home` at the viewport center.
    pub fn center_on(&mut self, home: Point) {
        let to = ViewTransform::looking_at(home, self.viewport.center(), 1.0);
        self.animate_to(to, self.config.center_ms, Easing::CubicInOut);
    }

    /// Animate so `point` sits at the viewport center, zoomed in.
    pub fn focus(&mut self, point: Point) {
        let k = self.clamp_scale(self.config.focus_scale);
        let to = ViewTransform::looking_at(point, self.viewport.center(), k);
        self.animate_to(to, self.config.focus_ms, Easing::CubicOut);
    }

    /// Advance to `now_ms`. Returns true while a transition is running.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        self.now_ms = now_ms;
        let Some(tween) = self.transition else {
            return false;
        };
        self.current = tween.sample(now_ms);
        if tween.is_finished(now_ms) {
            self.transition = None;
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> Camera {
        Camera::new(
            CameraConfig::default(),
            Viewport::new(800.0, 600.0),
            ViewTransform::IDENTITY,
        )
    }

    fn approx(a: Point, b: Point) -> bool {
        (a - b).hypot() < 1e-9
    }

    #[test]
    fn screen_canvas_roundtrip() {
        let t = ViewTransform::new(2.0, 100.0, -40.0);
        let p = Point::new(310.0, 60.0);
        let c = t.screen_to_canvas(p);
        assert_eq!(c, Point::new(105.0, 50.0));
        assert!(approx(t.canvas_to_screen(c), p));
    }

    #[test]
    fn screen_rect_normalizes_corners() {
        let t = ViewTransform::new(0.5, 10.0, 10.0);
        let r = t.screen_rect_to_canvas(Rect::new(60.0, 110.0, 10.0, 10.0));
        assert_eq!(r, Rect::new(0.0, 0.0, 100.0, 200.0));
    }

    #[test]
    fn scale_is_clamped_not_rejected() {
        let mut cam = camera();
        cam.set_immediate(ViewTransform::new(50.0, 0.0, 0.0));
        assert_eq!(cam.transform().k, 4.0);
        for _ in 0..40 {
            cam.zoom_at(Point::new(400.0, 300.0), 0.5);
        }
        assert_eq!(cam.transform().k, 0.1);
    }

    #[test]
    fn zoom_at_keeps_anchor_fixed() {
        let mut cam = camera();
        let anchor = Point::new(200.0, 150.0);
        let before = cam.screen_to_canvas(anchor);
        cam.zoom_at(anchor, 2.0);
        assert!(approx(cam.screen_to_canvas(anchor), before));
        assert_eq!(cam.transform().k, 2.0);
    }

    #[test]
    fn zoom_in_animates_about_viewport_center() {
        let mut cam = camera();
        cam.tick(0.0);
        cam.zoom_in();
        assert!(cam.is_animating());
        assert!(cam.tick(150.0));
        assert!(!cam.tick(300.0));
        let t = cam.transform();
        assert!((t.k - 1.2).abs() < 1e-9);
        assert!(approx(
            cam.screen_to_canvas(Point::new(400.0, 300.0)),
            Point::new(400.0, 300.0)
        ));
    }

    #[test]
    fn repeated_zoom_in_compounds_from_target() {
        let mut cam = camera();
        cam.tick(0.0);
        cam.zoom_in();
        cam.zoom_in();
        assert!((cam.target().k - 1.44).abs() < 1e-9);
    }

    #[test]
    fn focus_centers_point_at_focus_scale() {
        let mut cam = camera();
        cam.tick(0.0);
        cam.focus(Point::new(1000.0, -200.0));
        cam.tick(1000.0);
        let t = cam.transform();
        assert_eq!(t.k, 1.5);
        assert!(approx(
            t.canvas_to_screen(Point::new(1000.0, -200.0)),
            Point::new(400.0, 300.0)
        ));
    }

    #[test]
    fn center_on_origin_translates_to_viewport_center() {
        let mut cam = camera();
        cam.set_immediate(ViewTransform::new(3.0, -50.0, 20.0));
        cam.tick(10.0);
        cam.center_on(Point::ZERO);
        cam.tick(760.0);
        assert_eq!(cam.transform(), ViewTransform::new(1.0, 400.0, 300.0));
    }

    #[test]
    fn pan_cancels_transition() {
        let mut cam = camera();
        cam.tick(0.0);
        cam.zoom_in();
        cam.pan_by(Vec2::new(5.0, -5.0));
        assert!(!cam.is_animating());
        assert_eq!(cam.transform(), ViewTransform::new(1.0, 5.0, -5.0));
    }
}
