//! WASM bridge for Mindweave: exposes the mind-map engine to JavaScript.
//!
//! Compiled via `wasm-pack build --target web`. Structured values cross
//! the boundary as JSON strings; input handlers return an `InputResponse`
//! the host uses to fire callbacks, call `preventDefault`, and set pointer
//! capture.

mod console;
mod measure;

use measure::JsMeasurer;
use mw_core::{HeuristicMeasurer, LayoutKind, MindMapData, NodeId, Viewport};
use mw_editor::{CaptureFlag, EngineConfig, InputEvent, InputResponse, MindMapEngine, PointerButton};
use mw_render::render_svg;
use std::rc::Rc;
use wasm_bindgen::prelude::*;

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        log::error!("failed to serialize response: {e}");
        "{}".to_string()
    })
}

fn parse_mode(mode: &str) -> Option<LayoutKind> {
    match mode.parse::<LayoutKind>() {
        Ok(kind) => Some(kind),
        Err(e) => {
            log::warn!("{e}");
            None
        }
    }
}

/// The WASM-facing mind-map controller.
#[wasm_bindgen]
pub struct MindMapCanvas {
    engine: MindMapEngine,
    capture: Rc<CaptureFlag>,
}

#[wasm_bindgen]
impl MindMapCanvas {
    /// Create a canvas in `mode` (`"tree"` or `"force"`, default tree).
    #[wasm_bindgen(constructor)]
    pub fn new(width: f64, height: f64, mode: &str) -> Self {
        let config = EngineConfig {
            layout: parse_mode(mode).unwrap_or_default(),
            ..EngineConfig::default()
        };
        Self::build(width, height, config)
    }

    /// Create a canvas from a JSON `EngineConfig`. Unknown or malformed
    /// settings fall back to defaults.
    pub fn with_config(width: f64, height: f64, config_json: &str) -> Self {
        let config = serde_json::from_str(config_json).unwrap_or_else(|e| {
            log::warn!("ignoring engine config: {e}");
            EngineConfig::default()
        });
        Self::build(width, height, config)
    }

    /// Replace the snapshot. Returns `false` when the JSON is malformed or
    /// the hierarchy is invalid; see `last_diagnostic`.
    pub fn set_data(&mut self, json: &str) -> bool {
        match serde_json::from_str::<MindMapData>(json) {
            Ok(data) => self.engine.set_data(data),
            Err(e) => {
                log::warn!("rejecting snapshot: {e}");
                false
            }
        }
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.engine.resize(Viewport::new(width, height));
    }

    /// Measure labels with `measure(text) -> number`. Zero, a non-number,
    /// or a throw falls back to the glyph estimate for that label.
    pub fn set_text_measurer(&mut self, measure: js_sys::Function) {
        self.engine.set_measurer(Box::new(JsMeasurer::new(measure)));
    }

    pub fn clear_text_measurer(&mut self) {
        self.engine.set_measurer(Box::new(HeuristicMeasurer));
    }

    pub fn set_theme(&mut self, is_dark: bool) {
        self.engine.set_dark_mode(is_dark);
    }

    /// Switch layout. Returns `false` for an unknown mode name.
    pub fn set_mode(&mut self, mode: &str) -> bool {
        let Some(kind) = parse_mode(mode) else {
            return false;
        };
        self.engine.set_layout(kind);
        true
    }

    pub fn mode(&self) -> String {
        self.engine.layout_kind().to_string()
    }

    /// Advance to `now_ms`. Returns true while animation continues.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        self.engine.tick(now_ms)
    }

    // ─── Input ───────────────────────────────────────────────────────────

    /// `button` is the DOM `MouseEvent.button` code.
    pub fn pointer_down(&mut self, x: f64, y: f64, button: i16) -> String {
        match PointerButton::from_dom(button) {
            Some(button) => self.respond(InputEvent::pointer_down(x, y, button)),
            None => to_json(&InputResponse::default()),
        }
    }

    pub fn pointer_move(&mut self, x: f64, y: f64) -> String {
        self.respond(InputEvent::pointer_move(x, y))
    }

    pub fn pointer_up(&mut self, x: f64, y: f64) -> String {
        self.respond(InputEvent::pointer_up(x, y))
    }

    pub fn pointer_leave(&mut self) -> String {
        self.respond(InputEvent::PointerLeave)
    }

    pub fn context_menu(&mut self, x: f64, y: f64) -> String {
        self.respond(InputEvent::context_menu(x, y))
    }

    pub fn double_click(&mut self, x: f64, y: f64) -> String {
        self.respond(InputEvent::double_click(x, y))
    }

    pub fn wheel(&mut self, x: f64, y: f64, delta_y: f64) -> String {
        self.respond(InputEvent::wheel(x, y, delta_y))
    }

    pub fn blur(&mut self) -> String {
        self.respond(InputEvent::Blur)
    }

    // ─── Camera ──────────────────────────────────────────────────────────

    pub fn zoom_in(&mut self) {
        self.engine.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.engine.zoom_out();
    }

    pub fn center_view(&mut self) {
        self.engine.center_view();
    }

    pub fn focus_node(&mut self, id: &str) -> bool {
        self.engine.focus_node(NodeId::intern(id))
    }

    // ─── Output ──────────────────────────────────────────────────────────

    /// The current render frame as JSON.
    pub fn frame_json(&self) -> String {
        to_json(&self.engine.render_frame())
    }

    pub fn render_svg(&self) -> String {
        render_svg(&self.engine.render_frame())
    }

    pub fn mount(&mut self) {
        self.engine.mount();
    }

    pub fn unmount(&mut self) {
        self.engine.unmount();
    }

    /// Resolves to a `data:image/png;base64,…` URL of the current view.
    pub fn export_to_image(&self) -> js_sys::Promise {
        match self.engine.export_to_image() {
            Ok(url) => js_sys::Promise::resolve(&JsValue::from_str(&url)),
            Err(e) => {
                log::warn!("export failed: {e}");
                js_sys::Promise::reject(&JsValue::from_str(&e.to_string()))
            }
        }
    }

    pub fn last_diagnostic(&self) -> Option<String> {
        self.engine.last_diagnostic().map(str::to_owned)
    }
}

impl MindMapCanvas {
    fn build(width: f64, height: f64, config: EngineConfig) -> Self {
        console::install_panic_hook();
        console::init(log::LevelFilter::Warn);
        let capture = Rc::new(CaptureFlag::new());
        let engine = MindMapEngine::with_capture(config, Viewport::new(width, height), capture.clone());
        Self { engine, capture }
    }

    fn respond(&mut self, event: InputEvent) -> String {
        let response = self.engine.handle_input(event);
        debug_assert_eq!(response.capturing, self.capture.is_held());
        to_json(&response)
    }
}

/// Set the console log level (`off`, `error`, `warn`, `info`, `debug`,
/// `trace`). Returns `false` for an unknown name.
#[wasm_bindgen]
pub fn set_log_level(level: &str) -> bool {
    match console::parse_level(level) {
        Some(filter) => {
            console::init(filter);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SNAPSHOT: &str = r#"{
        "nodes": [
            { "id": "w_root", "text": "Root", "type": "root" },
            { "id": "w_a", "text": "Alpha", "type": "child", "parentId": "w_root" }
        ],
        "links": [{ "source": "w_root", "target": "w_a" }]
    }"#;

    #[test]
    fn unknown_mode_falls_back_to_tree() {
        let mut canvas = MindMapCanvas::new(800.0, 600.0, "radial");
        assert_eq!(canvas.mode(), "tree");
        assert!(!canvas.set_mode("radial"));
        assert!(canvas.set_mode("force"));
        assert_eq!(canvas.mode(), "force");
    }

    #[test]
    fn malformed_snapshot_is_rejected() {
        let mut canvas = MindMapCanvas::new(800.0, 600.0, "tree");
        assert!(!canvas.set_data("{ not json"));
        assert!(canvas.set_data(SNAPSHOT));
        assert_eq!(canvas.last_diagnostic(), None);
    }

    #[test]
    fn pointer_responses_are_json() {
        let mut canvas = MindMapCanvas::new(800.0, 600.0, "tree");
        assert!(canvas.set_data(SNAPSHOT));
        let down: serde_json::Value = serde_json::from_str(&canvas.pointer_down(5.0, 5.0, 0)).unwrap();
        assert_eq!(down["capturing"], serde_json::json!(true));
        let up: serde_json::Value = serde_json::from_str(&canvas.pointer_up(5.0, 5.0)).unwrap();
        assert_eq!(up["capturing"], serde_json::json!(false));
        assert_eq!(up["events"], serde_json::json!([]));

        let back_button: serde_json::Value = serde_json::from_str(&canvas.pointer_down(5.0, 5.0, 3)).unwrap();
        assert_eq!(back_button["events"], serde_json::json!([]));
    }

    #[test]
    fn frame_json_strips_nothing_real() {
        let mut canvas = MindMapCanvas::new(800.0, 600.0, "tree");
        assert!(canvas.set_data(SNAPSHOT));
        let frame: serde_json::Value = serde_json::from_str(&canvas.frame_json()).unwrap();
        assert_eq!(frame["layout"], serde_json::json!("tree"));
        assert_eq!(frame["nodes"].as_array().map(Vec::len), Some(2));
        assert_eq!(frame["links"][0]["source"], serde_json::json!("w_root"));
        assert!(canvas.render_svg().starts_with("<svg"));
    }

    #[test]
    fn with_config_reads_engine_settings() {
        let canvas = MindMapCanvas::with_config(400.0, 300.0, r#"{ "layout": "force" }"#);
        assert_eq!(canvas.mode(), "force");
        let fallback = MindMapCanvas::with_config(400.0, 300.0, "not json");
        assert_eq!(fallback.mode(), "tree");
    }
}
