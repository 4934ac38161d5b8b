//! The renderer-adapter input: everything needed to draw one frame.

use crate::theme::CanvasTheme;
use kurbo::Rect;
use mw_core::camera::ViewTransform;
use mw_core::layout::{LayoutKind, LinkPath, PlacedNode};
use mw_core::model::Viewport;
use serde::Serialize;

/// A node on its way out, drawn at `opacity`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FadingNode {
    #[serde(flatten)]
    pub node: PlacedNode,
    pub opacity: f64,
}

/// Nodes at their displayed (possibly mid-tween) positions, the links
/// between them, and the view state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderFrame {
    pub layout: LayoutKind,
    pub nodes: Vec<PlacedNode>,
    pub links: Vec<LinkPath>,
    pub exiting: Vec<FadingNode>,
    /// Box-select rectangle in screen space.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marquee: Option<Rect>,
    pub transform: ViewTransform,
    pub viewport: Viewport,
    pub dark_mode: bool,
}

impl RenderFrame {
    pub fn theme(&self) -> CanvasTheme {
        CanvasTheme::for_mode(self.dark_mode)
    }
}
