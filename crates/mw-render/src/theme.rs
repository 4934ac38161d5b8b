//! Light and dark canvas palettes.

/// Colors used by the SVG serializer and the raster background fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasTheme {
    pub bg: &'static str,
    pub node_fill: &'static str,
    pub node_fill_selected: &'static str,
    pub text_primary: &'static str,
    pub text_secondary: &'static str,
    pub stroke: &'static str,
    pub selection: &'static str,
    pub root_fill: &'static str,
    pub root_text: &'static str,
    pub link: &'static str,
}

impl CanvasTheme {
    /// Slate on near-white.
    pub fn light() -> Self {
        Self {
            bg: "#f8fafc",
            node_fill: "#ffffff",
            node_fill_selected: "#f1f5f9",
            text_primary: "#0f172a",
            text_secondary: "#475569",
            stroke: "#cbd5e1",
            selection: "#60A5FA",
            root_fill: "#4F46E5",
            root_text: "#FFFFFF",
            link: "#cbd5e1",
        }
    }

    /// Gray-900 canvas.
    pub fn dark() -> Self {
        Self {
            bg: "#111827",
            node_fill: "#1F2937",
            node_fill_selected: "#374151",
            text_primary: "#F9FAFB",
            text_secondary: "#9CA3AF",
            stroke: "#4B5563",
            selection: "#60A5FA",
            root_fill: "#374151",
            root_text: "#F9FAFB",
            link: "#4B5563",
        }
    }

    pub fn for_mode(dark: bool) -> Self {
        if dark { Self::dark() } else { Self::light() }
    }
}
