//! Node text measurement with a deterministic fallback.
//!
//! Hosts with a real text engine plug in a `TextMeasurer`. When the probe
//! is missing or reports zero for non-empty text, widths come from a
//! glyph-class estimate instead (ASCII narrower than CJK). This is a silent
//! degradation, never an error.

/// Width of one ASCII glyph in the fallback estimate.
pub const ASCII_GLYPH_WIDTH: f64 = 9.0;
/// Width of one non-ASCII (CJK, emoji, …) glyph in the fallback estimate.
pub const WIDE_GLYPH_WIDTH: f64 = 15.0;

/// Horizontal padding on each side of a tree node's label.
pub const LABEL_PADDING: f64 = 24.0;

/// Measures rendered label width in pixels. `0.0` means "unavailable".
pub trait TextMeasurer {
    fn measure(&self, text: &str) -> f64;
}

/// Always-available glyph-class estimate.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicMeasurer;

impl TextMeasurer for HeuristicMeasurer {
    fn measure(&self, text: &str) -> f64 {
        text.chars()
            .map(|c| {
                if c.is_ascii() {
                    ASCII_GLYPH_WIDTH
                } else {
                    WIDE_GLYPH_WIDTH
                }
            })
            .sum()
    }
}

/// Measure with `measurer`, falling back to the heuristic on a zero or
/// non-finite probe.
pub fn measure_or_estimate(measurer: &dyn TextMeasurer, text: &str) -> f64 {
    if text.is_empty() {
        return 0.0;
    }
    let probed = measurer.measure(text);
    if probed.is_finite() && probed > 0.0 {
        probed
    } else {
        HeuristicMeasurer.measure(text)
    }
}

/// Full box width of a tree node with this label.
pub fn node_box_width(measurer: &dyn TextMeasurer, text: &str) -> f64 {
    measure_or_estimate(measurer, text) + LABEL_PADDING * 2.0
}
