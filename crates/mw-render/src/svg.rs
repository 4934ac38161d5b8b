//! Serialize a render frame to a standalone SVG document.
//!
//! The document is viewport-sized: the background fills it, the map sits
//! inside one group carrying the view transform, and the marquee is drawn
//! on top in screen space.

use crate::scene::RenderFrame;
use crate::theme::CanvasTheme;
use kurbo::Point;
use mw_core::layout::{BOX_HEIGHT, BOX_INSET_X, LinkPath, NodeShape, PlacedNode};
use mw_core::model::NodeKind;

const CORNER_RADIUS: f64 = 10.0;
const FONT_SIZE: f64 = 14.0;
const LABEL_OFFSET_X: f64 = 10.0;

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub fn render_svg(frame: &RenderFrame) -> String {
    let theme = frame.theme();
    let width = frame.viewport.width.max(1.0);
    let height = frame.viewport.height.max(1.0);

    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">\n"
    ));
    svg.push_str("<style>\n");
    svg.push_str("  text { font-family: Inter, system-ui, sans-serif; }\n");
    svg.push_str("</style>\n");
    svg.push_str(&format!(
        "<rect width=\"{width}\" height=\"{height}\" fill=\"{}\" />\n",
        theme.bg
    ));

    let t = frame.transform;
    svg.push_str(&format!(
        "<g transform=\"matrix({} 0 0 {} {} {})\">\n",
        t.k, t.k, t.x, t.y
    ));
    for link in &frame.links {
        render_link(&mut svg, link, &theme);
    }
    for fading in &frame.exiting {
        svg.push_str(&format!("<g opacity=\"{}\">\n", fading.opacity.clamp(0.0, 1.0)));
        render_node(&mut svg, &fading.node, &theme);
        svg.push_str("</g>\n");
    }
    for node in &frame.nodes {
        render_node(&mut svg, node, &theme);
    }
    svg.push_str("</g>\n");

    if let Some(m) = frame.marquee {
        let m = m.abs();
        svg.push_str(&format!(
            "<rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\" fill-opacity=\"0.1\" stroke=\"{}\" stroke-width=\"1\" />\n",
            m.x0,
            m.y0,
            m.width(),
            m.height(),
            theme.selection,
            theme.selection
        ));
    }

    svg.push_str("</svg>");
    svg
}

fn render_link(out: &mut String, link: &LinkPath, theme: &CanvasTheme) {
    out.push_str(&format!(
        "  <path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"1.5\" />\n",
        link.curve.to_svg(),
        theme.link
    ));
}

fn render_node(out: &mut String, node: &PlacedNode, theme: &CanvasTheme) {
    let Point { x, y } = node.position;
    let is_root = node.kind == NodeKind::Root;
    let fill = if is_root {
        theme.root_fill
    } else if node.selected {
        theme.node_fill_selected
    } else {
        theme.node_fill
    };
    let stroke = if node.selected { theme.selection } else { theme.stroke };
    let stroke_width = if node.selected { 2.0 } else { 1.0 };
    let text_fill = if is_root { theme.root_text } else { theme.text_primary };
    let dash = if node.loading { " stroke-dasharray=\"4 3\"" } else { "" };
    let label = escape(&node.text);

    out.push_str(&format!("  <g transform=\"translate({x}, {y})\">\n"));
    match node.shape {
        NodeShape::Pill { width } => {
            out.push_str(&format!(
                "    <rect x=\"{}\" y=\"{}\" width=\"{width}\" height=\"{BOX_HEIGHT}\" rx=\"{CORNER_RADIUS}\" ry=\"{CORNER_RADIUS}\" fill=\"{fill}\" stroke=\"{stroke}\" stroke-width=\"{stroke_width}\"{dash} />\n",
                -BOX_INSET_X,
                -BOX_HEIGHT / 2.0
            ));
            out.push_str(&format!(
                "    <text x=\"{LABEL_OFFSET_X}\" dy=\"0.35em\" font-size=\"{FONT_SIZE}\" fill=\"{text_fill}\">{label}</text>\n"
            ));
            if let Some(toggle) = node.toggle() {
                let cx = toggle.center.x - x;
                let glyph = if node.expanded { "−" } else { "+" };
                out.push_str(&format!(
                    "    <circle cx=\"{cx}\" cy=\"0\" r=\"{}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1\" />\n",
                    toggle.radius, theme.node_fill, theme.stroke
                ));
                out.push_str(&format!(
                    "    <text x=\"{cx}\" dy=\"0.35em\" font-size=\"12\" text-anchor=\"middle\" fill=\"{}\">{glyph}</text>\n",
                    theme.text_secondary
                ));
            }
        }
        NodeShape::Circle { radius } => {
            out.push_str(&format!(
                "    <circle r=\"{radius}\" fill=\"{fill}\" stroke=\"{stroke}\" stroke-width=\"{stroke_width}\"{dash} />\n"
            ));
            out.push_str(&format!(
                "    <text dy=\"0.35em\" font-size=\"{FONT_SIZE}\" text-anchor=\"middle\" fill=\"{text_fill}\">{label}</text>\n"
            ));
        }
    }
    out.push_str("  </g>\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::FadingNode;
    use kurbo::Rect;
    use mw_core::camera::ViewTransform;
    use mw_core::id::NodeId;
    use mw_core::layout::{LayoutKind, LinkCurve};
    use mw_core::model::Viewport;

    fn pill(id: &str, text: &str, x: f64, y: f64) -> PlacedNode {
        PlacedNode {
            id: NodeId::intern(id),
            kind: NodeKind::Child,
            text: text.to_owned(),
            explanation: String::new(),
            position: Point::new(x, y),
            shape: NodeShape::Pill { width: 80.0 },
            depth: 1,
            selected: false,
            loading: false,
            expanded: true,
            has_children: false,
            image_url: None,
            enter_from: None,
        }
    }

    fn frame() -> RenderFrame {
        RenderFrame {
            layout: LayoutKind::Tree,
            viewport: Viewport::new(400.0, 300.0),
            transform: ViewTransform::new(0.8, 66.0, 150.0),
            ..RenderFrame::default()
        }
    }

    #[test]
    fn empty_frame_is_background_only() {
        let svg = render_svg(&frame());
        assert!(svg.starts_with("<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"400\" height=\"300\""));
        assert!(svg.contains("fill=\"#f8fafc\""));
        assert!(svg.contains("matrix(0.8 0 0 0.8 66 150)"));
        assert!(svg.ends_with("</svg>"));
    }

    #[test]
    fn dark_mode_uses_dark_background() {
        let svg = render_svg(&RenderFrame {
            dark_mode: true,
            ..frame()
        });
        assert!(svg.contains("fill=\"#111827\""));
    }

    #[test]
    fn labels_are_escaped() {
        let mut f = frame();
        f.nodes.push(pill("a", "R&D <core>", 0.0, 0.0));
        let svg = render_svg(&f);
        assert!(svg.contains("R&amp;D &lt;core&gt;"));
        assert!(!svg.contains("<core>"));
    }

    #[test]
    fn toggle_shows_expand_state() {
        let mut f = frame();
        let mut parent = pill("p", "Parent", 0.0, 0.0);
        parent.has_children = true;
        parent.expanded = false;
        f.nodes.push(parent);
        let svg = render_svg(&f);
        assert!(svg.contains("<circle cx=\"80\" cy=\"0\" r=\"9\""));
        assert!(svg.contains(">+</text>"));
    }

    #[test]
    fn links_exiting_nodes_and_marquee() {
        let mut f = frame();
        f.links.push(LinkPath {
            source: NodeId::intern("a"),
            target: NodeId::intern("b"),
            curve: LinkCurve::horizontal(Point::new(70.0, 0.0), Point::new(290.0, 40.0)),
        });
        f.exiting.push(FadingNode {
            node: pill("gone", "Gone", 300.0, 0.0),
            opacity: 0.25,
        });
        f.marquee = Some(Rect::new(50.0, 60.0, 10.0, 20.0));
        let svg = render_svg(&f);
        assert!(svg.contains("<path d=\"M"));
        assert!(svg.contains("<g opacity=\"0.25\">"));
        assert!(svg.contains("<rect x=\"10\" y=\"20\" width=\"40\" height=\"40\""));
    }
}
