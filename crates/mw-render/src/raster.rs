//! Rasterize the current view: SVG → pixmap → PNG → data URL.

use crate::scene::RenderFrame;
use crate::svg::render_svg;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("render surface is not mounted")]
    NotMounted,
    #[error("failed to decode serialized SVG: {0}")]
    SvgDecode(String),
    #[error("failed to allocate {width}x{height} pixmap")]
    PixmapAlloc { width: u32, height: u32 },
    #[error("failed to encode PNG: {0}")]
    PngEncode(String),
}

pub type Result<T> = std::result::Result<T, ExportError>;

const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Render `svg` onto a `width × height` pixmap pre-filled with `background`
/// and encode it as PNG.
pub fn svg_to_png(svg: &str, width: u32, height: u32, background: &str) -> Result<Vec<u8>> {
    let pixmap = svg_to_pixmap(svg, width, height, background)?;
    pixmap
        .encode_png()
        .map_err(|e| ExportError::PngEncode(e.to_string()))
}

/// Serialize `frame` and return it as a `data:image/png;base64,` URL sized
/// to the viewport.
pub fn export_png_data_url(frame: &RenderFrame) -> Result<String> {
    let svg = render_svg(frame);
    let width = pixel_extent(frame.viewport.width);
    let height = pixel_extent(frame.viewport.height);
    let png = svg_to_png(&svg, width, height, frame.theme().bg)?;
    log::debug!("exported {width}x{height} PNG ({} bytes)", png.len());
    Ok(format!("{PNG_DATA_URL_PREFIX}{}", STANDARD.encode(png)))
}

fn pixel_extent(v: f64) -> u32 {
    if v.is_finite() { v.ceil().max(1.0) as u32 } else { 1 }
}

fn svg_to_pixmap(svg: &str, width: u32, height: u32, background: &str) -> Result<tiny_skia::Pixmap> {
    #[allow(unused_mut)]
    let mut opt = usvg::Options::default();
    #[cfg(not(target_arch = "wasm32"))]
    opt.fontdb_mut().load_system_fonts();

    let tree = usvg::Tree::from_str(svg, &opt).map_err(|e| ExportError::SvgDecode(e.to_string()))?;

    let mut pixmap =
        tiny_skia::Pixmap::new(width, height).ok_or(ExportError::PixmapAlloc { width, height })?;
    if let Some(color) = parse_color(background) {
        pixmap.fill(color);
    }

    let size = tree.size();
    let sx = width as f32 / size.width().max(1.0);
    let sy = height as f32 / size.height().max(1.0);
    resvg::render(&tree, tiny_skia::Transform::from_scale(sx, sy), &mut pixmap.as_mut());
    Ok(pixmap)
}

/// `#rgb` or `#rrggbb`.
fn parse_color(text: &str) -> Option<tiny_skia::Color> {
    let hex = text.trim().strip_prefix('#')?;
    fn hex2(b: &[u8]) -> Option<u8> {
        let hi = (*b.first()? as char).to_digit(16)? as u8;
        let lo = (*b.get(1)? as char).to_digit(16)? as u8;
        Some((hi << 4) | lo)
    }
    fn hex1(c: u8) -> Option<u8> {
        let v = (c as char).to_digit(16)? as u8;
        Some((v << 4) | v)
    }

    let bytes = hex.as_bytes();
    match bytes.len() {
        3 => Some(tiny_skia::Color::from_rgba8(
            hex1(bytes[0])?,
            hex1(bytes[1])?,
            hex1(bytes[2])?,
            255,
        )),
        6 => Some(tiny_skia::Color::from_rgba8(
            hex2(&bytes[0..2])?,
            hex2(&bytes[2..4])?,
            hex2(&bytes[4..6])?,
            255,
        )),
        _ => None,
    }
}
