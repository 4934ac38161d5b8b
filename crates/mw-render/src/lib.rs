pub mod hit;
pub mod raster;
pub mod scene;
pub mod svg;
pub mod theme;

pub use hit::{HitCache, HitEntry, HitRegion};
pub use raster::{ExportError, export_png_data_url, svg_to_png};
pub use scene::{FadingNode, RenderFrame};
pub use svg::render_svg;
pub use theme::CanvasTheme;
