pub mod capture;
pub mod engine;
pub mod events;
pub mod input;
pub mod interaction;

pub use capture::{CaptureFlag, NoCapture, PointerCapture, Subscription};
pub use engine::{EngineConfig, InputResponse, MindMapEngine};
pub use events::{MapEvent, MapListener, PositionUpdate};
pub use input::{InputEvent, PointerButton};
pub use interaction::{Gesture, Intent, InteractionConfig, InteractionResolver, SceneQuery};
pub use mw_render::raster::ExportError;
