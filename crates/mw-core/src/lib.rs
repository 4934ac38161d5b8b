pub mod anim;
pub mod camera;
pub mod collapse;
pub mod hierarchy;
pub mod id;
pub mod layout;
pub mod measure;
pub mod model;

pub use anim::{Easing, Lerp, Tween};
pub use camera::{Camera, CameraConfig, ViewTransform};
pub use collapse::{CollapseTracker, Transition, VisibleTree, collapsed_set, visible_tree};
pub use hierarchy::{Hierarchy, HierarchyError, build_hierarchy};
pub use id::{NodeId, VIRTUAL_ROOT_ID};
pub use layout::{
    ForceConfig, Layout, LayoutFrame, LayoutInput, LayoutKind, LinkCurve, LinkPath,
    ManualPositionPolicy, NodeShape, PlacedNode, TreeConfig, new_layout,
};
pub use measure::{HeuristicMeasurer, TextMeasurer};
pub use model::*;

// Re-export kurbo so downstream crates share one geometry version
pub use kurbo;
