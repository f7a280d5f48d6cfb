pub mod entity;
pub mod graph;
pub mod node;
pub mod picking;
pub mod selection;
pub mod svg;
pub mod transition;

pub use entity::NodeId;
pub use graph::*;
pub use node::{Node, Selector};
pub use picking::{HitRegion, pick_point};
pub use selection::Join;
pub use transition::{Transition, interpolate_string};
