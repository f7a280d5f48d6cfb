pub mod anchors;
pub mod layer;
pub mod path;
pub mod regions;
pub mod scale;
pub mod spikes;
pub mod symbology;
pub mod voronoi;

pub use layer::*;
