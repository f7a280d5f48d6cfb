pub mod clip_box;
pub mod feature;
pub mod topology;

pub use clip_box::*;
pub use feature::*;
pub use topology::*;

pub use foundation::math::GeoPoint;
