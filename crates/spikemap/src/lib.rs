//! Spike map: regions from a topology, one spike per data row standing on its
//! region's anchor, and invisible voronoi cells for hover.

pub mod chart;
pub mod config;
pub mod error;
pub mod interaction;

pub use chart::{Container, SpikeMap};
pub use config::{Margin, Props, PropsOverrides};
pub use error::SpikeMapError;
pub use interaction::{HoverContext, PointerEvent, Selected};
