use formats::TopologyError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpikeMapError {
    #[error("Must pass topojson to SpikeMap::set_geo_data()")]
    MissingGeoData,
    #[error("Must pass data to SpikeMap::set_data()")]
    MissingData,
    #[error("invalid props: {0}")]
    InvalidProps(String),
    #[error(transparent)]
    Topology(#[from] TopologyError),
}
