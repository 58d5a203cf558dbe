//! Geometry checks and request argument validation

pub mod arguments;
pub mod geometry;

pub use arguments::{
    station_matching_channel, validate_channels_for_rotation, validate_lead_duration,
    validate_location_and_azimuth, validate_location_or_azimuth, validate_sampling_type,
};
pub use geometry::{validate_channel_inputs, GeometryWarning, ToleranceSet};
