//! Geometry and tolerance checks for a channel pair
//!
//! Three problems make a pair unrotatable and are returned as errors. Everything
//! else (sample rate, units, band/instrument codes, orientation codes, vertical
//! and orthogonality tolerance, location) is only a [`GeometryWarning`]:
//! rotation proceeds and the analyst is told.

use rotation_common::geo::{
    are_within_tolerance, distance_km, QUARTER_CIRCLE_DEG, THREE_QUARTER_CIRCLE_DEG,
};
use rotation_common::model::{Channel, RotationParameters};
use rotation_common::{Error, Result};
use std::fmt;

/// Tolerances applied when comparing two channels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToleranceSet {
    pub sample_rate_tolerance_hz: f64,
    pub orientation_angle_tolerance_deg: f64,
    pub location_tolerance_km: f64,
}

impl From<&RotationParameters> for ToleranceSet {
    fn from(parameters: &RotationParameters) -> Self {
        Self {
            sample_rate_tolerance_hz: parameters.sample_rate_tolerance_hz,
            orientation_angle_tolerance_deg: parameters.orientation_angle_tolerance_deg,
            location_tolerance_km: parameters.location_tolerance_km,
        }
    }
}

/// Non-fatal geometry problem found while validating a pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryWarning {
    SampleRateOutOfTolerance,
    IncompatibleUnits,
    IncompatibleBandCodes,
    IncompatibleInstrumentTypes,
    IncompatibleOrientationCodes,
    OutOfVerticalTolerance,
    NotOrthogonal,
    OutOfLocationTolerance,
}

impl GeometryWarning {
    pub fn message(&self) -> &'static str {
        match self {
            GeometryWarning::SampleRateOutOfTolerance => "Channels are out of sample rate tolerance",
            GeometryWarning::IncompatibleUnits => "Incompatible channel units",
            GeometryWarning::IncompatibleBandCodes => "Incompatible channel band codes",
            GeometryWarning::IncompatibleInstrumentTypes => "Incompatible channel instrument types",
            GeometryWarning::IncompatibleOrientationCodes => {
                "Incompatible channel orientation codes"
            }
            GeometryWarning::OutOfVerticalTolerance => "Channel out of vertical tolerance",
            GeometryWarning::NotOrthogonal => "Channels are not orthogonal",
            GeometryWarning::OutOfLocationTolerance => {
                "Channels are not within location tolerance"
            }
        }
    }
}

impl fmt::Display for GeometryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

pub fn are_channels_within_sample_rate_tolerance(tolerance_hz: f64, a: &Channel, b: &Channel) -> bool {
    are_within_tolerance(tolerance_hz, a.nominal_sample_rate_hz, b.nominal_sample_rate_hz)
}

/// N pairs with E or 2, E with N or 1, 1 with E or 2, 2 with N or 1
pub fn are_channel_orientation_codes_compatible(a: &Channel, b: &Channel) -> bool {
    let other = b.channel_orientation_code.as_str();
    match a.channel_orientation_code.as_str() {
        "N" => matches!(other, "E" | "2"),
        "E" => matches!(other, "N" | "1"),
        "1" => matches!(other, "E" | "2"),
        "2" => matches!(other, "N" | "1"),
        _ => false,
    }
}

/// A horizontal channel has a vertical angle of 90 degrees
pub fn is_channel_within_vertical_tolerance(tolerance_deg: f64, channel: &Channel) -> bool {
    are_within_tolerance(
        tolerance_deg,
        channel.vertical_angle_deg().map(f64::abs),
        Some(QUARTER_CIRCLE_DEG),
    )
}

/// Horizontal angles differ by 90 or 270 degrees, within tolerance
pub fn are_channels_orthogonal(tolerance_deg: f64, a: &Channel, b: &Channel) -> bool {
    match (a.horizontal_angle_deg(), b.horizontal_angle_deg()) {
        (Some(h1), Some(h2)) => {
            let diff = Some((h1 - h2).abs());
            are_within_tolerance(tolerance_deg, diff, Some(QUARTER_CIRCLE_DEG))
                || are_within_tolerance(tolerance_deg, diff, Some(THREE_QUARTER_CIRCLE_DEG))
        }
        _ => false,
    }
}

pub fn are_channel_locations_within_tolerance(tolerance_km: f64, a: &Channel, b: &Channel) -> bool {
    distance_km(&a.location, &b.location) <= tolerance_km
}

/// Compare the steering azimuths of two derived channels
///
/// A channel without `STEERING_BACK_AZIMUTH` metadata never matches.
pub fn are_channel_azimuths_within_tolerance(tolerance_deg: f64, a: &Channel, b: &Channel) -> bool {
    are_within_tolerance(tolerance_deg, a.steering_back_azimuth(), b.steering_back_azimuth())
}

/// Validate a pair before rotating it
///
/// Returns the warnings in check order. Fails when there are not exactly two
/// channels, when either lacks orientation angles, or when both point the same way.
pub fn validate_channel_inputs(
    channels: &[Channel],
    tolerances: &ToleranceSet,
) -> Result<Vec<GeometryWarning>> {
    let [a, b] = channels else {
        return Err(Error::Validation(
            "maskAndRotate2d: Rotation requires exactly two channels".to_string(),
        ));
    };
    if a.orientation_angles.is_none() || b.orientation_angles.is_none() {
        return Err(Error::Validation(
            "maskAndRotate2d: Channels do not have correct orientation angles".to_string(),
        ));
    }
    if a.horizontal_angle_deg() == b.horizontal_angle_deg() {
        return Err(Error::Validation(
            "maskAndRotate2d: Channels cannot have the same orientation angle".to_string(),
        ));
    }

    let mut warnings = Vec::new();
    if !are_channels_within_sample_rate_tolerance(tolerances.sample_rate_tolerance_hz, a, b) {
        warnings.push(GeometryWarning::SampleRateOutOfTolerance);
    }
    if a.units != b.units {
        warnings.push(GeometryWarning::IncompatibleUnits);
    }
    if a.channel_band_type != b.channel_band_type {
        warnings.push(GeometryWarning::IncompatibleBandCodes);
    }
    if a.channel_instrument_type != b.channel_instrument_type {
        warnings.push(GeometryWarning::IncompatibleInstrumentTypes);
    }
    if !are_channel_orientation_codes_compatible(a, b) {
        warnings.push(GeometryWarning::IncompatibleOrientationCodes);
    }
    let angle_tolerance = tolerances.orientation_angle_tolerance_deg;
    if !is_channel_within_vertical_tolerance(angle_tolerance, a)
        || !is_channel_within_vertical_tolerance(angle_tolerance, b)
    {
        warnings.push(GeometryWarning::OutOfVerticalTolerance);
    }
    if !are_channels_orthogonal(angle_tolerance, a, b) {
        warnings.push(GeometryWarning::NotOrthogonal);
    }
    if !are_channel_locations_within_tolerance(tolerances.location_tolerance_km, a, b) {
        warnings.push(GeometryWarning::OutOfLocationTolerance);
    }
    Ok(warnings)
}
