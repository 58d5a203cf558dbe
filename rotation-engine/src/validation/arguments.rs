//! Argument validation for the rotation entry points
//!
//! These run before any lookup or computation, so a bad request fails fast with
//! [`Error::Validation`].

use rotation_common::model::{Channel, Location, SamplingType, Station};
use rotation_common::{Error, Result};

pub fn validate_sampling_type(candidate: &str) -> Result<SamplingType> {
    candidate.parse()
}

/// Lead and duration are given together or not at all; a duration is non-negative
pub fn validate_lead_duration(lead_duration: Option<f64>, duration: Option<f64>) -> Result<()> {
    match (lead_duration, duration) {
        (None, None) => Ok(()),
        (Some(_), Some(duration)) if !(duration >= 0.0) => Err(Error::Validation(format!(
            "Invalid duration for rotation: {}. Duration must be a positive number.",
            duration
        ))),
        (Some(lead), Some(_)) if !lead.is_finite() => Err(Error::Validation(format!(
            "Invalid lead duration for rotation: {}. Lead duration must be a number.",
            lead
        ))),
        (Some(_), Some(_)) => Ok(()),
        (lead, duration) => Err(Error::Validation(format!(
            "leadDuration and duration must both be defined, or both be undefined; however, leadDuration is {} and duration is {}",
            display_optional(lead),
            display_optional(duration)
        ))),
    }
}

/// At most one of location and azimuth
pub fn validate_location_or_azimuth(location: Option<&Location>, azimuth_deg: Option<f64>) -> Result<()> {
    if location.is_some() && azimuth_deg.is_some() {
        return Err(Error::Validation(
            "Error rotating. One of location and receiverToSourceAzimuthDeg may be given, but not both."
                .to_string(),
        ));
    }
    Ok(())
}

/// Exactly one of location and azimuth; required when no event is open
pub fn validate_location_and_azimuth(
    location: Option<&Location>,
    azimuth_deg: Option<f64>,
) -> Result<()> {
    match (location, azimuth_deg) {
        (Some(_), Some(_)) => Err(Error::Validation(
            "Error rotating. Exactly one of location and receiverToSourceAzimuthDeg must be given, but both are provided."
                .to_string(),
        )),
        (None, None) => Err(Error::Validation(
            "Error rotating. Exactly one of location and receiverToSourceAzimuthDeg must be given, but neither is provided."
                .to_string(),
        )),
        _ => Ok(()),
    }
}

/// Two channels from the same station
pub fn validate_channels_for_rotation(channels: &[Channel]) -> Result<(&Channel, &Channel)> {
    let [a, b] = channels else {
        return Err(Error::Validation(format!(
            "Rotation requires exactly two channels, but rotate2dForChannels was called with {} channels",
            channels.len()
        )));
    };
    if a.station.name != b.station.name {
        return Err(Error::Validation(format!(
            "Cannot rotate for two channels from different stations. Received channels from {} and {}",
            a.station.name, b.station.name
        )));
    }
    Ok((a, b))
}

/// The station whose raw channels include `channel`
pub fn station_matching_channel<'a>(stations: &'a [Station], channel: &Channel) -> Result<&'a Station> {
    stations
        .iter()
        .find(|s| s.raw_channel(&channel.name).is_some())
        .ok_or_else(|| {
            Error::DataUnavailable(format!(
                "Cannot find station matching channels {}",
                channel.name
            ))
        })
}

fn display_optional(value: Option<f64>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "undefined".to_string())
}
