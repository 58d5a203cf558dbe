//! Rotation definitions, azimuths and time windows
//!
//! A rotation is steered by a receiver-to-source azimuth. The first available
//! source wins: an explicit azimuth, an explicit source location, the
//! detection's azimuth measurement, then the open event's preferred location.

use rotation_common::geo::{
    average_flat_earth_location, azimuth_between, mean, mean_angle_degrees, normalize_degrees,
    HALF_CIRCLE_DEG, THREE_QUARTER_CIRCLE_DEG,
};
use rotation_common::model::{
    Channel, Event, Location, OrientationAngles, RotationDefinition, RotationDescription,
    RotationParameters, RotationTemplate, SamplingType, SignalDetection, TimeRange,
};
use rotation_common::{Error, Result};

/// Everything that can steer a rotation
#[derive(Debug, Clone, Copy)]
pub struct AzimuthSources<'a> {
    pub receiver_location: &'a Location,
    pub receiver_to_source_azimuth_deg: Option<f64>,
    pub source_location: Option<&'a Location>,
    pub signal_detection: Option<&'a SignalDetection>,
    pub open_event: Option<&'a Event>,
    pub open_stage: &'a str,
}

/// Location of the open event's preferred solution for the open stage
pub fn preferred_event_location(event: &Event, open_stage: &str) -> Result<Location> {
    let hypothesis = event.preferred_hypothesis(open_stage).ok_or_else(|| {
        Error::DataUnavailable(
            "No preferred hypothesis found for current open event. Cannot rotate.".to_string(),
        )
    })?;
    let solution = event.preferred_location_solution(hypothesis).ok_or_else(|| {
        Error::DataUnavailable(
            "No preferred location solution found for open event. Cannot rotate.".to_string(),
        )
    })?;
    Ok(solution.location.to_location())
}

pub fn calculate_receiver_to_source_azimuth(sources: &AzimuthSources<'_>) -> Result<f64> {
    if let Some(azimuth) = sources.receiver_to_source_azimuth_deg {
        return Ok(azimuth);
    }
    if let Some(source) = sources.source_location {
        return Ok(azimuth_between(sources.receiver_location, source));
    }
    if let Some(azimuth) = sources
        .signal_detection
        .and_then(SignalDetection::current_hypothesis)
        .and_then(|h| h.receiver_to_source_azimuth())
    {
        return Ok(azimuth);
    }
    if let Some(event) = sources.open_event {
        let source = preferred_event_location(event, sources.open_stage)?;
        return Ok(azimuth_between(sources.receiver_location, &source));
    }
    Err(Error::Validation(
        "Cannot rotate. Either an event must be open, or a location or receiverToSourceAzimuth must be provided."
            .to_string(),
    ))
}

/// Two-dimensional description for `phase`, sampling defaulting to the template's
pub fn rotation_description(
    template: &RotationTemplate,
    phase: &str,
    sampling_type: Option<SamplingType>,
) -> RotationDescription {
    RotationDescription {
        phase_type: phase.to_string(),
        sampling_type: sampling_type.unwrap_or(template.rotation_description.sampling_type),
        two_dimensional: true,
    }
}

/// Build the definition for rotating `channels` toward `azimuth_deg`
///
/// The rotated horizontal angle points away from the source, the vertical angle
/// is the circular mean of the inputs and the location is their flat-earth mean.
pub fn create_2d_rotation_definition(
    channels: (&Channel, &Channel),
    template: &RotationTemplate,
    description: RotationDescription,
    azimuth_deg: f64,
) -> Result<RotationDefinition> {
    let (a, b) = channels;
    let vertical_angles = [a, b]
        .iter()
        .map(|c| {
            c.vertical_angle_deg().ok_or_else(|| {
                Error::Validation("Cannot rotate without known orientation angles.".to_string())
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let sample_rates = [a, b]
        .iter()
        .map(|c| {
            c.nominal_sample_rate_hz.ok_or_else(|| {
                Error::Validation(format!(
                    "Cannot rotate without a nominal sample rate for {}",
                    c.name
                ))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(RotationDefinition {
        rotation_description: description,
        rotation_parameters: RotationParameters {
            location: average_flat_earth_location(&a.location, &b.location),
            location_tolerance_km: template.location_tolerance_km,
            orientation_angles: OrientationAngles {
                horizontal_angle_deg: Some(normalize_degrees(azimuth_deg + HALF_CIRCLE_DEG)),
                vertical_angle_deg: mean_angle_degrees(&vertical_angles),
            },
            orientation_angle_tolerance_deg: template.orientation_angle_tolerance_deg,
            receiver_to_source_azimuth_deg: azimuth_deg,
            sample_rate_hz: mean(&sample_rates),
            sample_rate_tolerance_hz: template.sample_rate_tolerance_hz,
        },
    })
}

fn with_horizontal_offset(definition: &RotationDefinition, offset_deg: f64) -> RotationDefinition {
    let mut variant = definition.clone();
    variant.rotation_parameters.orientation_angles.horizontal_angle_deg = Some(
        normalize_degrees(definition.azimuth_deg() + offset_deg),
    );
    variant
}

/// Radial variant: oriented at `az + 180`
pub fn radial_definition(definition: &RotationDefinition) -> RotationDefinition {
    with_horizontal_offset(definition, HALF_CIRCLE_DEG)
}

/// Transverse variant: oriented at `az + 270`
pub fn transverse_definition(definition: &RotationDefinition) -> RotationDefinition {
    with_horizontal_offset(definition, THREE_QUARTER_CIRCLE_DEG)
}

/// Window to rotate over for a channel pair
///
/// Without an open event or a predicted arrival this is the viewable interval.
/// Otherwise the window starts `lead` before the arrival and lasts `duration`,
/// both defaulting to the template's values.
pub fn time_interval_for_rotation(
    viewable_interval: Option<TimeRange>,
    event_open: bool,
    predicted_arrival_time: Option<f64>,
    lead_duration: Option<f64>,
    duration: Option<f64>,
    template: &RotationTemplate,
) -> Result<TimeRange> {
    let viewable = viewable_interval.ok_or_else(|| {
        Error::Validation("Cannot rotate without a defined time range".to_string())
    })?;
    let arrival = match predicted_arrival_time {
        Some(arrival) if event_open => arrival,
        _ => return Ok(viewable),
    };
    let start = arrival - lead_duration.unwrap_or(template.lead_duration);
    Ok(TimeRange::new(
        start,
        start + duration.unwrap_or(template.duration),
    ))
}

/// `[arrival - lead, arrival + duration]` around the detection's current arrival time
pub fn rotation_time_range_for_signal_detection(
    signal_detection: &SignalDetection,
    lead_duration: f64,
    duration: f64,
) -> Option<TimeRange> {
    let arrival = signal_detection.current_hypothesis()?.arrival_time()?;
    Some(TimeRange::new(arrival - lead_duration, arrival + duration))
}
