//! Rotation, beam and processing-mask definitions

use super::{Location, OrientationAngles, VersionReference};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How samples are taken from the input channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SamplingType {
    Interpolated,
    Nearest,
}

impl FromStr for SamplingType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "INTERPOLATED" => Ok(SamplingType::Interpolated),
            "NEAREST" => Ok(SamplingType::Nearest),
            other => Err(Error::Validation(format!("Invalid sampling type: {}", other))),
        }
    }
}

impl fmt::Display for SamplingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SamplingType::Interpolated => f.write_str("INTERPOLATED"),
            SamplingType::Nearest => f.write_str("NEAREST"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationDescription {
    pub phase_type: String,
    pub sampling_type: SamplingType,
    pub two_dimensional: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationParameters {
    pub location: Location,
    pub location_tolerance_km: f64,
    pub orientation_angles: OrientationAngles,
    pub orientation_angle_tolerance_deg: f64,
    pub receiver_to_source_azimuth_deg: f64,
    pub sample_rate_hz: f64,
    pub sample_rate_tolerance_hz: f64,
}

/// Complete geometry, tolerances and phase driving one rotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationDefinition {
    pub rotation_description: RotationDescription,
    pub rotation_parameters: RotationParameters,
}

impl RotationDefinition {
    pub fn phase(&self) -> &str {
        &self.rotation_description.phase_type
    }

    pub fn azimuth_deg(&self) -> f64 {
        self.rotation_parameters.receiver_to_source_azimuth_deg
    }
}

/// Per station/phase defaults for rotating
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationTemplate {
    pub station: VersionReference,
    pub duration: f64,
    pub lead_duration: f64,
    pub location_tolerance_km: f64,
    pub orientation_angle_tolerance_deg: f64,
    pub sample_rate_tolerance_hz: f64,
    pub rotation_description: RotationDescription,
    /// Explicit channels to rotate
    #[serde(default)]
    pub input_channels: Option<Vec<VersionReference>>,
    /// Channel group whose channels should be rotated
    #[serde(default)]
    pub input_channel_group: Option<VersionReference>,
}

impl RotationTemplate {
    pub fn phase(&self) -> &str {
        &self.rotation_description.phase_type
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeamDescription {
    pub beam_summation: String,
    pub beam_type: String,
    pub phase: String,
    pub sampling_type: SamplingType,
    pub two_dimensional: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeamParameters {
    pub receiver_to_source_azimuth_deg: f64,
    pub slowness_sec_per_deg: f64,
    pub sample_rate_hz: f64,
    #[serde(default)]
    pub location: Option<Location>,
    pub orientation_angles: OrientationAngles,
    #[serde(default)]
    pub event_hypothesis_id: Option<String>,
    #[serde(default)]
    pub signal_detection_hypothesis_id: Option<String>,
}

/// Produced by the beamforming pipeline; carried here for naming beamed channels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BeamDefinition {
    pub beam_description: BeamDescription,
    pub beam_parameters: BeamParameters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaperDefinition {
    pub taper_function: String,
    pub taper_duration_samples: u32,
}

/// How masks are built for a channel, phase and processing operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingMaskDefinition {
    pub max_masked_segment_length_secs: f64,
    pub processing_operation: super::ProcessingOperation,
    #[serde(default)]
    pub applied_qc_segment_categories: Vec<String>,
    #[serde(default)]
    pub taper_definition: Option<TaperDefinition>,
}
