//! Domain model for the rotation pipeline
//!
//! Serialized field names are camelCase so request/response JSON matches the wider
//! analysis data model.

pub mod channel;
pub mod channel_name;
pub mod detection;
pub mod event;
pub mod filter;
pub mod metadata;
pub mod rotation;
pub mod segment;
pub mod station;

pub use channel::{
    Channel, ChannelBandType, ChannelDataType, ChannelInstrumentType, ChannelOrientationType,
    ResponseReference, Units,
};
pub use channel_name::{ChannelName, ChannelNameKind};
pub use detection::{
    AnalysisWaveform, FeatureMeasurement, FeatureMeasurementType, MeasurementValue,
    SignalDetection, SignalDetectionHypothesis, SignalDetectionHypothesisId,
    ValueWithStandardDeviation,
};
pub use event::{
    Event, EventHypothesis, EventHypothesisId, EventLocation, LocationSolution,
    PreferredEventHypothesis,
};
pub use filter::{FilterDefinition, FilterDefinitionUsage, FilterDescription};
pub use metadata::{
    BeamMetadata, FilterMetadata, ProcessingDefinition, ProcessingMetadata, RotationMetadata,
};
pub use rotation::{
    BeamDefinition, BeamDescription, BeamParameters, ProcessingMaskDefinition,
    RotationDefinition, RotationDescription, RotationParameters, RotationTemplate, SamplingType,
    TaperDefinition,
};
pub use segment::{
    ChannelSegmentDescriptor, MaskAndRotate2dResult, MissingInputChannel, ProcessingMask,
    ProcessingOperation, Timeseries, UiChannelSegment,
};
pub use station::{Station, StationType};

use serde::{Deserialize, Serialize};

/// Geographic location of a station, channel or event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub latitude_degrees: f64,
    pub longitude_degrees: f64,
    pub depth_km: f64,
    pub elevation_km: f64,
}

/// Sensor orientation; either angle may be unknown
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrientationAngles {
    pub horizontal_angle_deg: Option<f64>,
    pub vertical_angle_deg: Option<f64>,
}

/// Closed time interval in epoch seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRange {
    pub start_time_secs: f64,
    pub end_time_secs: f64,
}

impl TimeRange {
    pub fn new(start_time_secs: f64, end_time_secs: f64) -> Self {
        Self {
            start_time_secs,
            end_time_secs,
        }
    }

    /// Inclusive containment
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start_time_secs && time <= self.end_time_secs
    }

    pub fn overlaps(&self, start: f64, end: f64) -> bool {
        start <= self.end_time_secs && end >= self.start_time_secs
    }
}

/// Reference to one version of a named entity (`name` + `effectiveAt`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionReference {
    pub name: String,
    #[serde(default)]
    pub effective_at: Option<f64>,
}

impl VersionReference {
    pub fn new(name: impl Into<String>, effective_at: Option<f64>) -> Self {
        Self {
            name: name.into(),
            effective_at,
        }
    }
}
