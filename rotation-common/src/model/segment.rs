//! Channel segments, processing masks and rotation results

use super::channel::Channel;
use super::channel_name::ChannelName;
use super::{TimeRange, VersionReference};
use serde::{Deserialize, Serialize};

/// Processing operation a mask applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingOperation {
    AmplitudeMeasurementBeam,
    DisplayFilter,
    EventBeam,
    Fk,
    Rotation,
    SignalDetectionBeam,
    VirtualBeam,
}

/// Identifies one materialized time window of one channel version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSegmentDescriptor {
    pub channel: VersionReference,
    pub creation_time: f64,
    pub start_time: f64,
    pub end_time: f64,
}

impl ChannelSegmentDescriptor {
    /// Same lineage across filters
    ///
    /// Times must be equal and the channel codes (`STATION.GROUP.CODE`) must match;
    /// the full channel names may differ.
    pub fn matches(&self, other: &ChannelSegmentDescriptor) -> bool {
        self.start_time == other.start_time
            && self.end_time == other.end_time
            && self.creation_time == other.creation_time
            && ChannelName::parse(&self.channel.name)
                .has_same_code(&ChannelName::parse(&other.channel.name))
    }

    pub fn time_range(&self) -> TimeRange {
        TimeRange::new(self.start_time, self.end_time)
    }
}

impl std::fmt::Display for ChannelSegmentDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.channel.name, self.start_time, self.end_time, self.creation_time
        )
    }
}

/// One contiguous waveform series; samples live behind a claim check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeseries {
    pub start_time: f64,
    pub end_time: f64,
    pub sample_rate_hz: f64,
    pub sample_count: u64,
    /// Reference to bulk sample data stored outside the record
    pub claim_check_id: String,
}

/// Marks a time span of a raw channel as excluded for a processing operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingMask {
    pub id: String,
    pub applied_to_raw_channel: VersionReference,
    pub start_time: f64,
    pub end_time: f64,
    pub processing_operation: ProcessingOperation,
    #[serde(default)]
    pub effective_at: Option<f64>,
}

impl ProcessingMask {
    pub fn overlaps(&self, range: &TimeRange) -> bool {
        range.overlaps(self.start_time, self.end_time)
    }
}

/// Time ranges for which an input channel contributed no data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingInputChannel {
    pub channel: VersionReference,
    pub time_ranges: Vec<TimeRange>,
}

/// A channel segment as held in the segment store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiChannelSegment {
    pub channel_segment_descriptor: ChannelSegmentDescriptor,
    #[serde(default)]
    pub timeseries: Vec<Timeseries>,
    #[serde(default)]
    pub masked_by: Vec<ProcessingMask>,
    #[serde(default)]
    pub missing_input_channels: Vec<MissingInputChannel>,
    /// Filter this segment was produced with; `None` for unfiltered
    #[serde(default)]
    pub filter_id: Option<String>,
}

impl UiChannelSegment {
    pub fn descriptor(&self) -> &ChannelSegmentDescriptor {
        &self.channel_segment_descriptor
    }

    pub fn channel_name(&self) -> &str {
        &self.channel_segment_descriptor.channel.name
    }
}

/// Output of rotating one channel pair into one orientation (radial or transverse)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaskAndRotate2dResult {
    pub station_name: String,
    pub phase: String,
    pub rotated_channel: Channel,
    pub rotated_ui_channel_segment: UiChannelSegment,
    #[serde(default)]
    pub filtered_channel: Option<Channel>,
    #[serde(default)]
    pub filtered_ui_channel_segment: Option<UiChannelSegment>,
}

impl MaskAndRotate2dResult {
    /// The channel feature measurements should reference: filtered if present
    pub fn measured_channel(&self) -> &Channel {
        self.filtered_channel.as_ref().unwrap_or(&self.rotated_channel)
    }

    /// The segment feature measurements should reference: filtered if present
    pub fn measured_segment(&self) -> &UiChannelSegment {
        self.filtered_ui_channel_segment
            .as_ref()
            .unwrap_or(&self.rotated_ui_channel_segment)
    }

    /// True when `time` falls inside the rotated or the filtered segment
    pub fn overlaps_time(&self, time: f64) -> bool {
        self.rotated_ui_channel_segment
            .descriptor()
            .time_range()
            .contains(time)
            || self
                .filtered_ui_channel_segment
                .as_ref()
                .map(|s| s.descriptor().time_range().contains(time))
                .unwrap_or(false)
    }
}
