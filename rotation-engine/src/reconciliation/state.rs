//! Shared analysis state touched by rotation
//!
//! `DataState` owns the channel records, the per-station segment lists, signal
//! detections and events. Reconciliation takes it by value and hands back the
//! next version.

use rotation_common::model::{
    Channel, ChannelSegmentDescriptor, Event, SignalDetection, UiChannelSegment,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Segment-list key for segments that have not been filtered
pub const UNFILTERED: &str = "Unfiltered";

/// Channel records by kind, each keyed by channel name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStore {
    #[serde(default)]
    pub raw: BTreeMap<String, Channel>,
    /// Derived channels before filtering (beams and rotations)
    #[serde(default)]
    pub beamed: BTreeMap<String, Channel>,
    #[serde(default)]
    pub filtered: BTreeMap<String, Channel>,
}

/// station name -> filter name -> segments
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentStore(BTreeMap<String, BTreeMap<String, Vec<UiChannelSegment>>>);

impl SegmentStore {
    pub fn segments(&self, station_name: &str, filter_name: &str) -> &[UiChannelSegment] {
        self.0
            .get(station_name)
            .and_then(|by_filter| by_filter.get(filter_name))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// All segments of a station, across filters
    pub fn station_segments(&self, station_name: &str) -> impl Iterator<Item = &UiChannelSegment> {
        self.0
            .get(station_name)
            .into_iter()
            .flat_map(|by_filter| by_filter.values().flatten())
    }

    pub fn contains(&self, station_name: &str, descriptor: &ChannelSegmentDescriptor) -> bool {
        self.station_segments(station_name)
            .any(|s| s.descriptor() == descriptor)
    }

    /// Store `segment` under its filter; an identical descriptor is replaced
    pub fn upsert(&mut self, station_name: &str, segment: UiChannelSegment) {
        let filter_name = segment
            .filter_id
            .clone()
            .unwrap_or_else(|| UNFILTERED.to_string());
        let list = self
            .0
            .entry(station_name.to_string())
            .or_default()
            .entry(filter_name)
            .or_default();
        match list
            .iter_mut()
            .find(|s| s.channel_segment_descriptor == segment.channel_segment_descriptor)
        {
            Some(existing) => *existing = segment,
            None => list.push(segment),
        }
    }

    /// Remove the first segment matching `descriptor` from every filter list of a station
    ///
    /// Matching ignores the channel name beyond its code, so filtered variants go too.
    /// Returns how many segments were removed.
    pub fn remove_matching(
        &mut self,
        station_name: &str,
        descriptor: &ChannelSegmentDescriptor,
    ) -> usize {
        let Some(by_filter) = self.0.get_mut(station_name) else {
            return 0;
        };
        let mut removed = 0;
        for list in by_filter.values_mut() {
            if let Some(index) = list.iter().position(|s| descriptor.matches(s.descriptor())) {
                list.remove(index);
                removed += 1;
            }
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.0.values().flat_map(|f| f.values()).map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataState {
    #[serde(default)]
    pub channels: ChannelStore,
    #[serde(default)]
    pub ui_channel_segments: SegmentStore,
    /// Keyed by signal detection id
    #[serde(default)]
    pub signal_detections: BTreeMap<String, SignalDetection>,
    /// Keyed by event id
    #[serde(default)]
    pub events: BTreeMap<String, Event>,
}
