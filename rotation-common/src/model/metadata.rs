//! Processing definitions and processing metadata for derived channels
//!
//! Both are free-form key/value bags on the wire. Internally they are typed per
//! derivation kind and flattened back to sorted entries for hashing and JSON.

use super::filter::FilterDefinition;
use super::rotation::{BeamDefinition, ProcessingMaskDefinition, RotationDefinition};
use super::Location;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const CHANNEL_GROUP: &str = "CHANNEL_GROUP";
pub const STEERING_BACK_AZIMUTH: &str = "STEERING_BACK_AZIMUTH";
pub const STEERING_SLOWNESS: &str = "STEERING_SLOWNESS";
pub const BEAM_SUMMATION: &str = "BEAM_SUMMATION";
pub const BEAM_PHASE: &str = "BEAM_PHASE";
pub const BEAM_TYPE: &str = "BEAM_TYPE";
pub const BEAM_EVENT_HYPOTHESIS_ID: &str = "BEAM_EVENT_HYPOTHESIS_ID";
pub const BEAM_SIGNAL_DETECTION_HYPOTHESIS_ID: &str = "BEAM_SIGNAL_DETECTION_HYPOTHESIS_ID";
pub const BEAM_LOCATION: &str = "BEAM_LOCATION";
pub const FILTER_TYPE: &str = "FILTER_TYPE";
pub const FILTER_CAUSALITY: &str = "FILTER_CAUSALITY";

/// Metadata written by a rotation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationMetadata {
    pub steering_back_azimuth: f64,
}

/// Metadata written by beamforming
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BeamMetadata {
    pub steering_back_azimuth: Option<f64>,
    pub steering_slowness: Option<f64>,
    pub beam_summation: Option<String>,
    pub beam_phase: Option<String>,
    pub beam_type: Option<String>,
    pub event_hypothesis_id: Option<String>,
    pub signal_detection_hypothesis_id: Option<String>,
    pub location: Option<Location>,
}

/// Metadata written by filtering
#[derive(Debug, Clone, PartialEq)]
pub struct FilterMetadata {
    pub filter_type: String,
    pub causal: bool,
}

/// Cumulative processing metadata of a channel
///
/// Derived channels inherit their first input's metadata and layer their own
/// entries on top.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(into = "BTreeMap<String, Value>", try_from = "BTreeMap<String, Value>")]
pub struct ProcessingMetadata {
    pub channel_group: Option<String>,
    pub beam: Option<BeamMetadata>,
    pub rotation: Option<RotationMetadata>,
    pub filter: Option<FilterMetadata>,
    /// Entries with no typed home, kept verbatim
    pub other: BTreeMap<String, Value>,
}

impl ProcessingMetadata {
    /// The steering azimuth, preferring a rotation over an underlying beam
    pub fn steering_back_azimuth(&self) -> Option<f64> {
        self.rotation
            .map(|r| r.steering_back_azimuth)
            .or_else(|| self.beam.as_ref().and_then(|b| b.steering_back_azimuth))
    }

    pub fn is_empty(&self) -> bool {
        self.to_entries().is_empty()
    }

    /// Flatten into alphabetically ordered wire entries
    pub fn to_entries(&self) -> BTreeMap<String, Value> {
        let mut entries = self.other.clone();
        if let Some(beam) = &self.beam {
            let mut put = |key: &str, value: Option<Value>| {
                if let Some(value) = value {
                    entries.insert(key.to_string(), value);
                }
            };
            put(STEERING_BACK_AZIMUTH, beam.steering_back_azimuth.map(Value::from));
            put(STEERING_SLOWNESS, beam.steering_slowness.map(Value::from));
            put(BEAM_SUMMATION, beam.beam_summation.clone().map(Value::from));
            put(BEAM_PHASE, beam.beam_phase.clone().map(Value::from));
            put(BEAM_TYPE, beam.beam_type.clone().map(Value::from));
            put(BEAM_EVENT_HYPOTHESIS_ID, beam.event_hypothesis_id.clone().map(Value::from));
            put(
                BEAM_SIGNAL_DETECTION_HYPOTHESIS_ID,
                beam.signal_detection_hypothesis_id.clone().map(Value::from),
            );
            put(
                BEAM_LOCATION,
                beam.location.and_then(|l| serde_json::to_value(l).ok()),
            );
        }
        if let Some(rotation) = &self.rotation {
            entries.insert(
                STEERING_BACK_AZIMUTH.to_string(),
                Value::from(rotation.steering_back_azimuth),
            );
        }
        if let Some(filter) = &self.filter {
            entries.insert(FILTER_TYPE.to_string(), Value::from(filter.filter_type.clone()));
            entries.insert(FILTER_CAUSALITY.to_string(), Value::from(filter.causal));
        }
        if let Some(group) = &self.channel_group {
            entries.insert(CHANNEL_GROUP.to_string(), Value::from(group.clone()));
        }
        entries
    }

    /// Rebuild typed metadata from wire entries
    pub fn from_entries(mut entries: BTreeMap<String, Value>) -> Result<Self> {
        fn take_str(entries: &mut BTreeMap<String, Value>, key: &str) -> Option<String> {
            entries
                .remove(key)
                .and_then(|v| v.as_str().map(str::to_string))
        }

        let channel_group = take_str(&mut entries, CHANNEL_GROUP);

        let is_beam = entries.keys().any(|k| k.starts_with("BEAM_")) || entries.contains_key(STEERING_SLOWNESS);
        let steering = entries.remove(STEERING_BACK_AZIMUTH).and_then(|v| v.as_f64());

        let (beam, rotation) = if is_beam {
            let location = match entries.remove(BEAM_LOCATION) {
                Some(Value::Null) | None => None,
                Some(v) => Some(serde_json::from_value(v)?),
            };
            let beam = BeamMetadata {
                steering_back_azimuth: steering,
                steering_slowness: entries.remove(STEERING_SLOWNESS).and_then(|v| v.as_f64()),
                beam_summation: take_str(&mut entries, BEAM_SUMMATION),
                beam_phase: take_str(&mut entries, BEAM_PHASE),
                beam_type: take_str(&mut entries, BEAM_TYPE),
                event_hypothesis_id: take_str(&mut entries, BEAM_EVENT_HYPOTHESIS_ID),
                signal_detection_hypothesis_id: take_str(
                    &mut entries,
                    BEAM_SIGNAL_DETECTION_HYPOTHESIS_ID,
                ),
                location,
            };
            (Some(beam), None)
        } else {
            let rotation = steering.map(|steering_back_azimuth| RotationMetadata {
                steering_back_azimuth,
            });
            (None, rotation)
        };

        let filter = match (entries.remove(FILTER_TYPE), entries.remove(FILTER_CAUSALITY)) {
            (Some(Value::String(filter_type)), causality) => Some(FilterMetadata {
                filter_type,
                causal: causality.and_then(|c| c.as_bool()).unwrap_or(false),
            }),
            (None, None) => None,
            (other_type, _) => {
                return Err(Error::Validation(format!(
                    "Invalid {} processing metadata: {:?}",
                    FILTER_TYPE, other_type
                )))
            }
        };

        Ok(Self {
            channel_group,
            beam,
            rotation,
            filter,
            other: entries,
        })
    }
}

impl From<ProcessingMetadata> for BTreeMap<String, Value> {
    fn from(metadata: ProcessingMetadata) -> Self {
        metadata.to_entries()
    }
}

impl TryFrom<BTreeMap<String, Value>> for ProcessingMetadata {
    type Error = Error;

    fn try_from(entries: BTreeMap<String, Value>) -> Result<Self> {
        Self::from_entries(entries)
    }
}

/// How a derived channel was produced
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "definition", rename_all = "camelCase")]
pub enum ProcessingDefinition {
    /// Raw channel or temporary channel; no processing
    #[default]
    Raw,
    Filter(FilterDefinition),
    Mask(ProcessingMaskDefinition),
    Beam(BeamDefinition),
    Rotation(RotationDefinition),
}

impl ProcessingDefinition {
    pub fn as_filter(&self) -> Option<&FilterDefinition> {
        match self {
            ProcessingDefinition::Filter(definition) => Some(definition),
            _ => None,
        }
    }

    /// Flatten into alphabetically ordered wire entries
    ///
    /// Beam and rotation definitions merge their description and parameter objects
    /// into a single level.
    pub fn to_entries(&self) -> Result<BTreeMap<String, Value>> {
        let objects = match self {
            ProcessingDefinition::Raw => vec![],
            ProcessingDefinition::Filter(definition) => vec![serde_json::to_value(definition)?],
            ProcessingDefinition::Mask(definition) => vec![serde_json::to_value(definition)?],
            ProcessingDefinition::Beam(definition) => vec![
                serde_json::to_value(&definition.beam_description)?,
                serde_json::to_value(&definition.beam_parameters)?,
            ],
            ProcessingDefinition::Rotation(definition) => vec![
                serde_json::to_value(&definition.rotation_description)?,
                serde_json::to_value(&definition.rotation_parameters)?,
            ],
        };

        let mut entries = BTreeMap::new();
        for object in objects {
            match object {
                Value::Object(map) => entries.extend(strip_nulls(map)),
                other => {
                    return Err(Error::Validation(format!(
                        "Processing definition is not a record: {}",
                        other
                    )))
                }
            }
        }
        Ok(entries)
    }
}

fn strip_nulls(map: Map<String, Value>) -> impl Iterator<Item = (String, Value)> {
    map.into_iter().filter(|(_, v)| !v.is_null())
}
