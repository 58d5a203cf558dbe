//! Adding rotation results to the shared state
//!
//! A new rotation can supersede an older one of the same station, phase and
//! orientation. Detections measured on the older rotated channel are moved to
//! the new segment (through a working hypothesis), the older channel and its
//! segments are dropped, and the new results are stored.
//!
//! The transaction runs over an owned snapshot and only hands it back once
//! every step has succeeded, so a failed commit leaves the caller's state as it
//! was.

use super::hypothesis::{create_working_hypothesis, SdHypothesisArgs};
use super::state::DataState;
use crate::validation::geometry::are_channel_azimuths_within_tolerance;
use crate::waveform::build_analysis_waveform;
use rotation_common::model::channel_name::is_rotated_channel_name;
use rotation_common::model::event::{
    is_signal_detection_open_associated, is_signal_detection_unassociated,
};
use rotation_common::model::{
    Channel, Event, FeatureMeasurementType, MaskAndRotate2dResult, SignalDetection,
    SignalDetectionHypothesis,
};
use rotation_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationConfig {
    #[serde(default)]
    pub rotation_replacement_azimuth_tolerance_deg: Option<f64>,
}

/// Rotation results plus everything needed to reconcile them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationTransaction {
    pub results: Vec<MaskAndRotate2dResult>,
    pub config: ReconciliationConfig,
    pub sd_hypothesis_args: SdHypothesisArgs,
}

/// Derived channels whose names are rotated, keyed by name
fn previously_rotated_channels(state: &DataState) -> BTreeMap<String, Channel> {
    state
        .channels
        .beamed
        .iter()
        .chain(state.channels.filtered.iter())
        .filter(|(name, _)| is_rotated_channel_name(name))
        .map(|(name, channel)| (name.clone(), channel.clone()))
        .collect()
}

fn phase_measurement_channel_name(hypothesis: &SignalDetectionHypothesis) -> Result<&str> {
    hypothesis
        .feature_measurement(FeatureMeasurementType::Phase)
        .map(|fm| fm.channel.name.as_str())
        .ok_or_else(|| {
            Error::ReconciliationInvariant(format!(
                "Signal detection hypothesis {} must have a phase feature measurement",
                hypothesis.id.id
            ))
        })
}

fn is_open_associated_or_unassociated(
    sd: &SignalDetection,
    events: &[Event],
    args: &SdHypothesisArgs,
) -> bool {
    is_signal_detection_open_associated(
        sd,
        events,
        args.current_event_id.as_deref(),
        &args.open_interval_name,
    ) || is_signal_detection_unassociated(sd, events, &args.open_interval_name)
}

impl RotationTransaction {
    pub fn new(
        results: Vec<MaskAndRotate2dResult>,
        config: ReconciliationConfig,
        sd_hypothesis_args: SdHypothesisArgs,
    ) -> Self {
        Self {
            results,
            config,
            sd_hypothesis_args,
        }
    }

    /// Apply the transaction to `state`, returning the next state
    pub fn commit(self, mut state: DataState) -> Result<DataState> {
        let tolerance = self
            .config
            .rotation_replacement_azimuth_tolerance_deg
            .ok_or_else(|| {
                Error::ReconciliationInvariant(
                    "rotationReplacementAzimuthToleranceDeg must be configured to save rotation results"
                        .to_string(),
                )
            })?;

        let previous = previously_rotated_channels(&state);
        if !previous.is_empty() {
            self.update_signal_detections(&mut state, &previous, tolerance)?;
        }

        for result in &self.results {
            debug!(channel = %result.rotated_channel.name, "Saving rotated channel");
            state
                .channels
                .beamed
                .insert(result.rotated_channel.name.clone(), result.rotated_channel.clone());
            state
                .ui_channel_segments
                .upsert(&result.station_name, result.rotated_ui_channel_segment.clone());
            if let Some(filtered) = &result.filtered_channel {
                state
                    .channels
                    .filtered
                    .insert(filtered.name.clone(), filtered.clone());
            }
            if let Some(segment) = &result.filtered_ui_channel_segment {
                state
                    .ui_channel_segments
                    .upsert(&result.station_name, segment.clone());
            }
        }
        info!(results = self.results.len(), "Rotation results saved");
        Ok(state)
    }

    fn update_signal_detections(
        &self,
        state: &mut DataState,
        previous: &BTreeMap<String, Channel>,
        tolerance: f64,
    ) -> Result<()> {
        let events: Vec<Event> = state.events.values().cloned().collect();
        let candidates: Vec<String> = state
            .signal_detections
            .values()
            .filter(|sd| is_open_associated_or_unassociated(sd, &events, &self.sd_hypothesis_args))
            .map(|sd| sd.id.clone())
            .collect();

        for sd_id in candidates {
            for result in &self.results {
                let Some(sd) = state.signal_detections.get(&sd_id) else {
                    continue;
                };
                if sd.station.name != result.station_name {
                    continue;
                }
                let Some(hypothesis) = sd.current_hypothesis() else {
                    continue;
                };
                if hypothesis.feature_measurements.is_empty()
                    || !matches_result(hypothesis, result, previous, tolerance)?
                {
                    continue;
                }

                if !sd.has_unsaved_changes {
                    create_working_hypothesis(state, &sd_id, &self.sd_hypothesis_args)?;
                }
                update_feature_measurements(state, &sd_id, result, previous, tolerance)?;
            }
        }
        Ok(())
    }
}

/// True when the hypothesis was measured on an older rotation that `result` replaces
fn matches_result(
    hypothesis: &SignalDetectionHypothesis,
    result: &MaskAndRotate2dResult,
    previous: &BTreeMap<String, Channel>,
    tolerance: f64,
) -> Result<bool> {
    let phase_channel_name = phase_measurement_channel_name(hypothesis)?;
    let Some(phase_channel) = previous.get(phase_channel_name) else {
        return Ok(false);
    };
    let rotated = &result.rotated_channel;
    let arrival_overlaps = hypothesis
        .arrival_time()
        .map(|t| result.overlaps_time(t))
        .unwrap_or(false);

    Ok(is_rotated_channel_name(&phase_channel.name)
        && phase_channel.channel_orientation_type == rotated.channel_orientation_type
        && phase_channel.station.name == result.station_name
        && hypothesis.phase() == Some(result.phase.as_str())
        && are_channel_azimuths_within_tolerance(tolerance, phase_channel, rotated)
        && arrival_overlaps)
}

/// Point the current hypothesis' measurements at the new segment, then drop the old channel
fn update_feature_measurements(
    state: &mut DataState,
    sd_id: &str,
    result: &MaskAndRotate2dResult,
    previous: &BTreeMap<String, Channel>,
    tolerance: f64,
) -> Result<()> {
    let measured_channel = result.measured_channel();
    let measured_segment = result.measured_segment();
    let DataState {
        channels,
        ui_channel_segments,
        signal_detections,
        ..
    } = state;

    let Some(hypothesis) = signal_detections
        .get_mut(sd_id)
        .and_then(SignalDetection::current_hypothesis_mut)
    else {
        return Ok(());
    };
    let phase_channel_name = phase_measurement_channel_name(hypothesis)?.to_string();
    let phase_channel = previous.get(&phase_channel_name).ok_or_else(|| {
        Error::ReconciliationInvariant(format!(
            "Cannot find fully populated channel matching the channel used to make the feature measurement: {}",
            phase_channel_name
        ))
    })?;

    for fm in hypothesis
        .feature_measurements
        .iter_mut()
        .filter(|fm| fm.channel.name == phase_channel_name)
    {
        let within_tolerance = previous
            .get(&fm.channel.name)
            .map(|old| are_channel_azimuths_within_tolerance(tolerance, measured_channel, old))
            .unwrap_or(false);
        if !within_tolerance {
            continue;
        }

        if let Some(old) = &fm.measured_channel_segment {
            let incoming = measured_segment.descriptor();
            // an exact self-match stays, or the filter cache would lose it
            if old.matches(incoming) && old.channel.name == incoming.channel.name {
                debug!(segment = %old, "Keeping segment that matches the incoming one exactly");
            } else {
                let removed = ui_channel_segments.remove_matching(&result.station_name, old);
                debug!(segment = %old, removed, "Deleted superseded rotated segments");
            }
        }
        fm.measured_channel_segment = Some(measured_segment.descriptor().clone());
        fm.analysis_waveform = Some(build_analysis_waveform(
            fm.feature_measurement_type,
            result.rotated_ui_channel_segment.descriptor(),
            measured_channel,
        ));
    }

    if are_channel_azimuths_within_tolerance(tolerance, measured_channel, phase_channel) {
        if channels.beamed.remove(&phase_channel_name).is_some() {
            debug!(channel = %phase_channel_name, "Deleted superseded rotated channel");
        }
        if channels.filtered.remove(&phase_channel_name).is_some() {
            debug!(channel = %phase_channel_name, "Deleted superseded filtered rotated channel");
        }
    }
    Ok(())
}
