//! Working signal detection hypotheses

use super::state::DataState;
use rotation_common::model::{SignalDetectionHypothesisId, VersionReference};
use rotation_common::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// Who is editing, and in which interval, stage and event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SdHypothesisArgs {
    pub username: String,
    pub open_interval_name: String,
    #[serde(default)]
    pub stage_id: Option<VersionReference>,
    #[serde(default)]
    pub current_event_id: Option<String>,
}

/// Clone the detection's current hypothesis into a new working hypothesis
///
/// The clone gets a fresh id and points back at the hypothesis it was copied
/// from. If an event is open, its preferred hypothesis is re-associated with the
/// clone. Returns the new hypothesis id.
pub fn create_working_hypothesis(
    state: &mut DataState,
    signal_detection_id: &str,
    args: &SdHypothesisArgs,
) -> Result<SignalDetectionHypothesisId> {
    let sd = state
        .signal_detections
        .get_mut(signal_detection_id)
        .ok_or_else(|| {
            Error::DataUnavailable(format!(
                "Cannot find signal detection {}",
                signal_detection_id
            ))
        })?;
    let current = sd.current_hypothesis().cloned().ok_or_else(|| {
        Error::DataUnavailable(format!(
            "Signal detection {} has no current hypothesis",
            signal_detection_id
        ))
    })?;

    let new_id = SignalDetectionHypothesisId {
        id: Uuid::new_v4().to_string(),
        signal_detection_id: sd.id.clone(),
    };
    let mut working = current.clone();
    working.id = new_id.clone();
    working.parent_signal_detection_hypothesis = Some(current.id.clone());
    sd.signal_detection_hypotheses.push(working);
    sd.has_unsaved_changes = true;

    if let Some(event) = args
        .current_event_id
        .as_deref()
        .and_then(|id| state.events.get_mut(id))
    {
        if let Some(hypothesis) = event.preferred_hypothesis_mut(&args.open_interval_name) {
            for associated in hypothesis
                .associated_signal_detection_hypotheses
                .iter_mut()
                .filter(|a| a.id == current.id.id)
            {
                *associated = new_id.clone();
            }
        }
    }

    debug!(
        signal_detection = signal_detection_id,
        parent = %current.id.id,
        hypothesis = %new_id.id,
        user = %args.username,
        "Created working signal detection hypothesis"
    );
    Ok(new_id)
}
