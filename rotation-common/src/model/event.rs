//! Events, event hypotheses and the association predicates used by rotation

use super::detection::{SignalDetection, SignalDetectionHypothesisId};
use super::Location;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventHypothesisId {
    pub event_id: String,
    pub hypothesis_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLocation {
    pub latitude_degrees: f64,
    pub longitude_degrees: f64,
    pub depth_km: f64,
    pub time: f64,
}

impl EventLocation {
    pub fn to_location(&self) -> Location {
        Location {
            latitude_degrees: self.latitude_degrees,
            longitude_degrees: self.longitude_degrees,
            depth_km: self.depth_km,
            elevation_km: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSolution {
    pub id: String,
    pub location: EventLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSolutionReference {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventHypothesis {
    pub id: EventHypothesisId,
    #[serde(default)]
    pub rejected: bool,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub parent_event_hypotheses: Vec<EventHypothesisId>,
    #[serde(default)]
    pub location_solutions: Vec<LocationSolution>,
    #[serde(default)]
    pub preferred_location_solution: Option<LocationSolutionReference>,
    #[serde(default)]
    pub associated_signal_detection_hypotheses: Vec<SignalDetectionHypothesisId>,
}

impl EventHypothesis {
    fn own_preferred_location_solution(&self) -> Option<&LocationSolution> {
        let preferred = self.preferred_location_solution.as_ref()?;
        self.location_solutions.iter().find(|ls| ls.id == preferred.id)
    }

    pub fn is_associated_to(&self, sd_hypothesis: &SignalDetectionHypothesisId) -> bool {
        self.associated_signal_detection_hypotheses
            .iter()
            .any(|id| id.id == sd_hypothesis.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStage {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferredEventHypothesis {
    pub stage: WorkflowStage,
    #[serde(default)]
    pub preferred_by: Option<String>,
    pub preferred: EventHypothesisId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    #[serde(default)]
    pub event_hypotheses: Vec<EventHypothesis>,
    #[serde(default)]
    pub preferred_event_hypothesis_by_stage: Vec<PreferredEventHypothesis>,
    #[serde(default)]
    pub has_unsaved_changes: bool,
}

impl Event {
    pub fn hypothesis(&self, id: &EventHypothesisId) -> Option<&EventHypothesis> {
        self.event_hypotheses.iter().find(|h| h.id == *id)
    }

    /// Preferred hypothesis for the open stage, falling back to the first stage entry
    pub fn preferred_hypothesis(&self, open_stage: &str) -> Option<&EventHypothesis> {
        let preferred = self
            .preferred_event_hypothesis_by_stage
            .iter()
            .find(|p| p.stage.name == open_stage)
            .or_else(|| self.preferred_event_hypothesis_by_stage.first())?;
        self.hypothesis(&preferred.preferred)
    }

    pub fn preferred_hypothesis_mut(&mut self, open_stage: &str) -> Option<&mut EventHypothesis> {
        let preferred = self
            .preferred_event_hypothesis_by_stage
            .iter()
            .find(|p| p.stage.name == open_stage)
            .or_else(|| self.preferred_event_hypothesis_by_stage.first())?
            .preferred
            .clone();
        self.event_hypotheses.iter_mut().find(|h| h.id == preferred)
    }

    /// Preferred location solution of a hypothesis of this event
    ///
    /// Falls back to the preferred solution of the hypothesis' last parent.
    pub fn preferred_location_solution<'a>(
        &'a self,
        hypothesis: &'a EventHypothesis,
    ) -> Option<&'a LocationSolution> {
        hypothesis.own_preferred_location_solution().or_else(|| {
            hypothesis
                .parent_event_hypotheses
                .last()
                .and_then(|parent| self.hypothesis(parent))
                .and_then(EventHypothesis::own_preferred_location_solution)
        })
    }
}

pub fn find_preferred_event_hypothesis<'a>(
    event: &'a Event,
    open_stage: &str,
) -> Option<&'a EventHypothesis> {
    event.preferred_hypothesis(open_stage)
}

/// No event's preferred hypothesis associates the detection's current hypothesis
pub fn is_signal_detection_unassociated(
    sd: &SignalDetection,
    events: &[Event],
    open_stage: &str,
) -> bool {
    let Some(current) = sd.current_hypothesis() else {
        return true;
    };
    !events.iter().any(|event| {
        event
            .preferred_hypothesis(open_stage)
            .map(|h| h.is_associated_to(&current.id))
            .unwrap_or(false)
    })
}

/// The open event's preferred hypothesis associates the detection's current hypothesis
pub fn is_signal_detection_open_associated(
    sd: &SignalDetection,
    events: &[Event],
    open_event_id: Option<&str>,
    open_stage: &str,
) -> bool {
    let Some(open_event_id) = open_event_id else {
        return false;
    };
    let Some(current) = sd.current_hypothesis() else {
        return false;
    };
    events
        .iter()
        .find(|e| e.id == open_event_id)
        .and_then(|e| e.preferred_hypothesis(open_stage))
        .map(|h| h.is_associated_to(&current.id))
        .unwrap_or(false)
}
