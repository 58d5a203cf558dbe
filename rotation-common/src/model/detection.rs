//! Signal detections, their hypothesis chains and feature measurements

use super::filter::{FilterDefinition, FilterDefinitionUsage};
use super::segment::ChannelSegmentDescriptor;
use super::VersionReference;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeatureMeasurementType {
    ArrivalTime,
    Phase,
    ReceiverToSourceAzimuth,
    SourceToReceiverAzimuth,
    SourceToReceiverDistance,
    Slowness,
    EmergenceAngle,
    Rectilinearity,
    LongPeriodFirstMotion,
    ShortPeriodFirstMotion,
    #[serde(rename = "AMPLITUDE_A5_OVER_2")]
    AmplitudeA5Over2,
    #[serde(rename = "AMPLITUDE_ALR_OVER_2")]
    AmplitudeAlrOver2,
    #[serde(rename = "AMPLITUDE_ANL_OVER_2")]
    AmplitudeAnlOver2,
    Snr,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueWithStandardDeviation {
    pub value: f64,
    #[serde(default)]
    pub standard_deviation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
}

/// Measured value, shaped by the feature measurement type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MeasurementValue {
    Arrival {
        #[serde(rename = "arrivalTime")]
        arrival_time: ValueWithStandardDeviation,
        #[serde(rename = "travelTime", default)]
        travel_time: Option<ValueWithStandardDeviation>,
    },
    Numeric {
        #[serde(rename = "measuredValue")]
        measured_value: ValueWithStandardDeviation,
        #[serde(rename = "referenceTime", default)]
        reference_time: Option<f64>,
    },
    Phase {
        value: String,
        #[serde(default)]
        confidence: Option<f64>,
    },
}

/// Provenance of the waveform a measurement was made on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisWaveform {
    pub waveform: ChannelSegmentDescriptor,
    #[serde(default)]
    pub filter_definition: Option<FilterDefinition>,
    #[serde(default)]
    pub filter_definition_usage: Option<FilterDefinitionUsage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureMeasurement {
    pub feature_measurement_type: FeatureMeasurementType,
    pub channel: VersionReference,
    #[serde(default)]
    pub measured_channel_segment: Option<ChannelSegmentDescriptor>,
    #[serde(default)]
    pub analysis_waveform: Option<AnalysisWaveform>,
    pub measurement_value: MeasurementValue,
    #[serde(default)]
    pub snr: Option<ValueWithStandardDeviation>,
}

impl FeatureMeasurement {
    pub fn arrival_time(&self) -> Option<f64> {
        match &self.measurement_value {
            MeasurementValue::Arrival { arrival_time, .. } => Some(arrival_time.value),
            _ => None,
        }
    }

    pub fn phase(&self) -> Option<&str> {
        match &self.measurement_value {
            MeasurementValue::Phase { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn numeric_value(&self) -> Option<f64> {
        match &self.measurement_value {
            MeasurementValue::Numeric { measured_value, .. } => Some(measured_value.value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalDetectionHypothesisId {
    pub id: String,
    pub signal_detection_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalDetectionHypothesis {
    pub id: SignalDetectionHypothesisId,
    #[serde(default)]
    pub monitoring_organization: Option<String>,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub rejected: bool,
    pub station: VersionReference,
    #[serde(default)]
    pub parent_signal_detection_hypothesis: Option<SignalDetectionHypothesisId>,
    #[serde(default)]
    pub feature_measurements: Vec<FeatureMeasurement>,
}

impl SignalDetectionHypothesis {
    pub fn feature_measurement(&self, kind: FeatureMeasurementType) -> Option<&FeatureMeasurement> {
        self.feature_measurements
            .iter()
            .find(|fm| fm.feature_measurement_type == kind)
    }

    pub fn phase(&self) -> Option<&str> {
        self.feature_measurement(FeatureMeasurementType::Phase)
            .and_then(FeatureMeasurement::phase)
    }

    pub fn arrival_time(&self) -> Option<f64> {
        self.feature_measurement(FeatureMeasurementType::ArrivalTime)
            .and_then(FeatureMeasurement::arrival_time)
    }

    pub fn receiver_to_source_azimuth(&self) -> Option<f64> {
        self.feature_measurement(FeatureMeasurementType::ReceiverToSourceAzimuth)
            .and_then(FeatureMeasurement::numeric_value)
    }
}

/// A detection and its append-only chain of hypotheses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalDetection {
    pub id: String,
    #[serde(default)]
    pub monitoring_organization: Option<String>,
    pub station: VersionReference,
    pub signal_detection_hypotheses: Vec<SignalDetectionHypothesis>,
    /// Set once the current hypothesis is a working copy
    #[serde(default)]
    pub has_unsaved_changes: bool,
}

impl SignalDetection {
    /// Last hypothesis in the chain that is not deleted
    pub fn current_hypothesis(&self) -> Option<&SignalDetectionHypothesis> {
        self.signal_detection_hypotheses.iter().rev().find(|h| !h.deleted)
    }

    pub fn current_hypothesis_mut(&mut self) -> Option<&mut SignalDetectionHypothesis> {
        self.signal_detection_hypotheses
            .iter_mut()
            .rev()
            .find(|h| !h.deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hypothesis(id: &str, deleted: bool) -> SignalDetectionHypothesis {
        SignalDetectionHypothesis {
            id: SignalDetectionHypothesisId {
                id: id.to_string(),
                signal_detection_id: "sd".to_string(),
            },
            monitoring_organization: None,
            deleted,
            rejected: false,
            station: VersionReference::new("ASAR", None),
            parent_signal_detection_hypothesis: None,
            feature_measurements: vec![],
        }
    }

    #[test]
    fn test_current_hypothesis_skips_deleted() {
        let sd = SignalDetection {
            id: "sd".to_string(),
            monitoring_organization: None,
            station: VersionReference::new("ASAR", None),
            signal_detection_hypotheses: vec![hypothesis("a", false), hypothesis("b", true)],
            has_unsaved_changes: false,
        };
        assert_eq!(sd.current_hypothesis().unwrap().id.id, "a");
    }

    #[test]
    fn test_measurement_values_deserialize_by_shape() {
        let fms: Vec<FeatureMeasurement> = serde_json::from_value(json!([
            {
                "featureMeasurementType": "ARRIVAL_TIME",
                "channel": { "name": "ASAR.AS01.SHZ", "effectiveAt": 1.0 },
                "measurementValue": { "arrivalTime": { "value": 1000.5, "standardDeviation": 0.1 } }
            },
            {
                "featureMeasurementType": "PHASE",
                "channel": { "name": "ASAR.AS01.SHZ" },
                "measurementValue": { "value": "P", "confidence": 1.0 }
            },
            {
                "featureMeasurementType": "RECEIVER_TO_SOURCE_AZIMUTH",
                "channel": { "name": "ASAR.AS01.SHZ" },
                "measurementValue": { "measuredValue": { "value": 42.0, "units": "DEGREES" } }
            }
        ]))
        .unwrap();

        let mut h = hypothesis("a", false);
        h.feature_measurements = fms;
        assert_eq!(h.arrival_time(), Some(1000.5));
        assert_eq!(h.phase(), Some("P"));
        assert_eq!(h.receiver_to_source_azimuth(), Some(42.0));
    }
}
