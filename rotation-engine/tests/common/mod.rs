//! Shared fixtures for rotation-engine integration tests
//!
//! Builds stations, channels, segments and detections, and wires a
//! `RotationService` to the in-memory collaborators.

#![allow(dead_code)]

use std::sync::Arc;

use rotation_common::config::RotationConfig;
use rotation_common::events::EventBus;
use rotation_common::model::{
    Channel, ChannelBandType, ChannelDataType, ChannelInstrumentType, ChannelOrientationType,
    ChannelSegmentDescriptor, FeatureMeasurement, FeatureMeasurementType, Location,
    MeasurementValue, OrientationAngles, ProcessingDefinition, ProcessingMetadata,
    RotationDescription, RotationTemplate, SamplingType, SignalDetection,
    SignalDetectionHypothesis, SignalDetectionHypothesisId, Station, StationType, TimeRange,
    Timeseries, UiChannelSegment, Units, ValueWithStandardDeviation, VersionReference,
};
use rotation_engine::collaborators::memory::{
    MemoryFeaturePredictions, MemoryFilterService, MemoryMaskSource, MemorySegmentSource,
    MemoryStationCatalog, MemoryTemplateSource, PassThroughKernel,
};
use rotation_engine::reconciliation::{DataState, StateStore};
use rotation_engine::{Collaborators, RotationOptions, RotationService, SessionContext};

pub const STAGE: &str = "AL1";
pub const WINDOW_END: f64 = 600.0;

pub fn site() -> Location {
    Location {
        latitude_degrees: -23.665,
        longitude_degrees: 133.905,
        depth_km: 0.0,
        elevation_km: 0.6,
    }
}

/// Raw 40 Hz horizontal channel; the station is the first name component
pub fn channel(name: &str, orientation: ChannelOrientationType, horizontal_angle: f64) -> Channel {
    let station = name.split('.').next().unwrap_or(name);
    let code = orientation
        .code()
        .map(String::from)
        .unwrap_or_else(|| "X".to_string());
    Channel {
        name: name.to_string(),
        effective_at: None,
        description: format!("Raw channel {}", name),
        station: VersionReference::new(station, None),
        channel_data_type: ChannelDataType::Seismic,
        channel_band_type: ChannelBandType::ShortPeriod,
        channel_instrument_type: ChannelInstrumentType::HighGainSeismometer,
        channel_orientation_code: code,
        channel_orientation_type: orientation,
        units: Units::NanometersPerSecond,
        nominal_sample_rate_hz: Some(40.0),
        location: site(),
        orientation_angles: Some(OrientationAngles {
            horizontal_angle_deg: Some(horizontal_angle),
            vertical_angle_deg: Some(90.0),
        }),
        configured_inputs: vec![],
        processing_definition: ProcessingDefinition::Raw,
        processing_metadata: ProcessingMetadata::default(),
        response: None,
    }
}

/// North and east channels of `{station}.{group}.SH?`
pub fn north_east(station: &str, group: &str) -> (Channel, Channel) {
    (
        channel(
            &format!("{}.{}.SHN", station, group),
            ChannelOrientationType::NorthSouth,
            0.0,
        ),
        channel(
            &format!("{}.{}.SHE", station, group),
            ChannelOrientationType::EastWest,
            90.0,
        ),
    )
}

pub fn station(name: &str, channels: Vec<Channel>) -> Station {
    Station {
        name: name.to_string(),
        effective_at: None,
        description: format!("{} array", name),
        station_type: StationType::SeismicArray,
        location: site(),
        all_raw_channels: channels,
    }
}

pub fn template(station: &str, phase: &str) -> RotationTemplate {
    RotationTemplate {
        station: VersionReference::new(station, None),
        duration: 60.0,
        lead_duration: 5.0,
        location_tolerance_km: 1.0,
        orientation_angle_tolerance_deg: 5.0,
        sample_rate_tolerance_hz: 0.5,
        rotation_description: RotationDescription {
            phase_type: phase.to_string(),
            sampling_type: SamplingType::Interpolated,
            two_dimensional: true,
        },
        input_channels: None,
        input_channel_group: None,
    }
}

/// Unfiltered 40 Hz segment covering `start..=end`
pub fn raw_segment(channel_name: &str, start: f64, end: f64) -> UiChannelSegment {
    UiChannelSegment {
        channel_segment_descriptor: ChannelSegmentDescriptor {
            channel: VersionReference::new(channel_name, None),
            creation_time: 1.0,
            start_time: start,
            end_time: end,
        },
        timeseries: vec![Timeseries {
            start_time: start,
            end_time: end,
            sample_rate_hz: 40.0,
            sample_count: ((end - start) * 40.0).round() as u64 + 1,
            claim_check_id: format!("{}-{}", channel_name, start),
        }],
        masked_by: vec![],
        missing_input_channels: vec![],
        filter_id: None,
    }
}

fn measurement(
    kind: FeatureMeasurementType,
    channel: &VersionReference,
    measured: Option<&ChannelSegmentDescriptor>,
    measurement_value: MeasurementValue,
) -> FeatureMeasurement {
    FeatureMeasurement {
        feature_measurement_type: kind,
        channel: channel.clone(),
        measured_channel_segment: measured.cloned(),
        analysis_waveform: None,
        measurement_value,
        snr: None,
    }
}

/// Saved detection whose arrival and phase were measured on `channel`
pub fn signal_detection(
    id: &str,
    station: &str,
    arrival: f64,
    phase: &str,
    channel: &VersionReference,
    measured: Option<&ChannelSegmentDescriptor>,
    azimuth: Option<f64>,
) -> SignalDetection {
    let mut feature_measurements = vec![
        measurement(
            FeatureMeasurementType::ArrivalTime,
            channel,
            measured,
            MeasurementValue::Arrival {
                arrival_time: ValueWithStandardDeviation {
                    value: arrival,
                    standard_deviation: Some(0.1),
                    units: Some("SECONDS".to_string()),
                },
                travel_time: None,
            },
        ),
        measurement(
            FeatureMeasurementType::Phase,
            channel,
            measured,
            MeasurementValue::Phase {
                value: phase.to_string(),
                confidence: Some(1.0),
            },
        ),
    ];
    if let Some(azimuth) = azimuth {
        feature_measurements.push(measurement(
            FeatureMeasurementType::ReceiverToSourceAzimuth,
            channel,
            measured,
            MeasurementValue::Numeric {
                measured_value: ValueWithStandardDeviation {
                    value: azimuth,
                    standard_deviation: Some(2.0),
                    units: Some("DEGREES".to_string()),
                },
                reference_time: Some(arrival),
            },
        ));
    }

    SignalDetection {
        id: id.to_string(),
        monitoring_organization: None,
        station: VersionReference::new(station, None),
        signal_detection_hypotheses: vec![SignalDetectionHypothesis {
            id: SignalDetectionHypothesisId {
                id: format!("{}-h1", id),
                signal_detection_id: id.to_string(),
            },
            monitoring_organization: None,
            deleted: false,
            rejected: false,
            station: VersionReference::new(station, None),
            parent_signal_detection_hypothesis: None,
            feature_measurements,
        }],
        has_unsaved_changes: false,
    }
}

/// Analyst session with an open stage and a 0-600 s viewable interval
pub fn session() -> SessionContext {
    SessionContext {
        username: "analyst".to_string(),
        open_interval_name: STAGE.to_string(),
        stage_id: Some(VersionReference::new(STAGE, None)),
        open_event_id: None,
        viewable_interval: Some(TimeRange::new(0.0, WINDOW_END)),
    }
}

pub fn azimuth_options(azimuth: f64) -> RotationOptions {
    RotationOptions {
        receiver_to_source_azimuth_deg: Some(azimuth),
        ..Default::default()
    }
}

/// Everything a `RotationService` under test runs against
pub struct TestHarness {
    pub stations: Vec<Station>,
    pub templates: Vec<RotationTemplate>,
    pub segments: Vec<UiChannelSegment>,
    pub filters: MemoryFilterService,
    pub state: DataState,
    pub config: RotationConfig,
}

/// A running service plus handles for assertions
pub struct Running {
    pub service: RotationService,
    pub kernel: Arc<PassThroughKernel>,
    pub templates: Arc<MemoryTemplateSource>,
    pub events: EventBus,
}

impl TestHarness {
    /// Stations with P templates and 0-600 s cached segments for every raw channel
    pub fn with_stations(stations: Vec<Station>) -> Self {
        let templates = stations.iter().map(|s| template(&s.name, "P")).collect();
        let segments = stations
            .iter()
            .flat_map(|s| s.all_raw_channels.iter())
            .map(|c| raw_segment(&c.name, 0.0, WINDOW_END))
            .collect();
        Self {
            stations,
            templates,
            segments,
            filters: MemoryFilterService::default(),
            state: DataState::default(),
            config: RotationConfig::default(),
        }
    }

    pub fn start(self) -> Running {
        self.start_with_kernel(PassThroughKernel::default())
    }

    pub fn start_with_kernel(self, kernel: PassThroughKernel) -> Running {
        let kernel = Arc::new(kernel);
        let templates = Arc::new(MemoryTemplateSource::new(self.templates));
        let events = EventBus::new(self.config.event_bus_capacity);
        let collaborators = Collaborators {
            catalog: Arc::new(MemoryStationCatalog::from_stations(self.stations)),
            templates: templates.clone(),
            segments: Arc::new(MemorySegmentSource {
                cached: self.segments,
                stored: vec![],
            }),
            masks: Arc::new(MemoryMaskSource::default()),
            filters: Arc::new(self.filters),
            predictions: Arc::new(MemoryFeaturePredictions::default()),
            kernel: kernel.clone(),
        };
        let service = RotationService::new(
            collaborators,
            Arc::new(StateStore::new(self.state)),
            self.config,
            events.clone(),
        );
        Running {
            service,
            kernel,
            templates,
            events,
        }
    }
}
