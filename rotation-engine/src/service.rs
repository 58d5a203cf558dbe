//! Rotation entry points
//!
//! Three ways to ask for a rotation: an explicit channel pair, a set of signal
//! detections, or a set of stations. Each one validates its arguments, fans the
//! channel pairs out in parallel, settles every pair (a failed pair is logged and
//! published, the others still count) and then dispatches the surviving results
//! as one reconciliation transaction.

use crate::collaborators::{
    ChannelSegmentSource, EventStore, FeaturePredictionSource, FilterService,
    ProcessingMaskSource, RotationKernel, RotationTemplateSource, StationCatalog,
};
use crate::definition::{
    calculate_receiver_to_source_azimuth, create_2d_rotation_definition, rotation_description,
    rotation_time_range_for_signal_detection, time_interval_for_rotation, AzimuthSources,
};
use crate::orchestrator::MaskAndRotate;
use crate::pairing::get_channel_pairs_to_rotate;
use crate::reconciliation::{
    ReconciliationConfig, RotationTransaction, SdHypothesisArgs, StateStore,
};
use crate::template_cache::TemplateCache;
use crate::validation::{
    station_matching_channel, validate_channels_for_rotation, validate_lead_duration,
    validate_location_and_azimuth, validate_location_or_azimuth, validate_sampling_type,
};
use futures::future::join_all;
use rotation_common::config::RotationConfig;
use rotation_common::events::{EventBus, RotationEvent};
use rotation_common::model::{
    Channel, Event, Location, MaskAndRotate2dResult, SamplingType, SignalDetection, Station,
    TimeRange, VersionReference,
};
use rotation_common::{Error, Result};
use std::sync::Arc;
use tracing::{error, info, warn};

/// The analyst session a rotation runs in
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub username: String,
    /// Also the workflow stage used to pick preferred event hypotheses
    pub open_interval_name: String,
    pub stage_id: Option<VersionReference>,
    pub open_event_id: Option<String>,
    pub viewable_interval: Option<TimeRange>,
}

/// Optional overrides supplied with a rotation request
#[derive(Debug, Clone, Default)]
pub struct RotationOptions {
    pub sampling_type: Option<String>,
    pub lead_duration: Option<f64>,
    pub duration: Option<f64>,
    pub location: Option<Location>,
    pub receiver_to_source_azimuth_deg: Option<f64>,
}

impl RotationOptions {
    /// Checks shared by every entry point
    fn validate(&self) -> Result<Option<SamplingType>> {
        let sampling_type = self
            .sampling_type
            .as_deref()
            .map(validate_sampling_type)
            .transpose()?;
        validate_lead_duration(self.lead_duration, self.duration)?;
        validate_location_or_azimuth(self.location.as_ref(), self.receiver_to_source_azimuth_deg)?;
        Ok(sampling_type)
    }
}

/// External services the pipeline runs against
#[derive(Clone)]
pub struct Collaborators {
    pub catalog: Arc<dyn StationCatalog>,
    pub templates: Arc<dyn RotationTemplateSource>,
    pub segments: Arc<dyn ChannelSegmentSource>,
    pub masks: Arc<dyn ProcessingMaskSource>,
    pub filters: Arc<dyn FilterService>,
    pub predictions: Arc<dyn FeaturePredictionSource>,
    pub kernel: Arc<dyn RotationKernel>,
}

pub struct RotationService {
    catalog: Arc<dyn StationCatalog>,
    predictions: Arc<dyn FeaturePredictionSource>,
    templates: TemplateCache,
    orchestrator: MaskAndRotate,
    store: Arc<StateStore>,
    config: RotationConfig,
    events: EventBus,
}

fn require_stage(session: &SessionContext) -> Result<&VersionReference> {
    session.stage_id.as_ref().ok_or_else(|| {
        Error::Validation("No stage ID found, open interval before rotating".to_string())
    })
}

impl RotationService {
    pub fn new(
        collaborators: Collaborators,
        store: Arc<StateStore>,
        config: RotationConfig,
        events: EventBus,
    ) -> Self {
        Self {
            catalog: collaborators.catalog,
            predictions: collaborators.predictions,
            templates: TemplateCache::new(collaborators.templates, config.default_template.clone()),
            orchestrator: MaskAndRotate::new(
                collaborators.segments,
                collaborators.masks,
                collaborators.filters,
                collaborators.kernel,
                events.clone(),
            ),
            store,
            config,
            events,
        }
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    /// Rotate one explicit channel pair and dispatch the results
    pub async fn rotate_2d_for_channels(
        &self,
        session: &SessionContext,
        channels: &[Channel],
        phase: &str,
        options: &RotationOptions,
    ) -> Result<Vec<MaskAndRotate2dResult>> {
        require_stage(session)?;
        let results = self
            .rotate_single_pair(session, channels, phase, options)
            .await?;
        self.dispatch(session, results.clone()).await?;
        Ok(results)
    }

    /// Rotate every pair at each detection's station, around its arrival
    ///
    /// Detections that cannot be rotated are logged and contribute nothing.
    pub async fn rotate_2d_for_signal_detections(
        &self,
        session: &SessionContext,
        signal_detection_ids: &[String],
        options: &RotationOptions,
    ) -> Result<Vec<MaskAndRotate2dResult>> {
        require_stage(session)?;
        let sampling_type = options.validate()?;

        let state = self.store.snapshot().await;
        let open_event = session
            .open_event_id
            .as_deref()
            .and_then(|id| state.events.get(id));
        let stations = self.catalog.visible_stations().await?;
        let channels = self.catalog.channels().await?;

        let signal_detections: Vec<&SignalDetection> = signal_detection_ids
            .iter()
            .filter_map(|id| {
                let sd = state.signal_detections.get(id);
                if sd.is_none() {
                    warn!(signal_detection = %id, "Unknown signal detection, skipping rotation");
                }
                sd
            })
            .collect();

        let settled = join_all(signal_detections.into_iter().map(|sd| {
            self.rotate_for_signal_detection(
                session,
                sd,
                &stations,
                &channels,
                open_event,
                sampling_type,
                options,
            )
        }))
        .await;
        let results = self.settle(settled);
        self.dispatch(session, results.clone()).await?;
        Ok(results)
    }

    /// Rotate every pair of each named station for `phase`
    pub async fn rotate_2d_for_stations(
        &self,
        session: &SessionContext,
        station_names: &[String],
        phase: &str,
        options: &RotationOptions,
    ) -> Result<Vec<MaskAndRotate2dResult>> {
        require_stage(session)?;
        options.validate()?;

        let stations = self.catalog.visible_stations().await?;
        let channels = self.catalog.channels().await?;

        let per_station = join_all(station_names.iter().map(|name| {
            let station = stations.iter().find(|s| &s.name == name);
            let channels = &channels;
            async move {
                let Some(station) = station else {
                    return vec![Err(Error::DataUnavailable(format!(
                        "Cannot find station {}",
                        name
                    )))];
                };
                let template = match self.templates.get_or_fetch(station, phase).await {
                    Ok(template) => template,
                    Err(e) => return vec![Err(e)],
                };
                let pairs = get_channel_pairs_to_rotate(channels, station, &template);
                join_all(pairs.into_iter().map(|(a, b)| async move {
                    self.rotate_single_pair(session, &[a, b], phase, options)
                        .await
                }))
                .await
            }
        }))
        .await;

        let results = self.settle(per_station.into_iter().flatten().collect());
        self.dispatch(session, results.clone()).await?;
        Ok(results)
    }

    /// Validate and rotate one pair without dispatching
    async fn rotate_single_pair(
        &self,
        session: &SessionContext,
        channels: &[Channel],
        phase: &str,
        options: &RotationOptions,
    ) -> Result<Vec<MaskAndRotate2dResult>> {
        let (a, b) = validate_channels_for_rotation(channels)?;
        let stations = self.catalog.visible_stations().await?;
        let station = station_matching_channel(&stations, a)?;
        let template = self.templates.get_or_fetch(station, phase).await?;
        if !self.config.is_valid_phase(phase) {
            return Err(Error::Validation(format!(
                "Rotation error: Invalid phase {}.",
                phase
            )));
        }
        let sampling_type = options.validate()?;

        let open_event = match session.open_event_id.as_deref() {
            Some(id) => self.store.event(id).await?,
            None => None,
        };
        if open_event.is_none() {
            validate_location_and_azimuth(
                options.location.as_ref(),
                options.receiver_to_source_azimuth_deg,
            )?;
        }

        let azimuth = calculate_receiver_to_source_azimuth(&AzimuthSources {
            receiver_location: &station.location,
            receiver_to_source_azimuth_deg: options.receiver_to_source_azimuth_deg,
            source_location: options.location.as_ref(),
            signal_detection: None,
            open_event: open_event.as_ref(),
            open_stage: &session.open_interval_name,
        })?;
        let definition = create_2d_rotation_definition(
            (a, b),
            &template,
            rotation_description(&template, phase, sampling_type),
            azimuth,
        )?;

        let predicted_arrival = match &open_event {
            Some(event) => {
                self.predictions
                    .predict_arrival_time(event, station, phase, &session.open_interval_name)
                    .await?
            }
            None => None,
        };
        let interval = time_interval_for_rotation(
            session.viewable_interval,
            open_event.is_some(),
            predicted_arrival,
            options.lead_duration,
            options.duration,
            &template,
        )?;

        self.orchestrator
            .mask_and_rotate_2d(&definition, station, interval, (a, b))
            .await
    }

    /// Rotate the pairs at one detection's station; failed pairs are settled here
    #[allow(clippy::too_many_arguments)]
    async fn rotate_for_signal_detection(
        &self,
        session: &SessionContext,
        sd: &SignalDetection,
        stations: &[Station],
        channels: &[Channel],
        open_event: Option<&Event>,
        sampling_type: Option<SamplingType>,
        options: &RotationOptions,
    ) -> Result<Vec<MaskAndRotate2dResult>> {
        let station = stations
            .iter()
            .find(|s| s.name == sd.station.name)
            .ok_or_else(|| {
                Error::DataUnavailable(format!(
                    "Cannot find station {} for signal detection {}",
                    sd.station.name, sd.id
                ))
            })?;
        let phase = sd
            .current_hypothesis()
            .and_then(|h| h.phase())
            .ok_or_else(|| {
                Error::DataUnavailable(format!(
                    "Signal detection {} has no phase feature measurement",
                    sd.id
                ))
            })?;
        let azimuth = calculate_receiver_to_source_azimuth(&AzimuthSources {
            receiver_location: &station.location,
            receiver_to_source_azimuth_deg: options.receiver_to_source_azimuth_deg,
            source_location: options.location.as_ref(),
            signal_detection: Some(sd),
            open_event,
            open_stage: &session.open_interval_name,
        })?;

        let template = self.templates.get_or_fetch(station, phase).await?;
        let pairs = get_channel_pairs_to_rotate(channels, station, &template);
        let lead_duration = options.lead_duration.unwrap_or(template.lead_duration);
        let duration = options.duration.unwrap_or(template.duration);
        let interval = rotation_time_range_for_signal_detection(sd, lead_duration, duration)
            .ok_or_else(|| {
                Error::DataUnavailable(format!(
                    "Could not determine the time range for the given signal detection {}",
                    sd.id
                ))
            })?;

        let template = &template;
        let rotated = join_all(pairs.iter().map(|(a, b)| async move {
            let definition = create_2d_rotation_definition(
                (a, b),
                template,
                rotation_description(template, phase, sampling_type),
                azimuth,
            )?;
            self.orchestrator
                .mask_and_rotate_2d(&definition, station, interval, (a, b))
                .await
        }))
        .await;
        Ok(self.settle(rotated))
    }

    /// Keep the successful results; log and publish every failure
    fn settle(
        &self,
        settled: Vec<Result<Vec<MaskAndRotate2dResult>>>,
    ) -> Vec<MaskAndRotate2dResult> {
        let mut results = Vec::new();
        for outcome in settled {
            match outcome {
                Ok(pair_results) => results.extend(pair_results),
                Err(e) => {
                    error!(error = %e, "maskAndRotate2d: rotation failed");
                    self.events.emit_lossy(RotationEvent::error(e.to_string(), None));
                }
            }
        }
        results
    }

    /// Reconcile `results` with the shared state in one transaction
    async fn dispatch(
        &self,
        session: &SessionContext,
        results: Vec<MaskAndRotate2dResult>,
    ) -> Result<()> {
        info!(results = results.len(), user = %session.username, "Dispatching rotation results");
        let transaction = RotationTransaction::new(
            results,
            ReconciliationConfig {
                rotation_replacement_azimuth_tolerance_deg: self
                    .config
                    .rotation_replacement_azimuth_tolerance_deg,
            },
            SdHypothesisArgs {
                username: session.username.clone(),
                open_interval_name: session.open_interval_name.clone(),
                stage_id: session.stage_id.clone(),
                current_event_id: session.open_event_id.clone(),
            },
        );
        self.store.submit(transaction).await
    }
}
