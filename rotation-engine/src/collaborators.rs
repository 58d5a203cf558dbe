//! External collaborators of the rotation pipeline
//!
//! Station data, templates, waveforms, masks, filters, predictions and the numeric
//! rotation kernel all live outside this crate. Each is a `Send + Sync` trait held
//! as `Arc<dyn _>`, so the pipeline can run against live services or the
//! in-memory implementations in [`memory`].

use async_trait::async_trait;
use rotation_common::model::{
    Channel, Event, FilterDefinition, MissingInputChannel, ProcessingMask,
    ProcessingMaskDefinition, ProcessingOperation, RotationDefinition, RotationTemplate, Station,
    TaperDefinition, TimeRange, Timeseries, UiChannelSegment, VersionReference,
};
use rotation_common::Result;
use std::collections::BTreeMap;

/// Stations and channels visible to the analyst
#[async_trait]
pub trait StationCatalog: Send + Sync {
    async fn visible_stations(&self) -> Result<Vec<Station>>;

    /// Every channel known to the session, raw and derived
    async fn channels(&self) -> Result<Vec<Channel>>;

    async fn station(&self, name: &str) -> Result<Option<Station>> {
        Ok(self
            .visible_stations()
            .await?
            .into_iter()
            .find(|s| s.name == name))
    }

    async fn channel(&self, name: &str, effective_at: Option<f64>) -> Result<Option<Channel>> {
        Ok(self
            .channels()
            .await?
            .into_iter()
            .find(|c| c.name == name && (effective_at.is_none() || c.effective_at == effective_at)))
    }
}

#[async_trait]
pub trait RotationTemplateSource: Send + Sync {
    async fn fetch_rotation_template(
        &self,
        station: &VersionReference,
        phase: &str,
    ) -> Result<Option<RotationTemplate>>;
}

#[async_trait]
pub trait ChannelSegmentSource: Send + Sync {
    /// Unfiltered raw segments already loaded into the session
    async fn cached_raw_segments(&self) -> Result<Vec<UiChannelSegment>>;

    async fn fetch_segments(
        &self,
        channel: &Channel,
        range: &TimeRange,
    ) -> Result<Vec<UiChannelSegment>>;
}

#[async_trait]
pub trait ProcessingMaskSource: Send + Sync {
    /// Masks of `segment`'s channel that apply to `operation` and `phase`
    async fn create_processing_masks(
        &self,
        segment: &UiChannelSegment,
        operation: ProcessingOperation,
        phase: &str,
    ) -> Result<Vec<ProcessingMask>>;

    async fn mask_definition(
        &self,
        channel: &VersionReference,
        phase: &str,
        operation: ProcessingOperation,
    ) -> Result<Option<ProcessingMaskDefinition>>;
}

#[async_trait]
pub trait FilterService: Send + Sync {
    /// Filter configured for the station, resolved for this segment; `None` skips filtering
    async fn channel_filter(
        &self,
        station_name: &str,
        segment: &UiChannelSegment,
    ) -> Result<Option<FilterDefinition>>;

    /// Design `filter` for the segment's sample rate and apply it
    ///
    /// The returned segment belongs to `filtered_channel`.
    async fn design_and_apply(
        &self,
        segment: &UiChannelSegment,
        filter: &FilterDefinition,
        filtered_channel: &Channel,
    ) -> Result<UiChannelSegment>;
}

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn events(&self) -> Result<Vec<Event>>;

    async fn event(&self, id: &str) -> Result<Option<Event>> {
        Ok(self.events().await?.into_iter().find(|e| e.id == id))
    }
}

#[async_trait]
pub trait FeaturePredictionSource: Send + Sync {
    /// Predicted arrival time of `phase` at `station` for the event's preferred location
    async fn predict_arrival_time(
        &self,
        event: &Event,
        station: &Station,
        phase: &str,
        open_stage: &str,
    ) -> Result<Option<f64>>;
}

/// Inputs of one kernel invocation
#[derive(Debug, Clone, Copy)]
pub struct KernelRequest<'a> {
    pub definition: &'a RotationDefinition,
    pub station: &'a Station,
    pub channels: (&'a Channel, &'a Channel),
    pub segments: (&'a UiChannelSegment, &'a UiChannelSegment),
    pub interval: TimeRange,
    /// Masks keyed by channel name
    pub masks: &'a BTreeMap<String, Vec<ProcessingMask>>,
    pub taper: Option<&'a TaperDefinition>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KernelOutput {
    pub radial: Vec<Timeseries>,
    pub transverse: Vec<Timeseries>,
    pub missing_input_channels: Vec<MissingInputChannel>,
}

/// Numeric masking and rotation of one segment pair
#[async_trait]
pub trait RotationKernel: Send + Sync {
    async fn mask_and_rotate_2d(&self, request: &KernelRequest<'_>) -> Result<KernelOutput>;
}

/// In-memory collaborators for tests and offline runs
pub mod memory {
    use super::*;
    use rotation_common::Error;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, Default)]
    pub struct MemoryStationCatalog {
        pub stations: Vec<Station>,
        pub channels: Vec<Channel>,
    }

    impl MemoryStationCatalog {
        /// Catalog whose channels are the stations' raw channels
        pub fn from_stations(stations: Vec<Station>) -> Self {
            let channels = stations
                .iter()
                .flat_map(|s| s.all_raw_channels.iter().cloned())
                .collect();
            Self { stations, channels }
        }
    }

    #[async_trait]
    impl StationCatalog for MemoryStationCatalog {
        async fn visible_stations(&self) -> Result<Vec<Station>> {
            Ok(self.stations.clone())
        }

        async fn channels(&self) -> Result<Vec<Channel>> {
            Ok(self.channels.clone())
        }
    }

    /// Templates keyed by station and phase, counting fetches
    #[derive(Debug, Default)]
    pub struct MemoryTemplateSource {
        templates: HashMap<(String, String), RotationTemplate>,
        fetches: AtomicUsize,
    }

    impl MemoryTemplateSource {
        pub fn new(templates: Vec<RotationTemplate>) -> Self {
            Self {
                templates: templates
                    .into_iter()
                    .map(|t| ((t.station.name.clone(), t.phase().to_string()), t))
                    .collect(),
                fetches: AtomicUsize::new(0),
            }
        }

        pub fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RotationTemplateSource for MemoryTemplateSource {
        async fn fetch_rotation_template(
            &self,
            station: &VersionReference,
            phase: &str,
        ) -> Result<Option<RotationTemplate>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .templates
                .get(&(station.name.clone(), phase.to_string()))
                .cloned())
        }
    }

    #[derive(Debug, Clone, Default)]
    pub struct MemorySegmentSource {
        pub cached: Vec<UiChannelSegment>,
        pub stored: Vec<UiChannelSegment>,
    }

    #[async_trait]
    impl ChannelSegmentSource for MemorySegmentSource {
        async fn cached_raw_segments(&self) -> Result<Vec<UiChannelSegment>> {
            Ok(self.cached.clone())
        }

        async fn fetch_segments(
            &self,
            channel: &Channel,
            range: &TimeRange,
        ) -> Result<Vec<UiChannelSegment>> {
            Ok(self
                .stored
                .iter()
                .filter(|s| s.channel_name() == channel.name)
                .filter(|s| {
                    let d = s.descriptor();
                    range.overlaps(d.start_time, d.end_time)
                })
                .cloned()
                .collect())
        }
    }

    #[derive(Debug, Clone, Default)]
    pub struct MemoryMaskSource {
        pub masks: Vec<ProcessingMask>,
        /// Mask definitions keyed by channel name, then phase
        pub definitions: HashMap<String, HashMap<String, ProcessingMaskDefinition>>,
    }

    #[async_trait]
    impl ProcessingMaskSource for MemoryMaskSource {
        async fn create_processing_masks(
            &self,
            segment: &UiChannelSegment,
            operation: ProcessingOperation,
            _phase: &str,
        ) -> Result<Vec<ProcessingMask>> {
            let range = segment.descriptor().time_range();
            Ok(self
                .masks
                .iter()
                .filter(|m| m.applied_to_raw_channel.name == segment.channel_name())
                .filter(|m| m.processing_operation == operation && m.overlaps(&range))
                .cloned()
                .collect())
        }

        async fn mask_definition(
            &self,
            channel: &VersionReference,
            phase: &str,
            operation: ProcessingOperation,
        ) -> Result<Option<ProcessingMaskDefinition>> {
            Ok(self
                .definitions
                .get(&channel.name)
                .and_then(|by_phase| by_phase.get(phase))
                .filter(|d| d.processing_operation == operation)
                .cloned())
        }
    }

    /// Per-station filters; applying one relabels the segment
    #[derive(Debug, Clone, Default)]
    pub struct MemoryFilterService {
        pub filters_by_station: HashMap<String, FilterDefinition>,
        pub fail: bool,
    }

    #[async_trait]
    impl FilterService for MemoryFilterService {
        async fn channel_filter(
            &self,
            station_name: &str,
            _segment: &UiChannelSegment,
        ) -> Result<Option<FilterDefinition>> {
            Ok(self.filters_by_station.get(station_name).cloned())
        }

        async fn design_and_apply(
            &self,
            segment: &UiChannelSegment,
            filter: &FilterDefinition,
            filtered_channel: &Channel,
        ) -> Result<UiChannelSegment> {
            if self.fail {
                return Err(Error::Filter(format!("Failed to design filter {}", filter.name)));
            }
            let mut filtered = segment.clone();
            filtered.channel_segment_descriptor.channel = filtered_channel.version_reference();
            filtered.filter_id = Some(filter.name.clone());
            Ok(filtered)
        }
    }

    /// Arrival predictions keyed by station and phase
    #[derive(Debug, Clone, Default)]
    pub struct MemoryFeaturePredictions {
        pub arrivals: HashMap<(String, String), f64>,
    }

    #[async_trait]
    impl FeaturePredictionSource for MemoryFeaturePredictions {
        async fn predict_arrival_time(
            &self,
            _event: &Event,
            station: &Station,
            phase: &str,
            _open_stage: &str,
        ) -> Result<Option<f64>> {
            Ok(self
                .arrivals
                .get(&(station.name.clone(), phase.to_string()))
                .copied())
        }
    }

    /// Kernel that passes the first segment's series through under new claim checks
    #[derive(Debug, Default)]
    pub struct PassThroughKernel {
        pub fail: bool,
        calls: AtomicUsize,
    }

    impl PassThroughKernel {
        pub fn failing() -> Self {
            Self {
                fail: true,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RotationKernel for PassThroughKernel {
        async fn mask_and_rotate_2d(&self, request: &KernelRequest<'_>) -> Result<KernelOutput> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::Kernel(format!(
                    "Rotation kernel failed for {}",
                    request.station.name
                )));
            }
            let relabel = |suffix: &str| -> Vec<Timeseries> {
                request
                    .segments
                    .0
                    .timeseries
                    .iter()
                    .map(|t| Timeseries {
                        claim_check_id: format!("{}-{}", t.claim_check_id, suffix),
                        ..t.clone()
                    })
                    .collect()
            };
            Ok(KernelOutput {
                radial: relabel("radial"),
                transverse: relabel("transverse"),
                missing_input_channels: Vec::new(),
            })
        }
    }
}
