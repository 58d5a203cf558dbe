//! Mask-and-rotate for one channel pair
//!
//! Given a validated pair, a definition and an interval, the orchestrator loads
//! the unfiltered segments, builds processing masks, runs the rotation kernel and
//! wraps its output in radial and transverse channels. When the station has a
//! channel filter configured, each rotated segment is filtered as well.
//!
//! Every failure here is scoped to the pair; callers settle it alongside the
//! other pairs of the request.

use crate::collaborators::{
    ChannelSegmentSource, FilterService, KernelOutput, KernelRequest, ProcessingMaskSource,
    RotationKernel,
};
use crate::definition::{radial_definition, transverse_definition};
use crate::naming::ChannelFactory;
use crate::validation::{validate_channel_inputs, ToleranceSet};
use crate::waveform::trim_segment;
use rotation_common::events::{EventBus, RotationEvent};
use rotation_common::model::{
    Channel, ChannelOrientationType, ChannelSegmentDescriptor, MaskAndRotate2dResult,
    ProcessingMask, ProcessingMaskDefinition, ProcessingOperation, RotationDefinition, Station,
    TimeRange, UiChannelSegment,
};
use rotation_common::time::now_epoch_secs;
use rotation_common::{Error, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Collaborators needed to rotate one pair
#[derive(Clone)]
pub struct MaskAndRotate {
    segments: Arc<dyn ChannelSegmentSource>,
    masks: Arc<dyn ProcessingMaskSource>,
    filters: Arc<dyn FilterService>,
    kernel: Arc<dyn RotationKernel>,
    factory: ChannelFactory,
    events: EventBus,
}

/// Per-channel inputs to one kernel call
struct PreparedChannel {
    channel: Channel,
    segment: UiChannelSegment,
    masks: Vec<ProcessingMask>,
    mask_definition: Option<ProcessingMaskDefinition>,
}

impl PreparedChannel {
    /// The channel the rotated channel derives from: masked when masks apply
    fn rotation_input(&self, factory: &ChannelFactory) -> Result<Channel> {
        match &self.mask_definition {
            Some(definition) if !self.masks.is_empty() => {
                factory.create_masked(&self.channel, definition)
            }
            _ => Ok(self.channel.clone()),
        }
    }
}

impl MaskAndRotate {
    pub fn new(
        segments: Arc<dyn ChannelSegmentSource>,
        masks: Arc<dyn ProcessingMaskSource>,
        filters: Arc<dyn FilterService>,
        kernel: Arc<dyn RotationKernel>,
        events: EventBus,
    ) -> Self {
        Self {
            segments,
            masks,
            filters,
            kernel,
            factory: ChannelFactory::new(events.clone()),
            events,
        }
    }

    /// Rotate `channels` over `interval`
    ///
    /// Returns a radial and a transverse result, each carrying its filtered
    /// counterpart when the station has a channel filter.
    pub async fn mask_and_rotate_2d(
        &self,
        definition: &RotationDefinition,
        station: &Station,
        interval: TimeRange,
        channels: (&Channel, &Channel),
    ) -> Result<Vec<MaskAndRotate2dResult>> {
        let (a, b) = channels;
        let warnings = validate_channel_inputs(
            &[a.clone(), b.clone()],
            &ToleranceSet::from(&definition.rotation_parameters),
        )?;
        for warning in warnings {
            warn!(station = %station.name, channels = %format!("{}, {}", a.name, b.name), "maskAndRotate2d: {}", warning);
            self.events.emit_lossy(RotationEvent::warning(
                format!("maskAndRotate2d: {}", warning),
                Some(&station.name),
            ));
        }

        let segment_a = self.unfiltered_segment(a, &interval).await?;
        let segment_b = self.unfiltered_segment(b, &interval).await?;

        let results = self
            .rotate_segment_pair(definition, station, interval, (a, &segment_a), (b, &segment_b))
            .await?;
        info!(
            station = %station.name,
            phase = definition.phase(),
            results = results.len(),
            "Rotated channel pair"
        );
        Ok(results)
    }

    /// First cached raw segment of `channel` overlapping `interval`, else the first fetched one
    async fn unfiltered_segment(
        &self,
        channel: &Channel,
        interval: &TimeRange,
    ) -> Result<UiChannelSegment> {
        let cached = self
            .segments
            .cached_raw_segments()
            .await?
            .into_iter()
            .find(|s| {
                let d = s.descriptor();
                s.channel_name() == channel.name
                    && s.filter_id.is_none()
                    && interval.overlaps(d.start_time, d.end_time)
            });
        let segment = match cached {
            Some(segment) => Some(segment),
            None => {
                debug!(channel = %channel.name, "No cached segment, fetching");
                self.segments
                    .fetch_segments(channel, interval)
                    .await?
                    .into_iter()
                    .next()
            }
        };
        segment.ok_or_else(|| {
            Error::DataUnavailable(format!(
                "Cannot find channel segment for {}: missing waveform data",
                channel.name
            ))
        })
    }

    async fn prepare(
        &self,
        channel: &Channel,
        segment: &UiChannelSegment,
        interval: &TimeRange,
        phase: &str,
    ) -> Result<PreparedChannel> {
        let segment = trim_segment(segment, interval);
        let masks = self
            .masks
            .create_processing_masks(&segment, ProcessingOperation::Rotation, phase)
            .await?;
        let mask_definition = self
            .masks
            .mask_definition(&channel.version_reference(), phase, ProcessingOperation::Rotation)
            .await?;
        Ok(PreparedChannel {
            channel: channel.clone(),
            segment,
            masks,
            mask_definition,
        })
    }

    async fn rotate_segment_pair(
        &self,
        definition: &RotationDefinition,
        station: &Station,
        interval: TimeRange,
        first: (&Channel, &UiChannelSegment),
        second: (&Channel, &UiChannelSegment),
    ) -> Result<Vec<MaskAndRotate2dResult>> {
        let phase = definition.phase();
        let first = self.prepare(first.0, first.1, &interval, phase).await?;
        let second = self.prepare(second.0, second.1, &interval, phase).await?;

        let masks: BTreeMap<String, Vec<ProcessingMask>> = [&first, &second]
            .iter()
            .map(|p| (p.channel.name.clone(), p.masks.clone()))
            .collect();
        let taper = first
            .mask_definition
            .as_ref()
            .and_then(|d| d.taper_definition.as_ref());

        let request = KernelRequest {
            definition,
            station,
            channels: (&first.channel, &second.channel),
            segments: (&first.segment, &second.segment),
            interval,
            masks: &masks,
            taper,
        };
        let output = match self.kernel.mask_and_rotate_2d(&request).await {
            Ok(output) => output,
            Err(e) => {
                error!(station = %station.name, error = %e, "Rotation kernel failed");
                self.events
                    .emit_lossy(RotationEvent::error(e.to_string(), Some(&station.name)));
                return Err(e);
            }
        };

        let inputs = vec![
            first.rotation_input(&self.factory)?,
            second.rotation_input(&self.factory)?,
        ];
        let all_masks: Vec<ProcessingMask> = masks.into_values().flatten().collect();
        let creation_time = now_epoch_secs();
        let KernelOutput {
            radial,
            transverse,
            missing_input_channels,
        } = output;

        let mut results = Vec::with_capacity(2);
        for (orientation, variant, timeseries) in [
            (ChannelOrientationType::Radial, radial_definition(definition), radial),
            (
                ChannelOrientationType::Transverse,
                transverse_definition(definition),
                transverse,
            ),
        ] {
            let rotated_channel = self.factory.create_rotated(&inputs, &variant, orientation)?;
            let descriptor = ChannelSegmentDescriptor {
                channel: rotated_channel.version_reference(),
                creation_time,
                start_time: interval.start_time_secs,
                end_time: interval.end_time_secs,
            };
            let rotated_segment = UiChannelSegment {
                masked_by: masks_overlapping(&all_masks, &descriptor.time_range()),
                channel_segment_descriptor: descriptor,
                timeseries,
                missing_input_channels: missing_input_channels.clone(),
                filter_id: None,
            };
            let (filtered_channel, filtered_segment) = self
                .apply_channel_filter(station, &rotated_channel, &rotated_segment)
                .await?;
            results.push(MaskAndRotate2dResult {
                station_name: station.name.clone(),
                phase: phase.to_string(),
                rotated_channel,
                rotated_ui_channel_segment: rotated_segment,
                filtered_channel,
                filtered_ui_channel_segment: filtered_segment,
            });
        }
        Ok(results)
    }

    /// Filter a rotated segment with the station's channel filter, if one is configured
    async fn apply_channel_filter(
        &self,
        station: &Station,
        channel: &Channel,
        segment: &UiChannelSegment,
    ) -> Result<(Option<Channel>, Option<UiChannelSegment>)> {
        let Some(filter) = self.filters.channel_filter(&station.name, segment).await? else {
            return Ok((None, None));
        };
        let filtered_channel = self.factory.create_filtered(channel, &filter)?;
        match self
            .filters
            .design_and_apply(segment, &filter, &filtered_channel)
            .await
        {
            Ok(filtered_segment) => Ok((Some(filtered_channel), Some(filtered_segment))),
            Err(e) => {
                error!(station = %station.name, filter = %filter.name, error = %e, "Filtering rotated segment failed");
                self.events
                    .emit_lossy(RotationEvent::error(e.to_string(), Some(&station.name)));
                Err(e)
            }
        }
    }
}

fn masks_overlapping(masks: &[ProcessingMask], span: &TimeRange) -> Vec<ProcessingMask> {
    masks.iter().filter(|m| m.overlaps(span)).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::memory::{
        MemoryFilterService, MemoryMaskSource, MemorySegmentSource, PassThroughKernel,
    };
    use crate::test_support::{
        filter_definition, horizontal_channel, mask_definition, processing_mask, raw_segment,
        rotation_definition, station_with,
    };
    use rotation_common::model::{ChannelName, ChannelNameKind};
    use std::collections::HashMap;

    struct Fixture {
        segments: MemorySegmentSource,
        masks: MemoryMaskSource,
        filters: MemoryFilterService,
        kernel: Arc<PassThroughKernel>,
        events: EventBus,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                segments: MemorySegmentSource {
                    cached: vec![
                        raw_segment("ASAR.AS01.BHN", 0.0, 120.0),
                        raw_segment("ASAR.AS01.BHE", 0.0, 120.0),
                    ],
                    stored: vec![],
                },
                masks: MemoryMaskSource::default(),
                filters: MemoryFilterService::default(),
                kernel: Arc::new(PassThroughKernel::default()),
                events: EventBus::new(64),
            }
        }

        fn orchestrator(&self) -> MaskAndRotate {
            MaskAndRotate::new(
                Arc::new(self.segments.clone()),
                Arc::new(self.masks.clone()),
                Arc::new(self.filters.clone()),
                self.kernel.clone(),
                self.events.clone(),
            )
        }
    }

    fn pair() -> (Channel, Channel) {
        (
            horizontal_channel("ASAR.AS01.BHN", "N", 0.0),
            horizontal_channel("ASAR.AS01.BHE", "E", 90.0),
        )
    }

    #[tokio::test]
    async fn test_rotates_into_radial_and_transverse() {
        let fixture = Fixture::new();
        let mut rx = fixture.events.subscribe();
        let (n, e) = pair();
        let station = station_with("ASAR", vec![n.clone(), e.clone()]);
        let interval = TimeRange::new(10.0, 70.0);

        let results = fixture
            .orchestrator()
            .mask_and_rotate_2d(&rotation_definition(15.0, "P"), &station, interval, (&n, &e))
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        let radial = &results[0];
        let transverse = &results[1];
        assert_eq!(
            radial.rotated_channel.channel_orientation_type,
            ChannelOrientationType::Radial
        );
        assert_eq!(radial.rotated_channel.horizontal_angle_deg(), Some(195.0));
        assert_eq!(transverse.rotated_channel.horizontal_angle_deg(), Some(285.0));
        assert!(radial.rotated_channel.name.starts_with("ASAR.AS01.BHR/rotate/"));
        assert!(transverse.rotated_channel.name.starts_with("ASAR.AS01.BHT/rotate/"));

        let descriptor = radial.rotated_ui_channel_segment.descriptor();
        assert_eq!((descriptor.start_time, descriptor.end_time), (10.0, 70.0));
        assert_eq!(descriptor.channel.name, radial.rotated_channel.name);
        assert_eq!(radial.rotated_ui_channel_segment.timeseries[0].sample_count, 2401);
        assert!(radial.filtered_channel.is_none());
        assert_eq!(fixture.kernel.call_count(), 1);

        // both rotated channels are announced
        let mut announced = 0;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, RotationEvent::DerivedChannelsCreated { .. }) {
                announced += 1;
            }
        }
        assert_eq!(announced, 2);
    }

    #[tokio::test]
    async fn test_geometry_warnings_are_published() {
        let fixture = Fixture::new();
        let mut rx = fixture.events.subscribe();
        let (n, mut e) = pair();
        e.orientation_angles = Some(rotation_common::model::OrientationAngles {
            horizontal_angle_deg: Some(80.0),
            vertical_angle_deg: Some(90.0),
        });
        let station = station_with("ASAR", vec![n.clone(), e.clone()]);

        fixture
            .orchestrator()
            .mask_and_rotate_2d(
                &rotation_definition(15.0, "P"),
                &station,
                TimeRange::new(0.0, 60.0),
                (&n, &e),
            )
            .await
            .unwrap();

        let event = rx.try_recv().unwrap();
        assert!(matches!(
            event,
            RotationEvent::Warning { ref message, .. }
                if message == "maskAndRotate2d: Channels are not orthogonal"
        ));
    }

    #[tokio::test]
    async fn test_missing_orientation_fails_before_kernel() {
        let fixture = Fixture::new();
        let (n, mut e) = pair();
        e.orientation_angles = None;
        let station = station_with("ASAR", vec![n.clone(), e.clone()]);

        let err = fixture
            .orchestrator()
            .mask_and_rotate_2d(
                &rotation_definition(15.0, "P"),
                &station,
                TimeRange::new(0.0, 60.0),
                (&n, &e),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(fixture.kernel.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_waveform_data() {
        let mut fixture = Fixture::new();
        fixture.segments.cached.truncate(1);
        let (n, e) = pair();
        let station = station_with("ASAR", vec![n.clone(), e.clone()]);

        let err = fixture
            .orchestrator()
            .mask_and_rotate_2d(
                &rotation_definition(15.0, "P"),
                &station,
                TimeRange::new(0.0, 60.0),
                (&n, &e),
            )
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Data unavailable: Cannot find channel segment for ASAR.AS01.BHE: missing waveform data"
        );
        assert_eq!(fixture.kernel.call_count(), 0);
    }

    #[tokio::test]
    async fn test_fetches_when_not_cached() {
        let mut fixture = Fixture::new();
        fixture.segments.stored = std::mem::take(&mut fixture.segments.cached);
        let (n, e) = pair();
        let station = station_with("ASAR", vec![n.clone(), e.clone()]);

        let results = fixture
            .orchestrator()
            .mask_and_rotate_2d(
                &rotation_definition(15.0, "P"),
                &station,
                TimeRange::new(0.0, 60.0),
                (&n, &e),
            )
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_cached_segments_outside_window_are_ignored() {
        let mut fixture = Fixture::new();
        fixture.segments.cached = vec![
            raw_segment("ASAR.AS01.BHN", 5000.0, 5100.0),
            raw_segment("ASAR.AS01.BHE", 5000.0, 5100.0),
            raw_segment("ASAR.AS01.BHN", 0.0, 100.0),
            raw_segment("ASAR.AS01.BHE", 0.0, 100.0),
        ];
        let (n, e) = pair();
        let station = station_with("ASAR", vec![n.clone(), e.clone()]);

        let results = fixture
            .orchestrator()
            .mask_and_rotate_2d(
                &rotation_definition(15.0, "P"),
                &station,
                TimeRange::new(10.0, 70.0),
                (&n, &e),
            )
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(fixture.kernel.call_count(), 1);
        for result in &results {
            let series = &result.rotated_ui_channel_segment.timeseries[0];
            assert_eq!((series.start_time, series.end_time), (10.0, 70.0));
            assert_eq!(series.sample_count, 2401);
        }
    }

    #[tokio::test]
    async fn test_out_of_window_cache_falls_back_to_fetch() {
        let mut fixture = Fixture::new();
        fixture.segments.stored = std::mem::take(&mut fixture.segments.cached);
        fixture.segments.cached = vec![
            raw_segment("ASAR.AS01.BHN", 5000.0, 5100.0),
            raw_segment("ASAR.AS01.BHE", 5000.0, 5100.0),
        ];
        let (n, e) = pair();
        let station = station_with("ASAR", vec![n.clone(), e.clone()]);

        let results = fixture
            .orchestrator()
            .mask_and_rotate_2d(
                &rotation_definition(15.0, "P"),
                &station,
                TimeRange::new(10.0, 70.0),
                (&n, &e),
            )
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].rotated_ui_channel_segment.timeseries[0].start_time, 10.0);
    }

    #[tokio::test]
    async fn test_kernel_failure_is_published() {
        let mut fixture = Fixture::new();
        fixture.kernel = Arc::new(PassThroughKernel::failing());
        let mut rx = fixture.events.subscribe();
        let (n, e) = pair();
        let station = station_with("ASAR", vec![n.clone(), e.clone()]);

        let err = fixture
            .orchestrator()
            .mask_and_rotate_2d(
                &rotation_definition(15.0, "P"),
                &station,
                TimeRange::new(0.0, 60.0),
                (&n, &e),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Kernel(_)));
        assert!(matches!(rx.try_recv().unwrap(), RotationEvent::Error { .. }));
    }

    #[tokio::test]
    async fn test_masked_inputs_name_and_masks() {
        let mut fixture = Fixture::new();
        fixture.masks.masks = vec![
            processing_mask("ASAR.AS01.BHN", 20.0, 30.0),
            processing_mask("ASAR.AS01.BHE", 100.0, 110.0),
        ];
        let by_phase: HashMap<String, _> = [("P".to_string(), mask_definition())].into();
        fixture.masks.definitions = [
            ("ASAR.AS01.BHN".to_string(), by_phase.clone()),
            ("ASAR.AS01.BHE".to_string(), by_phase),
        ]
        .into();
        let (n, e) = pair();
        let station = station_with("ASAR", vec![n.clone(), e.clone()]);

        let results = fixture
            .orchestrator()
            .mask_and_rotate_2d(
                &rotation_definition(15.0, "P"),
                &station,
                TimeRange::new(10.0, 70.0),
                (&n, &e),
            )
            .await
            .unwrap();

        let radial = &results[0];
        // only the BHN mask falls inside the trimmed window
        assert_eq!(radial.rotated_ui_channel_segment.masked_by.len(), 1);
        assert_eq!(
            radial.rotated_ui_channel_segment.masked_by[0].applied_to_raw_channel.name,
            "ASAR.AS01.BHN"
        );
        let inputs = &radial.rotated_channel.configured_inputs;
        assert!(inputs[0].name.starts_with("ASAR.AS01.BHN/masked/"));
        assert_eq!(inputs[1].name, "ASAR.AS01.BHE");
        assert!(radial
            .rotated_channel
            .name
            .starts_with("ASAR.AS01.BHR/masked/rotate/"));
        // only one input had samples removed
        assert!(!radial
            .rotated_channel
            .description
            .contains("Masked samples removed."));
    }

    #[tokio::test]
    async fn test_station_filter_is_applied() {
        let mut fixture = Fixture::new();
        fixture
            .filters
            .filters_by_station
            .insert("ASAR".to_string(), filter_definition("BP"));
        let (n, e) = pair();
        let station = station_with("ASAR", vec![n.clone(), e.clone()]);

        let results = fixture
            .orchestrator()
            .mask_and_rotate_2d(
                &rotation_definition(15.0, "P"),
                &station,
                TimeRange::new(0.0, 60.0),
                (&n, &e),
            )
            .await
            .unwrap();

        let radial = &results[0];
        let filtered_channel = radial.filtered_channel.as_ref().unwrap();
        let filtered_segment = radial.filtered_ui_channel_segment.as_ref().unwrap();
        assert_eq!(
            ChannelName::parse(&filtered_channel.name).kind(),
            ChannelNameKind::Filtered
        );
        assert_eq!(filtered_segment.channel_name(), filtered_channel.name);
        assert_eq!(filtered_segment.filter_id.as_deref(), Some("BP"));
        assert_eq!(radial.measured_channel(), filtered_channel);
        assert!(filtered_segment
            .descriptor()
            .matches(radial.rotated_ui_channel_segment.descriptor()));
    }

    #[tokio::test]
    async fn test_filter_failure_fails_the_pair() {
        let mut fixture = Fixture::new();
        fixture.filters = MemoryFilterService {
            filters_by_station: [("ASAR".to_string(), filter_definition("BP"))].into(),
            fail: true,
        };
        let (n, e) = pair();
        let station = station_with("ASAR", vec![n.clone(), e.clone()]);

        let err = fixture
            .orchestrator()
            .mask_and_rotate_2d(
                &rotation_definition(15.0, "P"),
                &station,
                TimeRange::new(0.0, 60.0),
                (&n, &e),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Filter(_)));
    }
}
