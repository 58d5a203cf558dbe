//! Segment trimming and measurement provenance

use rotation_common::model::{
    AnalysisWaveform, Channel, ChannelSegmentDescriptor, FeatureMeasurementType,
    FilterDefinitionUsage, TimeRange, Timeseries, UiChannelSegment,
};

/// Samples between `from` and `to` at `sample_rate_hz`; zero when `to <= from`
fn samples_between(from: f64, to: f64, sample_rate_hz: f64) -> u64 {
    if to <= from {
        return 0;
    }
    ((to - from) * sample_rate_hz).round() as u64
}

fn trim_timeseries(series: &Timeseries, range: &TimeRange) -> Timeseries {
    let start_time = series.start_time.max(range.start_time_secs);
    let end_time = series.end_time.min(range.end_time_secs);
    let trimmed = samples_between(series.start_time, start_time, series.sample_rate_hz)
        + samples_between(end_time, series.end_time, series.sample_rate_hz);
    Timeseries {
        start_time,
        end_time,
        sample_count: series.sample_count.saturating_sub(trimmed),
        ..series.clone()
    }
}

/// Restrict `segment` to `range`
///
/// The descriptor takes the range's bounds; each series is clamped into it and
/// loses the samples that fell outside.
pub fn trim_segment(segment: &UiChannelSegment, range: &TimeRange) -> UiChannelSegment {
    let mut trimmed = segment.clone();
    trimmed.channel_segment_descriptor.start_time = range.start_time_secs;
    trimmed.channel_segment_descriptor.end_time = range.end_time_secs;
    trimmed.timeseries = segment
        .timeseries
        .iter()
        .map(|series| trim_timeseries(series, range))
        .collect();
    trimmed
}

/// Provenance of a measurement taken on `descriptor` of `measured_channel`
///
/// Only arrival time measurements on a filtered channel are marked as made with
/// the detection filter.
pub fn build_analysis_waveform(
    measurement_type: FeatureMeasurementType,
    descriptor: &ChannelSegmentDescriptor,
    measured_channel: &Channel,
) -> AnalysisWaveform {
    let filter_definition = measured_channel.processing_definition.as_filter().cloned();
    let filter_definition_usage = match (&filter_definition, measurement_type) {
        (Some(_), FeatureMeasurementType::ArrivalTime) => Some(FilterDefinitionUsage::Detection),
        _ => None,
    };
    AnalysisWaveform {
        waveform: descriptor.clone(),
        filter_definition,
        filter_definition_usage,
    }
}
