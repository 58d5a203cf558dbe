//! Derived channel construction
//!
//! Every derivation builds a draft channel from its inputs, then names it from
//! the content hash of a representative channel. Masked, beamed and rotated
//! channels announce themselves on the event bus; filtered and temporary
//! channels are created too often for that to be useful.

use super::names::{
    build_beamed_channel_description, build_beamed_channel_name, build_filtered_channel_name,
    build_masked_channel_name, build_rotated_channel_description, build_rotated_channel_name,
    build_temporary_channel_name, rotated_channel_group,
};
use rotation_common::events::{EventBus, RotationEvent};
use rotation_common::model::{
    BeamDefinition, BeamMetadata, Channel, ChannelBandType, ChannelInstrumentType,
    ChannelOrientationType, FilterDefinition, FilterMetadata, OrientationAngles,
    ProcessingDefinition, ProcessingMaskDefinition, ProcessingMetadata, RotationDefinition,
    RotationMetadata, Station, Units,
};
use rotation_common::model::channel_name::TEMPORARY_CHANNEL_GROUP;
use rotation_common::{Error, Result};
use tracing::debug;

const BEAM_CHANNEL_GROUP: &str = "beam";
const UNKNOWN_ORIENTATION_CODE: &str = "UNKNOWN";

/// Latest `effective_at` among the inputs
fn latest_effective_at(inputs: &[Channel]) -> Option<f64> {
    inputs
        .iter()
        .filter_map(|c| c.effective_at)
        .fold(None, |latest: Option<f64>, t| Some(latest.map_or(t, |l| l.max(t))))
}

/// Builds derived channels and publishes their creation
#[derive(Debug, Clone)]
pub struct ChannelFactory {
    events: EventBus,
}

impl ChannelFactory {
    pub fn new(events: EventBus) -> Self {
        Self { events }
    }

    fn publish(&self, channel: &Channel) {
        debug!(channel = %channel.name, "Derived channel created");
        self.events
            .emit_lossy(RotationEvent::derived_channels_created(vec![channel.name.clone()]));
    }

    /// Filtered version of `input`
    pub fn create_filtered(&self, input: &Channel, filter: &FilterDefinition) -> Result<Channel> {
        let mut metadata = input.processing_metadata.clone();
        metadata.filter = Some(FilterMetadata {
            filter_type: filter.filter_description.filter_type.clone(),
            causal: filter.filter_description.causal,
        });

        let mut channel = Channel {
            description: format!("{} Filtered using a {} filter.", input.description, filter.name),
            configured_inputs: vec![input.version_reference()],
            processing_definition: ProcessingDefinition::Filter(filter.clone()),
            processing_metadata: metadata,
            response: None,
            ..input.clone()
        };
        channel.name = build_filtered_channel_name(&channel, filter)?;
        Ok(channel)
    }

    /// Masked version of `input`; the name hashes the unmasked input
    pub fn create_masked(
        &self,
        input: &Channel,
        mask_definition: &ProcessingMaskDefinition,
    ) -> Result<Channel> {
        let channel = Channel {
            name: build_masked_channel_name(input)?,
            description: format!("{} Masked samples removed.", input.description),
            configured_inputs: vec![input.version_reference()],
            processing_definition: ProcessingDefinition::Mask(mask_definition.clone()),
            response: None,
            ..input.clone()
        };
        self.publish(&channel);
        Ok(channel)
    }

    /// Placeholder channel standing in for a whole station
    pub fn create_temporary(&self, station: &Station) -> Result<Channel> {
        let mut channel = Channel {
            name: station.name.clone(),
            effective_at: station.effective_at,
            description: format!("Temporary Channel for Station {}.", station.name),
            station: station.version_reference(),
            channel_data_type: station.station_type.data_type(),
            channel_band_type: ChannelBandType::Unknown,
            channel_instrument_type: ChannelInstrumentType::Unknown,
            channel_orientation_code: UNKNOWN_ORIENTATION_CODE.to_string(),
            channel_orientation_type: ChannelOrientationType::Unknown,
            units: Units::Unitless,
            nominal_sample_rate_hz: None,
            location: station.location,
            orientation_angles: Some(OrientationAngles::default()),
            configured_inputs: station
                .all_raw_channels
                .iter()
                .map(Channel::version_reference)
                .collect(),
            processing_definition: ProcessingDefinition::Raw,
            processing_metadata: ProcessingMetadata {
                channel_group: Some(TEMPORARY_CHANNEL_GROUP.to_string()),
                ..Default::default()
            },
            response: None,
        };
        channel.name = build_temporary_channel_name(&channel)?;
        Ok(channel)
    }

    /// Beam of `inputs` at `station`
    ///
    /// A masked input, when present, is the one hashed into the name.
    pub fn create_beamed(
        &self,
        inputs: &[Channel],
        beam: &BeamDefinition,
        station: &Station,
    ) -> Result<Channel> {
        let first = inputs.first().ok_or_else(|| {
            Error::Validation("Cannot create a beamed channel without input channels".to_string())
        })?;
        let representative = inputs
            .iter()
            .find(|c| c.name.contains("masked"))
            .unwrap_or(first);
        let parameters = &beam.beam_parameters;

        let mut metadata = first.processing_metadata.clone();
        metadata.channel_group = Some(BEAM_CHANNEL_GROUP.to_string());
        metadata.beam = Some(BeamMetadata {
            steering_back_azimuth: Some(parameters.receiver_to_source_azimuth_deg),
            steering_slowness: Some(parameters.slowness_sec_per_deg),
            beam_summation: Some(beam.beam_description.beam_summation.clone()),
            beam_phase: Some(beam.beam_description.phase.clone()),
            beam_type: Some(beam.beam_description.beam_type.clone()),
            event_hypothesis_id: parameters.event_hypothesis_id.clone(),
            signal_detection_hypothesis_id: parameters.signal_detection_hypothesis_id.clone(),
            location: parameters.location,
        });

        let channel = Channel {
            name: build_beamed_channel_name(representative, beam)?,
            effective_at: latest_effective_at(inputs),
            description: build_beamed_channel_description(inputs, beam, &station.name),
            station: station.version_reference(),
            location: station.location,
            nominal_sample_rate_hz: Some(parameters.sample_rate_hz),
            orientation_angles: Some(parameters.orientation_angles),
            configured_inputs: inputs.iter().map(Channel::version_reference).collect(),
            processing_definition: ProcessingDefinition::Beam(beam.clone()),
            processing_metadata: metadata,
            response: None,
            ..first.clone()
        };
        self.publish(&channel);
        Ok(channel)
    }

    /// Rotated channel for one orientation of `definition`
    pub fn create_rotated(
        &self,
        inputs: &[Channel],
        definition: &RotationDefinition,
        orientation: ChannelOrientationType,
    ) -> Result<Channel> {
        if !(2..=3).contains(&inputs.len()) {
            return Err(Error::Validation(format!(
                "inputChannels array must contain 2 or 3 channels, but received {}",
                inputs.len()
            )));
        }
        let letter = orientation.code().ok_or_else(|| {
            Error::Validation("channelOrientationType may not be UNKNOWN".to_string())
        })?;
        let first = &inputs[0];
        let parameters = &definition.rotation_parameters;

        let mut metadata = first.processing_metadata.clone();
        metadata.channel_group = Some(rotated_channel_group(inputs)?);
        metadata.rotation = Some(RotationMetadata {
            steering_back_azimuth: definition.azimuth_deg(),
        });

        let channel = Channel {
            name: build_rotated_channel_name(inputs, definition, orientation)?,
            effective_at: latest_effective_at(inputs),
            description: build_rotated_channel_description(inputs, definition),
            channel_orientation_code: letter.to_string(),
            channel_orientation_type: orientation,
            nominal_sample_rate_hz: Some(parameters.sample_rate_hz),
            location: parameters.location,
            orientation_angles: Some(parameters.orientation_angles),
            configured_inputs: inputs.iter().map(Channel::version_reference).collect(),
            processing_definition: ProcessingDefinition::Rotation(definition.clone()),
            processing_metadata: metadata,
            response: None,
            ..first.clone()
        };
        self.publish(&channel);
        Ok(channel)
    }
}
