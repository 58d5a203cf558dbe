//! Derived channel names and descriptions

use super::hash::generate_channel_hash;
use rotation_common::model::channel_name::{
    strip_hash, ATTRIBUTE_SEPARATOR, COMPONENT_SEPARATOR, ROTATION_CHANNEL_GROUP,
    TEMPORARY_CHANNEL_CODE, TEMPORARY_CHANNEL_GROUP,
};
use rotation_common::model::{
    BeamDefinition, Channel, ChannelName, ChannelOrientationType, FilterDefinition,
    RotationDefinition,
};
use rotation_common::{Error, Result};
use std::collections::BTreeSet;

const MASKED_SAMPLES_REMOVED: &str = "Masked samples removed.";

/// Azimuths and slownesses appear in names with exactly three decimals
pub fn format_three_decimals(value: f64) -> String {
    format!("{:.3}", value)
}

/// `filter,<name>` with the first `/` of the filter name escaped
pub fn filter_attributes(filter: &FilterDefinition) -> String {
    format!("filter{}{}", ATTRIBUTE_SEPARATOR, filter.name_for_channel())
}

/// `<stripped>/filter,<filter name>/<hash>`
///
/// `channel` is the new filtered channel before it is renamed, so it still
/// carries its input's name.
pub fn build_filtered_channel_name(channel: &Channel, filter: &FilterDefinition) -> Result<String> {
    let hash = generate_channel_hash(channel)?;
    Ok(format!(
        "{}{sep}{}{sep}{}",
        strip_hash(&channel.name),
        filter_attributes(filter),
        hash,
        sep = COMPONENT_SEPARATOR
    ))
}

/// `<stripped>/masked/<hash>`, hashed over the unmasked input
pub fn build_masked_channel_name(input: &Channel) -> Result<String> {
    let hash = generate_channel_hash(input)?;
    Ok(format!(
        "{}{sep}masked{sep}{}",
        strip_hash(&input.name),
        hash,
        sep = COMPONENT_SEPARATOR
    ))
}

/// `<station>.temp.---/<hash>`; `channel` still carries the station name
pub fn build_temporary_channel_name(channel: &Channel) -> Result<String> {
    let hash = generate_channel_hash(channel)?;
    Ok(format!(
        "{}.{}.{}{}{}",
        strip_hash(&channel.name),
        TEMPORARY_CHANNEL_GROUP,
        TEMPORARY_CHANNEL_CODE,
        COMPONENT_SEPARATOR,
        hash
    ))
}

fn parse_components(name: &str) -> Result<(String, String, String)> {
    let parsed = ChannelName::parse(name);
    match (parsed.station(), parsed.group(), parsed.code()) {
        (Some(s), Some(g), Some(c)) => Ok((s.to_string(), g.to_string(), c.to_string())),
        _ => Err(Error::Validation(format!(
            "Cannot parse channel name components from {}",
            name
        ))),
    }
}

/// `<station>.beam.<code>/beam,<type>,<summation>/steer,backaz_<az>deg,slow_<s>s_per_deg/<hash>`
pub fn build_beamed_channel_name(input: &Channel, beam: &BeamDefinition) -> Result<String> {
    let hash = generate_channel_hash(input)?;
    let (station, _, code) = parse_components(&input.name)?;
    let description = &beam.beam_description;
    let parameters = &beam.beam_parameters;
    Ok(format!(
        "{station}.beam.{code}{sep}beam{attr}{}{attr}{}{sep}steer{attr}backaz_{}deg{attr}slow_{}s_per_deg{sep}{hash}",
        description.beam_type.to_lowercase(),
        description.beam_summation.to_lowercase(),
        format_three_decimals(parameters.receiver_to_source_azimuth_deg),
        format_three_decimals(parameters.slowness_sec_per_deg),
        sep = COMPONENT_SEPARATOR,
        attr = ATTRIBUTE_SEPARATOR,
    ))
}

/// Channel group shared by all inputs, or `rotation` when they differ
pub fn rotated_channel_group(inputs: &[Channel]) -> Result<String> {
    let groups = inputs
        .iter()
        .map(|c| parse_components(&c.name).map(|(_, group, _)| group))
        .collect::<Result<BTreeSet<_>>>()?;
    Ok(match groups.len() {
        1 => groups.into_iter().next().unwrap_or_default(),
        _ => ROTATION_CHANNEL_GROUP.to_string(),
    })
}

/// Name of a rotated channel
///
/// Station and band/instrument codes come from the first input, which is also
/// the only channel hashed. Processing attributes are kept only when every
/// input carries the same ones.
pub fn build_rotated_channel_name(
    inputs: &[Channel],
    definition: &RotationDefinition,
    orientation: ChannelOrientationType,
) -> Result<String> {
    let first = inputs.first().ok_or_else(|| {
        Error::Validation("inputChannels array may not be null or empty".to_string())
    })?;
    let letter = orientation.code().ok_or_else(|| {
        Error::Validation("channelOrientationType may not be UNKNOWN".to_string())
    })?;
    let hash = generate_channel_hash(first)?;
    let (_, _, code) = parse_components(&first.name)?;
    let group = rotated_channel_group(inputs)?;

    let attributes: BTreeSet<String> = inputs
        .iter()
        .map(|c| ChannelName::parse(&c.name).processing_attributes())
        .filter(|a| !a.is_empty())
        .collect();
    let shared_attributes = match (attributes.len(), attributes.iter().next()) {
        (1, Some(attributes)) => format!("{}{}", COMPONENT_SEPARATOR, attributes),
        _ => String::new(),
    };

    let band_and_instrument: String = code.chars().take(2).collect();
    Ok(format!(
        "{}.{}.{}{}{}/rotate/steer,backaz_{}deg,phase_{}{}{}",
        first.station.name,
        group,
        band_and_instrument,
        letter,
        shared_attributes,
        format_three_decimals(definition.azimuth_deg()),
        definition.phase(),
        COMPONENT_SEPARATOR,
        hash
    ))
}

/// True when every input description records masked samples being removed
pub fn has_masked_samples_removed(inputs: &[Channel]) -> bool {
    inputs
        .iter()
        .all(|c| c.description.contains(MASKED_SAMPLES_REMOVED))
}

/// Sorted input names, shared processing note, then the azimuth
pub fn build_rotated_channel_description(
    inputs: &[Channel],
    definition: &RotationDefinition,
) -> String {
    let mut names: Vec<&str> = inputs.iter().map(|c| c.name.as_str()).collect();
    names.sort_unstable();
    let operations = if has_masked_samples_removed(inputs) {
        format!(" {}", MASKED_SAMPLES_REMOVED)
    } else {
        String::new()
    };
    format!(
        "{}{} Rotated to {}.",
        names.join(","),
        operations,
        format_three_decimals(definition.azimuth_deg())
    )
}

pub fn build_beamed_channel_description(
    inputs: &[Channel],
    beam: &BeamDefinition,
    station_name: &str,
) -> String {
    let first = inputs.first().map(|c| c.description.as_str()).unwrap_or_default();
    let base = if inputs.iter().all(|c| c.description == first) {
        first
    } else {
        station_name
    };
    let description = &beam.beam_description;
    let parameters = &beam.beam_parameters;
    let event = parameters
        .event_hypothesis_id
        .as_ref()
        .map(|id| format!("event {},", id))
        .unwrap_or_default();
    let detection = parameters
        .signal_detection_hypothesis_id
        .as_ref()
        .map(|id| format!("signal detection hypothesis {},", id))
        .unwrap_or_default();
    let location = parameters
        .location
        .map(|l| format!("{}/{}", l.latitude_degrees, l.longitude_degrees))
        .unwrap_or_else(|| "unknown".to_string());

    format!(
        "{} {} beamed for {} {}at location {} {}, back azimuth {}deg, slowness {}sec/deg, {}, {}.",
        base,
        description.beam_type,
        event,
        detection,
        location,
        description.phase,
        parameters.receiver_to_source_azimuth_deg,
        parameters.slowness_sec_per_deg,
        description.beam_summation,
        description.two_dimensional
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{horizontal_channel, rotation_definition, HASH};
    use rotation_common::model::channel_name::is_rotated_channel_name;

    #[test]
    fn test_rotated_name_keeps_shared_group() {
        let n = horizontal_channel("ASAR.AS01.BHN", "N", 0.0);
        let e = horizontal_channel("ASAR.AS01.BHE", "E", 90.0);
        let definition = rotation_definition(15.0, "P");
        let name = build_rotated_channel_name(
            &[n.clone(), e],
            &definition,
            ChannelOrientationType::Radial,
        )
        .unwrap();
        let hash = generate_channel_hash(&n).unwrap();
        assert_eq!(
            name,
            format!("ASAR.AS01.BHR/rotate/steer,backaz_15.000deg,phase_P/{}", hash)
        );
        assert!(is_rotated_channel_name(&name));
    }

    #[test]
    fn test_rotated_name_uses_rotation_group_for_mixed_inputs() {
        let n = horizontal_channel("ASAR.AS01.BHN", "N", 0.0);
        let e = horizontal_channel("ASAR.AS02.BHE", "E", 90.0);
        let name = build_rotated_channel_name(
            &[n, e],
            &rotation_definition(15.5, "S"),
            ChannelOrientationType::Transverse,
        )
        .unwrap();
        assert!(name.starts_with("ASAR.rotation.BHT/rotate/steer,backaz_15.500deg,phase_S/"));
    }

    #[test]
    fn test_rotated_name_keeps_identical_processing_attributes() {
        let n = horizontal_channel(&format!("ASAR.AS01.BHN/masked/{}", HASH), "N", 0.0);
        let e = horizontal_channel(&format!("ASAR.AS01.BHE/masked/{}", HASH), "E", 90.0);
        let name = build_rotated_channel_name(
            &[n.clone(), e],
            &rotation_definition(1.0, "P"),
            ChannelOrientationType::Radial,
        )
        .unwrap();
        assert!(name.starts_with("ASAR.AS01.BHR/masked/rotate/steer,backaz_1.000deg,phase_P/"));

        let raw = horizontal_channel("ASAR.AS01.BHE", "E", 90.0);
        let name = build_rotated_channel_name(
            &[n, raw],
            &rotation_definition(1.0, "P"),
            ChannelOrientationType::Radial,
        )
        .unwrap();
        assert!(name.starts_with("ASAR.AS01.BHR/rotate/"));
    }

    #[test]
    fn test_unknown_orientation_is_fatal() {
        let n = horizontal_channel("ASAR.AS01.BHN", "N", 0.0);
        let err = build_rotated_channel_name(
            &[n],
            &rotation_definition(1.0, "P"),
            ChannelOrientationType::Unknown,
        )
        .unwrap_err();
        assert!(err.to_string().contains("may not be UNKNOWN"));
    }

    #[test]
    fn test_rotated_description() {
        let mut n = horizontal_channel("ASAR.AS01.BHN", "N", 0.0);
        let mut e = horizontal_channel("ASAR.AS01.BHE", "E", 90.0);
        let definition = rotation_definition(15.0, "P");
        assert_eq!(
            build_rotated_channel_description(&[n.clone(), e.clone()], &definition),
            "ASAR.AS01.BHE,ASAR.AS01.BHN Rotated to 15.000."
        );

        n.description.push_str(" Masked samples removed.");
        e.description.push_str(" Masked samples removed.");
        assert_eq!(
            build_rotated_channel_description(&[n, e], &definition),
            "ASAR.AS01.BHE,ASAR.AS01.BHN Masked samples removed. Rotated to 15.000."
        );
    }

    #[test]
    fn test_masked_and_temporary_names() {
        let n = horizontal_channel(&format!("ASAR.AS01.BHN/{}", HASH), "N", 0.0);
        let masked = build_masked_channel_name(&n).unwrap();
        assert!(masked.starts_with("ASAR.AS01.BHN/masked/"));
        assert!(!masked.contains(HASH));

        let mut draft = horizontal_channel("ASAR", "N", 0.0);
        draft.name = "ASAR".to_string();
        let temporary = build_temporary_channel_name(&draft).unwrap();
        assert!(temporary.starts_with("ASAR.temp.---/"));
        assert_eq!(temporary.len(), "ASAR.temp.---/".len() + 64);
    }
}
