//! Selecting channel pairs to rotate at a station

use crate::validation::geometry::are_channels_orthogonal;
use rotation_common::model::{Channel, ChannelName, RotationTemplate, Station};
use std::collections::BTreeMap;
use tracing::debug;

/// Channels named by the template, in the template's order; unknown names are skipped
fn find_channels_by_names(channels: &[Channel], names: &[&str]) -> Vec<Channel> {
    names
        .iter()
        .filter_map(|name| channels.iter().find(|c| c.name == *name))
        .cloned()
        .collect()
}

fn find_channels_by_group(channels: &[Channel], group: &str) -> Vec<Channel> {
    channels
        .iter()
        .filter(|c| ChannelName::parse(&c.name).group() == Some(group))
        .cloned()
        .collect()
}

/// True when `a` and `b` may be rotated together
///
/// Symmetric in its arguments.
pub fn are_channels_pairable(tolerance_deg: f64, a: &Channel, b: &Channel) -> bool {
    a.nominal_sample_rate_hz == b.nominal_sample_rate_hz
        && a.channel_band_type == b.channel_band_type
        && a.channel_instrument_type == b.channel_instrument_type
        && a.channel_data_type == b.channel_data_type
        && a.units == b.units
        && are_channels_orthogonal(tolerance_deg, a, b)
}

/// Pair horizontal channels within each channel group
///
/// Each step takes the last unpaired channel of a group and pairs it with the
/// first remaining compatible one. Channels left without a partner are dropped.
pub fn pair_channels_to_rotate(
    channels: &[Channel],
    template: &RotationTemplate,
) -> Vec<(Channel, Channel)> {
    let mut groups: BTreeMap<String, Vec<Channel>> = BTreeMap::new();
    for channel in channels
        .iter()
        .filter(|c| c.channel_orientation_type.is_horizontal_rotatable())
    {
        let group = ChannelName::parse(&channel.name)
            .group()
            .unwrap_or_default()
            .to_string();
        groups.entry(group).or_default().push(channel.clone());
    }

    let tolerance = template.orientation_angle_tolerance_deg;
    let mut pairs = Vec::new();
    for (group, mut remaining) in groups {
        while let Some(current) = remaining.pop() {
            match remaining
                .iter()
                .position(|c| are_channels_pairable(tolerance, c, &current))
            {
                Some(index) => {
                    let partner = remaining.remove(index);
                    pairs.push((current, partner));
                }
                None => debug!(group = %group, channel = %current.name, "No rotation partner"),
            }
        }
    }
    pairs
}

/// Channel pairs to rotate at `station`
///
/// Candidates are the template's input channels if it lists any, else the
/// channels of its input channel group, else the station's raw channels.
pub fn get_channel_pairs_to_rotate(
    all_channels: &[Channel],
    station: &Station,
    template: &RotationTemplate,
) -> Vec<(Channel, Channel)> {
    let candidates = if let Some(inputs) = &template.input_channels {
        let names: Vec<&str> = inputs.iter().map(|r| r.name.as_str()).collect();
        find_channels_by_names(all_channels, &names)
    } else if let Some(group) = &template.input_channel_group {
        find_channels_by_group(all_channels, &group.name)
    } else {
        all_channels
            .iter()
            .filter(|c| station.raw_channel(&c.name).is_some())
            .cloned()
            .collect()
    };
    pair_channels_to_rotate(&candidates, template)
}
