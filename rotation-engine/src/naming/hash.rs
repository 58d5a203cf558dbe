//! Content hash of a derived channel
//!
//! The hash input is a JSON object with a fixed field order. Processing
//! definition and metadata are flattened into alphabetically sorted
//! single-key entries, so key order in the source never changes the hash.
//!
//! Numbers and absent values are written the way JavaScript's `JSON.stringify`
//! writes them, so names agree with ones minted by the analyst display:
//! integral floats carry no fraction and unknown optional fields are left out.
//! `response` is the exception and is always present, as `null` when unset.

use rotation_common::model::{
    Channel, ChannelBandType, ChannelDataType, ChannelInstrumentType, ChannelOrientationType,
    Location, OrientationAngles, Units,
};
use rotation_common::time::to_osd_time;
use rotation_common::Result;
use serde::{Serialize, Serializer};
use serde_json::{Map, Number, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Largest magnitude below which every integer is exactly representable as `f64`
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

fn as_integer(value: f64) -> Option<i64> {
    (value.fract() == 0.0 && value.abs() < MAX_SAFE_INTEGER).then_some(value as i64)
}

/// `f64` written without a fraction when it is integral
#[derive(Clone, Copy)]
struct JsNumber(f64);

impl Serialize for JsNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match as_integer(self.0) {
            Some(integer) => serializer.serialize_i64(integer),
            None => serializer.serialize_f64(self.0),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HashedLocation {
    latitude_degrees: JsNumber,
    longitude_degrees: JsNumber,
    depth_km: JsNumber,
    elevation_km: JsNumber,
}

impl From<&Location> for HashedLocation {
    fn from(location: &Location) -> Self {
        Self {
            latitude_degrees: JsNumber(location.latitude_degrees),
            longitude_degrees: JsNumber(location.longitude_degrees),
            depth_km: JsNumber(location.depth_km),
            elevation_km: JsNumber(location.elevation_km),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HashedOrientation {
    #[serde(skip_serializing_if = "Option::is_none")]
    horizontal_angle_deg: Option<JsNumber>,
    #[serde(skip_serializing_if = "Option::is_none")]
    vertical_angle_deg: Option<JsNumber>,
}

impl From<&OrientationAngles> for HashedOrientation {
    fn from(angles: &OrientationAngles) -> Self {
        Self {
            horizontal_angle_deg: angles.horizontal_angle_deg.map(JsNumber),
            vertical_angle_deg: angles.vertical_angle_deg.map(JsNumber),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HashedInput<'a> {
    effective_at: String,
    name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HashableChannel<'a> {
    channel_band_type: ChannelBandType,
    channel_data_type: ChannelDataType,
    channel_instrument_type: ChannelInstrumentType,
    channel_orientation_code: &'a str,
    channel_orientation_type: ChannelOrientationType,
    configured_inputs: [HashedInput<'a>; 1],
    description: &'a str,
    location: HashedLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    nominal_sample_rate_hz: Option<JsNumber>,
    #[serde(skip_serializing_if = "Option::is_none")]
    orientation_angles: Option<HashedOrientation>,
    processing_definition: Value,
    processing_metadata: Value,
    response: Option<&'a str>,
    station: &'a str,
    units: Units,
}

/// Rewrite integral floats anywhere in `value` as integers
fn integral_numbers(value: Value) -> Value {
    match value {
        Value::Number(n) if n.is_f64() => match n.as_f64().and_then(as_integer) {
            Some(integer) => Value::Number(Number::from(integer)),
            None => Value::Number(n),
        },
        Value::Array(items) => Value::Array(items.into_iter().map(integral_numbers).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, integral_numbers(v)))
                .collect(),
        ),
        other => other,
    }
}

/// `[{k1: v1}, {k2: v2}, ...]` in key order, or `{}` when there are no entries
fn sorted_entries(entries: BTreeMap<String, Value>) -> Value {
    if entries.is_empty() {
        return Value::Object(Map::new());
    }
    Value::Array(
        entries
            .into_iter()
            .map(|(key, value)| {
                let mut single = Map::new();
                single.insert(key, integral_numbers(value));
                Value::Object(single)
            })
            .collect(),
    )
}

/// The JSON string that is hashed for `channel`
pub fn channel_hash_input(channel: &Channel) -> Result<String> {
    let hashable = HashableChannel {
        channel_band_type: channel.channel_band_type,
        channel_data_type: channel.channel_data_type,
        channel_instrument_type: channel.channel_instrument_type,
        channel_orientation_code: &channel.channel_orientation_code,
        channel_orientation_type: channel.channel_orientation_type,
        configured_inputs: [HashedInput {
            effective_at: to_osd_time(channel.effective_at),
            name: &channel.name,
        }],
        description: &channel.description,
        location: HashedLocation::from(&channel.location),
        nominal_sample_rate_hz: channel.nominal_sample_rate_hz.map(JsNumber),
        orientation_angles: channel.orientation_angles.as_ref().map(HashedOrientation::from),
        processing_definition: sorted_entries(channel.processing_definition.to_entries()?),
        processing_metadata: sorted_entries(channel.processing_metadata.to_entries()),
        response: channel.response.as_ref().map(|r| r.id.as_str()),
        station: &channel.station.name,
        units: channel.units,
    };
    Ok(serde_json::to_string(&hashable)?)
}

/// Lowercase hex SHA-256 of [`channel_hash_input`]
pub fn generate_channel_hash(channel: &Channel) -> Result<String> {
    let input = channel_hash_input(channel)?;
    Ok(format!("{:x}", Sha256::digest(input.as_bytes())))
}
