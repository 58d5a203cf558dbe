//! Channel definitions

use super::metadata::{ProcessingDefinition, ProcessingMetadata};
use super::{Location, OrientationAngles, VersionReference};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelBandType {
    Unknown,
    FrequencyBandA,
    FrequencyBandB,
    FrequencyBandC,
    FrequencyBandD,
    FrequencyBandE,
    FrequencyBandF,
    FrequencyBandG,
    FrequencyBandH,
    ShortPeriod,
    MidPeriod,
    LongPeriod,
    Broadband,
    HighBroadband,
    VeryLongPeriod,
    UltraLongPeriod,
    ExtremelyLongPeriod,
    Administrative,
    Opaque,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelInstrumentType {
    Unknown,
    Tiltmeter,
    CreepMeter,
    Calibration,
    Pressure,
    ElectronicTest,
    Gravimeter,
    HighGainSeismometer,
    Hydrophone,
    LowGainSeismometer,
    LinearStrain,
    MassPositionSeismometer,
    Magnetometer,
    Accelerometer,
    Humidity,
    Rotational,
    Synthesized,
    Temperature,
    Water,
    Wind,
    SyntheticBeam,
    DerivedOrGenerated,
    NonSpecificInstrument,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelDataType {
    Seismic,
    Hydroacoustic,
    Infrasound,
    Weather,
    DiagnosticSoh,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Units {
    Nanometers,
    NanometersPerSecond,
    NanometersPerSecondPerSecond,
    NanometersPerCount,
    Pascals,
    Micropascals,
    Counts,
    Volts,
    Degrees,
    Unitless,
}

/// Orientation of a channel, one per SEED orientation letter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelOrientationType {
    Unknown,
    Vertical,
    NorthSouth,
    EastWest,
    TriaxialA,
    TriaxialB,
    TriaxialC,
    Transverse,
    Radial,
    #[serde(rename = "ORTHOGONAL_1")]
    Orthogonal1,
    #[serde(rename = "ORTHOGONAL_2")]
    Orthogonal2,
    #[serde(rename = "ORTHOGONAL_3")]
    Orthogonal3,
    OptionalU,
    OptionalV,
    OptionalW,
}

impl ChannelOrientationType {
    /// Orientation letter used in channel codes; `Unknown` has none
    pub fn code(self) -> Option<char> {
        use ChannelOrientationType::*;
        match self {
            Unknown => None,
            Vertical => Some('Z'),
            NorthSouth => Some('N'),
            EastWest => Some('E'),
            TriaxialA => Some('A'),
            TriaxialB => Some('B'),
            TriaxialC => Some('C'),
            Transverse => Some('T'),
            Radial => Some('R'),
            Orthogonal1 => Some('1'),
            Orthogonal2 => Some('2'),
            Orthogonal3 => Some('3'),
            OptionalU => Some('U'),
            OptionalV => Some('V'),
            OptionalW => Some('W'),
        }
    }

    /// Orientations that can take part in a horizontal 2D rotation
    pub fn is_horizontal_rotatable(self) -> bool {
        matches!(
            self,
            ChannelOrientationType::NorthSouth
                | ChannelOrientationType::EastWest
                | ChannelOrientationType::Orthogonal1
                | ChannelOrientationType::Orthogonal2
        )
    }
}

/// Instrument response reference; only the id takes part in hashing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseReference {
    pub id: String,
}

/// A raw or derived channel
///
/// For derived channels the `name` ends in a content hash of every other field, so
/// equal names imply equal content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub name: String,
    #[serde(default)]
    pub effective_at: Option<f64>,
    #[serde(default)]
    pub description: String,
    pub station: VersionReference,
    pub channel_data_type: ChannelDataType,
    pub channel_band_type: ChannelBandType,
    pub channel_instrument_type: ChannelInstrumentType,
    pub channel_orientation_code: String,
    pub channel_orientation_type: ChannelOrientationType,
    pub units: Units,
    #[serde(default)]
    pub nominal_sample_rate_hz: Option<f64>,
    pub location: Location,
    #[serde(default)]
    pub orientation_angles: Option<OrientationAngles>,
    #[serde(default)]
    pub configured_inputs: Vec<VersionReference>,
    #[serde(default)]
    pub processing_definition: ProcessingDefinition,
    #[serde(default)]
    pub processing_metadata: ProcessingMetadata,
    #[serde(default)]
    pub response: Option<ResponseReference>,
}

impl Channel {
    /// Version reference (`name` + `effectiveAt`) to this channel
    pub fn version_reference(&self) -> VersionReference {
        VersionReference::new(self.name.clone(), self.effective_at)
    }

    pub fn horizontal_angle_deg(&self) -> Option<f64> {
        self.orientation_angles.and_then(|a| a.horizontal_angle_deg)
    }

    pub fn vertical_angle_deg(&self) -> Option<f64> {
        self.orientation_angles.and_then(|a| a.vertical_angle_deg)
    }

    /// Receiver-to-source azimuth a derived channel was steered to, if any
    pub fn steering_back_azimuth(&self) -> Option<f64> {
        self.processing_metadata.steering_back_azimuth()
    }
}
