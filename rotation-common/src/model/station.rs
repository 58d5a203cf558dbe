//! Stations and their raw channels

use super::channel::{Channel, ChannelDataType};
use super::{Location, VersionReference};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StationType {
    #[serde(rename = "SEISMIC_1_COMPONENT")]
    Seismic1Component,
    #[serde(rename = "SEISMIC_3_COMPONENT")]
    Seismic3Component,
    SeismicArray,
    Hydroacoustic,
    HydroacousticArray,
    Infrasound,
    InfrasoundArray,
    Weather,
    Unknown,
}

impl StationType {
    /// Data type a temporary channel for this station carries
    pub fn data_type(self) -> ChannelDataType {
        match self {
            StationType::Seismic1Component
            | StationType::Seismic3Component
            | StationType::SeismicArray => ChannelDataType::Seismic,
            StationType::Hydroacoustic | StationType::HydroacousticArray => {
                ChannelDataType::Hydroacoustic
            }
            StationType::Infrasound | StationType::InfrasoundArray => ChannelDataType::Infrasound,
            StationType::Weather => ChannelDataType::Weather,
            StationType::Unknown => ChannelDataType::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub name: String,
    #[serde(default)]
    pub effective_at: Option<f64>,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub station_type: StationType,
    pub location: Location,
    #[serde(default)]
    pub all_raw_channels: Vec<Channel>,
}

impl Station {
    pub fn version_reference(&self) -> VersionReference {
        VersionReference::new(self.name.clone(), self.effective_at)
    }

    pub fn raw_channel(&self, name: &str) -> Option<&Channel> {
        self.all_raw_channels.iter().find(|c| c.name == name)
    }
}
