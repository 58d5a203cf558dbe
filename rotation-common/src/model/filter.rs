//! Filter definitions consumed by post-rotation filtering

use serde::{Deserialize, Serialize};

/// How a filter definition was used to produce a measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterDefinitionUsage {
    Detection,
    Fk,
    Onset,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterDescription {
    pub filter_type: String,
    pub causal: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass_band_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_frequency_hz: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_frequency_hz: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zero_phase: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    pub filter_description: FilterDescription,
}

impl FilterDefinition {
    /// Filter name as it appears inside a derived channel name
    ///
    /// `/` separates name components, so it is replaced with `|`.
    pub fn name_for_channel(&self) -> String {
        self.name.replacen('/', "|", 1)
    }
}
