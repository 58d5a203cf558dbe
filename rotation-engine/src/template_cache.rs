//! Rotation templates by station and phase
//!
//! Templates are cached after the first fetch. When the source has nothing and a
//! default template is configured, the default is used instead.

use crate::collaborators::RotationTemplateSource;
use rotation_common::config::DefaultTemplateConfig;
use rotation_common::model::{
    RotationDescription, RotationTemplate, SamplingType, Station,
};
use rotation_common::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error};

pub struct TemplateCache {
    source: Arc<dyn RotationTemplateSource>,
    fallback: Option<DefaultTemplateConfig>,
    /// station name -> phase -> template
    templates: RwLock<HashMap<String, HashMap<String, RotationTemplate>>>,
}

impl TemplateCache {
    pub fn new(
        source: Arc<dyn RotationTemplateSource>,
        fallback: Option<DefaultTemplateConfig>,
    ) -> Self {
        Self {
            source,
            fallback,
            templates: RwLock::new(HashMap::new()),
        }
    }

    /// Cached template, without fetching
    pub async fn get(&self, station_name: &str, phase: &str) -> Option<RotationTemplate> {
        self.templates
            .read()
            .await
            .get(station_name)
            .and_then(|by_phase| by_phase.get(phase))
            .cloned()
    }

    pub async fn insert(&self, template: RotationTemplate) {
        self.templates
            .write()
            .await
            .entry(template.station.name.clone())
            .or_default()
            .insert(template.phase().to_string(), template);
    }

    /// Cached template, or fetch it
    ///
    /// A failed fetch is logged and treated like a missing template.
    pub async fn get_or_fetch(&self, station: &Station, phase: &str) -> Result<RotationTemplate> {
        if let Some(template) = self.get(&station.name, phase).await {
            return Ok(template);
        }

        let fetched = match self
            .source
            .fetch_rotation_template(&station.version_reference(), phase)
            .await
        {
            Ok(template) => template,
            Err(e) => {
                error!(station = %station.name, phase, error = %e, "Rotation template fetch failed");
                None
            }
        };

        let template = fetched
            .or_else(|| self.default_template(station, phase))
            .ok_or_else(|| {
                Error::DataUnavailable(format!(
                    "No rotation template available to rotate {} for phase {}",
                    station.name, phase
                ))
            })?;
        debug!(station = %station.name, phase, "Caching rotation template");
        self.insert(template.clone()).await;
        Ok(template)
    }

    fn default_template(&self, station: &Station, phase: &str) -> Option<RotationTemplate> {
        let defaults = self.fallback.as_ref()?;
        Some(RotationTemplate {
            station: station.version_reference(),
            duration: defaults.duration_secs,
            lead_duration: defaults.lead_duration_secs,
            location_tolerance_km: defaults.location_tolerance_km,
            orientation_angle_tolerance_deg: defaults.orientation_angle_tolerance_deg,
            sample_rate_tolerance_hz: defaults.sample_rate_tolerance_hz,
            rotation_description: RotationDescription {
                phase_type: phase.to_string(),
                sampling_type: SamplingType::Interpolated,
                two_dimensional: true,
            },
            input_channels: None,
            input_channel_group: None,
        })
    }
}
