use super::{SelectionMode, SonoConfig};
use crate::error::{Result, SonoError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Body of the configuration endpoint. A null `configuration` means the server
/// has nothing to serve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigurationResponse {
    pub configuration: Option<WireConfiguration>,
}

/// Configuration record as served over the network.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireConfiguration {
    pub primary_angle: f32,
    pub secondary_angle: f32,
    /// Seconds
    pub time_to_focus: f32,
    #[serde(default)]
    pub min_angle_between_sounds: f32,
    pub max_media_players: usize,
    pub max_idle_sensor_difference: f32,
    /// Seconds
    pub max_idle_seconds: f32,
    #[serde(default)]
    pub select_randomly: bool,
    #[serde(default)]
    pub num_randomly_selected: usize,
}

impl WireConfiguration {
    /// Converts into a validated engine context, keeping local-only settings
    /// (reveal seed, bed floor, pre-focus delay) from `base`.
    pub fn into_config(self, base: SonoConfig) -> Result<SonoConfig> {
        let selection_mode = if self.select_randomly {
            SelectionMode::Random {
                count: self.num_randomly_selected,
                min_angle_between_deg: self.min_angle_between_sounds,
            }
        } else {
            SelectionMode::Selected
        };

        let config = SonoConfig {
            primary_angle_deg: self.primary_angle,
            secondary_angle_deg: self.secondary_angle,
            time_to_focus: seconds("timeToFocus", self.time_to_focus)?,
            max_concurrent_resources: self.max_media_players,
            idle_sensor_epsilon: self.max_idle_sensor_difference,
            idle_timeout: seconds("maxIdleSeconds", self.max_idle_seconds)?,
            selection_mode,
            ..base
        };
        config.validate()?;
        Ok(config)
    }
}

fn seconds(field: &str, value: f32) -> Result<Duration> {
    Duration::try_from_secs_f32(value)
        .map_err(|e| SonoError::Configuration(format!("{} = {}: {}", field, value, e)))
}
