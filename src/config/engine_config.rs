use crate::error::{Result, SonoError};
use std::time::Duration;

/// How targets are chosen from the fetched catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SelectionMode {
    /// Every entry flagged `selected` becomes a target.
    #[default]
    Selected,
    /// `count` entries are drawn at random and placed at random directions,
    /// each at least `min_angle_between_deg` away from the others.
    Random {
        count: usize,
        min_angle_between_deg: f32,
    },
}

/// Engine context shared by every component at construction.
#[derive(Debug, Clone)]
pub struct SonoConfig {
    /// Distance below which the nearest target becomes the focus candidate
    pub primary_angle_deg: f32,
    /// Distance below which a target is audible at all
    pub secondary_angle_deg: f32,
    /// Total dwell time over which the metadata text is revealed
    pub time_to_focus: Duration,
    /// Delay between entering focusing and revealing the first character
    pub pre_focus_delay: Duration,
    /// Number of playback channels in the pool
    pub max_concurrent_resources: usize,
    /// Per-axis change that counts as activity
    pub idle_sensor_epsilon: f32,
    /// Inactivity span after which the experience pauses
    pub idle_timeout: Duration,
    pub selection_mode: SelectionMode,
    /// Lowest ambience gain while near a target
    pub bed_floor: f32,
    /// Seed for reveal order and random placement (None = entropy)
    pub reveal_seed: Option<u64>,
}

impl Default for SonoConfig {
    fn default() -> Self {
        Self {
            primary_angle_deg: 10.0,
            secondary_angle_deg: 30.0,
            time_to_focus: Duration::from_secs(5),
            pre_focus_delay: Duration::from_secs(1),
            max_concurrent_resources: 4,
            idle_sensor_epsilon: 0.01,
            idle_timeout: Duration::from_secs(30),
            selection_mode: SelectionMode::default(),
            bed_floor: 0.2,
            reveal_seed: None,
        }
    }
}

impl SonoConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn primary_angle(mut self, degrees: f32) -> Self {
        self.primary_angle_deg = degrees;
        self
    }

    pub fn secondary_angle(mut self, degrees: f32) -> Self {
        self.secondary_angle_deg = degrees;
        self
    }

    pub fn time_to_focus(mut self, duration: Duration) -> Self {
        self.time_to_focus = duration;
        self
    }

    pub fn pre_focus_delay(mut self, duration: Duration) -> Self {
        self.pre_focus_delay = duration;
        self
    }

    pub fn max_concurrent_resources(mut self, max: usize) -> Self {
        self.max_concurrent_resources = max;
        self
    }

    pub fn idle_sensor_epsilon(mut self, epsilon: f32) -> Self {
        self.idle_sensor_epsilon = epsilon;
        self
    }

    pub fn idle_timeout(mut self, duration: Duration) -> Self {
        self.idle_timeout = duration;
        self
    }

    pub fn selection_mode(mut self, mode: SelectionMode) -> Self {
        self.selection_mode = mode;
        self
    }

    pub fn bed_floor(mut self, floor: f32) -> Self {
        self.bed_floor = floor;
        self
    }

    pub fn reveal_seed(mut self, seed: u64) -> Self {
        self.reveal_seed = Some(seed);
        self
    }

    /// Checks the invariants the tick pipeline relies on.
    pub fn validate(&self) -> Result<()> {
        let angles = [self.primary_angle_deg, self.secondary_angle_deg];
        if angles.iter().any(|a| !a.is_finite() || *a <= 0.0) {
            return Err(SonoError::Configuration(format!(
                "angles must be positive (primary {}, secondary {})",
                self.primary_angle_deg, self.secondary_angle_deg
            )));
        }
        if self.secondary_angle_deg > 180.0 {
            return Err(SonoError::Configuration(format!(
                "secondary angle {} exceeds 180 degrees",
                self.secondary_angle_deg
            )));
        }
        if self.primary_angle_deg > self.secondary_angle_deg {
            return Err(SonoError::Configuration(format!(
                "primary angle {} exceeds secondary angle {}",
                self.primary_angle_deg, self.secondary_angle_deg
            )));
        }
        if self.max_concurrent_resources == 0 {
            return Err(SonoError::Configuration(
                "max_concurrent_resources must be at least 1".into(),
            ));
        }
        if !self.idle_sensor_epsilon.is_finite() || self.idle_sensor_epsilon < 0.0 {
            return Err(SonoError::Configuration(format!(
                "idle sensor epsilon {} must be non-negative",
                self.idle_sensor_epsilon
            )));
        }
        if self.idle_timeout.is_zero() {
            return Err(SonoError::Configuration("idle timeout must be non-zero".into()));
        }
        if !(0.0..=1.0).contains(&self.bed_floor) {
            return Err(SonoError::Configuration(format!(
                "bed floor {} must lie in [0, 1]",
                self.bed_floor
            )));
        }
        if let SelectionMode::Random {
            min_angle_between_deg,
            ..
        } = self.selection_mode
        {
            if !(0.0..180.0).contains(&min_angle_between_deg) {
                return Err(SonoError::Configuration(format!(
                    "minimum angle between sounds {} must lie in [0, 180)",
                    min_angle_between_deg
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = SonoConfig::default();
        config.validate().unwrap();
        assert_eq!(config.selection_mode, SelectionMode::Selected);
        assert_eq!(SelectionMode::default(), SelectionMode::Selected);
    }

    #[test]
    fn test_builder_sets_fields() {
        let config = SonoConfig::new()
            .primary_angle(5.0)
            .secondary_angle(40.0)
            .max_concurrent_resources(2)
            .reveal_seed(9);

        assert_eq!(config.primary_angle_deg, 5.0);
        assert_eq!(config.secondary_angle_deg, 40.0);
        assert_eq!(config.max_concurrent_resources, 2);
        assert_eq!(config.reveal_seed, Some(9));
    }

    #[test]
    fn test_rejects_inverted_angles() {
        let config = SonoConfig::new().primary_angle(40.0).secondary_angle(30.0);
        assert!(matches!(config.validate(), Err(SonoError::Configuration(_))));
    }

    #[test]
    fn test_rejects_empty_pool() {
        let config = SonoConfig::new().max_concurrent_resources(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_idle_timeout() {
        let config = SonoConfig::new().idle_timeout(Duration::ZERO);
        assert!(config.validate().is_err());
    }
}
