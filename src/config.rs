// Loop rate, channel assignments, safety defaults

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// Control loop frequency
pub const LOOP_HZ: u64 = 50;

// Highest commanded motor magnitude at which a gear shift is still allowed.
// Above this the gearbox is assumed torque-loaded and the shift is deferred.
pub const DEFAULT_SHIFT_LOAD_THRESHOLD: f64 = 0.12;

// Absolute error tolerance for the on-target check
pub const DEFAULT_PID_TOLERANCE: f64 = 1.0;

/// Error types for loading a gearbox configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Channel assignments and tuning for one gearbox.
///
/// Every channel is optional: the gearbox only allocates the subsystems whose
/// channels are present. The feedback path (encoder + PID) requires both
/// `encoder_a` and `encoder_b`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GearBoxConfig {
    pub shifter_channel: Option<u32>,
    pub encoder_a: Option<u32>,
    pub encoder_b: Option<u32>,
    pub motor1: Option<u32>,
    pub motor2: Option<u32>,
    pub motor3: Option<u32>,

    /// Shift interlock threshold (normalized motor output)
    pub shift_load_threshold: f64,

    /// Absolute tolerance for the controller's on-target check
    pub pid_tolerance: f64,
}

impl Default for GearBoxConfig {
    fn default() -> Self {
        Self {
            shifter_channel: None,
            encoder_a: None,
            encoder_b: None,
            motor1: None,
            motor2: None,
            motor3: None,
            shift_load_threshold: DEFAULT_SHIFT_LOAD_THRESHOLD,
            pid_tolerance: DEFAULT_PID_TOLERANCE,
        }
    }
}

impl GearBoxConfig {
    /// Load a configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Assigned motor channels, in declaration order
    pub fn motor_channels(&self) -> impl Iterator<Item = u32> + '_ {
        [self.motor1, self.motor2, self.motor3].into_iter().flatten()
    }

    /// True if both encoder channels are assigned
    pub fn has_feedback(&self) -> bool {
        self.encoder_a.is_some() && self.encoder_b.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_has_no_channels() {
        let config = GearBoxConfig::default();
        assert!(config.shifter_channel.is_none());
        assert!(!config.has_feedback());
        assert_eq!(config.motor_channels().count(), 0);
        assert_eq!(config.shift_load_threshold, DEFAULT_SHIFT_LOAD_THRESHOLD);
        assert_eq!(config.pid_tolerance, DEFAULT_PID_TOLERANCE);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: GearBoxConfig =
            serde_json::from_str(r#"{"shifter_channel": 0, "motor1": 4}"#).unwrap();
        assert_eq!(config.shifter_channel, Some(0));
        assert_eq!(config.motor_channels().collect::<Vec<_>>(), vec![4]);
        assert!(!config.has_feedback());
        assert_eq!(config.shift_load_threshold, DEFAULT_SHIFT_LOAD_THRESHOLD);
    }

    #[test]
    fn motor_channels_preserve_order() {
        let config: GearBoxConfig =
            serde_json::from_str(r#"{"motor1": 7, "motor2": 8, "motor3": 9}"#).unwrap();
        assert_eq!(config.motor_channels().collect::<Vec<_>>(), vec![7, 8, 9]);
    }

    #[test]
    fn full_feedback_path_detected() {
        let config: GearBoxConfig =
            serde_json::from_str(r#"{"encoder_a": 2, "encoder_b": 3, "pid_tolerance": 0.5}"#)
                .unwrap();
        assert!(config.has_feedback());
        assert_eq!(config.pid_tolerance, 0.5);
    }

    #[test]
    fn one_encoder_channel_is_not_feedback() {
        let config: GearBoxConfig = serde_json::from_str(r#"{"encoder_a": 2}"#).unwrap();
        assert!(!config.has_feedback());
    }
}
