//! BMS configuration

use crate::BmsError;
use serde::{Deserialize, Serialize};

/// BMS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BmsConfig {
    /// Both eyes below this open-probability count as closed
    pub eyes_closed_threshold: f32,

    /// Both eyes above this open-probability count as open
    pub eyes_open_threshold: f32,

    /// Eyes closed continuously this long before sleep is declared (milliseconds)
    pub sleep_threshold_ms: u64,

    /// Eyes open continuously this long before wake is declared (milliseconds)
    pub wake_threshold_ms: u64,

    /// An expression label must hold this long to become stable (milliseconds)
    pub expression_stable_ms: u64,

    /// Save one photo per distinct stable expression per day
    pub auto_capture: bool,

    /// Face detection confidence threshold
    pub face_confidence: f32,

    /// Expression model path (ONNX); a static classifier is used when unset
    pub expression_model_path: Option<String>,
}

impl Default for BmsConfig {
    fn default() -> Self {
        Self {
            eyes_closed_threshold: 0.3,
            eyes_open_threshold: 0.7,
            sleep_threshold_ms: 3000,
            wake_threshold_ms: 3000,
            expression_stable_ms: 1000,
            auto_capture: true,
            face_confidence: 0.7,
            expression_model_path: None,
        }
    }
}

impl BmsConfig {
    /// Reject thresholds that would let the eye state chatter
    pub fn validate(&self) -> Result<(), BmsError> {
        let in_range = |p: f32| (0.0..=1.0).contains(&p);
        if !in_range(self.eyes_closed_threshold) || !in_range(self.eyes_open_threshold) {
            return Err(BmsError::Config(
                "eye thresholds must lie within [0, 1]".into(),
            ));
        }
        if self.eyes_closed_threshold >= self.eyes_open_threshold {
            return Err(BmsError::Config(format!(
                "closed threshold {} must be below open threshold {}",
                self.eyes_closed_threshold, self.eyes_open_threshold
            )));
        }
        if self.sleep_threshold_ms == 0 || self.wake_threshold_ms == 0 {
            return Err(BmsError::Config("sleep/wake thresholds must be non-zero".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_validates() {
        assert!(BmsConfig::default().validate().is_ok());
    }

    #[test]
    fn test_equal_thresholds_rejected() {
        let config = BmsConfig {
            eyes_closed_threshold: 0.5,
            eyes_open_threshold: 0.5,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(BmsError::Config(_))));
    }

    #[test]
    fn test_out_of_range_rejected() {
        let config = BmsConfig {
            eyes_open_threshold: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
