use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which way the requested camera should face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    User,
    Environment,
}

/// Constraints requested from the device for one capture attempt.
///
/// Resolution and frame rate are ideals: the device may deliver something
/// close. A rejected configuration is retried once with [`CaptureConfiguration::fallback`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureConfiguration {
    /// Ideal frame width in pixels (default: 1280).
    pub ideal_width: u32,

    /// Ideal frame height in pixels (default: 720).
    pub ideal_height: u32,

    /// Ideal frame rate, or None to leave it to the device (default: 30).
    pub frame_rate: Option<f64>,

    /// Camera facing preference (default: environment, the rear camera on phones).
    pub facing_mode: Option<FacingMode>,

    /// Request an audio track alongside video (default: false).
    pub audio: bool,
}

impl CaptureConfiguration {
    /// Conservative configuration used after the primary one is rejected.
    pub fn fallback() -> Self {
        Self {
            ideal_width: 640,
            ideal_height: 480,
            frame_rate: None,
            facing_mode: None,
            audio: false,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.ideal_width == 0 || self.ideal_height == 0 {
            return Err(format!(
                "resolution must be non-zero: {}x{}",
                self.ideal_width, self.ideal_height
            ));
        }
        if let Some(rate) = self.frame_rate {
            if !(rate.is_finite() && rate > 0.0) {
                return Err(format!("frame rate must be positive: {}", rate));
            }
        }
        Ok(())
    }
}

impl Default for CaptureConfiguration {
    fn default() -> Self {
        Self {
            ideal_width: 1280,
            ideal_height: 720,
            frame_rate: Some(30.0),
            facing_mode: Some(FacingMode::Environment),
            audio: false,
        }
    }
}

/// Tuning for `PlateRecognizer`.
///
/// The bands are exclusive on both ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizerConfig {
    /// How long `initialize()` waits for the vision engine (default: 5000 ms).
    pub init_timeout_ms: u64,

    /// Smallest plausible plate contour area in px² (default: 1000).
    pub min_contour_area: f64,

    /// Largest plausible plate contour area in px² (default: 50000).
    pub max_contour_area: f64,

    /// Lower bound on bounding-box width/height (default: 2.0).
    pub min_aspect_ratio: f64,

    /// Upper bound on bounding-box width/height (default: 5.0).
    pub max_aspect_ratio: f64,

    /// Number of recent detections kept for metrics (default: 10).
    pub history_capacity: usize,

    /// Seed for the degraded-mode generator. None draws from OS entropy.
    pub fallback_seed: Option<u64>,
}

impl RecognizerConfig {
    pub fn init_timeout(&self) -> Duration {
        Duration::from_millis(self.init_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(self.min_contour_area >= 0.0 && self.min_contour_area < self.max_contour_area) {
            return Err(format!(
                "invalid contour area band: {}..{}",
                self.min_contour_area, self.max_contour_area
            ));
        }
        if !(self.min_aspect_ratio > 0.0 && self.min_aspect_ratio < self.max_aspect_ratio) {
            return Err(format!(
                "invalid aspect ratio band: {}..{}",
                self.min_aspect_ratio, self.max_aspect_ratio
            ));
        }
        if self.history_capacity == 0 {
            return Err("history capacity must be at least 1".into());
        }
        Ok(())
    }

    pub(crate) fn area_in_band(&self, area: f64) -> bool {
        area > self.min_contour_area && area < self.max_contour_area
    }

    pub(crate) fn aspect_in_band(&self, aspect_ratio: f64) -> bool {
        aspect_ratio > self.min_aspect_ratio && aspect_ratio < self.max_aspect_ratio
    }
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            init_timeout_ms: 5000,
            min_contour_area: 1000.0,
            max_contour_area: 50000.0,
            min_aspect_ratio: 2.0,
            max_aspect_ratio: 5.0,
            history_capacity: 10,
            fallback_seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_hd_rear_camera_without_audio() {
        let config = CaptureConfiguration::default();
        assert_eq!((config.ideal_width, config.ideal_height), (1280, 720));
        assert_eq!(config.frame_rate, Some(30.0));
        assert_eq!(config.facing_mode, Some(FacingMode::Environment));
        assert!(!config.audio);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn fallback_drops_hints() {
        let config = CaptureConfiguration::fallback();
        assert_eq!((config.ideal_width, config.ideal_height), (640, 480));
        assert!(config.frame_rate.is_none());
        assert!(config.facing_mode.is_none());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let zero = CaptureConfiguration {
            ideal_width: 0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());

        let negative_rate = CaptureConfiguration {
            frame_rate: Some(-1.0),
            ..Default::default()
        };
        assert!(negative_rate.validate().is_err());
    }

    #[test]
    fn recognizer_bands_are_exclusive() {
        let config = RecognizerConfig::default();
        assert!(!config.area_in_band(1000.0));
        assert!(config.area_in_band(1000.5));
        assert!(!config.area_in_band(50000.0));
        assert!(!config.aspect_in_band(2.0));
        assert!(config.aspect_in_band(3.0));
        assert!(!config.aspect_in_band(5.0));
    }

    #[test]
    fn recognizer_config_deserializes_partial_input() {
        let config: RecognizerConfig =
            serde_json::from_str(r#"{"init_timeout_ms": 250, "fallback_seed": 7}"#).unwrap();
        assert_eq!(config.init_timeout(), Duration::from_millis(250));
        assert_eq!(config.fallback_seed, Some(7));
        assert_eq!(config.history_capacity, 10);
        assert!(config.validate().is_ok());
    }
}
