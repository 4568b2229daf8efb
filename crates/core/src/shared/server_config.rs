use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::constants::{
    DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_DETECTION_INTERVAL, DEFAULT_FALLBACK_FPS,
    DEFAULT_PADDING, DEFAULT_VIDEO_BASE_URL,
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Server-wide settings shared by every stream worker.
///
/// Every field has a default, so a config file only needs the values it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base address of the video server. Streams are read from
    /// `{video_base_url}/{camera_id}.mp4` with the base used as given.
    pub video_base_url: String,
    pub detector_model: PathBuf,
    pub detector_model_url: Option<String>,
    pub classifier_model: PathBuf,
    pub classifier_model_url: Option<String>,
    /// JSON label file: array of names or `{"index": "name"}` object.
    pub labels_path: PathBuf,
    /// Minimum classifier confidence as a 0-1 fraction.
    pub confidence_threshold: f64,
    /// Minimum detector score for a face box.
    pub detector_confidence: f64,
    pub padding: i32,
    pub detection_interval_secs: f64,
    pub fallback_fps: f64,
    /// Per-subscriber queue length. `None` = unbounded.
    pub subscriber_buffer: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            video_base_url: DEFAULT_VIDEO_BASE_URL.to_string(),
            detector_model: PathBuf::from("models/face-detector.onnx"),
            detector_model_url: None,
            classifier_model: PathBuf::from("models/face-classifier.onnx"),
            classifier_model_url: None,
            labels_path: PathBuf::from("models/labels.json"),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            detector_confidence: 0.25,
            padding: DEFAULT_PADDING,
            detection_interval_secs: DEFAULT_DETECTION_INTERVAL.as_secs_f64(),
            fallback_fps: DEFAULT_FALLBACK_FPS,
            subscriber_buffer: None,
        }
    }
}

impl ServerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: ServerConfig =
            serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(ConfigError::Invalid(format!(
                "confidence_threshold must be between 0.0 and 1.0, got {}",
                self.confidence_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.detector_confidence) {
            return Err(ConfigError::Invalid(format!(
                "detector_confidence must be between 0.0 and 1.0, got {}",
                self.detector_confidence
            )));
        }
        if self.padding < 0 {
            return Err(ConfigError::Invalid(format!(
                "padding must be non-negative, got {}",
                self.padding
            )));
        }
        if !(self.detection_interval_secs.is_finite() && self.detection_interval_secs > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "detection_interval_secs must be positive, got {}",
                self.detection_interval_secs
            )));
        }
        if !(self.fallback_fps.is_finite() && self.fallback_fps > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "fallback_fps must be positive, got {}",
                self.fallback_fps
            )));
        }
        if self.subscriber_buffer == Some(0) {
            return Err(ConfigError::Invalid(
                "subscriber_buffer must be at least 1 when set".to_string(),
            ));
        }
        if self.video_base_url.is_empty() {
            return Err(ConfigError::Invalid("video_base_url is empty".to_string()));
        }
        Ok(())
    }

    pub fn detection_interval(&self) -> Duration {
        Duration::from_secs_f64(self.detection_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.detection_interval(), Duration::from_secs(10));
        assert_eq!(config.padding, 3);
        assert_eq!(config.video_base_url, "http://localhost:5000/api/video");
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("camwatch.json");
        fs::write(
            &path,
            r#"{ "video_base_url": "http://cams:8080/video", "padding": 6 }"#,
        )
        .unwrap();

        let config = ServerConfig::load(&path).unwrap();
        assert_eq!(config.video_base_url, "http://cams:8080/video");
        assert_eq!(config.padding, 6);
        assert_eq!(config.confidence_threshold, 0.90);
    }

    #[test]
    fn test_load_missing_file_is_read_error() {
        let err = ServerConfig::load(Path::new("/nonexistent/camwatch.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_load_malformed_file_is_parse_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            ServerConfig::load(&path).unwrap_err(),
            ConfigError::Parse { .. }
        ));
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.json");
        fs::write(&path, r#"{ "confidence_threshold": 90 }"#).unwrap();
        assert!(matches!(
            ServerConfig::load(&path).unwrap_err(),
            ConfigError::Invalid(_)
        ));
    }

    #[rstest]
    #[case::threshold_above_one(ServerConfig { confidence_threshold: 1.5, ..Default::default() })]
    #[case::negative_padding(ServerConfig { padding: -1, ..Default::default() })]
    #[case::zero_interval(ServerConfig { detection_interval_secs: 0.0, ..Default::default() })]
    #[case::zero_fallback_fps(ServerConfig { fallback_fps: 0.0, ..Default::default() })]
    #[case::zero_buffer(ServerConfig { subscriber_buffer: Some(0), ..Default::default() })]
    #[case::empty_base(ServerConfig { video_base_url: String::new(), ..Default::default() })]
    fn test_validate_rejects(#[case] config: ServerConfig) {
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_round_trips_through_json() {
        let config = ServerConfig {
            subscriber_buffer: Some(16),
            ..Default::default()
        };
        let json = serde_json::to_string_pretty(&config).unwrap();
        let back: ServerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
