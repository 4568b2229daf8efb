use std::time::Duration;

/// Side length of the square grayscale crop the face classifier consumes.
pub const CLASSIFIER_INPUT_SIZE: u32 = 112;

/// Minimum classifier confidence, as a fraction of 100.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.90;

/// Pixels added around each detector box before cropping.
pub const DEFAULT_PADDING: i32 = 3;

/// Time between full detect + classify cycles.
pub const DEFAULT_DETECTION_INTERVAL: Duration = Duration::from_secs(10);

/// Pacing rate used when a source reports no usable frame rate.
pub const DEFAULT_FALLBACK_FPS: f64 = 25.0;

pub const DEFAULT_VIDEO_BASE_URL: &str = "http://localhost:5000/api/video";

/// Identity reported when the classifier fails on a crop.
pub const UNKNOWN_LABEL: &str = "unknown";

/// Builds the source URL for a camera: `{base}/{camera_id}.mp4`.
pub fn video_url(base: &str, camera_id: &str) -> String {
    format!("{base}/{camera_id}.mp4")
}
