/// Properties reported by a video source when it is opened.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    /// Nominal frame rate. Zero when the container does not report one.
    pub fps: f64,
    pub codec: String,
    pub url: String,
}

impl VideoMetadata {
    /// Delay between frames at the nominal rate, or at `fallback_fps` when
    /// the reported rate is missing or unusable.
    pub fn frame_period(&self, fallback_fps: f64) -> std::time::Duration {
        let fps = if self.fps.is_finite() && self.fps > 0.0 {
            self.fps
        } else {
            fallback_fps
        };
        std::time::Duration::from_secs_f64(1.0 / fps)
    }
}
