use crate::shared::frame::Frame;
use crate::shared::rect::Rect;

/// Error type for detector backends; crosses worker threads.
pub type DetectError = Box<dyn std::error::Error + Send + Sync>;

/// Domain interface for face detection.
///
/// One detector instance is shared by every stream worker, so
/// implementations must tolerate concurrent calls (hence `&self` and
/// `Sync`). Returns raw boxes only; no identities.
pub trait FaceDetector: Send + Sync {
    fn detect(&self, frame: &Frame) -> Result<Vec<Rect>, DetectError>;
}
