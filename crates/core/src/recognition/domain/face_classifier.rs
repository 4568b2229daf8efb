use thiserror::Error;

use super::face_crop::FaceCrop;

/// Predicted identity for one face crop. `confidence` is on a 0-100 scale.
#[derive(Clone, Debug, PartialEq)]
pub struct Classification {
    pub label: String,
    pub confidence: f64,
}

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("classifier produced no scores")]
    EmptyOutput,
    #[error("predicted class {0} has no label")]
    UnknownClass(usize),
}

/// Domain interface for face identification.
///
/// Shared across stream workers, so implementations must be reentrant.
/// Failure is an ordinary result: callers decide what a failed crop means.
pub trait FaceClassifier: Send + Sync {
    fn classify(&self, crop: &FaceCrop) -> Result<Classification, ClassifierError>;
}
