use serde::{Deserialize, Serialize};

use crate::shared::rect::Rect;

/// One recognized face: where it is, who it is, and how sure the
/// classifier was (0-100).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "box")]
    pub bbox: Rect,
    pub label: String,
    pub confidence: f64,
}

/// A detection carried between recognition cycles. The tracker refreshes
/// `bbox`; `label` and `confidence` stay as the last classification left them.
pub type TrackedFace = Detection;

impl Detection {
    pub fn new(bbox: Rect, label: impl Into<String>, confidence: f64) -> Self {
        Self {
            bbox,
            label: label.into(),
            confidence,
        }
    }

    /// Same identity at a new position.
    pub fn moved_to(&self, bbox: Rect) -> Self {
        Self {
            bbox,
            label: self.label.clone(),
            confidence: self.confidence,
        }
    }
}
