use serde::{Deserialize, Serialize};

use crate::detection::domain::detection::{Detection, TrackedFace};

pub const CONNECTED_MESSAGE: &str = "Connected to face recognition server";
pub const SOURCE_OPEN_FAILED_MESSAGE: &str = "Could not open video stream";

/// Push message delivered to every subscriber.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Notification {
    /// Acknowledges a new subscriber.
    Connected { message: String },
    /// One processed frame of one camera.
    Detections {
        camera_id: String,
        detections: Vec<Detection>,
        total_detected: usize,
        frame_count: u64,
    },
    /// A worker's video source failed to open. Nothing follows for that camera.
    Error { camera_id: String, message: String },
}

impl Notification {
    pub fn connected() -> Self {
        Self::Connected {
            message: CONNECTED_MESSAGE.to_string(),
        }
    }

    pub fn detections(camera_id: &str, faces: &[TrackedFace], frame_count: u64) -> Self {
        Self::Detections {
            camera_id: camera_id.to_string(),
            detections: faces.to_vec(),
            total_detected: faces.len(),
            frame_count,
        }
    }

    pub fn source_unavailable(camera_id: &str) -> Self {
        Self::Error {
            camera_id: camera_id.to_string(),
            message: SOURCE_OPEN_FAILED_MESSAGE.to_string(),
        }
    }

    /// The camera this notification is about, if any.
    pub fn camera_id(&self) -> Option<&str> {
        match self {
            Self::Connected { .. } => None,
            Self::Detections { camera_id, .. } | Self::Error { camera_id, .. } => Some(camera_id),
        }
    }
}

/// Where workers push notifications. Must accept pushes from many worker
/// threads at once and never block on a slow subscriber.
pub trait NotificationSink: Send + Sync {
    fn publish(&self, notification: Notification);
}
