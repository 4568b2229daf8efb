use std::sync::Arc;

use crate::detection::domain::detection::TrackedFace;
use crate::detection::domain::face_detector::{DetectError, FaceDetector};
use crate::shared::frame::Frame;
use crate::shared::rect::{Rect, TRACKING_IOU_THRESHOLD};

/// Cheap between-cycle tracker: re-runs the detector only, then moves each
/// tracked identity onto the fresh box it overlaps most.
///
/// Classification is never repeated here. A tracked face whose best overlap
/// does not exceed the threshold is carried forward unchanged (it is never
/// expired), while a frame with no boxes at all clears the tracked set.
pub struct FaceTracker {
    detector: Arc<dyn FaceDetector>,
    iou_threshold: f64,
}

impl FaceTracker {
    pub fn new(detector: Arc<dyn FaceDetector>) -> Self {
        Self {
            detector,
            iou_threshold: TRACKING_IOU_THRESHOLD,
        }
    }

    pub fn with_iou_threshold(mut self, iou_threshold: f64) -> Self {
        self.iou_threshold = iou_threshold;
        self
    }

    pub fn track(
        &self,
        frame: &Frame,
        tracked: &[TrackedFace],
    ) -> Result<Vec<TrackedFace>, DetectError> {
        let boxes = self.detector.detect(frame)?;
        Ok(reassign(tracked, &boxes, self.iou_threshold))
    }
}

/// Matches tracked faces against this frame's raw boxes.
///
/// Several tracked faces may land on the same box; boxes are not consumed.
/// Ties on overlap go to the earliest box in `boxes`.
pub fn reassign(tracked: &[TrackedFace], boxes: &[Rect], iou_threshold: f64) -> Vec<TrackedFace> {
    if boxes.is_empty() {
        return Vec::new();
    }

    tracked
        .iter()
        .map(|face| match face.bbox.best_match(boxes) {
            Some((idx, ratio)) if ratio > iou_threshold => face.moved_to(boxes[idx]),
            _ => face.clone(),
        })
        .collect()
}
