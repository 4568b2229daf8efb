use std::sync::Arc;

use crate::detection::domain::detection::Detection;
use crate::detection::domain::face_detector::{DetectError, FaceDetector};
use crate::recognition::domain::face_classifier::FaceClassifier;
use crate::recognition::domain::face_crop::FaceCrop;
use crate::shared::constants::{DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_PADDING, UNKNOWN_LABEL};
use crate::shared::frame::Frame;

/// Full recognition pass over one frame: detect, crop, classify, filter.
///
/// Emitted boxes are the detector's raw boxes; padding only widens the crop
/// handed to the classifier.
pub struct FrameAnalyzer {
    detector: Arc<dyn FaceDetector>,
    classifier: Arc<dyn FaceClassifier>,
    confidence_threshold: f64,
    padding: i32,
}

impl FrameAnalyzer {
    pub fn new(detector: Arc<dyn FaceDetector>, classifier: Arc<dyn FaceClassifier>) -> Self {
        Self {
            detector,
            classifier,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            padding: DEFAULT_PADDING,
        }
    }

    /// `threshold` is a 0-1 fraction, compared against confidence / 100.
    pub fn with_confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn with_padding(mut self, padding: i32) -> Self {
        self.padding = padding;
        self
    }

    pub fn detector(&self) -> &Arc<dyn FaceDetector> {
        &self.detector
    }

    pub fn analyze(&self, frame: &Frame) -> Result<Vec<Detection>, DetectError> {
        let boxes = self.detector.detect(frame)?;
        let min_confidence = self.confidence_threshold * 100.0;

        let mut detections = Vec::with_capacity(boxes.len());
        for bbox in boxes {
            let Some(crop) = FaceCrop::extract(frame, &bbox.padded(self.padding)) else {
                continue;
            };
            match self.classifier.classify(&crop) {
                Ok(c) if c.confidence >= min_confidence => {
                    detections.push(Detection::new(bbox, c.label, c.confidence));
                }
                Ok(_) => {}
                Err(e) => {
                    log::warn!("Classification failed for {bbox:?}, reporting as unknown: {e}");
                    detections.push(Detection::new(bbox, UNKNOWN_LABEL, 0.0));
                }
            }
        }
        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognition::domain::face_classifier::{Classification, ClassifierError};
    use crate::shared::rect::Rect;
    use rstest::rstest;
    use std::sync::Mutex;

    struct FixedDetector(Vec<Rect>);

    impl FaceDetector for FixedDetector {
        fn detect(&self, _frame: &Frame) -> Result<Vec<Rect>, DetectError> {
            Ok(self.0.clone())
        }
    }

    struct FailingDetector;

    impl FaceDetector for FailingDetector {
        fn detect(&self, _frame: &Frame) -> Result<Vec<Rect>, DetectError> {
            Err("model crashed".into())
        }
    }

    /// Replays scripted results in call order.
    struct ScriptedClassifier {
        results: Mutex<Vec<Result<Classification, ClassifierError>>>,
    }

    impl ScriptedClassifier {
        fn new(results: Vec<Result<Classification, ClassifierError>>) -> Self {
            Self {
                results: Mutex::new(results),
            }
        }

        fn calls_left(&self) -> usize {
            self.results.lock().unwrap().len()
        }
    }

    impl FaceClassifier for ScriptedClassifier {
        fn classify(&self, crop: &FaceCrop) -> Result<Classification, ClassifierError> {
            assert_eq!(crop.pixels().len(), 112 * 112);
            self.results.lock().unwrap().remove(0)
        }
    }

    fn ok(label: &str, confidence: f64) -> Result<Classification, ClassifierError> {
        Ok(Classification {
            label: label.to_string(),
            confidence,
        })
    }

    fn frame() -> Frame {
        Frame::new(vec![90u8; 200 * 100 * 3], 200, 100, 3, 0)
    }

    fn analyzer(boxes: Vec<Rect>, classifier: Arc<ScriptedClassifier>) -> FrameAnalyzer {
        FrameAnalyzer::new(Arc::new(FixedDetector(boxes)), classifier)
            .with_confidence_threshold(0.90)
            .with_padding(3)
    }

    #[rstest]
    #[case(90.0, true)]
    #[case(89.9, false)]
    #[case(100.0, true)]
    #[case(0.0, false)]
    fn test_confidence_threshold_boundary(#[case] confidence: f64, #[case] included: bool) {
        let classifier = Arc::new(ScriptedClassifier::new(vec![ok("alice", confidence)]));
        let analyzer = analyzer(vec![Rect::new(10, 10, 50, 60)], classifier);

        let detections = analyzer.analyze(&frame()).unwrap();
        assert_eq!(detections.len(), usize::from(included));
    }

    #[test]
    fn test_emits_raw_box_not_padded_box() {
        let classifier = Arc::new(ScriptedClassifier::new(vec![ok("alice", 95.0)]));
        let analyzer = analyzer(vec![Rect::new(10, 10, 50, 60)], classifier);

        let detections = analyzer.analyze(&frame()).unwrap();
        assert_eq!(
            detections,
            vec![Detection::new(Rect::new(10, 10, 50, 60), "alice", 95.0)]
        );
    }

    #[test]
    fn test_classification_failure_reports_unknown() {
        let classifier = Arc::new(ScriptedClassifier::new(vec![
            Err(ClassifierError::Inference("bad tensor".to_string())),
            ok("bob", 97.5),
        ]));
        let analyzer = analyzer(
            vec![Rect::new(10, 10, 50, 60), Rect::new(100, 10, 150, 60)],
            classifier,
        );

        let detections = analyzer.analyze(&frame()).unwrap();
        assert_eq!(
            detections,
            vec![
                Detection::new(Rect::new(10, 10, 50, 60), "unknown", 0.0),
                Detection::new(Rect::new(100, 10, 150, 60), "bob", 97.5),
            ]
        );
    }

    #[test]
    fn test_box_outside_frame_is_skipped_without_classifying() {
        let classifier = Arc::new(ScriptedClassifier::new(vec![ok("alice", 99.0)]));
        let analyzer = analyzer(vec![Rect::new(400, 400, 450, 450)], classifier.clone());

        assert!(analyzer.analyze(&frame()).unwrap().is_empty());
        assert_eq!(classifier.calls_left(), 1);
    }

    #[test]
    fn test_box_at_frame_edge_is_clamped_and_classified() {
        let classifier = Arc::new(ScriptedClassifier::new(vec![ok("carol", 92.0)]));
        let analyzer = analyzer(vec![Rect::new(0, 0, 20, 20)], classifier.clone());

        let detections = analyzer.analyze(&frame()).unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].bbox, Rect::new(0, 0, 20, 20));
        assert_eq!(classifier.calls_left(), 0);
    }

    #[test]
    fn test_no_boxes_means_no_detections() {
        let classifier = Arc::new(ScriptedClassifier::new(vec![]));
        let analyzer = analyzer(vec![], classifier);
        assert!(analyzer.analyze(&frame()).unwrap().is_empty());
    }

    #[test]
    fn test_detector_error_propagates() {
        let classifier = Arc::new(ScriptedClassifier::new(vec![]));
        let analyzer = FrameAnalyzer::new(Arc::new(FailingDetector), classifier);
        assert!(analyzer.analyze(&frame()).is_err());
    }
}
