/// Face identity classifier using ONNX Runtime.
///
/// Expects a single-channel 112x112 input (NHWC as exported from Keras, or
/// NCHW) and a per-class score vector. Scores that are not already a
/// probability distribution are passed through softmax.
use std::path::Path;
use std::sync::Mutex;

use crate::recognition::domain::face_classifier::{
    Classification, ClassifierError, FaceClassifier,
};
use crate::recognition::domain::face_crop::FaceCrop;
use crate::shared::onnx_session;

use super::label_map::LabelMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum InputLayout {
    /// `[1, 112, 112, 1]`
    Nhwc,
    /// `[1, 1, 112, 112]`
    Nchw,
}

pub struct OnnxFaceClassifier {
    session: Mutex<ort::session::Session>,
    labels: LabelMap,
    layout: InputLayout,
}

impl OnnxFaceClassifier {
    pub fn new(model_path: &Path, labels: LabelMap) -> Result<Self, Box<dyn std::error::Error>> {
        let session = onnx_session::build_session(model_path)?;
        let layout = match onnx_session::input_dims(&session) {
            Some([1, _, _]) => InputLayout::Nchw,
            _ => InputLayout::Nhwc,
        };
        log::info!(
            "Face classifier ready: {} identities, {layout:?} input",
            labels.len()
        );
        Ok(Self {
            session: Mutex::new(session),
            labels,
            layout,
        })
    }

    fn scores(&self, crop: &FaceCrop) -> Result<Vec<f32>, ClassifierError> {
        let tensor = input_tensor(crop, self.layout);
        let input_value = ort::value::Tensor::from_array(tensor)
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;
        let mut session = self
            .session
            .lock()
            .map_err(|e| ClassifierError::Inference(format!("Lock poisoned: {e}")))?;
        let outputs = session
            .run(ort::inputs![input_value])
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;
        if outputs.len() == 0 {
            return Err(ClassifierError::EmptyOutput);
        }
        let scores = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;
        Ok(scores.iter().copied().collect())
    }
}

impl FaceClassifier for OnnxFaceClassifier {
    fn classify(&self, crop: &FaceCrop) -> Result<Classification, ClassifierError> {
        let probabilities = to_probabilities(self.scores(crop)?);
        let (index, p) = top_class(&probabilities).ok_or(ClassifierError::EmptyOutput)?;
        let label = self
            .labels
            .get(index)
            .ok_or(ClassifierError::UnknownClass(index))?;
        Ok(Classification {
            label: label.to_string(),
            confidence: p as f64 * 100.0,
        })
    }
}

fn input_tensor(crop: &FaceCrop, layout: InputLayout) -> ndarray::Array4<f32> {
    let side = FaceCrop::SIDE as usize;
    let pixels = crop.as_ndarray();
    match layout {
        InputLayout::Nhwc => {
            ndarray::Array4::from_shape_fn((1, side, side, 1), |(_, y, x, _)| pixels[[y, x]])
        }
        InputLayout::Nchw => {
            ndarray::Array4::from_shape_fn((1, 1, side, side), |(_, _, y, x)| pixels[[y, x]])
        }
    }
}

/// Leaves a distribution alone; softmaxes anything else (raw logits).
fn to_probabilities(scores: Vec<f32>) -> Vec<f32> {
    let in_range = scores.iter().all(|s| (0.0..=1.0).contains(s));
    let total: f32 = scores.iter().sum();
    if in_range && (total - 1.0).abs() < 1e-3 {
        return scores;
    }
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exp: Vec<f32> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f32 = exp.iter().sum();
    exp.into_iter().map(|e| e / sum).collect()
}

/// Highest-scoring class; the lowest index wins ties.
fn top_class(probabilities: &[f32]) -> Option<(usize, f32)> {
    probabilities
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (i, p)| match best {
            Some((_, bp)) if bp >= p => best,
            _ => Some((i, p)),
        })
}
