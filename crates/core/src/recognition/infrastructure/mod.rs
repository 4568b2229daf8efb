pub mod label_map;
pub mod onnx_face_classifier;
