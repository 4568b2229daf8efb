pub mod constants;
pub mod frame;
pub mod model_resolver;
pub mod onnx_session;
pub mod rect;
pub mod server_config;
pub mod video_metadata;
