use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::streaming::stream_registry::{StartOutcome, StopOutcome, StreamRegistry};

/// A control operation, decoded from any transport.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ControlRequest {
    Status,
    /// `request_stream` is the subscriber-side spelling of the same start.
    #[serde(alias = "request_stream")]
    StartStream {
        camera_id: String,
    },
    StopStream {
        camera_id: String,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ControlResponse {
    Status {
        status: String,
        models_loaded: bool,
        active_streams: Vec<String>,
    },
    Started {
        camera_id: String,
        video_url: String,
        message: String,
    },
    AlreadyActive {
        camera_id: String,
        video_url: String,
        message: String,
    },
    Stopped {
        camera_id: String,
        message: String,
    },
    NotActive {
        camera_id: String,
        message: String,
    },
    /// The worker could not be spawned.
    Failed {
        camera_id: String,
        message: String,
    },
    /// The request could not be decoded.
    Invalid {
        message: String,
    },
}

impl ControlResponse {
    /// HTTP-equivalent status for transports that need one.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotActive { .. } => 404,
            Self::Invalid { .. } => 400,
            Self::Failed { .. } => 500,
            _ => 200,
        }
    }
}

/// Maps control requests onto the stream registry.
pub struct ControlSurface {
    registry: Arc<StreamRegistry>,
    models_loaded: bool,
}

impl ControlSurface {
    pub fn new(registry: Arc<StreamRegistry>) -> Self {
        Self {
            registry,
            models_loaded: true,
        }
    }

    pub fn registry(&self) -> &Arc<StreamRegistry> {
        &self.registry
    }

    pub fn handle(&self, request: ControlRequest) -> ControlResponse {
        match request {
            ControlRequest::Status => ControlResponse::Status {
                status: "running".to_string(),
                models_loaded: self.models_loaded,
                active_streams: self.registry.status(),
            },
            ControlRequest::StartStream { camera_id } => self.start(camera_id),
            ControlRequest::StopStream { camera_id } => match self.registry.stop(&camera_id) {
                StopOutcome::Stopped => ControlResponse::Stopped {
                    message: format!("Stopped processing {camera_id}"),
                    camera_id,
                },
                StopOutcome::NotActive => ControlResponse::NotActive {
                    camera_id,
                    message: "Stream not active".to_string(),
                },
            },
        }
    }

    /// Decodes one JSON request and handles it. Undecodable input yields
    /// `invalid` instead of an error.
    pub fn handle_json(&self, line: &str) -> ControlResponse {
        match serde_json::from_str::<ControlRequest>(line) {
            Ok(request) => self.handle(request),
            Err(e) => ControlResponse::Invalid {
                message: format!("invalid request: {e}"),
            },
        }
    }

    fn start(&self, camera_id: String) -> ControlResponse {
        match self.registry.start(&camera_id) {
            Ok(StartOutcome::Started { video_url }) => ControlResponse::Started {
                message: format!("Started processing {camera_id}"),
                camera_id,
                video_url,
            },
            Ok(StartOutcome::AlreadyActive { video_url }) => ControlResponse::AlreadyActive {
                camera_id,
                video_url,
                message: "Stream already active".to_string(),
            },
            Err(e) => {
                log::error!("{e}");
                ControlResponse::Failed {
                    camera_id,
                    message: e.to_string(),
                }
            }
        }
    }
}
