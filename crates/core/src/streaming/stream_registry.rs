use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use thiserror::Error;

use crate::pipeline::stream_worker::WorkerExit;
use crate::shared::constants::video_url;

use super::cancellation::CancellationToken;
use super::worker_launcher::WorkerLauncher;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("failed to start worker for camera {camera_id}: {source}")]
    Spawn {
        camera_id: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StartOutcome {
    Started { video_url: String },
    AlreadyActive { video_url: String },
}

impl StartOutcome {
    pub fn video_url(&self) -> &str {
        match self {
            Self::Started { video_url } | Self::AlreadyActive { video_url } => video_url,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    NotActive,
}

struct StreamEntry {
    token: CancellationToken,
    handle: JoinHandle<WorkerExit>,
}

impl StreamEntry {
    /// Running until stop is requested or the worker exits on its own.
    fn is_active(&self) -> bool {
        !self.token.is_cancelled() && !self.handle.is_finished()
    }
}

/// Camera id → worker table; the only state shared between the control
/// surface and the workers.
///
/// Entries are never removed while the process runs, so `status` also
/// lists cameras that were stopped or whose worker exited. A stopped entry
/// is replaced by the next `start` for that camera.
pub struct StreamRegistry {
    streams: Mutex<HashMap<String, StreamEntry>>,
    launcher: Arc<dyn WorkerLauncher>,
    video_base_url: String,
}

impl StreamRegistry {
    pub fn new(launcher: Arc<dyn WorkerLauncher>, video_base_url: &str) -> Self {
        Self {
            streams: Mutex::new(HashMap::new()),
            launcher,
            video_base_url: video_base_url.to_string(),
        }
    }

    /// Spawns a worker unless one is already active for `camera_id`.
    pub fn start(&self, camera_id: &str) -> Result<StartOutcome, RegistryError> {
        let video_url = video_url(&self.video_base_url, camera_id);
        let mut streams = self.lock();

        if streams.get(camera_id).is_some_and(StreamEntry::is_active) {
            return Ok(StartOutcome::AlreadyActive { video_url });
        }

        let token = CancellationToken::new();
        let handle = self
            .launcher
            .launch(camera_id, &video_url, token.clone())
            .map_err(|source| RegistryError::Spawn {
                camera_id: camera_id.to_string(),
                source,
            })?;
        // A replaced worker is already cancelled or finished; dropping its
        // handle detaches it.
        streams.insert(camera_id.to_string(), StreamEntry { token, handle });
        log::info!("Started stream {camera_id} from {video_url}");
        Ok(StartOutcome::Started { video_url })
    }

    /// Requests the worker to stop. It exits at its next loop check.
    pub fn stop(&self, camera_id: &str) -> StopOutcome {
        match self.lock().get(camera_id) {
            Some(entry) => {
                entry.token.cancel();
                log::info!("Stop requested for stream {camera_id}");
                StopOutcome::Stopped
            }
            None => StopOutcome::NotActive,
        }
    }

    /// Every camera id ever started, sorted. Presence does not imply a
    /// running worker.
    pub fn status(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn is_active(&self, camera_id: &str) -> bool {
        self.lock()
            .get(camera_id)
            .is_some_and(StreamEntry::is_active)
    }

    /// Cancels every worker and waits for all of them to exit.
    pub fn shutdown(&self) {
        let entries: Vec<(String, StreamEntry)> = self.lock().drain().collect();
        for (_, entry) in &entries {
            entry.token.cancel();
        }
        for (camera_id, entry) in entries {
            if entry.handle.join().is_err() {
                log::error!("Stream worker {camera_id} panicked");
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, StreamEntry>> {
        self.streams.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for StreamRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}
