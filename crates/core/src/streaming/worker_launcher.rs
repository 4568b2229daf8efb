use std::io;
use std::thread::{self, JoinHandle};

use crate::pipeline::stream_worker::{StreamWorker, WorkerContext, WorkerExit};

use super::cancellation::CancellationToken;

/// Starts a worker for one camera on its own unit of execution.
pub trait WorkerLauncher: Send + Sync {
    fn launch(
        &self,
        camera_id: &str,
        video_url: &str,
        token: CancellationToken,
    ) -> io::Result<JoinHandle<WorkerExit>>;
}

/// One OS thread per camera, named `stream-<camera_id>`.
pub struct ThreadedWorkerLauncher {
    ctx: WorkerContext,
}

impl ThreadedWorkerLauncher {
    pub fn new(ctx: WorkerContext) -> Self {
        Self { ctx }
    }
}

impl WorkerLauncher for ThreadedWorkerLauncher {
    fn launch(
        &self,
        camera_id: &str,
        video_url: &str,
        token: CancellationToken,
    ) -> io::Result<JoinHandle<WorkerExit>> {
        let worker = StreamWorker::new(camera_id, video_url, self.ctx.clone());
        thread::Builder::new()
            .name(format!("stream-{camera_id}"))
            .spawn(move || worker.run(&token))
    }
}
