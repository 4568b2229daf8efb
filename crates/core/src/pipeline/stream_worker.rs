use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::detection::domain::detection::TrackedFace;
use crate::detection::domain::face_tracker::FaceTracker;
use crate::shared::constants::{DEFAULT_DETECTION_INTERVAL, DEFAULT_FALLBACK_FPS};
use crate::shared::frame::Frame;
use crate::shared::server_config::ServerConfig;
use crate::streaming::cancellation::CancellationToken;
use crate::streaming::clock::Clock;
use crate::streaming::notification::{Notification, NotificationSink};
use crate::video::domain::video_source::{VideoSource, VideoSourceOpener};

use super::frame_analyzer::FrameAnalyzer;
use super::worker_stats::{Cycle, WorkerStats};

/// Scheduling knobs shared by every worker.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorkerSettings {
    /// Minimum time between two full recognition passes.
    pub detection_interval: Duration,
    /// Pacing rate for sources that report no usable frame rate.
    pub fallback_fps: f64,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            detection_interval: DEFAULT_DETECTION_INTERVAL,
            fallback_fps: DEFAULT_FALLBACK_FPS,
        }
    }
}

impl From<&ServerConfig> for WorkerSettings {
    fn from(config: &ServerConfig) -> Self {
        Self {
            detection_interval: config.detection_interval(),
            fallback_fps: config.fallback_fps,
        }
    }
}

/// Capabilities injected into every worker. Cloning shares them.
#[derive(Clone)]
pub struct WorkerContext {
    pub analyzer: Arc<FrameAnalyzer>,
    pub tracker: Arc<FaceTracker>,
    pub opener: Arc<dyn VideoSourceOpener>,
    pub sink: Arc<dyn NotificationSink>,
    pub clock: Arc<dyn Clock>,
    pub settings: WorkerSettings,
}

/// How a worker ended.
#[derive(Debug)]
pub enum WorkerExit {
    /// Cancelled by the registry; the source was released.
    Stopped(WorkerStats),
    /// The source never opened. One error notification was sent.
    SourceUnavailable,
}

/// One camera's processing loop.
///
/// Each iteration reads a frame, runs a full recognition pass when the
/// detection interval has elapsed (always on the first frame) and otherwise
/// tracks the current faces, emits the tracked set, then sleeps one frame
/// period. End of stream and read failures rewind the source.
pub struct StreamWorker {
    camera_id: String,
    video_url: String,
    ctx: WorkerContext,
}

impl StreamWorker {
    pub fn new(camera_id: &str, video_url: &str, ctx: WorkerContext) -> Self {
        Self {
            camera_id: camera_id.to_string(),
            video_url: video_url.to_string(),
            ctx,
        }
    }

    pub fn camera_id(&self) -> &str {
        &self.camera_id
    }

    /// Runs until `token` is cancelled or the source fails to open.
    pub fn run(self, token: &CancellationToken) -> WorkerExit {
        let mut source = match self.ctx.opener.open(&self.video_url) {
            Ok(source) => source,
            Err(e) => {
                log::warn!("Stream {}: {e}", self.camera_id);
                self.ctx
                    .sink
                    .publish(Notification::source_unavailable(&self.camera_id));
                return WorkerExit::SourceUnavailable;
            }
        };

        let frame_period = source.metadata().frame_period(self.ctx.settings.fallback_fps);
        log::info!(
            "Stream {} opened {} ({}x{}, {:.2} fps, pacing {:?})",
            self.camera_id,
            self.video_url,
            source.metadata().width,
            source.metadata().height,
            source.metadata().fps,
            frame_period,
        );

        let mut stats = WorkerStats::new(&self.camera_id);
        let mut tracked: Vec<TrackedFace> = Vec::new();
        let mut last_detection: Option<Instant> = None;
        let mut frame_count: u64 = 0;

        while !token.is_cancelled() {
            let Some(frame) = self.next_frame(source.as_mut(), &mut stats, frame_period) else {
                continue;
            };

            let now = self.ctx.clock.now();
            let detection_due = last_detection
                .map_or(true, |t| now.duration_since(t) >= self.ctx.settings.detection_interval);

            let cycle = if detection_due {
                last_detection = Some(now);
                self.detect(&frame, frame_count, &mut tracked, &mut stats);
                Cycle::Detecting
            } else if !tracked.is_empty() {
                self.track(&frame, &mut tracked, &mut stats);
                Cycle::Tracking
            } else {
                Cycle::Idle
            };
            stats.record_cycle(cycle);

            self.ctx.sink.publish(Notification::detections(
                &self.camera_id,
                &tracked,
                frame_count,
            ));

            frame_count += 1;
            self.ctx.clock.sleep(frame_period);
        }

        drop(source);
        log::info!("Stream {} stopped after {frame_count} frames", self.camera_id);
        stats.log_summary();
        WorkerExit::Stopped(stats)
    }

    /// Next frame, rewinding once at end of stream. Returns `None` when the
    /// source yields nothing even after a rewind, after sleeping one frame
    /// period so an empty or broken source does not spin the loop.
    fn next_frame(
        &self,
        source: &mut dyn VideoSource,
        stats: &mut WorkerStats,
        frame_period: Duration,
    ) -> Option<Frame> {
        if let Some(frame) = self.read(source, stats) {
            return Some(frame);
        }

        stats.record_rewind();
        let frame = match source.rewind() {
            Ok(()) => self.read(source, stats),
            Err(e) => {
                log::warn!("Stream {}: {e}", self.camera_id);
                None
            }
        };
        if frame.is_none() {
            self.ctx.clock.sleep(frame_period);
        }
        frame
    }

    fn read(&self, source: &mut dyn VideoSource, stats: &mut WorkerStats) -> Option<Frame> {
        let started = Instant::now();
        let read = source.read_frame();
        stats.timing("read", started.elapsed().as_secs_f64() * 1000.0);

        match read {
            Ok(Some(frame)) => Some(frame),
            Ok(None) => {
                log::debug!("Stream {}: end of stream", self.camera_id);
                None
            }
            Err(e) => {
                log::debug!("Stream {}: {e}", self.camera_id);
                None
            }
        }
    }

    fn detect(
        &self,
        frame: &Frame,
        frame_count: u64,
        tracked: &mut Vec<TrackedFace>,
        stats: &mut WorkerStats,
    ) {
        let started = Instant::now();
        match self.ctx.analyzer.analyze(frame) {
            Ok(detections) => {
                log::info!(
                    "Stream {} frame {frame_count}: detected {} faces",
                    self.camera_id,
                    detections.len()
                );
                *tracked = detections;
            }
            Err(e) => log::warn!(
                "Stream {} frame {frame_count}: detection failed, keeping tracked faces: {e}",
                self.camera_id
            ),
        }
        stats.timing("analyze", started.elapsed().as_secs_f64() * 1000.0);
    }

    fn track(&self, frame: &Frame, tracked: &mut Vec<TrackedFace>, stats: &mut WorkerStats) {
        let started = Instant::now();
        match self.ctx.tracker.track(frame, tracked) {
            Ok(updated) => *tracked = updated,
            Err(e) => log::warn!(
                "Stream {}: tracking failed, keeping tracked faces: {e}",
                self.camera_id
            ),
        }
        stats.timing("track", started.elapsed().as_secs_f64() * 1000.0);
    }
}
