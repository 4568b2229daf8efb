//! In-memory fakes for the detector, classifier, video source, clock and
//! worker launcher, shared by the worker, registry and control tests.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::detection::domain::face_detector::{DetectError, FaceDetector};
use crate::recognition::domain::face_classifier::{
    Classification, ClassifierError, FaceClassifier,
};
use crate::pipeline::stream_worker::WorkerExit;
use crate::pipeline::worker_stats::WorkerStats;
use crate::recognition::domain::face_crop::FaceCrop;
use crate::shared::frame::Frame;
use crate::shared::rect::Rect;
use crate::shared::video_metadata::VideoMetadata;
use crate::streaming::cancellation::CancellationToken;
use crate::streaming::clock::Clock;
use crate::streaming::worker_launcher::WorkerLauncher;
use crate::video::domain::video_source::{SourceError, VideoSource, VideoSourceOpener};

pub const WIDTH: u32 = 64;
pub const HEIGHT: u32 = 48;

/// Three well-separated faces inside a `WIDTH` x `HEIGHT` frame.
pub fn three_boxes() -> Vec<Rect> {
    vec![
        Rect::new(2, 2, 18, 20),
        Rect::new(22, 2, 40, 20),
        Rect::new(44, 10, 60, 30),
    ]
}

pub struct FakeSource {
    metadata: VideoMetadata,
    length: usize,
    position: usize,
    released: Arc<AtomicBool>,
}

impl VideoSource for FakeSource {
    fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    fn read_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        if self.position >= self.length {
            return Ok(None);
        }
        let frame = Frame::new(
            vec![120u8; (WIDTH * HEIGHT * 3) as usize],
            WIDTH,
            HEIGHT,
            3,
            self.position,
        );
        self.position += 1;
        Ok(Some(frame))
    }

    fn rewind(&mut self) -> Result<(), SourceError> {
        self.position = 0;
        Ok(())
    }
}

impl Drop for FakeSource {
    fn drop(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

/// Opens `length`-frame clips at `fps`, or refuses every URL.
pub struct FakeOpener {
    fps: f64,
    length: usize,
    fail: bool,
    opened: AtomicUsize,
    released: Arc<AtomicBool>,
}

impl FakeOpener {
    pub fn new(fps: f64, length: usize) -> Self {
        Self {
            fps,
            length,
            fail: false,
            opened: AtomicUsize::new(0),
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(8.0, 0)
        }
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Whether the last opened source has been dropped.
    pub fn released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

impl VideoSourceOpener for FakeOpener {
    fn open(&self, url: &str) -> Result<Box<dyn VideoSource>, SourceError> {
        if self.fail {
            return Err(SourceError::Open {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.released.store(false, Ordering::SeqCst);
        Ok(Box::new(FakeSource {
            metadata: VideoMetadata {
                width: WIDTH,
                height: HEIGHT,
                fps: self.fps,
                codec: "fake".to_string(),
                url: url.to_string(),
            },
            length: self.length,
            position: 0,
            released: self.released.clone(),
        }))
    }
}

/// Returns the same boxes on every call and counts calls.
pub struct CountingDetector {
    boxes: Vec<Rect>,
    calls: AtomicUsize,
}

impl CountingDetector {
    pub fn new(boxes: Vec<Rect>) -> Self {
        Self {
            boxes,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl FaceDetector for CountingDetector {
    fn detect(&self, _frame: &Frame) -> Result<Vec<Rect>, DetectError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.boxes.clone())
    }
}

pub struct FailingDetector {
    calls: AtomicUsize,
}

impl FailingDetector {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl FaceDetector for FailingDetector {
    fn detect(&self, _frame: &Frame) -> Result<Vec<Rect>, DetectError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err("inference failed".into())
    }
}

/// Answers every crop with the same identity.
pub struct FixedClassifier {
    label: String,
    confidence: f64,
    calls: AtomicUsize,
}

impl FixedClassifier {
    pub fn new(label: &str, confidence: f64) -> Self {
        Self {
            label: label.to_string(),
            confidence,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl FaceClassifier for FixedClassifier {
    fn classify(&self, _crop: &FaceCrop) -> Result<Classification, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Classification {
            label: self.label.clone(),
            confidence: self.confidence,
        })
    }
}

/// Spawns threads that idle until cancelled, exit at once, or refuses to
/// spawn at all.
pub struct FakeLauncher {
    launches: AtomicUsize,
    pub exit_immediately: bool,
    pub fail: bool,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self {
            launches: AtomicUsize::new(0),
            exit_immediately: false,
            fail: false,
        }
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

impl WorkerLauncher for FakeLauncher {
    fn launch(
        &self,
        camera_id: &str,
        _video_url: &str,
        token: CancellationToken,
    ) -> io::Result<JoinHandle<WorkerExit>> {
        if self.fail {
            return Err(io::Error::new(io::ErrorKind::Other, "no threads left"));
        }
        self.launches.fetch_add(1, Ordering::SeqCst);
        let exit_immediately = self.exit_immediately;
        let camera_id = camera_id.to_string();
        Ok(thread::spawn(move || {
            if exit_immediately {
                return WorkerExit::SourceUnavailable;
            }
            while !token.is_cancelled() {
                thread::sleep(Duration::from_millis(1));
            }
            WorkerExit::Stopped(WorkerStats::new(&camera_id))
        }))
    }
}

/// Virtual clock that only moves when slept on or advanced.
///
/// Lets tests run a worker through many seconds of footage instantly.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, duration: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(PoisonError::into_inner);
        *offset += duration;
    }

    /// Virtual time elapsed since construction.
    pub fn elapsed(&self) -> Duration {
        *self.offset.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration);
    }
}
