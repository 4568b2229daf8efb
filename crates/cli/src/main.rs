use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::thread;

use clap::Parser;
use crossbeam_channel::{select, Receiver};
use serde::Serialize;

use camwatch_core::control::control_surface::{ControlRequest, ControlResponse, ControlSurface};
use camwatch_core::detection::domain::face_tracker::FaceTracker;
use camwatch_core::detection::infrastructure::onnx_yolo_detector::OnnxYoloDetector;
use camwatch_core::pipeline::frame_analyzer::FrameAnalyzer;
use camwatch_core::pipeline::stream_worker::{WorkerContext, WorkerSettings};
use camwatch_core::recognition::infrastructure::label_map::LabelMap;
use camwatch_core::recognition::infrastructure::onnx_face_classifier::OnnxFaceClassifier;
use camwatch_core::shared::model_resolver;
use camwatch_core::shared::server_config::ServerConfig;
use camwatch_core::streaming::clock::SystemClock;
use camwatch_core::streaming::notification::Notification;
use camwatch_core::streaming::notification_hub::{BufferPolicy, NotificationHub};
use camwatch_core::streaming::stream_registry::StreamRegistry;
use camwatch_core::streaming::worker_launcher::ThreadedWorkerLauncher;
use camwatch_core::video::infrastructure::ffmpeg_source::FfmpegSourceOpener;

/// Per-camera face recognition streams.
///
/// Reads JSON control requests from stdin, one per line, e.g.
/// `{"op": "start_stream", "camera_id": "cam1"}`. Responses and detection
/// notifications are written to stdout as JSON lines.
#[derive(Parser)]
#[command(name = "camwatch")]
struct Cli {
    /// Cameras to start immediately.
    cameras: Vec<String>,

    /// JSON config file. Flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Base URL of the video server; streams are read from `<base>/<camera>.mp4`.
    #[arg(long)]
    video_base_url: Option<String>,

    /// Face detector ONNX model.
    #[arg(long)]
    detector_model: Option<PathBuf>,

    /// Face classifier ONNX model.
    #[arg(long)]
    classifier_model: Option<PathBuf>,

    /// JSON file mapping class indices to names.
    #[arg(long)]
    labels: Option<PathBuf>,

    /// Minimum classifier confidence (0.0-1.0).
    #[arg(long)]
    confidence: Option<f64>,

    /// Pixels added around each face before classification.
    #[arg(long)]
    padding: Option<i32>,

    /// Seconds between full recognition passes.
    #[arg(long)]
    detection_interval: Option<f64>,

    /// Per-subscriber queue length (unbounded when omitted).
    #[arg(long)]
    subscriber_buffer: Option<usize>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let hub = Arc::new(NotificationHub::new(BufferPolicy::from_capacity(
        config.subscriber_buffer,
    )));
    let notifications = hub.subscribe();

    let ctx = build_context(&config, hub)?;
    let registry = Arc::new(StreamRegistry::new(
        Arc::new(ThreadedWorkerLauncher::new(ctx)),
        &config.video_base_url,
    ));
    let surface = ControlSurface::new(registry.clone());

    let (response_tx, response_rx) = crossbeam_channel::unbounded::<ControlResponse>();
    let writer = thread::Builder::new()
        .name("stdout-writer".to_string())
        .spawn(move || write_output(&notifications, &response_rx))?;

    for camera_id in &cli.cameras {
        let request = ControlRequest::StartStream {
            camera_id: camera_id.clone(),
        };
        let _ = response_tx.send(surface.handle(request));
    }

    for line in io::stdin().lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let _ = response_tx.send(surface.handle_json(&line));
    }

    log::info!("Control input closed, stopping {} streams", registry.status().len());
    registry.shutdown();
    drop(response_tx);
    if writer.join().is_err() {
        log::error!("Output writer panicked");
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    apply_overrides(&mut config, cli);
    config.validate()?;
    Ok(config)
}

fn apply_overrides(config: &mut ServerConfig, cli: &Cli) {
    if let Some(url) = &cli.video_base_url {
        config.video_base_url = url.clone();
    }
    if let Some(path) = &cli.detector_model {
        config.detector_model = path.clone();
    }
    if let Some(path) = &cli.classifier_model {
        config.classifier_model = path.clone();
    }
    if let Some(path) = &cli.labels {
        config.labels_path = path.clone();
    }
    if let Some(confidence) = cli.confidence {
        config.confidence_threshold = confidence;
    }
    if let Some(padding) = cli.padding {
        config.padding = padding;
    }
    if let Some(secs) = cli.detection_interval {
        config.detection_interval_secs = secs;
    }
    if cli.subscriber_buffer.is_some() {
        config.subscriber_buffer = cli.subscriber_buffer;
    }
}

fn build_context(
    config: &ServerConfig,
    hub: Arc<NotificationHub>,
) -> Result<WorkerContext, Box<dyn std::error::Error>> {
    let detector_path = resolve_model(&config.detector_model, config.detector_model_url.as_deref())?;
    let classifier_path =
        resolve_model(&config.classifier_model, config.classifier_model_url.as_deref())?;
    let labels = LabelMap::load(&config.labels_path)?;

    let detector = Arc::new(OnnxYoloDetector::new(
        &detector_path,
        config.detector_confidence,
    )?);
    let classifier = Arc::new(OnnxFaceClassifier::new(&classifier_path, labels)?);

    let analyzer = FrameAnalyzer::new(detector.clone(), classifier)
        .with_confidence_threshold(config.confidence_threshold)
        .with_padding(config.padding);

    Ok(WorkerContext {
        analyzer: Arc::new(analyzer),
        tracker: Arc::new(FaceTracker::new(detector)),
        opener: Arc::new(FfmpegSourceOpener),
        sink: hub,
        clock: Arc::new(SystemClock),
        settings: WorkerSettings::from(config),
    })
}

fn resolve_model(path: &Path, url: Option<&str>) -> Result<PathBuf, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {}", path.display());
    let resolved = model_resolver::resolve(path, url, Some(Box::new(download_progress)))?;
    if url.is_some() {
        eprintln!();
    }
    Ok(resolved)
}

/// Serializes responses and notifications onto stdout, one JSON object per
/// line, until the response channel closes.
fn write_output(notifications: &Receiver<Notification>, responses: &Receiver<ControlResponse>) {
    let stdout = io::stdout();
    let written = loop {
        let result = select! {
            recv(notifications) -> msg => match msg {
                Ok(notification) => write_line(&mut stdout.lock(), &notification),
                Err(_) => break responses
                    .iter()
                    .try_for_each(|r| write_line(&mut stdout.lock(), &r)),
            },
            recv(responses) -> msg => match msg {
                Ok(response) => write_line(&mut stdout.lock(), &response),
                Err(_) => break Ok(()),
            },
        };
        if result.is_err() {
            break result;
        }
    };
    if let Err(e) = written {
        log::error!("Failed to write output: {e}");
    }
}

fn write_line<W: Write, T: Serialize>(out: &mut W, value: &T) -> io::Result<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    out.flush()
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading model... {pct}%");
    } else {
        eprint!("\rDownloading model... {downloaded} bytes");
    }
}
