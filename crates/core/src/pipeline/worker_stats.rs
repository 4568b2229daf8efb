use std::collections::HashMap;
use std::time::Instant;

/// Which branch a worker iteration took.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cycle {
    /// Full detect + classify pass.
    Detecting,
    /// Detector-only re-localization of tracked faces.
    Tracking,
    /// Nothing tracked, nothing due; the frame was only emitted.
    Idle,
}

/// Running aggregate of one stage's durations.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StageTiming {
    pub count: u64,
    pub total_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
}

impl StageTiming {
    fn new(duration_ms: f64) -> Self {
        Self {
            count: 1,
            total_ms: duration_ms,
            min_ms: duration_ms,
            max_ms: duration_ms,
        }
    }

    fn add(&mut self, duration_ms: f64) {
        self.count += 1;
        self.total_ms += duration_ms;
        self.min_ms = self.min_ms.min(duration_ms);
        self.max_ms = self.max_ms.max(duration_ms);
    }

    pub fn avg_ms(&self) -> f64 {
        self.total_ms / self.count as f64
    }
}

/// Per-worker counters and stage timings, summarized in the log when the
/// worker stops. Memory use does not grow with the number of frames.
#[derive(Debug)]
pub struct WorkerStats {
    camera_id: String,
    frames: u64,
    detecting: u64,
    tracking: u64,
    idle: u64,
    rewinds: u64,
    timings: HashMap<&'static str, StageTiming>,
    start_time: Instant,
}

impl WorkerStats {
    pub fn new(camera_id: &str) -> Self {
        Self {
            camera_id: camera_id.to_string(),
            frames: 0,
            detecting: 0,
            tracking: 0,
            idle: 0,
            rewinds: 0,
            timings: HashMap::new(),
            start_time: Instant::now(),
        }
    }

    pub fn record_cycle(&mut self, cycle: Cycle) {
        self.frames += 1;
        match cycle {
            Cycle::Detecting => self.detecting += 1,
            Cycle::Tracking => self.tracking += 1,
            Cycle::Idle => self.idle += 1,
        }
    }

    pub fn record_rewind(&mut self) {
        self.rewinds += 1;
    }

    /// Record how long a named stage took for one frame.
    pub fn timing(&mut self, stage: &'static str, duration_ms: f64) {
        self.timings
            .entry(stage)
            .and_modify(|t| t.add(duration_ms))
            .or_insert_with(|| StageTiming::new(duration_ms));
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn cycles(&self, cycle: Cycle) -> u64 {
        match cycle {
            Cycle::Detecting => self.detecting,
            Cycle::Tracking => self.tracking,
            Cycle::Idle => self.idle,
        }
    }

    pub fn rewinds(&self) -> u64 {
        self.rewinds
    }

    pub fn timings_for(&self, stage: &str) -> Option<&StageTiming> {
        self.timings.get(stage)
    }

    /// Number of distinct stages timed so far.
    pub fn stage_count(&self) -> usize {
        self.timings.len()
    }

    /// Returns the formatted summary, or `None` if no frame was processed.
    pub fn summary_string(&self) -> Option<String> {
        if self.frames == 0 {
            return None;
        }

        let elapsed = self.start_time.elapsed().as_secs_f64();
        let mut lines = vec![
            format!(
                "Stream {} summary ({} frames, {elapsed:.1}s):",
                self.camera_id, self.frames
            ),
            format!(
                "  cycles: {} detecting, {} tracking, {} idle, {} rewinds",
                self.detecting, self.tracking, self.idle, self.rewinds
            ),
        ];

        let mut stages: Vec<_> = self.timings.iter().collect();
        stages.sort_by_key(|(stage, _)| *stage);
        for (stage, t) in stages {
            lines.push(format!(
                "  {stage:8}: avg {:6.1}ms  min {:6.1}ms  max {:6.1}ms  total {:7.0}ms",
                t.avg_ms(),
                t.min_ms,
                t.max_ms,
                t.total_ms
            ));
        }

        Some(lines.join("\n"))
    }

    pub fn log_summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n{text}");
        }
    }
}
