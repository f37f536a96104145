//! Replay a JSON-lines detection log through the speed pipeline.
//!
//! Each input line is one decoded frame:
//! `{"t": 12.3, "detections": [{"x1": 10, "y1": 20, "x2": 50, "y2": 80, "label": "car"}]}`
//! where `t` is seconds since the start of the recording. One JSON line is
//! printed per speed event.

use std::convert::Infallible;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use speedtrap_rs::{Config, Detection, DetectionSource, Frame, IntoDetections, SpeedPipeline};

#[derive(Parser, Debug)]
#[command(name = "speedtrap", about = "Two-line vehicle speed estimation over recorded detections")]
struct Args {
    /// YAML configuration; defaults are used when omitted
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// JSON-lines detection log, one line per decoded frame
    #[arg(long, value_name = "PATH")]
    input: PathBuf,
    /// Process every Nth frame
    #[arg(long)]
    stride: Option<u64>,
    /// Real-world distance between the reference lines, in metres
    #[arg(long)]
    distance: Option<f64>,
    /// Flag speeds above this many km/h
    #[arg(long)]
    threshold: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ReplayFrame {
    t: f64,
    #[serde(default)]
    detections: Vec<Detection>,
}

impl IntoDetections for ReplayFrame {
    fn into_detections(self) -> Vec<Detection> {
        self.detections
    }
}

/// Hands back whatever detections the replay loop staged for the current frame.
#[derive(Default)]
struct ReplayDetector {
    staged: Vec<Detection>,
}

impl DetectionSource for ReplayDetector {
    type Error = Infallible;

    fn detect(&mut self, _frame: &Frame<'_>) -> Result<Vec<Detection>, Self::Error> {
        Ok(std::mem::take(&mut self.staged))
    }
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(stride) = args.stride {
        config.pipeline.stride = stride;
    }
    if let Some(distance) = args.distance {
        config.estimator.distance_m = distance;
    }
    if let Some(threshold) = args.threshold {
        config.estimator.flag_threshold_kph = threshold;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("speedtrap=info")),
        )
        .with_writer(io::stderr)
        .init();

    let config = load_config(&args)?;
    info!(
        "lines: A y={} B y={} (±{}px), distance={}m, threshold={}km/h, stride={}",
        config.estimator.line_a_y,
        config.estimator.line_b_y,
        config.estimator.offset,
        config.estimator.distance_m,
        config.estimator.flag_threshold_kph,
        config.pipeline.stride
    );

    let input = File::open(&args.input)
        .with_context(|| format!("opening {}", args.input.display()))?;
    let mut pipeline = SpeedPipeline::new(ReplayDetector::default(), &config)?;
    let size = pipeline.config().resize;
    let frame = Frame::new(&[], size.width, size.height);
    let start = Instant::now();
    let mut stdout = io::stdout().lock();

    for (lineno, line) in BufReader::new(input).lines().enumerate() {
        let line = line.with_context(|| format!("reading line {}", lineno + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let record: ReplayFrame = serde_json::from_str(&line)
            .with_context(|| format!("parsing line {}", lineno + 1))?;
        let Some(now) = Duration::try_from_secs_f64(record.t)
            .ok()
            .and_then(|offset| start.checked_add(offset))
        else {
            bail!("line {}: invalid timestamp {}", lineno + 1, record.t);
        };

        pipeline.detector_mut().staged = record.into_detections();
        let Some(processed) = pipeline.process_frame(&frame, now)? else {
            continue;
        };
        for event in &processed.report.events {
            serde_json::to_writer(&mut stdout, event)?;
            writeln!(stdout)?;
        }
    }

    let estimator = pipeline.estimator();
    info!(
        "coming towards: {}, going away: {}, identities: {}",
        estimator.down_count(),
        estimator.up_count(),
        pipeline.tracker().total_identities()
    );
    Ok(())
}
