//! detect_image - run the configured detector on one still image.
//!
//! Prints `{ success, count, detections, message }` as JSON on stdout.

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;

use walkaround_verify::{
    default_registry, DetectionAdapter, Detection, RawFrame, SampledFrame, VerifyConfig,
};

#[derive(Parser, Debug)]
#[command(name = "detect_image", version, about = "Detect objects in a single image")]
struct Args {
    /// Image file (JPEG or PNG).
    #[arg(long, value_name = "PATH")]
    image: PathBuf,

    /// Comma-separated labels to report.
    #[arg(long, value_name = "CSV")]
    labels: Option<String>,

    /// Detector backend name (stub, tract).
    #[arg(long)]
    backend: Option<String>,

    /// Local ONNX model for the tract backend.
    #[arg(long, value_name = "PATH")]
    model: Option<PathBuf>,
}

#[derive(Serialize)]
struct DetectOutput {
    success: bool,
    count: usize,
    detections: Vec<Detection>,
    message: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut cfg = VerifyConfig::layered().context("load configuration")?;
    if let Some(labels) = &args.labels {
        cfg.allowed_labels = labels.split(',').map(|l| l.trim().to_string()).collect();
    }
    if let Some(backend) = &args.backend {
        cfg.backend = backend.clone();
    }
    if let Some(model) = &args.model {
        cfg.model_path = Some(model.clone());
    }
    cfg.validate().context("validate configuration")?;

    let image = image::open(&args.image)
        .with_context(|| format!("decode image {}", args.image.display()))?
        .to_rgb8();
    let (width, height) = image.dimensions();
    let frame = SampledFrame {
        index: 0,
        frame: RawFrame::from_rgb(image.into_raw(), width, height)?,
    };

    let registry = default_registry(&cfg)?;
    let backend = registry.select(&cfg.backend)?;
    let mut backend = backend
        .lock()
        .map_err(|_| anyhow::anyhow!("detector backend lock poisoned"))?;

    let adapter = DetectionAdapter::new(cfg.label_filter()).with_min_confidence(cfg.min_confidence);
    let result = adapter.classify(&mut *backend, &frame)?;
    log::info!(
        "{}: {} qualifying detection(s) from backend '{}'",
        args.image.display(),
        result.detections.len(),
        backend.name()
    );

    let message = if result.detections.is_empty() {
        format!("No objects detected such as: {:?}", cfg.allowed_labels)
    } else {
        "Valid image.".to_string()
    };
    let output = DetectOutput {
        success: true,
        count: result.detections.len(),
        detections: result.detections,
        message,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
