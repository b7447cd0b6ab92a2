//! verify_video - check that a walkaround video keeps its subject in frame.
//!
//! 1. Loads settings (defaults, WALKAROUND_CONFIG file, environment, flags)
//! 2. Opens the video (a local path, a stub:// source, or stdin staged to a temp file)
//! 3. Samples every Nth frame and runs the selected detector on it
//! 4. Prints the verdict as JSON on stdout
//!
//! Exit status: 0 for any well-formed verdict, 1 on fatal errors, 2 when cancelled.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;

use walkaround_verify::{
    default_registry, CancelToken, FailurePolicy, FileConfig, StagedVideo, Verifier, VerifyConfig,
    VerifyError,
};

#[path = "../ui.rs"]
mod ui;

const EXIT_CANCELLED: i32 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "verify_video",
    version,
    about = "Verify that a walkaround video keeps the target object in frame"
)]
struct Args {
    /// Video to verify (local path or stub://walkaround?...).
    #[arg(long, value_name = "PATH", required_unless_present = "stdin")]
    video: Option<String>,

    /// Read the video from stdin instead (staged to a temp file).
    #[arg(long, conflicts_with = "video")]
    stdin: bool,

    /// Original file name of the stdin upload; its extension names the container.
    #[arg(long, value_name = "NAME", default_value = "upload.mp4", requires = "stdin")]
    stdin_name: String,

    /// Keep every Nth frame.
    #[arg(long)]
    frame_skip: Option<u32>,

    /// Comma-separated labels that count as the target object.
    #[arg(long, value_name = "CSV")]
    labels: Option<String>,

    /// Count detections of any label.
    #[arg(long)]
    any_label: bool,

    /// Minimum qualifying/total frame ratio.
    #[arg(long)]
    min_presence_ratio: Option<f64>,

    /// Max top-left bbox displacement between qualifying frames (pixels).
    #[arg(long)]
    jump_threshold: Option<f32>,

    /// Ignore detections below this confidence.
    #[arg(long)]
    min_confidence: Option<f32>,

    /// Detector backend name (stub, tract).
    #[arg(long)]
    backend: Option<String>,

    /// Local ONNX model for the tract backend.
    #[arg(long, value_name = "PATH")]
    model: Option<PathBuf>,

    /// Bounded decode queue depth (0 = decode and detect on one thread).
    #[arg(long)]
    pipeline_depth: Option<usize>,

    /// Frames per detector call.
    #[arg(long)]
    batch_size: Option<usize>,

    /// Abort the run when the detector fails on a frame instead of skipping it.
    #[arg(long)]
    abort_on_detect_error: bool,

    /// Print run diagnostics alongside the verdict.
    #[arg(long)]
    report: bool,

    /// UI mode for stderr progress (auto|plain|pretty)
    #[arg(long, env = "WALKAROUND_UI", default_value = "auto", value_name = "MODE")]
    ui: String,
}

impl Args {
    fn apply(&self, cfg: &mut VerifyConfig) {
        if let Some(skip) = self.frame_skip {
            cfg.frame_skip = skip;
        }
        if let Some(labels) = &self.labels {
            cfg.allowed_labels = labels.split(',').map(|l| l.trim().to_string()).collect();
        }
        if self.any_label {
            cfg.allow_any_label = true;
        }
        if let Some(ratio) = self.min_presence_ratio {
            cfg.min_presence_ratio = ratio;
        }
        if let Some(threshold) = self.jump_threshold {
            cfg.jump_threshold = threshold;
        }
        if let Some(confidence) = self.min_confidence {
            cfg.min_confidence = confidence;
        }
        if let Some(backend) = &self.backend {
            cfg.backend = backend.clone();
        }
        if let Some(model) = &self.model {
            cfg.model_path = Some(model.clone());
        }
        if let Some(depth) = self.pipeline_depth {
            cfg.pipeline_depth = depth;
        }
        if let Some(batch) = self.batch_size {
            cfg.batch_size = batch;
        }
        if self.abort_on_detect_error {
            cfg.failure_policy = FailurePolicy::Abort;
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let ui = ui::Ui::from_args(
        &args.ui,
        std::io::stderr().is_terminal(),
        !std::io::stdout().is_terminal(),
    );

    let mut cfg = VerifyConfig::layered().context("load configuration")?;
    args.apply(&mut cfg);
    cfg.validate().context("validate configuration")?;
    let verifier = Verifier::new(&cfg)?;

    let stage = ui.stage("Load detector");
    let registry = default_registry(&cfg)?;
    let backend = registry.select(&cfg.backend)?;
    let mut backend = backend
        .lock()
        .map_err(|_| anyhow::anyhow!("detector backend lock poisoned"))?;
    backend.warm_up().context("warm up detector")?;
    stage.done();

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        log::warn!("interrupt received, cancelling verification");
        handler_token.cancel();
    })
    .expect("error setting Ctrl-C handler");

    // Dropped at the end of main, removing the temp file on every path.
    let staged = if args.stdin {
        let stage = ui.stage("Stage upload");
        let suffix = StagedVideo::suffix_for(&args.stdin_name);
        let staged = StagedVideo::from_reader(std::io::stdin().lock(), &suffix)
            .context("stage video from stdin")?;
        log::info!("staged {} bytes from stdin", staged.len());
        stage.done();
        Some(staged)
    } else {
        None
    };
    let file = match (&staged, &args.video) {
        (Some(staged), _) => staged.file_config(),
        (None, Some(video)) => FileConfig::new(video.as_str()),
        (None, None) => anyhow::bail!("either --video or --stdin is required"),
    };

    let stage = ui.stage("Verify video");
    let report = match verifier.run_file(&file, &mut *backend, &cancel) {
        Ok(report) => report,
        Err(VerifyError::Cancelled) => {
            drop(stage);
            drop(staged);
            log::warn!("verification cancelled; no verdict produced");
            std::process::exit(EXIT_CANCELLED);
        }
        Err(err) => return Err(err).with_context(|| format!("verify {}", file.path)),
    };
    stage.done();

    let json = if args.report {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string_pretty(&report.verdict)?
    };
    println!("{json}");
    Ok(())
}
