use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::continuity::DEFAULT_JUMP_THRESHOLD;
use crate::detect::LabelFilter;
use crate::error::VerifyError;
use crate::verdict::DEFAULT_MIN_PRESENCE_RATIO;

const DEFAULT_FRAME_SKIP: u32 = 5;
const DEFAULT_LABEL: &str = "car";
const DEFAULT_BACKEND: &str = "stub";
const DEFAULT_BATCH_SIZE: usize = 1;

/// What to do when the detector fails on a single frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Count the frame toward the total, not toward presence, and continue.
    #[default]
    Skip,
    /// Abort the whole run with the detection error.
    Abort,
}

impl FromStr for FailurePolicy {
    type Err = VerifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "abort" => Ok(Self::Abort),
            other => Err(VerifyError::InvalidConfiguration(format!(
                "failure policy must be 'skip' or 'abort', got '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct VerifyConfigFile {
    frame_skip: Option<u32>,
    allowed_labels: Option<Vec<String>>,
    allow_any_label: Option<bool>,
    min_presence_ratio: Option<f64>,
    jump_threshold: Option<f32>,
    min_confidence: Option<f32>,
    failure_policy: Option<FailurePolicy>,
    pipeline: Option<PipelineConfigFile>,
    detector: Option<DetectorConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct PipelineConfigFile {
    depth: Option<usize>,
    batch_size: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<String>,
    model_path: Option<PathBuf>,
}

/// Settings for one verification run.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifyConfig {
    /// Keep every Nth decoded frame.
    pub frame_skip: u32,
    /// Labels that count as the target object.
    pub allowed_labels: Vec<String>,
    /// Count every label. An empty `allowed_labels` is only accepted with this set.
    pub allow_any_label: bool,
    /// Minimum qualifying/total ratio for a valid verdict, in (0, 1].
    pub min_presence_ratio: f64,
    /// Max top-left displacement between qualifying frames, bbox pixel units.
    pub jump_threshold: f32,
    /// Detections below this (rounded) confidence are ignored.
    pub min_confidence: f32,
    pub failure_policy: FailurePolicy,
    /// Bounded queue depth between decoder and detector. 0 runs sequentially.
    pub pipeline_depth: usize,
    /// Frames per detector call.
    pub batch_size: usize,
    pub backend: String,
    pub model_path: Option<PathBuf>,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            frame_skip: DEFAULT_FRAME_SKIP,
            allowed_labels: vec![DEFAULT_LABEL.to_string()],
            allow_any_label: false,
            min_presence_ratio: DEFAULT_MIN_PRESENCE_RATIO,
            jump_threshold: DEFAULT_JUMP_THRESHOLD,
            min_confidence: 0.0,
            failure_policy: FailurePolicy::Skip,
            pipeline_depth: 0,
            batch_size: DEFAULT_BATCH_SIZE,
            backend: DEFAULT_BACKEND.to_string(),
            model_path: None,
        }
    }
}

impl VerifyConfig {
    /// Defaults, then the file named by `WALKAROUND_CONFIG`, then environment
    /// overrides, then `validate()`.
    pub fn load() -> Result<Self, VerifyError> {
        let mut cfg = Self::layered()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Same layering as `load` without the final `validate()`, for callers
    /// that apply their own overrides (CLI flags) on top.
    pub fn layered() -> Result<Self, VerifyError> {
        let config_path = std::env::var("WALKAROUND_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        Ok(cfg)
    }

    fn from_file(file: VerifyConfigFile) -> Self {
        let defaults = Self::default();
        let pipeline = file.pipeline.unwrap_or_default();
        let detector = file.detector.unwrap_or_default();
        Self {
            frame_skip: file.frame_skip.unwrap_or(defaults.frame_skip),
            allowed_labels: file.allowed_labels.unwrap_or(defaults.allowed_labels),
            allow_any_label: file.allow_any_label.unwrap_or(defaults.allow_any_label),
            min_presence_ratio: file
                .min_presence_ratio
                .unwrap_or(defaults.min_presence_ratio),
            jump_threshold: file.jump_threshold.unwrap_or(defaults.jump_threshold),
            min_confidence: file.min_confidence.unwrap_or(defaults.min_confidence),
            failure_policy: file.failure_policy.unwrap_or(defaults.failure_policy),
            pipeline_depth: pipeline.depth.unwrap_or(defaults.pipeline_depth),
            batch_size: pipeline.batch_size.unwrap_or(defaults.batch_size),
            backend: detector.backend.unwrap_or(defaults.backend),
            model_path: detector.model_path,
        }
    }

    fn apply_env(&mut self) -> Result<(), VerifyError> {
        if let Some(skip) = env_parsed::<u32>("WALKAROUND_FRAME_SKIP", "a positive integer")? {
            self.frame_skip = skip;
        }
        if let Ok(labels) = std::env::var("WALKAROUND_ALLOWED_LABELS") {
            let parsed = split_csv(&labels);
            if !parsed.is_empty() {
                self.allowed_labels = parsed;
            }
        }
        if let Some(ratio) = env_parsed::<f64>("WALKAROUND_MIN_PRESENCE_RATIO", "a number")? {
            self.min_presence_ratio = ratio;
        }
        if let Some(threshold) = env_parsed::<f32>("WALKAROUND_JUMP_THRESHOLD", "a number")? {
            self.jump_threshold = threshold;
        }
        if let Some(confidence) = env_parsed::<f32>("WALKAROUND_MIN_CONFIDENCE", "a number")? {
            self.min_confidence = confidence;
        }
        if let Ok(policy) = std::env::var("WALKAROUND_FAILURE_POLICY") {
            if !policy.trim().is_empty() {
                self.failure_policy = policy.parse()?;
            }
        }
        if let Some(depth) = env_parsed::<usize>("WALKAROUND_PIPELINE_DEPTH", "an integer")? {
            self.pipeline_depth = depth;
        }
        if let Ok(backend) = std::env::var("WALKAROUND_BACKEND") {
            if !backend.trim().is_empty() {
                self.backend = backend.trim().to_string();
            }
        }
        if let Ok(path) = std::env::var("WALKAROUND_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.model_path = Some(PathBuf::from(path));
            }
        }
        Ok(())
    }

    /// Reject settings that cannot produce a meaningful run.
    pub fn validate(&mut self) -> Result<(), VerifyError> {
        if self.frame_skip == 0 {
            return Err(VerifyError::config("frame_skip must be >= 1"));
        }

        self.allowed_labels = self
            .allowed_labels
            .iter()
            .map(|label| label.trim().to_string())
            .filter(|label| !label.is_empty())
            .collect();
        if self.allowed_labels.is_empty() && !self.allow_any_label {
            return Err(VerifyError::config(
                "allowed_labels must not be empty (set allow_any_label to count every label)",
            ));
        }

        if !self.min_presence_ratio.is_finite()
            || self.min_presence_ratio <= 0.0
            || self.min_presence_ratio > 1.0
        {
            return Err(VerifyError::config(
                "min_presence_ratio must be in (0, 1]",
            ));
        }
        if !self.jump_threshold.is_finite() || self.jump_threshold <= 0.0 {
            return Err(VerifyError::config(
                "jump_threshold must be a positive number",
            ));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(VerifyError::config("min_confidence must be in [0, 1]"));
        }
        if self.batch_size == 0 {
            return Err(VerifyError::config("batch_size must be >= 1"));
        }
        Ok(())
    }

    pub fn label_filter(&self) -> LabelFilter {
        if self.allow_any_label {
            LabelFilter::Any
        } else {
            LabelFilter::only(self.allowed_labels.iter().cloned())
        }
    }
}

fn env_parsed<T: FromStr>(key: &str, expected: &str) -> Result<Option<T>, VerifyError> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| VerifyError::InvalidConfiguration(format!("{} must be {}", key, expected))),
        _ => Ok(None),
    }
}

fn read_config_file(path: &Path) -> Result<VerifyConfigFile, VerifyError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        VerifyError::InvalidConfiguration(format!(
            "failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let parsed = if is_toml {
        toml::from_str(&raw).map_err(|e| e.to_string())
    } else {
        serde_json::from_str(&raw).map_err(|e| e.to_string())
    };
    parsed.map_err(|e| {
        VerifyError::InvalidConfiguration(format!("invalid config file {}: {}", path.display(), e))
    })
}

pub(crate) fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.to_string())
        .collect()
}
