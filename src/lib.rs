//! Walkaround video verification.
//!
//! Given a video of a subject (e.g. a vehicle) filmed while walking around it,
//! decide whether the subject was continuously and plausibly present.
//!
//! # Architecture
//!
//! Data flows left to right in a single pass:
//!
//! raw frames → sampled frames → per-frame detections → running aggregate → verdict
//!
//! - `ingest`: frame sources (FFmpeg files, synthetic walkarounds, memory) and temp staging
//! - `sample`: every-Nth-frame sampler
//! - `detect`: detector backends and the adapter that filters their output
//! - `aggregate` / `continuity`: presence counting and bbox jump detection
//! - `verdict`: presence-ratio decision
//! - `pipeline`: ties the stages together, with optional decode/detect overlap
//!
//! The detector is an explicit capability object passed into each run; there is
//! no global model state.

pub mod aggregate;
pub mod cancel;
pub mod config;
pub mod continuity;
pub mod detect;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod pipeline;
pub mod sample;
pub mod verdict;

pub use aggregate::{fold, AggregateState, Aggregator, FoldOutcome};
pub use cancel::CancelToken;
pub use config::{FailurePolicy, VerifyConfig};
pub use continuity::{check_jump, Jump, DEFAULT_JUMP_THRESHOLD};
#[cfg(feature = "backend-tract")]
pub use detect::TractBackend;
pub use detect::{
    BBox, BackendRegistry, Detection, DetectionAdapter, DetectionCapability, DetectorBackend,
    FrameResult, LabelFilter, SharedBackend, StubBackend,
};
pub use error::VerifyError;
pub use frame::{InferenceView, RawFrame, SampledFrame};
pub use ingest::{open_video, FileConfig, FrameSource, MemorySource, StagedVideo};
pub use pipeline::{RunReport, Verifier};
pub use sample::FrameSampler;
pub use verdict::{decide, presence_ratio, VerdictResult, DEFAULT_MIN_PRESENCE_RATIO};

/// Build the registry of backends available in this build.
///
/// `stub` is always present. `tract` is registered when the feature is
/// enabled and a model path is given.
pub fn default_registry(config: &VerifyConfig) -> Result<BackendRegistry, VerifyError> {
    let mut registry = BackendRegistry::new();
    registry.register(StubBackend::new());

    #[cfg(feature = "backend-tract")]
    if let Some(model_path) = &config.model_path {
        let backend = TractBackend::new(model_path).map_err(|e| {
            VerifyError::InvalidConfiguration(format!("failed to load detector model: {:#}", e))
        })?;
        registry.register(backend);
    }
    #[cfg(not(feature = "backend-tract"))]
    if config.model_path.is_some() {
        log::warn!("model path ignored: built without the backend-tract feature");
    }

    registry.set_default(&config.backend)?;
    Ok(registry)
}
