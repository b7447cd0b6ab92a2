//! Verification run: sample, classify, fold, decide.
//!
//! `Init -> Sampling -> (Classify -> Fold)* -> Decide -> Terminal`, one linear
//! pass. The fold runs on the caller thread in frame order. With
//! `pipeline_depth > 0` decoding and sampling move to a dedicated thread that
//! feeds a bounded queue, so decoding overlaps detection without reordering.

use std::sync::mpsc;
use std::thread;

use serde::Serialize;

use crate::aggregate::Aggregator;
use crate::cancel::CancelToken;
use crate::config::{FailurePolicy, VerifyConfig};
use crate::continuity::Jump;
use crate::detect::{DetectionAdapter, DetectorBackend};
use crate::error::VerifyError;
use crate::frame::{InferenceView, SampledFrame};
use crate::ingest::{open_video, FileConfig, FrameSource};
use crate::sample::FrameSampler;
use crate::verdict::{decide, VerdictResult};

/// Verdict plus run diagnostics.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunReport {
    pub verdict: VerdictResult,
    /// Sampled frames whose detection failed (counted in `total_frames` only).
    pub detection_failures: u64,
    /// Frames decoded from the source, sampled or not.
    pub source_frames: u64,
    pub largest_jump: Option<Jump>,
}

/// A validated, reusable run configuration.
///
/// Holds no per-run state: every `run` builds its own aggregate, so one
/// `Verifier` may serve several videos, including concurrently.
#[derive(Clone, Debug)]
pub struct Verifier {
    frame_skip: u32,
    adapter: DetectionAdapter,
    jump_threshold: f32,
    min_presence_ratio: f64,
    failure_policy: FailurePolicy,
    pipeline_depth: usize,
    batch_size: usize,
}

impl Verifier {
    pub fn new(config: &VerifyConfig) -> Result<Self, VerifyError> {
        let mut config = config.clone();
        config.validate()?;
        Ok(Self {
            frame_skip: config.frame_skip,
            adapter: DetectionAdapter::new(config.label_filter())
                .with_min_confidence(config.min_confidence),
            jump_threshold: config.jump_threshold,
            min_presence_ratio: config.min_presence_ratio,
            failure_policy: config.failure_policy,
            pipeline_depth: config.pipeline_depth,
            batch_size: config.batch_size,
        })
    }

    /// Open a video and verify it.
    pub fn run_file(
        &self,
        file: &FileConfig,
        backend: &mut dyn DetectorBackend,
        cancel: &CancelToken,
    ) -> Result<RunReport, VerifyError> {
        if cancel.is_cancelled() {
            return Err(VerifyError::Cancelled);
        }
        let source = open_video(file)?;
        self.run(source, backend, cancel)
    }

    /// Verify frames from `source`. The source is dropped before this returns,
    /// on every path.
    pub fn run<S: FrameSource + 'static>(
        &self,
        source: S,
        backend: &mut dyn DetectorBackend,
        cancel: &CancelToken,
    ) -> Result<RunReport, VerifyError> {
        let sampler = FrameSampler::new(source, self.frame_skip)?.with_cancel(cancel.clone());
        log::info!(
            "verifying {} source: skip={} labels={:?} min_presence_ratio={} jump_threshold={} backend={}",
            sampler.source_name(),
            self.frame_skip,
            self.adapter.filter(),
            self.min_presence_ratio,
            self.jump_threshold,
            backend.name()
        );

        let mut aggregator = Aggregator::new(self.jump_threshold);
        let source_frames = if self.pipeline_depth == 0 {
            self.run_sequential(sampler, backend, &mut aggregator, cancel)?
        } else {
            self.run_pipelined(sampler, backend, &mut aggregator, cancel)?
        };

        if cancel.is_cancelled() {
            return Err(VerifyError::Cancelled);
        }

        let detection_failures = aggregator.detection_failures();
        let largest_jump = aggregator.largest_jump();
        let verdict = decide(&aggregator.into_state(), self.min_presence_ratio);
        log::info!(
            "verdict: valid={} frames={} qualifying={} ratio={:.3} jumps={} failures={}",
            verdict.valid,
            verdict.total_frames,
            verdict.qualifying_frames,
            verdict.presence_ratio,
            verdict.jump_count,
            detection_failures
        );

        Ok(RunReport {
            verdict,
            detection_failures,
            source_frames,
            largest_jump,
        })
    }

    fn run_sequential<S: FrameSource>(
        &self,
        mut sampler: FrameSampler<S>,
        backend: &mut dyn DetectorBackend,
        aggregator: &mut Aggregator,
        cancel: &CancelToken,
    ) -> Result<u64, VerifyError> {
        self.consume(sampler.by_ref(), backend, aggregator, cancel)?;
        Ok(sampler.frames_read())
    }

    fn run_pipelined<S: FrameSource + 'static>(
        &self,
        sampler: FrameSampler<S>,
        backend: &mut dyn DetectorBackend,
        aggregator: &mut Aggregator,
        cancel: &CancelToken,
    ) -> Result<u64, VerifyError> {
        let (tx, rx) = mpsc::sync_channel::<Result<SampledFrame, VerifyError>>(self.pipeline_depth);
        let producer = thread::Builder::new()
            .name("walkaround-decode".to_string())
            .spawn(move || {
                let mut sampler = sampler;
                for item in sampler.by_ref() {
                    let stop = item.is_err();
                    if tx.send(item).is_err() || stop {
                        break;
                    }
                }
                sampler.frames_read()
            })?;

        let consumed = self.consume(rx.iter(), backend, aggregator, cancel);
        // Unblocks a producer waiting on a full queue so it can drop the source.
        drop(rx);
        let source_frames = producer
            .join()
            .map_err(|_| VerifyError::decode("decoder thread panicked"))?;
        consumed?;
        Ok(source_frames)
    }

    /// Classify and fold frames in arrival order, `batch_size` at a time.
    fn consume<I>(
        &self,
        frames: I,
        backend: &mut dyn DetectorBackend,
        aggregator: &mut Aggregator,
        cancel: &CancelToken,
    ) -> Result<(), VerifyError>
    where
        I: Iterator<Item = Result<SampledFrame, VerifyError>>,
    {
        let mut batch: Vec<SampledFrame> = Vec::with_capacity(self.batch_size);
        for item in frames {
            batch.push(item?);
            if batch.len() >= self.batch_size {
                self.process_batch(&mut batch, backend, aggregator, cancel)?;
            }
        }
        self.process_batch(&mut batch, backend, aggregator, cancel)
    }

    fn process_batch(
        &self,
        batch: &mut Vec<SampledFrame>,
        backend: &mut dyn DetectorBackend,
        aggregator: &mut Aggregator,
        cancel: &CancelToken,
    ) -> Result<(), VerifyError> {
        if batch.is_empty() {
            return Ok(());
        }
        if cancel.is_cancelled() {
            return Err(VerifyError::Cancelled);
        }

        let mut raw = if batch.len() == 1 {
            vec![batch[0].inference_view().run(backend)]
        } else {
            let views: Vec<InferenceView<'_>> = batch.iter().map(|f| f.inference_view()).collect();
            backend.detect_batch(&views)
        };
        if raw.len() != batch.len() {
            let reason = format!(
                "backend returned {} results for {} frames",
                raw.len(),
                batch.len()
            );
            raw = batch
                .iter()
                .map(|_| Err(anyhow::anyhow!(reason.clone())))
                .collect();
        }

        for (frame, detections) in batch.iter().zip(raw) {
            match self.adapter.normalize(frame.index, detections) {
                Ok(result) => {
                    let outcome = aggregator.push(&result);
                    log::debug!(
                        "frame {}: qualifying={} detections={}",
                        frame.index,
                        outcome.qualifying,
                        result.detections.len()
                    );
                }
                Err(err) => match self.failure_policy {
                    FailurePolicy::Skip => {
                        log::warn!("{}; frame counted as not present", err);
                        aggregator.push_failure();
                    }
                    FailurePolicy::Abort => return Err(err),
                },
            }
        }

        // Frames are released (and zeroized) as soon as they are folded.
        batch.clear();
        Ok(())
    }
}
