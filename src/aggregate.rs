//! Presence aggregation and continuity tracking as one sequential fold.

use crate::continuity::{check_jump, Jump};
use crate::detect::{BBox, FrameResult};

/// Running statistics for one verification run. Never shared between runs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AggregateState {
    pub total_frames: u64,
    pub qualifying_frames: u64,
    pub last_bbox: Option<BBox>,
    pub jump_count: u64,
}

/// What one fold step observed.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FoldOutcome {
    pub qualifying: bool,
    pub jump: Option<Jump>,
}

/// Pure fold step.
///
/// Counts the frame, counts it as qualifying when it has detections, and runs
/// the continuity check on the best detection. `last_bbox` is kept across
/// frames with no detection, so a gap followed by a distant detection is
/// measured against the last position seen.
pub fn fold(state: AggregateState, result: &FrameResult, jump_threshold: f32) -> AggregateState {
    fold_step(state, result, jump_threshold).0
}

fn fold_step(
    mut state: AggregateState,
    result: &FrameResult,
    jump_threshold: f32,
) -> (AggregateState, FoldOutcome) {
    state.total_frames += 1;
    let mut outcome = FoldOutcome::default();

    if let Some(best) = result.best_detection() {
        state.qualifying_frames += 1;
        outcome.qualifying = true;
        outcome.jump = check_jump(
            result.frame_index,
            state.last_bbox.as_ref(),
            &best.bbox,
            jump_threshold,
        );
        if outcome.jump.is_some() {
            state.jump_count += 1;
        }
        state.last_bbox = Some(best.bbox);
    }

    (state, outcome)
}

/// Stateful wrapper around `fold` used by the pipeline.
#[derive(Clone, Debug)]
pub struct Aggregator {
    state: AggregateState,
    jump_threshold: f32,
    detection_failures: u64,
    largest_jump: Option<Jump>,
}

impl Aggregator {
    pub fn new(jump_threshold: f32) -> Self {
        Self {
            state: AggregateState::default(),
            jump_threshold,
            detection_failures: 0,
            largest_jump: None,
        }
    }

    /// Fold one frame result.
    pub fn push(&mut self, result: &FrameResult) -> FoldOutcome {
        let state = std::mem::take(&mut self.state);
        let (state, outcome) = fold_step(state, result, self.jump_threshold);
        self.state = state;

        if let Some(jump) = outcome.jump {
            log::debug!(
                "frame {}: bbox jump dx={:.1} dy={:.1}",
                jump.frame_index,
                jump.dx,
                jump.dy
            );
            if self
                .largest_jump
                .map_or(true, |largest| jump.magnitude() > largest.magnitude())
            {
                self.largest_jump = Some(jump);
            }
        }
        outcome
    }

    /// A frame whose detection failed: counted toward the total only.
    /// `last_bbox` is untouched.
    pub fn push_failure(&mut self) {
        self.state.total_frames += 1;
        self.detection_failures += 1;
    }

    pub fn state(&self) -> &AggregateState {
        &self.state
    }

    pub fn detection_failures(&self) -> u64 {
        self.detection_failures
    }

    pub fn largest_jump(&self) -> Option<Jump> {
        self.largest_jump
    }

    pub fn into_state(self) -> AggregateState {
        self.state
    }
}
