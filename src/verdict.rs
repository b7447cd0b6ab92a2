//! Verdict engine: turns the final aggregate into the caller-facing result.

use serde::Serialize;

use crate::aggregate::AggregateState;

/// Default minimum presence ratio for a valid walkaround.
pub const DEFAULT_MIN_PRESENCE_RATIO: f64 = 0.8;

pub const MESSAGE_NO_FRAMES: &str = "No frames extracted from video";
pub const MESSAGE_VALID: &str = "Target object present throughout video";
pub const MESSAGE_INVALID: &str = "Target object not consistently present in video";

/// Terminal output of a run.
///
/// Serializes as a flat object:
/// `valid, total_frames, car_detected_frames, presence_ratio, bbox_jumps, message`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VerdictResult {
    pub valid: bool,
    pub total_frames: u64,
    #[serde(rename = "car_detected_frames")]
    pub qualifying_frames: u64,
    pub presence_ratio: f64,
    #[serde(rename = "bbox_jumps")]
    pub jump_count: u64,
    pub message: String,
}

impl VerdictResult {
    /// The "no frames" terminal state: not an error, never valid.
    pub fn no_frames() -> Self {
        Self {
            valid: false,
            total_frames: 0,
            qualifying_frames: 0,
            presence_ratio: 0.0,
            jump_count: 0,
            message: MESSAGE_NO_FRAMES.to_string(),
        }
    }
}

/// Decide validity from presence alone.
///
/// Jumps are reported but do not affect `valid`.
pub fn decide(state: &AggregateState, min_presence_ratio: f64) -> VerdictResult {
    if state.total_frames == 0 {
        return VerdictResult::no_frames();
    }

    let presence_ratio = presence_ratio(state.qualifying_frames, state.total_frames);
    let valid = presence_ratio >= min_presence_ratio;

    VerdictResult {
        valid,
        total_frames: state.total_frames,
        qualifying_frames: state.qualifying_frames,
        presence_ratio,
        jump_count: state.jump_count,
        message: if valid { MESSAGE_VALID } else { MESSAGE_INVALID }.to_string(),
    }
}

/// `qualifying / total` rounded to three decimals, half to even.
///
/// Rounding is done on the exact rational in integer arithmetic so results do
/// not depend on float representation. `total` must be non-zero.
pub fn presence_ratio(qualifying: u64, total: u64) -> f64 {
    debug_assert!(total > 0);
    let scaled = qualifying as u128 * 1000;
    let total = total as u128;
    let mut thousandths = scaled / total;
    let remainder = scaled % total;
    let twice = remainder * 2;
    if twice > total || (twice == total && thousandths % 2 == 1) {
        thousandths += 1;
    }
    thousandths as f64 / 1000.0
}
