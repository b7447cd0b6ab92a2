use std::collections::VecDeque;

use crate::error::VerifyError;
use crate::frame::RawFrame;

use super::FrameSource;

/// Frames already decoded by the caller, yielded in order.
///
/// An entry may be an error to simulate a decoder failing mid-stream.
#[derive(Default)]
pub struct MemorySource {
    frames: VecDeque<Result<RawFrame, VerifyError>>,
}

impl MemorySource {
    pub fn new(frames: Vec<RawFrame>) -> Self {
        Self {
            frames: frames.into_iter().map(Ok).collect(),
        }
    }

    /// Build a source that can also yield decode errors.
    pub fn from_results(frames: Vec<Result<RawFrame, VerifyError>>) -> Self {
        Self {
            frames: frames.into(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for MemorySource {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn next_frame(&mut self) -> Result<Option<RawFrame>, VerifyError> {
        self.frames.pop_front().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> RawFrame {
        RawFrame::from_rgb(vec![0u8; 3], 1, 1).unwrap()
    }

    #[test]
    fn yields_frames_then_exhausts() {
        let mut source = MemorySource::new(vec![frame(), frame()]);
        assert!(source.next_frame().unwrap().is_some());
        assert!(source.next_frame().unwrap().is_some());
        assert!(source.next_frame().unwrap().is_none());
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn yields_scripted_errors() {
        let mut source = MemorySource::from_results(vec![
            Ok(frame()),
            Err(VerifyError::decode("truncated packet")),
        ]);
        assert!(source.next_frame().unwrap().is_some());
        assert!(matches!(
            source.next_frame(),
            Err(VerifyError::DecodeFailure(_))
        ));
        assert_eq!(source.remaining(), 0);
    }
}
