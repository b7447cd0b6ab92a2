//! Frame sampler: keeps every Nth decoded frame.

use crate::cancel::CancelToken;
use crate::error::VerifyError;
use crate::frame::SampledFrame;
use crate::ingest::FrameSource;

/// Lazily walks a frame source and yields frames whose index is a multiple of `skip`.
///
/// Every decoded frame gets a zero-based index, including dropped ones, so
/// sampled indices are `0, skip, 2*skip, ...`. Dropped frames are released
/// immediately. The iterator is fused: after the source ends, fails or the run
/// is cancelled it yields nothing more.
pub struct FrameSampler<S: FrameSource> {
    source: S,
    skip: u64,
    next_index: u64,
    done: bool,
    cancel: Option<CancelToken>,
}

impl<S: FrameSource> FrameSampler<S> {
    /// Fails before reading any frame when `skip` is zero.
    pub fn new(source: S, skip: u32) -> Result<Self, VerifyError> {
        if skip == 0 {
            return Err(VerifyError::config("frame_skip must be >= 1"));
        }
        Ok(Self {
            source,
            skip: skip as u64,
            next_index: 0,
            done: false,
            cancel: None,
        })
    }

    /// Stop reading frames once `token` is tripped.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Number of frames decoded so far, sampled or not.
    pub fn frames_read(&self) -> u64 {
        self.next_index
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }
}

impl<S: FrameSource> Iterator for FrameSampler<S> {
    type Item = Result<SampledFrame, VerifyError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            if self.cancel.as_ref().is_some_and(|c| c.is_cancelled()) {
                self.done = true;
                return Some(Err(VerifyError::Cancelled));
            }
            let frame = match self.source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    self.done = true;
                    return None;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };
            let index = self.next_index;
            self.next_index += 1;
            if index % self.skip == 0 {
                return Some(Ok(SampledFrame { index, frame }));
            }
        }
        None
    }
}
