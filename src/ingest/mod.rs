//! Frame sources.
//!
//! This module provides the decoders that feed the sampler:
//! - Local video files (feature: ingest-file-ffmpeg)
//! - Synthetic walkaround source (`stub://walkaround`, testing and demos)
//! - In-memory frames (embedding callers and tests)
//!
//! Sources are sequential and single-pass. A source releases its decoder and
//! file handles when dropped, whether the run finished, failed or was cancelled.
//!
//! Sources MUST NOT:
//! - Store decoded frames to disk
//! - Retain frames after handing them to the sampler

pub mod file;
#[cfg(feature = "ingest-file-ffmpeg")]
pub(crate) mod file_ffmpeg;
pub mod memory;
pub mod staging;

pub use file::{open_video, FileConfig, WalkaroundScript};
pub use memory::MemorySource;
pub use staging::StagedVideo;

use crate::error::VerifyError;
use crate::frame::RawFrame;

/// Sequential frame decoder.
pub trait FrameSource: Send {
    /// Source identifier for logs.
    fn name(&self) -> &'static str;

    /// Decode the next frame. `Ok(None)` means the stream is exhausted.
    fn next_frame(&mut self) -> Result<Option<RawFrame>, VerifyError>;
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn next_frame(&mut self) -> Result<Option<RawFrame>, VerifyError> {
        (**self).next_frame()
    }
}
