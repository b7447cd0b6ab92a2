//! Transient frame containers.
//!
//! - `RawFrame`: decoded RGB24 pixels. Bytes are private and zeroized on drop.
//! - `InferenceView`: borrowed view handed to detector backends.
//! - `SampledFrame`: a frame selected by the sampler, tagged with its source index.
//!
//! Frames are never cloned, serialized or buffered past their fold step.

use zeroize::Zeroize;

use crate::detect::{Detection, DetectorBackend};
use crate::error::VerifyError;

/// Bytes per RGB24 pixel.
pub const RGB_CHANNELS: usize = 3;

// ----------------------------------------------------------------------------
// RawFrame: opaque decoded image
// ----------------------------------------------------------------------------

/// Decoded RGB24 frame. There is no `Clone` and no byte accessor outside the crate.
pub struct RawFrame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

// Explicitly NOT implementing Clone, Serialize or AsRef<[u8]>.

impl RawFrame {
    /// Wrap an RGB24 pixel buffer. The buffer length must be `width * height * 3`.
    pub fn from_rgb(data: Vec<u8>, width: u32, height: u32) -> Result<Self, VerifyError> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(RGB_CHANNELS))
            .ok_or_else(|| VerifyError::decode("frame dimensions overflow"))?;
        if data.len() != expected {
            return Err(VerifyError::DecodeFailure(format!(
                "expected {} RGB bytes for {}x{}, received {}",
                expected,
                width,
                height,
                data.len()
            )));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Detector backends receive this view, not the frame itself.
    pub fn inference_view(&self) -> InferenceView<'_> {
        InferenceView { frame: self }
    }

    pub(crate) fn byte_len(&self) -> usize {
        self.data.len()
    }
}

impl std::fmt::Debug for RawFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.byte_len())
            .finish_non_exhaustive()
    }
}

impl Drop for RawFrame {
    fn drop(&mut self) {
        self.data.zeroize();
    }
}

// ----------------------------------------------------------------------------
// InferenceView: read-only access for detectors
// ----------------------------------------------------------------------------

/// Borrowed view of a frame for inference.
///
/// Pixels flow into the backend through `run`; only detections flow out.
#[derive(Clone, Copy)]
pub struct InferenceView<'a> {
    frame: &'a RawFrame,
}

impl<'a> InferenceView<'a> {
    pub fn width(&self) -> u32 {
        self.frame.width
    }

    pub fn height(&self) -> u32 {
        self.frame.height
    }

    /// Run a backend over the frame pixels.
    pub fn run<D: DetectorBackend + ?Sized>(&self, backend: &mut D) -> anyhow::Result<Vec<Detection>> {
        backend.detect(&self.frame.data, self.frame.width, self.frame.height)
    }
}

// ----------------------------------------------------------------------------
// SampledFrame
// ----------------------------------------------------------------------------

/// A frame picked by the sampler.
///
/// `index` is the zero-based position of the frame in the decoded stream,
/// counting skipped frames, so it reflects true temporal position.
#[derive(Debug)]
pub struct SampledFrame {
    pub index: u64,
    pub frame: RawFrame,
}

impl SampledFrame {
    pub fn inference_view(&self) -> InferenceView<'_> {
        self.frame.inference_view()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
