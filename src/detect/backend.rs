use anyhow::Result;

use crate::detect::result::Detection;
use crate::frame::InferenceView;

/// Detection capabilities a backend may offer.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetectionCapability {
    /// Labelled bounding boxes (the walkaround pipeline needs this).
    ObjectDetection,
}

/// Detector backend trait.
///
/// A backend is constructed once and passed by reference into each run.
/// Implementations must treat the pixel slice as read-only and must not keep it
/// past the `detect` call.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Returns true when the backend supports a capability.
    fn supports(&self, capability: DetectionCapability) -> bool;

    /// Run detection on one RGB24 frame. Boxes are in frame pixel coordinates.
    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<Detection>>;

    /// Run detection on several frames. Results come back in input order.
    ///
    /// The default issues one `detect` call per frame.
    fn detect_batch(&mut self, frames: &[InferenceView<'_>]) -> Vec<Result<Vec<Detection>>> {
        let mut results = Vec::with_capacity(frames.len());
        for view in frames {
            results.push(view.run(&mut *self));
        }
        results
    }

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
