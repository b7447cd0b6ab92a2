use anyhow::{anyhow, Result};

use crate::detect::backend::{DetectionCapability, DetectorBackend};
use crate::detect::result::{BBox, Detection};
use crate::frame::RGB_CHANNELS;

/// Label reported by the stub backend.
pub const STUB_LABEL: &str = "car";

/// Confidence reported by the stub backend.
pub const STUB_CONFIDENCE: f32 = 0.9;

/// Stub backend for tests and synthetic runs.
///
/// Reports the bounding box of all saturated white pixels as a single `car`
/// detection. The synthetic walkaround source paints its subject this way.
#[derive(Default)]
pub struct StubBackend {
    label: Option<&'static str>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a different label (useful to exercise label filtering).
    pub fn with_label(label: &'static str) -> Self {
        Self { label: Some(label) }
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn supports(&self, capability: DetectionCapability) -> bool {
        matches!(capability, DetectionCapability::ObjectDetection)
    }

    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<Detection>> {
        let expected = (width as usize) * (height as usize) * RGB_CHANNELS;
        if pixels.len() != expected {
            return Err(anyhow!(
                "expected {} RGB bytes, received {}",
                expected,
                pixels.len()
            ));
        }

        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        for (i, px) in pixels.chunks_exact(RGB_CHANNELS).enumerate() {
            if px.iter().any(|&c| c != u8::MAX) {
                continue;
            }
            let x = (i % width as usize) as u32;
            let y = (i / width as usize) as u32;
            bounds = Some(match bounds {
                None => (x, y, x, y),
                Some((x1, y1, x2, y2)) => (x1.min(x), y1.min(y), x2.max(x), y2.max(y)),
            });
        }

        Ok(bounds
            .map(|(x1, y1, x2, y2)| {
                vec![Detection::new(
                    self.label.unwrap_or(STUB_LABEL),
                    STUB_CONFIDENCE,
                    BBox::new(x1 as f32, y1 as f32, (x2 + 1) as f32, (y2 + 1) as f32),
                )]
            })
            .unwrap_or_default())
    }
}
