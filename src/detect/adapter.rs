//! Detection adapter: one detector call per sampled frame, normalised into a
//! `FrameResult` holding only qualifying detections.

use std::collections::BTreeSet;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{Detection, FrameResult};
use crate::error::VerifyError;
use crate::frame::SampledFrame;

/// Which detector labels count toward presence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LabelFilter {
    /// Only these labels qualify. An empty set qualifies nothing.
    Only(BTreeSet<String>),
    /// Every label qualifies. Must be asked for explicitly.
    Any,
}

impl LabelFilter {
    pub fn only<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Only(labels.into_iter().map(Into::into).collect())
    }

    pub fn allows(&self, label: &str) -> bool {
        match self {
            Self::Only(labels) => labels.contains(label),
            Self::Any => true,
        }
    }
}

impl Default for LabelFilter {
    fn default() -> Self {
        Self::only(["car"])
    }
}

/// Turns raw detector output into a `FrameResult`.
#[derive(Clone, Debug)]
pub struct DetectionAdapter {
    filter: LabelFilter,
    min_confidence: f32,
}

impl DetectionAdapter {
    pub fn new(filter: LabelFilter) -> Self {
        Self {
            filter,
            min_confidence: 0.0,
        }
    }

    /// Drop detections below this confidence (after rounding).
    pub fn with_min_confidence(mut self, min_confidence: f32) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    pub fn filter(&self) -> &LabelFilter {
        &self.filter
    }

    /// Invoke the backend exactly once for this frame. No retry, no caching.
    pub fn classify(
        &self,
        backend: &mut dyn DetectorBackend,
        frame: &SampledFrame,
    ) -> Result<FrameResult, VerifyError> {
        let raw = frame.inference_view().run(backend);
        self.normalize(frame.index, raw)
    }

    /// Normalise one backend result, tagging failures with the frame index.
    pub fn normalize(
        &self,
        frame_index: u64,
        raw: anyhow::Result<Vec<Detection>>,
    ) -> Result<FrameResult, VerifyError> {
        let raw = raw.map_err(|e| VerifyError::DetectionFailure {
            frame_index,
            reason: format!("{:#}", e),
        })?;

        let mut detections = Vec::with_capacity(raw.len());
        for mut detection in raw {
            if !self.filter.allows(&detection.label) {
                continue;
            }
            if !detection.confidence.is_finite()
                || !(0.0..=1.0).contains(&detection.confidence)
                || !detection.bbox.is_well_formed()
            {
                log::debug!(
                    "frame {}: discarding malformed '{}' detection",
                    frame_index,
                    detection.label
                );
                continue;
            }
            detection.confidence = round_confidence(detection.confidence);
            if detection.confidence < self.min_confidence {
                continue;
            }
            detections.push(detection);
        }

        Ok(FrameResult::new(frame_index, detections))
    }
}

/// Confidences are reported to three decimals.
fn round_confidence(confidence: f32) -> f32 {
    (confidence * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::result::BBox;
    use anyhow::anyhow;

    fn det(label: &str, confidence: f32) -> Detection {
        Detection::new(label, confidence, BBox::new(0.0, 0.0, 10.0, 10.0))
    }

    #[test]
    fn keeps_only_allowed_labels_in_order() {
        let adapter = DetectionAdapter::new(LabelFilter::only(["car", "truck"]));
        let result = adapter
            .normalize(
                5,
                Ok(vec![det("person", 0.9), det("truck", 0.4), det("car", 0.8)]),
            )
            .unwrap();
        assert_eq!(result.frame_index, 5);
        let labels: Vec<&str> = result.detections.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, vec!["truck", "car"]);
    }

    #[test]
    fn empty_allowed_set_qualifies_nothing() {
        let adapter = DetectionAdapter::new(LabelFilter::Only(BTreeSet::new()));
        let result = adapter.normalize(0, Ok(vec![det("car", 0.9)])).unwrap();
        assert!(result.detections.is_empty());
    }

    #[test]
    fn any_filter_passes_every_label() {
        let adapter = DetectionAdapter::new(LabelFilter::Any);
        let result = adapter
            .normalize(0, Ok(vec![det("person", 0.9), det("dog", 0.2)]))
            .unwrap();
        assert_eq!(result.detections.len(), 2);
    }

    #[test]
    fn backend_error_becomes_tagged_detection_failure() {
        let adapter = DetectionAdapter::new(LabelFilter::default());
        let err = adapter
            .normalize(42, Err(anyhow!("malformed image")))
            .unwrap_err();
        match err {
            VerifyError::DetectionFailure {
                frame_index,
                reason,
            } => {
                assert_eq!(frame_index, 42);
                assert!(reason.contains("malformed image"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn confidence_is_rounded_and_floored() {
        let adapter = DetectionAdapter::new(LabelFilter::default()).with_min_confidence(0.3);
        let result = adapter
            .normalize(0, Ok(vec![det("car", 0.91049), det("car", 0.2996), det("car", 0.29)]))
            .unwrap();
        let confidences: Vec<f32> = result.detections.iter().map(|d| d.confidence).collect();
        assert_eq!(confidences, vec![0.91, 0.3]);
    }

    #[test]
    fn malformed_detections_are_discarded() {
        let adapter = DetectionAdapter::new(LabelFilter::default());
        let inverted = Detection::new("car", 0.9, BBox::new(10.0, 0.0, 5.0, 5.0));
        let result = adapter
            .normalize(0, Ok(vec![inverted, det("car", 1.5), det("car", f32::NAN)]))
            .unwrap();
        assert!(result.detections.is_empty());
    }
}
