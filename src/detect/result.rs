use serde::{Serialize, Serializer};

/// Axis-aligned box in frame pixel coordinates, `x2 >= x1`, `y2 >= y1`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Finite coordinates with non-negative extent.
    pub fn is_well_formed(&self) -> bool {
        [self.x1, self.y1, self.x2, self.y2]
            .iter()
            .all(|v| v.is_finite())
            && self.x2 >= self.x1
            && self.y2 >= self.y1
    }

    pub fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    pub fn iou(&self, other: &BBox) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);
        let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }
}

// Serialized as `[x1, y1, x2, y2]`.
impl Serialize for BBox {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        [self.x1, self.y1, self.x2, self.y2].serialize(serializer)
    }
}

/// One labelled box reported by a detector.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
    pub bbox: BBox,
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f32, bbox: BBox) -> Self {
        Self {
            label: label.into(),
            confidence,
            bbox,
        }
    }
}

/// Qualifying detections for one sampled frame, in detector order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameResult {
    pub frame_index: u64,
    pub detections: Vec<Detection>,
}

impl FrameResult {
    pub fn new(frame_index: u64, detections: Vec<Detection>) -> Self {
        Self {
            frame_index,
            detections,
        }
    }

    pub fn is_qualifying(&self) -> bool {
        !self.detections.is_empty()
    }

    /// Highest-confidence detection; the first one seen wins ties.
    pub fn best_detection(&self) -> Option<&Detection> {
        let mut best: Option<&Detection> = None;
        for detection in &self.detections {
            match best {
                Some(current) if detection.confidence <= current.confidence => {}
                _ => best = Some(detection),
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(label: &str, confidence: f32, x1: f32) -> Detection {
        Detection::new(label, confidence, BBox::new(x1, 0.0, x1 + 10.0, 10.0))
    }

    #[test]
    fn best_detection_picks_highest_confidence() {
        let result = FrameResult::new(0, vec![det("car", 0.87, 1.0), det("car", 0.91, 2.0)]);
        assert_eq!(result.best_detection().unwrap().bbox.x1, 2.0);

        let reversed = FrameResult::new(0, vec![det("car", 0.91, 2.0), det("car", 0.87, 1.0)]);
        assert_eq!(reversed.best_detection().unwrap().bbox.x1, 2.0);
    }

    #[test]
    fn best_detection_ties_go_to_first_seen() {
        let result = FrameResult::new(
            3,
            vec![det("car", 0.5, 1.0), det("car", 0.9, 2.0), det("car", 0.9, 3.0)],
        );
        assert_eq!(result.best_detection().unwrap().bbox.x1, 2.0);
    }

    #[test]
    fn empty_result_has_no_best() {
        let result = FrameResult::new(0, Vec::new());
        assert!(!result.is_qualifying());
        assert!(result.best_detection().is_none());
    }

    #[test]
    fn bbox_well_formed_checks_order_and_finiteness() {
        assert!(BBox::new(0.0, 0.0, 0.0, 0.0).is_well_formed());
        assert!(!BBox::new(5.0, 0.0, 4.0, 1.0).is_well_formed());
        assert!(!BBox::new(0.0, 0.0, f32::NAN, 1.0).is_well_formed());
    }

    #[test]
    fn iou_of_identical_boxes_is_one() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
        let b = BBox::new(20.0, 20.0, 30.0, 30.0);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn detection_serializes_bbox_as_array() {
        let json = serde_json::to_value(det("car", 0.9, 1.0)).unwrap();
        assert_eq!(json["label"], "car");
        assert_eq!(json["bbox"], serde_json::json!([1.0, 0.0, 11.0, 10.0]));
    }
}
