#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::{DetectionCapability, DetectorBackend};
use crate::detect::result::{BBox, Detection};
use crate::frame::RGB_CHANNELS;

/// COCO class names in YOLO output order.
pub const COCO_CLASSES: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich", "orange",
    "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch", "potted plant",
    "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote", "keyboard", "cell phone",
    "microwave", "oven", "toaster", "sink", "refrigerator", "book", "clock", "vase", "scissors",
    "teddy bear", "hair drier", "toothbrush",
];

const DEFAULT_INPUT_SIZE: u32 = 640;
const DEFAULT_CONFIDENCE: f32 = 0.25;
const DEFAULT_IOU: f32 = 0.45;
const DEFAULT_MAX_DETECTIONS: usize = 100;

/// Tract-based backend for YOLO-family ONNX detectors.
///
/// Loads a local model file and runs it on RGB frames resized to the square
/// model input. Output rows are `[cx, cy, w, h, class scores...]`; boxes are
/// mapped back to frame pixel coordinates. No network I/O.
pub struct TractBackend {
    model: TypedRunnableModel<TypedModel>,
    input_size: u32,
    confidence_threshold: f32,
    iou_threshold: f32,
    max_detections: usize,
    class_names: Vec<String>,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        Self::with_input_size(model_path, DEFAULT_INPUT_SIZE)
    }

    pub fn with_input_size<P: AsRef<Path>>(model_path: P, input_size: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let side = input_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, side, side)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            input_size,
            confidence_threshold: DEFAULT_CONFIDENCE,
            iou_threshold: DEFAULT_IOU,
            max_detections: DEFAULT_MAX_DETECTIONS,
            class_names: COCO_CLASSES.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Override the default confidence threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Override the class names (for models not trained on COCO).
    pub fn with_class_names(mut self, names: Vec<String>) -> Self {
        self.class_names = names;
        self
    }

    fn build_input(&self, pixels: &[u8], width: u32, height: u32) -> Result<Tensor> {
        let expected_len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(RGB_CHANNELS))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if pixels.len() != expected_len || width == 0 || height == 0 {
            return Err(anyhow!(
                "expected {} RGB bytes, received {}",
                expected_len,
                pixels.len()
            ));
        }

        // Nearest-neighbour resize into the square model input.
        let side = self.input_size as usize;
        let (src_w, src_h) = (width as usize, height as usize);
        let input = tract_ndarray::Array4::from_shape_fn((1, 3, side, side), |(_, channel, y, x)| {
            let sx = (x * src_w / side).min(src_w - 1);
            let sy = (y * src_h / side).min(src_h - 1);
            pixels[(sy * src_w + sx) * RGB_CHANNELS + channel] as f32 / 255.0
        });

        Ok(input.into_tensor())
    }

    fn decode_output(&self, outputs: TVec<TValue>, width: u32, height: u32) -> Result<Vec<Detection>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?
            .into_dimensionality::<tract_ndarray::Ix3>()
            .context("model output was not rank 3")?;

        let (_, a, b) = view.dim();
        // YOLOv8/11 exports [1, 4 + classes, anchors]; some exports transpose it.
        let channels_first = a < b;
        let (attrs, anchors) = if channels_first { (a, b) } else { (b, a) };
        if attrs <= 4 {
            return Err(anyhow!("model output has {} attributes per anchor", attrs));
        }
        let at = |attr: usize, anchor: usize| {
            if channels_first {
                view[[0, attr, anchor]]
            } else {
                view[[0, anchor, attr]]
            }
        };

        let sx = width as f32 / self.input_size as f32;
        let sy = height as f32 / self.input_size as f32;
        let mut candidates: Vec<(usize, Detection)> = Vec::new();
        for anchor in 0..anchors {
            let mut best_class = 0usize;
            let mut best_score = f32::NEG_INFINITY;
            for class in 0..attrs - 4 {
                let score = at(4 + class, anchor);
                if score > best_score {
                    best_score = score;
                    best_class = class;
                }
            }
            if !best_score.is_finite() || best_score < self.confidence_threshold {
                continue;
            }
            let (cx, cy, w, h) = (at(0, anchor), at(1, anchor), at(2, anchor), at(3, anchor));
            let bbox = BBox::new(
                ((cx - w / 2.0) * sx).clamp(0.0, width as f32),
                ((cy - h / 2.0) * sy).clamp(0.0, height as f32),
                ((cx + w / 2.0) * sx).clamp(0.0, width as f32),
                ((cy + h / 2.0) * sy).clamp(0.0, height as f32),
            );
            let label = self
                .class_names
                .get(best_class)
                .cloned()
                .unwrap_or_else(|| format!("class_{}", best_class));
            candidates.push((best_class, Detection::new(label, best_score, bbox)));
        }

        Ok(non_max_suppression(
            candidates,
            self.iou_threshold,
            self.max_detections,
        ))
    }
}

/// Class-wise NMS. Output is ordered by descending confidence.
fn non_max_suppression(
    mut candidates: Vec<(usize, Detection)>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<Detection> {
    candidates.sort_by(|a, b| b.1.confidence.total_cmp(&a.1.confidence));
    let mut kept: Vec<(usize, Detection)> = Vec::new();
    for (class, det) in candidates {
        if kept.len() >= max_detections {
            break;
        }
        let suppressed = kept
            .iter()
            .any(|(k_class, k)| *k_class == class && k.bbox.iou(&det.bbox) > iou_threshold);
        if !suppressed {
            kept.push((class, det));
        }
    }
    kept.into_iter().map(|(_, det)| det).collect()
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn supports(&self, capability: DetectionCapability) -> bool {
        matches!(capability, DetectionCapability::ObjectDetection)
    }

    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<Detection>> {
        let input = self.build_input(pixels, width, height)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        self.decode_output(outputs, width, height)
    }

    fn warm_up(&mut self) -> Result<()> {
        let side = self.input_size;
        let blank = vec![0u8; (side as usize) * (side as usize) * RGB_CHANNELS];
        self.detect(&blank, side, side).map(|_| ())
    }
}
