/// YOLO-style text-region proposer using ONNX Runtime via `ort`.
///
/// Handles letterbox preprocessing, inference, confidence filtering and
/// NMS, then maps boxes back to whole-pixel frame coordinates.
use std::path::Path;

use crate::detection::domain::candidate_box::CandidateBox;
use crate::detection::domain::region_proposer::RegionProposer;
use crate::shared::frame::Frame;

use super::box_math::{nms, ScoredBox};
use super::onnx_session::{input_hw, load_session};

/// Fallback model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// Default confidence threshold for a text region.
pub const DEFAULT_CONFIDENCE: f64 = 0.25;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.45;

pub struct OnnxTextRegionProposer {
    session: ort::session::Session,
    confidence: f64,
    input_size: u32,
}

impl OnnxTextRegionProposer {
    /// Load a detection model and prepare for inference.
    ///
    /// The input resolution is read from the model's input shape (expecting
    /// square NCHW). Falls back to 640 if the shape is dynamic.
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = load_session(model_path)?;
        let input_size = input_hw(&session).0.unwrap_or(DEFAULT_INPUT_SIZE);
        Ok(Self {
            session,
            confidence,
            input_size,
        })
    }
}

impl RegionProposer for OnnxTextRegionProposer {
    fn propose(&mut self, frame: &Frame) -> Result<Vec<CandidateBox>, Box<dyn std::error::Error>> {
        let (input_tensor, scale, pad_x, pad_y) = letterbox(frame, self.input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("text detection model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        let mut boxes = parse_detections(data, &shape, self.confidence)?;
        for b in &mut boxes {
            b.x1 = (b.x1 - pad_x as f64) / scale;
            b.y1 = (b.y1 - pad_y as f64) / scale;
            b.x2 = (b.x2 - pad_x as f64) / scale;
            b.y2 = (b.y2 - pad_y as f64) / scale;
        }

        let kept = nms(&mut boxes, NMS_IOU_THRESH);
        Ok(to_candidate_boxes(&kept, frame.width(), frame.height()))
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Letterbox-resize a frame to `target_size` × `target_size`.
///
/// Returns `(NCHW float32 tensor, scale, pad_x, pad_y)`.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, f64, u32, u32) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = ((fw * scale).round() as u32).min(target_size);
    let new_h = ((fh * scale).round() as u32).min(target_size);
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    // Padding uses the YOLO convention of 114/255 gray.
    let gray = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), gray);

    let src = frame.as_ndarray(); // [H, W, C] u8
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    // Nearest-neighbor resize + copy into padded region
    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    (tensor, scale, pad_x, pad_y)
}

// ---------------------------------------------------------------------------
// Postprocessing
// ---------------------------------------------------------------------------

/// Decodes raw model output into letterbox-space boxes above `confidence`.
///
/// Accepts `[1, features, detections]` (YOLOv8 export layout) or
/// `[1, detections, features]`, where each row is `[cx, cy, w, h, score...]`
/// and the box score is the best class score.
fn parse_detections(
    data: &[f32],
    shape: &[usize],
    confidence: f64,
) -> Result<Vec<ScoredBox>, Box<dyn std::error::Error>> {
    if shape.len() != 3 {
        return Err(format!("Unexpected text detection output shape: {shape:?}").into());
    }
    let transposed = shape[1] < shape[2];
    let (num_dets, num_feats) = if transposed {
        (shape[2], shape[1])
    } else {
        (shape[1], shape[2])
    };
    if num_feats < 5 || data.len() < num_dets * num_feats {
        return Err(format!("Unexpected text detection output shape: {shape:?}").into());
    }

    let value = |det: usize, feat: usize| -> f64 {
        let idx = if transposed {
            feat * num_dets + det
        } else {
            det * num_feats + feat
        };
        data[idx] as f64
    };

    let mut boxes = Vec::new();
    for i in 0..num_dets {
        let score = (4..num_feats)
            .map(|f| value(i, f))
            .fold(f64::NEG_INFINITY, f64::max);
        if score < confidence {
            continue;
        }

        let cx = value(i, 0);
        let cy = value(i, 1);
        let w = value(i, 2);
        let h = value(i, 3);
        boxes.push(ScoredBox {
            x1: cx - w / 2.0,
            y1: cy - h / 2.0,
            x2: cx + w / 2.0,
            y2: cy + h / 2.0,
            confidence: score,
        });
    }
    Ok(boxes)
}

/// Snaps boxes outward to whole pixels, clamps them to the frame, drops
/// empty results and orders the rest top-to-bottom, then left-to-right.
fn to_candidate_boxes(boxes: &[ScoredBox], width: u32, height: u32) -> Vec<CandidateBox> {
    let w = width as f64;
    let h = height as f64;
    let mut out: Vec<CandidateBox> = boxes
        .iter()
        .map(|b| {
            CandidateBox::new(
                b.x1.floor().clamp(0.0, w) as i32,
                b.y1.floor().clamp(0.0, h) as i32,
                b.x2.ceil().clamp(0.0, w) as i32,
                b.y2.ceil().clamp(0.0, h) as i32,
            )
        })
        .filter(CandidateBox::is_valid)
        .collect();
    out.sort_by_key(|b| (b.y1, b.x1));
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letterbox_preserves_aspect_ratio() {
        // 200x100 frame → letterbox to 640x640
        // Scale = min(640/200, 640/100) = 3.2 → 640x320, pad_y = 160
        let data = vec![128u8; 200 * 100 * 3];
        let frame = Frame::new(data, 200, 100, 3, 0);
        let (tensor, scale, pad_x, pad_y) = letterbox(&frame, 640);

        assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
        assert!((scale - 3.2).abs() < 0.01);
        assert_eq!(pad_x, 0);
        assert_eq!(pad_y, 160);
    }

    #[test]
    fn test_letterbox_broadcast_frame() {
        // 16:9 broadcast frame: 1280x720 → scale 0.5, 640x360, pad_y 140
        let data = vec![0u8; 1280 * 720 * 3];
        let frame = Frame::new(data, 1280, 720, 3, 0);
        let (_, scale, pad_x, pad_y) = letterbox(&frame, 640);
        assert!((scale - 0.5).abs() < 1e-9);
        assert_eq!(pad_x, 0);
        assert_eq!(pad_y, 140);
    }

    #[test]
    fn test_letterbox_values_normalized() {
        let data = vec![255u8; 100 * 50 * 3];
        let frame = Frame::new(data, 100, 50, 3, 0);
        let (tensor, _, pad_x, pad_y) = letterbox(&frame, 640);

        let y = pad_y as usize + 1;
        let x = pad_x as usize + 1;
        assert!((tensor[[0, 0, y, x]] - 1.0).abs() < 0.01);

        let pad_val = 114.0 / 255.0;
        assert!((tensor[[0, 0, 0, 0]] - pad_val).abs() < 0.01);
    }

    #[test]
    fn test_parse_detections_row_major_multi_class() {
        // [1, 7, 6]: detections-major, two class scores per detection
        let mut data = vec![0.0f32; 7 * 6];
        data[..6].copy_from_slice(&[50.0, 20.0, 40.0, 10.0, 0.1, 0.9]);
        data[6..12].copy_from_slice(&[10.0, 10.0, 4.0, 4.0, 0.1, 0.2]);

        let boxes = parse_detections(&data, &[1, 7, 6], 0.25).unwrap();
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].x1, 30.0);
        assert_eq!(boxes[0].y1, 15.0);
        assert_eq!(boxes[0].x2, 70.0);
        assert_eq!(boxes[0].y2, 25.0);
        assert!((boxes[0].confidence - 0.9f32 as f64).abs() < 1e-9);
    }

    #[test]
    fn test_parse_detections_transposed() {
        // [1, 5, 6]: features-major (YOLOv8 export), single class
        #[rustfmt::skip]
        let data = vec![
            10.0, 100.0, 200.0, 0.0, 0.0, 0.0, // cx
            10.0, 100.0, 200.0, 0.0, 0.0, 0.0, // cy
            4.0, 20.0, 8.0, 1.0, 1.0, 1.0,     // w
            4.0, 10.0, 8.0, 1.0, 1.0, 1.0,     // h
            0.1, 0.6, 0.8, 0.0, 0.0, 0.0,      // score
        ];
        let boxes = parse_detections(&data, &[1, 5, 6], 0.5).unwrap();
        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes[0].x1, 90.0);
        assert_eq!(boxes[0].y1, 95.0);
        assert!((boxes[1].confidence - 0.8f32 as f64).abs() < 1e-9);
    }

    #[test]
    fn test_parse_detections_rejects_bad_shape() {
        assert!(parse_detections(&[0.0; 4], &[1, 4], 0.5).is_err());
        assert!(parse_detections(&[0.0; 8], &[1, 2, 4], 0.5).is_err());
    }

    #[test]
    fn test_to_candidate_boxes_clamps_and_orders() {
        let boxes = vec![
            ScoredBox {
                x1: 900.4,
                y1: 650.2,
                x2: 1010.0,
                y2: 700.6,
                confidence: 0.9,
            },
            ScoredBox {
                x1: -5.0,
                y1: 10.0,
                x2: 120.5,
                y2: 40.0,
                confidence: 0.5,
            },
        ];
        let out = to_candidate_boxes(&boxes, 1000, 720);
        assert_eq!(
            out,
            vec![
                CandidateBox::new(0, 10, 121, 40),
                CandidateBox::new(900, 650, 1000, 701),
            ]
        );
    }

    #[test]
    fn test_to_candidate_boxes_drops_boxes_outside_frame() {
        let boxes = vec![ScoredBox {
            x1: 1100.0,
            y1: 10.0,
            x2: 1200.0,
            y2: 40.0,
            confidence: 0.9,
        }];
        assert!(to_candidate_boxes(&boxes, 1000, 720).is_empty());
    }
}
