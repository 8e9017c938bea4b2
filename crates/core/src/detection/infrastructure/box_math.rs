//! Box geometry shared by the ONNX detection backends.

/// A box in floating-point frame coordinates with its detector score.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoredBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub confidence: f64,
}

impl ScoredBox {
    fn corners(&self) -> [f64; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }
}

/// IoU between two bounding boxes represented as `[x1, y1, x2, y2]`.
pub fn bbox_iou(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }

    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    inter / (area_a + area_b - inter)
}

/// Greedy NMS: sort by confidence descending, suppress overlapping boxes.
pub fn nms(boxes: &mut [ScoredBox], iou_thresh: f64) -> Vec<ScoredBox> {
    boxes.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; boxes.len()];

    for i in 0..boxes.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(boxes[i].clone());
        for j in (i + 1)..boxes.len() {
            if suppressed[j] {
                continue;
            }
            if bbox_iou(&boxes[i].corners(), &boxes[j].corners()) > iou_thresh {
                suppressed[j] = true;
            }
        }
    }
    keep
}
