/// CTC line recognizer using ONNX Runtime via `ort`.
///
/// Expects a CRNN-style model taking `[1, 3, 48, W]` and producing
/// per-timestep class probabilities `[1, T, classes]`, where class 0 is
/// the CTC blank and class `i` maps to line `i - 1` of the charset file.
use std::fs;
use std::path::Path;

use ndarray::{Array4, ArrayView2};

use crate::detection::domain::text_recognizer::TextRecognizer;
use crate::shared::frame::Frame;

use super::onnx_session::{input_hw, load_session};

/// Input height used when the model leaves it dynamic.
const DEFAULT_INPUT_HEIGHT: u32 = 48;

/// Upper bound on the resized width for dynamic-width models.
const MAX_INPUT_WIDTH: u32 = 2048;

pub struct OnnxCtcRecognizer {
    session: ort::session::Session,
    charset: Vec<String>,
    input_height: u32,
    fixed_width: Option<u32>,
}

impl OnnxCtcRecognizer {
    pub fn new(model_path: &Path, charset_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let text = fs::read_to_string(charset_path).map_err(|e| {
            format!("Failed to read charset {}: {e}", charset_path.display())
        })?;
        let charset = parse_charset(&text);
        if charset.is_empty() {
            return Err(format!("Charset {} is empty", charset_path.display()).into());
        }

        let session = load_session(model_path)?;
        let (height, width) = input_hw(&session);
        log::debug!(
            "Recognizer charset has {} symbols, input height {:?}, width {:?}",
            charset.len(),
            height,
            width
        );
        Ok(Self {
            session,
            charset,
            input_height: height.unwrap_or(DEFAULT_INPUT_HEIGHT),
            fixed_width: width,
        })
    }
}

impl TextRecognizer for OnnxCtcRecognizer {
    fn recognize(&mut self, image: &Frame) -> Result<Vec<String>, Box<dyn std::error::Error>> {
        if image.channels() != 3 {
            return Err(format!("Expected RGB input, got {} channels", image.channels()).into());
        }
        if image.width() == 0 || image.height() == 0 {
            return Ok(Vec::new());
        }

        let input_tensor = preprocess(image, self.input_height, self.fixed_width)?;
        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("text recognition model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        if shape.len() != 3 || shape[0] != 1 {
            return Err(format!("Unexpected text recognition output shape: {shape:?}").into());
        }
        let probs = tensor
            .to_shape((shape[1], shape[2]))
            .map_err(|e| format!("Cannot reshape recognition output: {e}"))?;

        let text = ctc_greedy_decode(probs.view(), &self.charset);
        if text.trim().is_empty() {
            Ok(Vec::new())
        } else {
            Ok(vec![text])
        }
    }
}

/// One symbol per line. A trailing `\r` is stripped and a space symbol is
/// appended when the file does not already define one.
fn parse_charset(text: &str) -> Vec<String> {
    let mut charset: Vec<String> = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if !charset.is_empty() && !charset.iter().any(|s| s == " ") {
        charset.push(" ".to_string());
    }
    charset
}

/// Resizes to the model height keeping aspect ratio and normalises to
/// `[-1, 1]`. Fixed-width models get the remainder zero-padded on the right.
fn preprocess(
    image: &Frame,
    input_height: u32,
    fixed_width: Option<u32>,
) -> Result<Array4<f32>, Box<dyn std::error::Error>> {
    let ratio = image.width() as f64 / image.height() as f64;
    let scaled_width = ((input_height as f64 * ratio).ceil() as u32).max(1);
    let (resized_width, tensor_width) = match fixed_width {
        Some(w) => (scaled_width.min(w), w),
        None => {
            let w = scaled_width.min(MAX_INPUT_WIDTH);
            (w, w)
        }
    };

    let img = image::RgbImage::from_raw(image.width(), image.height(), image.data().to_vec())
        .ok_or("Failed to create image from frame data")?;
    let resized = image::imageops::resize(
        &img,
        resized_width,
        input_height,
        image::imageops::FilterType::Triangle,
    );

    let mut tensor =
        Array4::<f32>::zeros((1, 3, input_height as usize, tensor_width as usize));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            let v = pixel[c] as f32 / 255.0;
            tensor[[0, c, y as usize, x as usize]] = (v - 0.5) / 0.5;
        }
    }
    Ok(tensor)
}

/// Best-path CTC decoding: argmax per timestep, collapse repeats, drop blanks.
///
/// Indices past the end of the charset are ignored.
fn ctc_greedy_decode(probs: ArrayView2<'_, f32>, charset: &[String]) -> String {
    let mut text = String::new();
    let mut previous = 0usize;
    for row in probs.rows() {
        let best = row
            .iter()
            .enumerate()
            .fold((0usize, f32::NEG_INFINITY), |acc, (i, &p)| {
                if p > acc.1 {
                    (i, p)
                } else {
                    acc
                }
            })
            .0;
        if best != 0 && best != previous {
            if let Some(symbol) = charset.get(best - 1) {
                text.push_str(symbol);
            }
        }
        previous = best;
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn charset() -> Vec<String> {
        parse_charset("0\n1\n2\n:\nA\nB\n")
    }

    /// One-hot probabilities for a sequence of class indices.
    fn one_hot(path: &[usize], classes: usize) -> Array2<f32> {
        let mut probs = Array2::<f32>::zeros((path.len(), classes));
        for (t, &c) in path.iter().enumerate() {
            probs[[t, c]] = 1.0;
        }
        probs
    }

    #[test]
    fn test_parse_charset_appends_space() {
        let cs = charset();
        assert_eq!(cs, vec!["0", "1", "2", ":", "A", "B", " "]);
    }

    #[test]
    fn test_parse_charset_strips_carriage_returns() {
        let cs = parse_charset("x\r\ny\r\n \r\n");
        assert_eq!(cs, vec!["x", "y", " "]);
    }

    #[test]
    fn test_parse_charset_empty() {
        assert!(parse_charset("").is_empty());
    }

    #[test]
    fn test_ctc_collapses_repeats_and_blanks() {
        let cs = charset();
        // "A", "A", blank, "A", "1", "1", ":", "2" → "AA1:2"
        let probs = one_hot(&[5, 5, 0, 5, 2, 2, 4, 3], cs.len() + 1);
        assert_eq!(ctc_greedy_decode(probs.view(), &cs), "AA1:2");
    }

    #[test]
    fn test_ctc_all_blank_is_empty() {
        let cs = charset();
        let probs = one_hot(&[0, 0, 0], cs.len() + 1);
        assert_eq!(ctc_greedy_decode(probs.view(), &cs), "");
    }

    #[test]
    fn test_ctc_maps_space_symbol() {
        let cs = charset();
        // "A", space, "B"
        let probs = one_hot(&[5, 7, 6], cs.len() + 1);
        assert_eq!(ctc_greedy_decode(probs.view(), &cs), "A B");
    }

    #[test]
    fn test_ctc_ignores_out_of_range_class() {
        let cs = charset();
        let probs = one_hot(&[1, 20], 21);
        assert_eq!(ctc_greedy_decode(probs.view(), &cs), "0");
    }

    #[test]
    fn test_preprocess_scales_to_height_and_normalizes() {
        // 40x10 white strip → 192x48, all values 1.0
        let frame = Frame::new(vec![255u8; 40 * 10 * 3], 40, 10, 3, 0);
        let tensor = preprocess(&frame, 48, None).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 48, 192]);
        assert!((tensor[[0, 0, 0, 0]] - 1.0).abs() < 1e-6);
        assert!((tensor[[0, 2, 47, 191]] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_preprocess_pads_fixed_width_models() {
        let frame = Frame::new(vec![0u8; 20 * 10 * 3], 20, 10, 3, 0);
        let tensor = preprocess(&frame, 48, Some(320)).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 48, 320]);
        // Black maps to -1, padding stays 0.
        assert!((tensor[[0, 0, 10, 10]] + 1.0).abs() < 1e-6);
        assert_eq!(tensor[[0, 0, 10, 300]], 0.0);
    }

    #[test]
    fn test_preprocess_caps_dynamic_width() {
        let frame = Frame::new(vec![0u8; 4000 * 10 * 3], 4000, 10, 3, 0);
        let tensor = preprocess(&frame, 48, None).unwrap();
        assert_eq!(tensor.shape()[3], MAX_INPUT_WIDTH as usize);
    }

    #[test]
    fn test_new_with_missing_charset_fails() {
        let err = OnnxCtcRecognizer::new(
            Path::new("/nonexistent/rec.onnx"),
            Path::new("/nonexistent/charset.txt"),
        )
        .err()
        .unwrap();
        assert!(err.to_string().contains("charset"));
    }
}
