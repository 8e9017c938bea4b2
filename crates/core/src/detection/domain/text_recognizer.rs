use crate::shared::frame::Frame;

/// Domain interface for optical text recognition.
///
/// Takes a whole frame or a crop and returns the strings read from it,
/// in reading order. May return empty or whitespace-only strings; the
/// aggregator drops those.
pub trait TextRecognizer: Send {
    fn recognize(&mut self, image: &Frame) -> Result<Vec<String>, Box<dyn std::error::Error>>;
}
