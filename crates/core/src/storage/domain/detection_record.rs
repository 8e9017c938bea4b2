use crate::shared::constants::BLOCK_DELIMITER;
use crate::shared::stream_position::StreamPosition;

/// Text read from one sampled frame.
///
/// Texts are stored one per log line, so construction normalises them:
/// line breaks inside a string collapse to a single space, and strings
/// that are blank or read as a block delimiter line are dropped.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionRecord {
    pub frame_index: u64,
    pub timestamp_seconds: f64,
    pub texts: Vec<String>,
}

impl DetectionRecord {
    pub fn new<I, S>(position: StreamPosition, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            frame_index: position.frame_index,
            timestamp_seconds: position.timestamp_seconds,
            texts: texts
                .into_iter()
                .filter_map(|t| normalize_text(t.as_ref()))
                .collect(),
        }
    }
}

/// Collapses line breaks to spaces.
///
/// `None` for blank input and for text that would read back as a block
/// delimiter, since either would corrupt the log's block structure.
pub fn normalize_text(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed == BLOCK_DELIMITER {
        return None;
    }
    if !text.contains(|c: char| c == '\n' || c == '\r') {
        return Some(text.to_string());
    }

    let mut out = String::with_capacity(text.len());
    let mut in_break = false;
    for c in text.chars() {
        if c == '\n' || c == '\r' {
            if !in_break {
                out.push(' ');
            }
            in_break = true;
        } else {
            out.push(c);
            in_break = false;
        }
    }
    Some(out)
}
