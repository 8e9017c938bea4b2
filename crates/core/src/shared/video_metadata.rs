use std::path::PathBuf;

use super::constants::DEFAULT_FRAME_RATE;

/// Stream properties reported by a decoder at open time.
///
/// Both `fps` and `total_frames` are best-effort: containers without a
/// usable rate report `0.0`, and streams without an index report `0`.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub total_frames: u64,
    pub codec: String,
    pub source_path: Option<PathBuf>,
}

impl VideoMetadata {
    /// Frame rate used for all index/time conversions of a run.
    ///
    /// Falls back to [`DEFAULT_FRAME_RATE`] when the decoder could not
    /// report a positive, finite rate.
    pub fn frame_rate(&self) -> f64 {
        if self.fps.is_finite() && self.fps > 0.0 {
            self.fps
        } else {
            DEFAULT_FRAME_RATE
        }
    }

    /// Total frame count, or `None` when the decoder could not report it.
    pub fn known_total_frames(&self) -> Option<u64> {
        (self.total_frames > 0).then_some(self.total_frames)
    }
}
