use std::path::Path;

use thiserror::Error;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

#[derive(Error, Debug)]
pub enum DecodeError {
    /// The source could not be opened (missing file, unsupported container,
    /// no video stream).
    #[error("cannot open {path}: {reason}")]
    Open { path: String, reason: String },
    /// The decoder failed to produce the next frame.
    #[error("decode failed after {frames_read} frames: {reason}")]
    Read { frames_read: u64, reason: String },
    #[error("reader used before open")]
    NotOpened,
}

/// Sequential, forward-only source of decoded frames.
///
/// There is no seek. Callers reach later frames by reading and
/// discarding. Non-fatal decoder diagnostics are handled inside
/// implementations and never surface as errors.
pub trait VideoReader: Send {
    /// Opens a video file and returns its metadata.
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, DecodeError>;

    /// Decodes the next frame in stream order.
    ///
    /// `Ok(None)` signals end of stream. Frame indices start at 0 and
    /// increase by one per call.
    fn read_next(&mut self) -> Result<Option<Frame>, DecodeError>;

    /// Releases any resources held by the reader. Safe to call twice.
    fn close(&mut self);
}
