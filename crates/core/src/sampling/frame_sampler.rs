use std::iter::FusedIterator;

use crate::shared::frame::Frame;
use crate::shared::stream_position::StreamPosition;
use crate::video::domain::video_reader::VideoReader;

use super::sample_window::SampleWindow;

/// A frame selected for downstream processing, tagged with its position.
#[derive(Clone, Debug)]
pub struct SampledFrame {
    pub position: StreamPosition,
    pub frame: Frame,
}

/// Why a [`FrameSampler`] stopped yielding frames.
#[derive(Clone, Debug, PartialEq)]
pub enum SamplerStop {
    /// The decoder reported end of stream.
    EndOfStream,
    /// The next target index reached the window's end.
    WindowEnd,
    /// The decoder failed mid-stream; treated as end of stream.
    DecodeFailed(String),
}

/// Lazily selects frames `start + k * cadence` from a forward-only reader.
///
/// Frames are pulled one at a time and every non-target frame is read and
/// dropped; the reader is never asked to seek. The sequence is finite and
/// cannot be restarted.
pub struct FrameSampler<'a> {
    reader: &'a mut dyn VideoReader,
    window: SampleWindow,
    frame_rate: f64,
    next_target: u64,
    frames_read: u64,
    stop: Option<SamplerStop>,
}

impl<'a> FrameSampler<'a> {
    /// `reader` must be freshly opened, positioned before frame 0.
    pub fn new(reader: &'a mut dyn VideoReader, window: SampleWindow, frame_rate: f64) -> Self {
        let window = SampleWindow {
            cadence_frames: window.cadence_frames.max(1),
            ..window
        };
        Self {
            reader,
            window,
            frame_rate,
            next_target: window.start_frame,
            frames_read: 0,
            stop: None,
        }
    }

    /// Frames pulled from the reader so far, sampled or discarded.
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// `None` while the sampler can still yield frames.
    pub fn stop_reason(&self) -> Option<&SamplerStop> {
        self.stop.as_ref()
    }

    fn finish(&mut self, reason: SamplerStop) -> Option<SampledFrame> {
        self.stop = Some(reason);
        None
    }
}

impl Iterator for FrameSampler<'_> {
    type Item = SampledFrame;

    fn next(&mut self) -> Option<SampledFrame> {
        if self.stop.is_some() {
            return None;
        }
        if !self.window.contains(self.next_target) {
            return self.finish(SamplerStop::WindowEnd);
        }

        loop {
            match self.reader.read_next() {
                Ok(Some(frame)) => {
                    let index = self.frames_read;
                    self.frames_read += 1;
                    if index < self.next_target {
                        continue;
                    }

                    self.next_target = self.next_target.saturating_add(self.window.cadence_frames);
                    return Some(SampledFrame {
                        position: StreamPosition::new(index, self.frame_rate),
                        frame,
                    });
                }
                Ok(None) => return self.finish(SamplerStop::EndOfStream),
                Err(e) => {
                    log::warn!(
                        "Decoder failed after {} frames, stopping early: {e}",
                        self.frames_read
                    );
                    return self.finish(SamplerStop::DecodeFailed(e.to_string()));
                }
            }
        }
    }
}

impl FusedIterator for FrameSampler<'_> {}
