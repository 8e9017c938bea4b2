use crate::shared::constants::DEFAULT_INTERVAL_FRAMES;
use crate::shared::video_metadata::VideoMetadata;

/// User-facing sampling configuration, in seconds where possible.
#[derive(Clone, Debug, PartialEq)]
pub struct SamplingConfig {
    /// Sample one frame every N seconds. Overrides `interval_frames`.
    pub interval_seconds: Option<f64>,
    /// Sample one frame every N frames when no time interval is set.
    pub interval_frames: u64,
    pub start_time_seconds: f64,
    /// Stop before this time; `None` runs to the end of the stream.
    pub end_time_seconds: Option<f64>,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            interval_seconds: None,
            interval_frames: DEFAULT_INTERVAL_FRAMES,
            start_time_seconds: 0.0,
            end_time_seconds: None,
        }
    }
}

/// Frame-index form of a [`SamplingConfig`] for one stream.
///
/// Targets are `start_frame + k * cadence_frames` for `k >= 0`, bounded
/// above (exclusive) by `end_frame` when one is known.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SampleWindow {
    pub start_frame: u64,
    pub end_frame: Option<u64>,
    pub cadence_frames: u64,
}

impl SampleWindow {
    /// Converts `config` to frame indices using the stream's frame rate.
    ///
    /// Every conversion uses one rule: times map to frames with `floor`
    /// for window edges and round-half-away-from-zero for the cadence,
    /// and any value that would leave the window unusable is clamped
    /// (cadence to 1, start to 0) rather than rejected.
    pub fn resolve(config: &SamplingConfig, metadata: &VideoMetadata) -> Self {
        let fps = metadata.frame_rate();

        let cadence_frames = match config.interval_seconds {
            Some(seconds) => frames_nearest(seconds * fps),
            None => config.interval_frames,
        };
        if cadence_frames < 1 {
            log::warn!("Sampling interval resolves to less than one frame, using 1");
        }
        let cadence_frames = cadence_frames.max(1);

        let start_frame = frames_floor(config.start_time_seconds * fps);
        let end_frame = match config.end_time_seconds {
            Some(seconds) => Some(frames_floor(seconds * fps)),
            None => metadata.known_total_frames(),
        };

        Self {
            start_frame,
            end_frame,
            cadence_frames,
        }
    }

    /// True when `index` lies inside the window's bounds.
    pub fn contains(&self, index: u64) -> bool {
        index >= self.start_frame && self.end_frame.map_or(true, |end| index < end)
    }

    /// Number of frames this window will sample, when the end is known.
    pub fn expected_samples(&self) -> Option<u64> {
        self.end_frame.map(|end| {
            if end <= self.start_frame {
                0
            } else {
                (end - self.start_frame).div_ceil(self.cadence_frames)
            }
        })
    }
}

/// Floors a non-negative frame position; negative or non-finite values map to 0.
fn frames_floor(frames: f64) -> u64 {
    if frames.is_finite() && frames > 0.0 {
        frames.floor() as u64
    } else {
        0
    }
}

fn frames_nearest(frames: f64) -> u64 {
    if frames.is_finite() && frames > 0.0 {
        frames.round() as u64
    } else {
        0
    }
}
