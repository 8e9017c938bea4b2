/// Where a decoded frame sits in its stream.
///
/// `timestamp_seconds` is always derived from `frame_index` and the run's
/// frame rate, never read from container timestamps, so sampled times are
/// reproducible across runs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StreamPosition {
    pub frame_index: u64,
    pub timestamp_seconds: f64,
}

impl StreamPosition {
    pub fn new(frame_index: u64, frame_rate: f64) -> Self {
        Self {
            frame_index,
            timestamp_seconds: frame_index as f64 / frame_rate,
        }
    }
}
