use crate::shared::constants::{DEFAULT_ZONE_RATIO, MAX_ZONE_RATIO, MIN_ZONE_RATIO};

use super::candidate_box::CandidateBox;

/// Restricts accepted regions to the overlay bands of a frame.
///
/// With ratio `r` and frame height `h`, the top zone is `[0, r*h)` and the
/// bottom zone is `[(1-r)*h, h)`. A box is accepted when its vertical
/// center falls in either zone. A disabled policy accepts every box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZonePolicy {
    enabled: bool,
    ratio: f64,
}

impl ZonePolicy {
    /// Builds a policy, clamping `ratio` into `(0, 0.5]`.
    ///
    /// Non-positive or non-finite ratios become [`MIN_ZONE_RATIO`]; any
    /// positive ratio up to 0.5 is kept as given.
    pub fn new(enabled: bool, ratio: f64) -> Self {
        let clamped = if !ratio.is_finite() || ratio <= 0.0 {
            MIN_ZONE_RATIO
        } else {
            ratio.min(MAX_ZONE_RATIO)
        };
        if clamped != ratio {
            log::warn!("Zone ratio {ratio} out of range, using {clamped}");
        }
        Self {
            enabled,
            ratio: clamped,
        }
    }

    pub fn disabled() -> Self {
        Self::new(false, DEFAULT_ZONE_RATIO)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    pub fn accepts(&self, bbox: &CandidateBox, frame_height: u32) -> bool {
        if !self.enabled {
            return true;
        }
        let h = f64::from(frame_height);
        let cy = bbox.center_y();
        cy < self.ratio * h || cy >= (1.0 - self.ratio) * h
    }
}

impl Default for ZonePolicy {
    fn default() -> Self {
        Self::new(true, DEFAULT_ZONE_RATIO)
    }
}
