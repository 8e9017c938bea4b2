use crate::shared::frame::Frame;

use super::candidate_box::CandidateBox;

/// Domain interface for text-region proposal.
///
/// Returns candidate boxes in the proposer's own order; downstream
/// filtering preserves that order. Implementations may hold inference
/// state, hence `&mut self`.
pub trait RegionProposer: Send {
    fn propose(&mut self, frame: &Frame) -> Result<Vec<CandidateBox>, Box<dyn std::error::Error>>;
}
