use crate::detection::domain::candidate_box::CandidateBox;
use crate::detection::domain::zone_policy::ZonePolicy;

/// Keeps the proposed boxes worth recognizing, in their original order.
///
/// A box survives when it is non-degenerate, lies fully inside the
/// `frame_width` × `frame_height` frame, and its vertical center falls in
/// a band accepted by `zone`. A disabled zone policy accepts every
/// in-frame box.
pub fn filter_boxes(
    boxes: &[CandidateBox],
    frame_width: u32,
    frame_height: u32,
    zone: &ZonePolicy,
) -> Vec<CandidateBox> {
    boxes
        .iter()
        .filter(|b| b.is_within(frame_width, frame_height))
        .filter(|b| zone.accepts(b, frame_height))
        .copied()
        .collect()
}
