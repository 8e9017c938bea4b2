pub mod candidate_box;
pub mod region_proposer;
pub mod text_recognizer;
pub mod zone_policy;
