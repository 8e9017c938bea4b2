pub mod box_math;
pub mod onnx_ctc_recognizer;
pub mod onnx_session;
pub mod onnx_text_region_proposer;
