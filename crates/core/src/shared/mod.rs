pub mod constants;
pub mod frame;
pub mod stream_position;
pub mod video_metadata;
