pub mod detection;
pub mod pipeline;
pub mod sampling;
pub mod shared;
pub mod storage;
pub mod video;
