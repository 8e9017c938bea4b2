pub mod frame_sampler;
pub mod sample_window;
