pub mod constants;
pub mod fourcc;
pub mod frame;
pub mod video_metadata;
