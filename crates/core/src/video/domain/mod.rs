pub mod image_codec;
pub mod media_backend;
pub mod video_capture;
pub mod video_sink;
