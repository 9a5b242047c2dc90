pub mod ffmpeg_backend;
pub mod ffmpeg_capture;
pub mod ffmpeg_sink;
pub mod image_file_codec;
