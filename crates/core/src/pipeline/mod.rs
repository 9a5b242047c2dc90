pub mod driver_error;
pub mod frame_stream_driver;
pub mod frame_transform;
pub mod image_sequence;
pub mod input_source;
pub mod numbered_images;
pub mod output_sink;
pub mod run_summary;
