//! Frame-stream processing: pull frames from a video file, capture device
//! or image list, run an optional per-frame transform, and write the result
//! to a video file or numbered images, with optional preview windows.

pub mod display;
pub mod pipeline;
pub mod shared;
pub mod video;

pub use pipeline::driver_error::DriverError;
pub use pipeline::frame_stream_driver::FrameStreamDriver;
pub use pipeline::frame_transform::FrameProcessor;
pub use pipeline::output_sink::VideoOutput;
pub use pipeline::run_summary::{FrameErrorPolicy, RunSummary, StopHandle, StopReason};
pub use shared::fourcc::FourCc;
pub use shared::frame::Frame;
