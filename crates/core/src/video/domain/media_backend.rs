use std::path::Path;

use crate::shared::fourcc::FourCc;
use crate::shared::video_metadata::FrameSize;

use super::video_capture::VideoCapture;
use super::video_sink::VideoSink;

/// Parameters for opening an encoded output stream.
#[derive(Clone, Debug, PartialEq)]
pub struct SinkParams {
    pub codec: FourCc,
    pub fps: f64,
    pub frame_size: FrameSize,
    pub is_color: bool,
}

/// Opens capture sources and video sinks for the driver.
///
/// This is the factory seam between the driver and a concrete media library.
pub trait MediaBackend: Send {
    fn open_file(&self, path: &Path) -> Result<Box<dyn VideoCapture>, Box<dyn std::error::Error>>;

    fn open_device(&self, id: u32) -> Result<Box<dyn VideoCapture>, Box<dyn std::error::Error>>;

    fn open_sink(
        &self,
        path: &Path,
        params: &SinkParams,
    ) -> Result<Box<dyn VideoSink>, Box<dyn std::error::Error>>;
}

