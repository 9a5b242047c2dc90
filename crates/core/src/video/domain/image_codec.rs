use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::FrameSize;

/// Reads and writes single still images. The file format follows the
/// path's extension.
pub trait ImageCodec: Send {
    fn read(&self, path: &Path) -> Result<Frame, Box<dyn std::error::Error>>;

    /// Reads only the header to learn the image dimensions.
    fn dimensions(&self, path: &Path) -> Result<FrameSize, Box<dyn std::error::Error>>;

    fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;
}
