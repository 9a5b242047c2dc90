use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// A seekable source of decoded frames: a video file or a capture device.
///
/// Implementations own the underlying decoder; dropping the value releases
/// it. Positions are frame indices counted from the start of the stream and
/// always refer to the next frame `read` will return.
pub trait VideoCapture: Send {
    /// Decodes the next frame. `Ok(None)` signals end of stream.
    fn read(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>>;

    fn metadata(&self) -> &VideoMetadata;

    /// Index of the next frame to be read.
    fn position(&self) -> u64;

    /// Timestamp of the next frame in milliseconds.
    fn position_ms(&self) -> f64;

    fn seek_frame(&mut self, index: u64) -> Result<(), Box<dyn std::error::Error>>;

    fn seek_ms(&mut self, ms: f64) -> Result<(), Box<dyn std::error::Error>>;

    /// Seeks to a fraction of the total stream length, `0.0..=1.0`.
    fn seek_fraction(&mut self, fraction: f64) -> Result<(), Box<dyn std::error::Error>>;
}
