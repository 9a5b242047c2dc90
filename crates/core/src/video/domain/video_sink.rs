use crate::shared::frame::Frame;

/// An open encoded video stream accepting frames in presentation order.
///
/// The stream is finalized by `finish`, or on drop if the caller never
/// finishes it explicitly.
pub trait VideoSink: Send {
    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;

    /// Flushes buffered packets and writes the container trailer.
    /// Calling it more than once is a no-op.
    fn finish(&mut self) -> Result<(), Box<dyn std::error::Error>>;
}
