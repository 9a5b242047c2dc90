use crate::shared::fourcc::FourCc;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::FrameSize;
use crate::video::domain::image_codec::ImageCodec;
use crate::video::domain::video_capture::VideoCapture;

use super::image_sequence::ImageSequence;

/// Where frames come from: a decoded stream (file or device) or a list of
/// still images.
pub enum InputSource {
    Capture(Box<dyn VideoCapture>),
    Images(ImageSequence),
}

impl InputSource {
    /// Reads the next frame, stamped with its input index. `Ok(None)` marks
    /// the end of the stream.
    pub fn read(
        &mut self,
        codec: &dyn ImageCodec,
    ) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        match self {
            InputSource::Capture(capture) => capture.read(),
            InputSource::Images(sequence) => {
                let Some((index, path)) = sequence.advance() else {
                    return Ok(None);
                };
                let mut frame = codec
                    .read(path)
                    .map_err(|e| format!("{}: {e}", path.display()))?;
                frame.set_index(index);
                Ok(Some(frame))
            }
        }
    }

    /// Size of the stream, or of the first image regardless of the cursor.
    pub fn frame_size(&self, codec: &dyn ImageCodec) -> Option<FrameSize> {
        match self {
            InputSource::Capture(capture) => Some(capture.metadata().frame_size()),
            InputSource::Images(sequence) => {
                let first = sequence.first()?;
                match codec.dimensions(first) {
                    Ok(size) => Some(size),
                    Err(e) => {
                        log::warn!("Cannot read size of {}: {e}", first.display());
                        None
                    }
                }
            }
        }
    }

    /// Nominal frame rate; 0 for image lists.
    pub fn frame_rate(&self) -> f64 {
        match self {
            InputSource::Capture(capture) => capture.metadata().fps,
            InputSource::Images(_) => 0.0,
        }
    }

    pub fn codec(&self) -> Option<FourCc> {
        match self {
            InputSource::Capture(capture) => Some(capture.metadata().codec).filter(|c| !c.is_none()),
            InputSource::Images(_) => None,
        }
    }

    /// Index of the next frame to be read.
    pub fn position(&self) -> u64 {
        match self {
            InputSource::Capture(capture) => capture.position(),
            InputSource::Images(sequence) => sequence.position(),
        }
    }

    pub fn position_ms(&self) -> f64 {
        match self {
            InputSource::Capture(capture) => capture.position_ms(),
            InputSource::Images(_) => 0.0,
        }
    }

    pub fn total_frames(&self) -> Option<u64> {
        match self {
            InputSource::Capture(capture) => capture.metadata().total_frames,
            InputSource::Images(sequence) => Some(sequence.len() as u64),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            InputSource::Capture(capture) => {
                let meta = capture.metadata();
                match &meta.source_path {
                    Some(path) => format!("{} ({}, {:.2} fps)", path.display(), meta.frame_size(), meta.fps),
                    None => format!("capture device ({}, {:.2} fps)", meta.frame_size(), meta.fps),
                }
            }
            InputSource::Images(sequence) => format!("{} images", sequence.len()),
        }
    }
}
