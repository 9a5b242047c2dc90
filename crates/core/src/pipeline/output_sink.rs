use std::path::PathBuf;

use crate::shared::fourcc::FourCc;
use crate::shared::frame::Frame;
use crate::video::domain::image_codec::ImageCodec;
use crate::video::domain::video_sink::VideoSink;

use super::numbered_images::NumberedImages;

/// Settings for a video file output. `None` fields are taken from the
/// current input.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoOutput {
    pub path: PathBuf,
    pub codec: Option<FourCc>,
    pub fps: Option<f64>,
    pub is_color: bool,
}

impl VideoOutput {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            codec: None,
            fps: None,
            is_color: true,
        }
    }

    pub fn with_codec(mut self, codec: FourCc) -> Self {
        self.codec = Some(codec);
        self
    }

    pub fn with_fps(mut self, fps: f64) -> Self {
        self.fps = Some(fps);
        self
    }

    pub fn with_color(mut self, is_color: bool) -> Self {
        self.is_color = is_color;
        self
    }
}

/// Where processed frames go.
pub enum OutputSink {
    Video(Box<dyn VideoSink>),
    Images(NumberedImages),
}

impl OutputSink {
    /// Writes one frame. For numbered images the index only advances once
    /// the file has been written.
    pub fn write(
        &mut self,
        frame: &Frame,
        codec: &dyn ImageCodec,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match self {
            OutputSink::Video(sink) => sink.write(frame),
            OutputSink::Images(images) => {
                let path = images.next_path();
                codec
                    .write(&path, frame)
                    .map_err(|e| format!("{}: {e}", path.display()))?;
                images.advance();
                Ok(())
            }
        }
    }

    pub fn finish(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        match self {
            OutputSink::Video(sink) => sink.finish(),
            OutputSink::Images(_) => Ok(()),
        }
    }
}
