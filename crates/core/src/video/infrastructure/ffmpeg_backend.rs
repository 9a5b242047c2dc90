use std::path::Path;

use crate::video::domain::media_backend::{MediaBackend, SinkParams};
use crate::video::domain::video_capture::VideoCapture;
use crate::video::domain::video_sink::VideoSink;

use super::ffmpeg_capture::FfmpegCapture;
use super::ffmpeg_sink::FfmpegSink;

/// [`MediaBackend`] backed by libav* through ffmpeg-next.
pub struct FfmpegBackend;

impl FfmpegBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FfmpegBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaBackend for FfmpegBackend {
    fn open_file(&self, path: &Path) -> Result<Box<dyn VideoCapture>, Box<dyn std::error::Error>> {
        Ok(Box::new(FfmpegCapture::open(path)?))
    }

    fn open_device(&self, id: u32) -> Result<Box<dyn VideoCapture>, Box<dyn std::error::Error>> {
        Ok(Box::new(FfmpegCapture::open_device(id)?))
    }

    fn open_sink(
        &self,
        path: &Path,
        params: &SinkParams,
    ) -> Result<Box<dyn VideoSink>, Box<dyn std::error::Error>> {
        Ok(Box::new(FfmpegSink::open(path, params)?))
    }
}
