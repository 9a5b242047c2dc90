use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::display::domain::display_backend::{DisplayBackend, WindowHandle};
use crate::display::infrastructure::headless_display::HeadlessDisplay;
use crate::shared::fourcc::FourCc;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::FrameSize;
use crate::video::domain::image_codec::ImageCodec;
use crate::video::domain::media_backend::{MediaBackend, SinkParams};
use crate::video::infrastructure::ffmpeg_backend::FfmpegBackend;
use crate::video::infrastructure::image_file_codec::ImageFileCodec;

use super::driver_error::DriverError;
use super::frame_transform::{FrameProcessor, FrameTransform};
use super::image_sequence::ImageSequence;
use super::input_source::InputSource;
use super::numbered_images::NumberedImages;
use super::output_sink::{OutputSink, VideoOutput};
use super::run_summary::{FrameErrorPolicy, RunSummary, StopHandle, StopReason};

/// Pulls frames from an input, optionally transforms them, and pushes the
/// result to an output, with optional preview windows in between.
///
/// Every frame goes through the same fixed order: read, show input,
/// transform, write, show output, wait, stop-frame check. Configuration is
/// done through setters between runs; `run` then drives the loop on the
/// calling thread until the input ends or a stop condition is met.
pub struct FrameStreamDriver {
    media: Box<dyn MediaBackend>,
    images: Box<dyn ImageCodec>,
    display: Box<dyn DisplayBackend>,
    input: Option<InputSource>,
    output: Option<OutputSink>,
    transform: Option<FrameTransform>,
    processing: bool,
    processed: u64,
    stop: StopHandle,
    stop_frame: Option<u64>,
    delay: Option<Duration>,
    input_window: Option<WindowHandle>,
    output_window: Option<WindowHandle>,
    error_policy: FrameErrorPolicy,
}

impl FrameStreamDriver {
    pub fn new(
        media: Box<dyn MediaBackend>,
        images: Box<dyn ImageCodec>,
        display: Box<dyn DisplayBackend>,
    ) -> Self {
        Self {
            media,
            images,
            display,
            input: None,
            output: None,
            transform: None,
            processing: false,
            processed: 0,
            stop: StopHandle::new(),
            stop_frame: None,
            delay: None,
            input_window: None,
            output_window: None,
            error_policy: FrameErrorPolicy::default(),
        }
    }

    /// FFmpeg for video, the `image` crate for stills, no visible display.
    pub fn with_defaults() -> Self {
        Self::new(
            Box::new(FfmpegBackend::new()),
            Box::new(ImageFileCodec::new()),
            Box::new(HeadlessDisplay::new()),
        )
    }

    // --- Input ---

    /// Opens a video file as input, replacing any previous input.
    pub fn set_input_file(&mut self, path: impl AsRef<Path>) -> Result<(), DriverError> {
        let path = path.as_ref();
        self.release_input();
        let capture = self
            .media
            .open_file(path)
            .map_err(|source| DriverError::OpenInput {
                input: path.display().to_string(),
                source,
            })?;
        self.install_input(InputSource::Capture(capture));
        Ok(())
    }

    /// Opens a capture device as input, replacing any previous input.
    pub fn set_input_device(&mut self, id: u32) -> Result<(), DriverError> {
        self.release_input();
        let capture = self
            .media
            .open_device(id)
            .map_err(|source| DriverError::OpenInput {
                input: format!("device {id}"),
                source,
            })?;
        self.install_input(InputSource::Capture(capture));
        Ok(())
    }

    /// Uses an ordered list of image files as input, replacing any previous
    /// input. An empty list leaves the driver without input.
    pub fn set_input_images<I, P>(&mut self, paths: I) -> Result<(), DriverError>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.release_input();
        let sequence = ImageSequence::new(paths.into_iter().map(Into::into).collect())?;
        self.install_input(InputSource::Images(sequence));
        Ok(())
    }

    fn release_input(&mut self) {
        self.input = None;
        self.processed = 0;
    }

    fn install_input(&mut self, input: InputSource) {
        log::info!("Opened input: {}", input.describe());
        self.input = Some(input);
    }

    // --- Output ---

    /// Writes frames to a video file. On failure the previous output is
    /// kept.
    pub fn set_video_output(&mut self, config: VideoOutput) -> Result<(), DriverError> {
        let codec = match config.codec {
            Some(codec) => codec,
            None => self.codec().ok_or(DriverError::NoInputCodec)?,
        };
        let fps = match config.fps {
            Some(fps) => fps,
            None => Some(self.frame_rate())
                .filter(|fps| *fps > 0.0)
                .ok_or(DriverError::NoInputFrameRate)?,
        };
        let frame_size = self
            .frame_size()
            .filter(|size| !size.is_empty())
            .ok_or(DriverError::UnknownFrameSize)?;

        let params = SinkParams {
            codec,
            fps,
            frame_size,
            is_color: config.is_color,
        };
        let sink = self
            .media
            .open_sink(&config.path, &params)
            .map_err(|source| DriverError::OpenOutput {
                path: config.path.clone(),
                source,
            })?;
        log::info!(
            "Writing video to {} ({codec}, {fps:.2} fps, {frame_size}{})",
            config.path.display(),
            if config.is_color { "" } else { ", gray" }
        );
        self.replace_output(Some(OutputSink::Video(sink)));
        Ok(())
    }

    /// Writes each frame to `prefix` + zero-padded index + `extension`,
    /// starting at `start_index`. On failure the previous output is kept.
    pub fn set_image_output(
        &mut self,
        prefix: impl Into<String>,
        extension: &str,
        digits: i32,
        start_index: u64,
    ) -> Result<(), DriverError> {
        let images = NumberedImages::new(prefix, extension, digits, start_index)?;
        log::info!("Writing frames to {} onwards", images.next_path().display());
        self.replace_output(Some(OutputSink::Images(images)));
        Ok(())
    }

    /// Removes the output; processed frames are then only displayed.
    pub fn clear_output(&mut self) {
        self.replace_output(None);
    }

    fn replace_output(&mut self, output: Option<OutputSink>) {
        if let Some(mut previous) = std::mem::replace(&mut self.output, output) {
            if let Err(e) = previous.finish() {
                log::warn!("Failed to finalize previous output: {e}");
            }
        }
    }

    // --- Transform ---

    /// Installs a transform function and enables processing. Replaces any
    /// installed processor.
    pub fn set_frame_function<F>(&mut self, f: F)
    where
        F: FnMut(&mut Frame, &mut Frame) + Send + 'static,
    {
        self.transform = Some(FrameTransform::Function(Box::new(f)));
        self.processing = true;
    }

    /// Installs a transform object and enables processing. Replaces any
    /// installed function.
    pub fn set_frame_processor(&mut self, processor: Box<dyn FrameProcessor>) {
        self.transform = Some(FrameTransform::Processor(processor));
        self.processing = true;
    }

    pub fn enable_processing(&mut self) {
        self.processing = true;
    }

    /// Frames pass through untouched while processing is disabled; the
    /// installed transform is kept.
    pub fn disable_processing(&mut self) {
        self.processing = false;
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    // --- Run control ---

    /// Stops the run once the input's next frame index reaches `frame`.
    pub fn set_stop_frame(&mut self, frame: Option<u64>) {
        log::debug!("Stop frame set to {frame:?}");
        self.stop_frame = frame;
    }

    /// Wait after every frame, during which the display may report a
    /// cancel. `None` disables the wait; zero only polls.
    pub fn set_delay(&mut self, delay: Option<Duration>) {
        log::debug!("Per-frame delay set to {delay:?}");
        self.delay = delay;
    }

    pub fn set_frame_error_policy(&mut self, policy: FrameErrorPolicy) {
        self.error_policy = policy;
    }

    /// Handle that stops the run from a transform or another thread.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn stop(&self) {
        self.stop.request();
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_requested()
    }

    // --- Display ---

    /// Shows every input frame in a window named `name`.
    pub fn show_input(&mut self, name: &str) -> Result<(), DriverError> {
        if let Some(window) = self.input_window.take() {
            self.display.destroy_window(window);
        }
        self.input_window = Some(self.create_window(name)?);
        Ok(())
    }

    /// Shows every output frame in a window named `name`.
    pub fn show_output(&mut self, name: &str) -> Result<(), DriverError> {
        if let Some(window) = self.output_window.take() {
            self.display.destroy_window(window);
        }
        self.output_window = Some(self.create_window(name)?);
        Ok(())
    }

    /// Closes both windows. Safe to call when none are open.
    pub fn hide_displays(&mut self) {
        for window in [self.input_window.take(), self.output_window.take()]
            .into_iter()
            .flatten()
        {
            self.display.destroy_window(window);
        }
    }

    fn create_window(&mut self, name: &str) -> Result<WindowHandle, DriverError> {
        self.display
            .create_window(name)
            .map_err(|source| DriverError::Display {
                name: name.to_string(),
                source,
            })
    }

    // --- Queries ---

    pub fn is_opened(&self) -> bool {
        self.input.is_some()
    }

    /// Size of the input frames; for image lists, the size of the first
    /// image.
    pub fn frame_size(&self) -> Option<FrameSize> {
        self.input
            .as_ref()
            .and_then(|input| input.frame_size(self.images.as_ref()))
    }

    /// Input frame rate, 0 when unknown or for image lists.
    pub fn frame_rate(&self) -> f64 {
        self.input.as_ref().map_or(0.0, InputSource::frame_rate)
    }

    pub fn codec(&self) -> Option<FourCc> {
        self.input.as_ref().and_then(InputSource::codec)
    }

    /// Index of the next frame to be read.
    pub fn frame_index(&self) -> u64 {
        self.input.as_ref().map_or(0, InputSource::position)
    }

    /// Stream position in milliseconds, 0 for image lists.
    pub fn position_ms(&self) -> f64 {
        self.input.as_ref().map_or(0.0, InputSource::position_ms)
    }

    /// `None` for live devices and streams of unknown length.
    pub fn total_frame_count(&self) -> Option<u64> {
        self.input.as_ref().and_then(InputSource::total_frames)
    }

    /// Frames passed to the transform since the input was opened.
    pub fn processed_frames(&self) -> u64 {
        self.processed
    }

    // --- Seeking ---

    pub fn seek_frame(&mut self, index: u64) -> Result<(), DriverError> {
        match self.input.as_mut().ok_or(DriverError::NoInput)? {
            InputSource::Capture(capture) => capture.seek_frame(index).map_err(DriverError::Seek),
            InputSource::Images(sequence) => sequence.seek(index),
        }
    }

    pub fn seek_time(&mut self, ms: f64) -> Result<(), DriverError> {
        match self.input.as_mut().ok_or(DriverError::NoInput)? {
            InputSource::Capture(capture) => capture.seek_ms(ms).map_err(DriverError::Seek),
            InputSource::Images(_) => Err(DriverError::Unsupported("seeking by time")),
        }
    }

    /// Seeks to a fraction of the input length; 0 is the first frame.
    pub fn seek_fraction(&mut self, fraction: f64) -> Result<(), DriverError> {
        if !(0.0..=1.0).contains(&fraction) {
            return Err(DriverError::InvalidFraction(fraction));
        }
        match self.input.as_mut().ok_or(DriverError::NoInput)? {
            InputSource::Capture(capture) => {
                capture.seek_fraction(fraction).map_err(DriverError::Seek)
            }
            InputSource::Images(sequence) => sequence.seek_fraction(fraction),
        }
    }

    // --- Run ---

    /// Processes frames until the input ends or a stop condition is met.
    ///
    /// Returns immediately with [`StopReason::NotOpened`] when there is no
    /// input. Read and write failures end the run or skip the frame
    /// depending on the [`FrameErrorPolicy`]; they are never returned as
    /// errors. The stop flag is cleared on entry and set on exit.
    pub fn run(&mut self) -> RunSummary {
        let started = Instant::now();
        let mut summary = RunSummary::new(StopReason::NotOpened);
        if self.input.is_none() {
            log::warn!("run called without an open input");
            return summary;
        }

        self.stop.reset();
        let mut output = Frame::default();

        summary.stop_reason = 'run: loop {
            if self.stop.is_requested() {
                break StopReason::Requested;
            }

            'frame: {
                let Some(input) = self.input.as_mut() else {
                    break 'run StopReason::EndOfStream;
                };
                let mut frame = match input.read(self.images.as_ref()) {
                    Ok(Some(frame)) => frame,
                    Ok(None) => break 'run StopReason::EndOfStream,
                    Err(e) => match self.error_policy {
                        FrameErrorPolicy::Stop => {
                            log::error!("Failed to read frame: {e}");
                            break 'run StopReason::ReadFailed(e.to_string());
                        }
                        FrameErrorPolicy::Skip => {
                            log::warn!("Skipping unreadable frame: {e}");
                            summary.frames_skipped += 1;
                            break 'frame;
                        }
                    },
                };
                summary.frames_read += 1;
                log::trace!("Read frame {} ({})", frame.index(), frame.size());

                if let Some(window) = &self.input_window {
                    if let Err(e) = self.display.show(window, &frame) {
                        log::warn!("Failed to show input frame {}: {e}", frame.index());
                    }
                }

                let result = match (self.processing, self.transform.as_mut()) {
                    (true, Some(transform)) => {
                        transform.apply(&mut frame, &mut output);
                        self.processed += 1;
                        summary.frames_processed += 1;
                        &output
                    }
                    _ => &frame,
                };

                if let Some(sink) = self.output.as_mut() {
                    match sink.write(result, self.images.as_ref()) {
                        Ok(()) => summary.frames_written += 1,
                        Err(e) => match self.error_policy {
                            FrameErrorPolicy::Stop => {
                                log::error!("Failed to write frame {}: {e}", frame.index());
                                break 'run StopReason::WriteFailed(e.to_string());
                            }
                            FrameErrorPolicy::Skip => {
                                log::warn!("Skipping unwritable frame {}: {e}", frame.index());
                                summary.frames_skipped += 1;
                            }
                        },
                    }
                }

                if let Some(window) = &self.output_window {
                    if let Err(e) = self.display.show(window, result) {
                        log::warn!("Failed to show output frame {}: {e}", frame.index());
                    }
                }
            }

            if let Some(delay) = self.delay {
                if self.display.wait_for_cancel(delay) {
                    break StopReason::Cancelled;
                }
            }

            if self.stop_frame.is_some_and(|n| self.frame_index() == n) {
                break StopReason::StopFrame;
            }
        };

        self.stop.request();
        summary.elapsed = started.elapsed();
        if summary.failed() {
            log::warn!("{summary}");
        } else {
            log::info!("{summary}");
        }
        summary
    }
}

impl Drop for FrameStreamDriver {
    fn drop(&mut self) {
        self.hide_displays();
        self.clear_output();
    }
}
