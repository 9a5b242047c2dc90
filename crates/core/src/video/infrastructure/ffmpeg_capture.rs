use std::path::{Path, PathBuf};

use crate::shared::fourcc::FourCc;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_capture::VideoCapture;

const AV_TIME_BASE: f64 = 1_000_000.0;
const AV_NOPTS_VALUE: i64 = i64::MIN;

/// Decodes frames from a file or capture device via ffmpeg-next.
///
/// Every decoded picture is converted to RGB24. Seeking jumps to the
/// preceding keyframe and then decodes and discards frames until the
/// requested index, so positions stay frame accurate.
pub struct FfmpegCapture {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    stream_index: usize,
    time_base: ffmpeg_next::Rational,
    start_pts: i64,
    metadata: VideoMetadata,
    next_index: u64,
    seek_target: Option<u64>,
    draining: bool,
}

// Safety: FfmpegCapture is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegCapture {}

impl FfmpegCapture {
    pub fn open(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;
        let ictx = ffmpeg_next::format::input(path)?;
        Self::from_input(ictx, Some(path.to_path_buf()))
    }

    /// Opens a numbered camera through libavdevice.
    pub fn open_device(id: u32) -> Result<Self, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;
        ffmpeg_next::device::register_all();

        let (format_name, url) = device_url(id)?;
        let format = ffmpeg_next::device::input::video()
            .find(|f| f.name().split(',').any(|n| n == format_name))
            .ok_or_else(|| format!("capture backend '{format_name}' is not available"))?;

        let ctx = ffmpeg_next::format::open_with(
            &url,
            &ffmpeg_next::format::Format::Input(format),
            ffmpeg_next::Dictionary::new(),
        )?;
        match ctx {
            ffmpeg_next::format::context::Context::Input(ictx) => Self::from_input(ictx, None),
            ffmpeg_next::format::context::Context::Output(_) => {
                Err(format!("device {url} did not open as an input").into())
            }
        }
    }

    fn from_input(
        ictx: ffmpeg_next::format::context::Input,
        source_path: Option<PathBuf>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let (stream_index, time_base, start_pts, fps, total_frames, codec, decoder) = {
            let stream = ictx
                .streams()
                .best(ffmpeg_next::media::Type::Video)
                .ok_or("No video stream found")?;

            let fps = [stream.avg_frame_rate(), stream.rate()]
                .into_iter()
                .map(rational_to_f64)
                .find(|r| *r > 0.0)
                .unwrap_or(0.0);

            let parameters = stream.parameters();
            let codec = codec_tag(&parameters);
            let decoder = ffmpeg_next::codec::context::Context::from_parameters(parameters)?
                .decoder()
                .video()?;

            let start = stream.start_time();
            let start_pts = if start == AV_NOPTS_VALUE {
                0
            } else {
                start
            };

            let total_frames = estimate_frame_count(
                stream.frames(),
                stream.duration() as f64 * rational_to_f64(stream.time_base()),
                ictx.duration() as f64 / AV_TIME_BASE,
                fps,
            );

            (
                stream.index(),
                stream.time_base(),
                start_pts,
                fps,
                total_frames,
                codec,
                decoder,
            )
        };

        let width = decoder.width();
        let height = decoder.height();
        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        let metadata = VideoMetadata {
            width,
            height,
            fps,
            total_frames,
            codec,
            source_path,
        };
        log::debug!(
            "Opened capture {}x{} @ {:.2} fps, codec {}, {} frames",
            width,
            height,
            fps,
            codec,
            total_frames.map_or_else(|| "unknown".to_string(), |n| n.to_string())
        );

        Ok(Self {
            ictx,
            decoder,
            scaler,
            stream_index,
            time_base,
            start_pts,
            metadata,
            next_index: 0,
            seek_target: None,
            draining: false,
        })
    }

    fn receive_decoded(
        &mut self,
    ) -> Result<Option<ffmpeg_next::util::frame::video::Video>, ffmpeg_next::Error> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        let ready = decoder_ready(self.decoder.receive_frame(&mut decoded))?;
        Ok(ready.then_some(decoded))
    }

    /// Sends the next packet of the video stream to the decoder, or puts the
    /// decoder into draining mode once the container is exhausted. Demuxer
    /// and decoder failures are returned; the offending packet is consumed,
    /// so the next call carries on after it.
    fn feed_decoder(&mut self) -> Result<(), ffmpeg_next::Error> {
        loop {
            let mut packet = ffmpeg_next::Packet::empty();
            match packet.read(&mut self.ictx) {
                Ok(()) => {}
                Err(ffmpeg_next::Error::Eof) => {
                    self.draining = true;
                    decoder_ready(self.decoder.send_eof())?;
                    return Ok(());
                }
                Err(e) if is_again(&e) => continue,
                Err(e) => return Err(e),
            }

            if packet.stream() != self.stream_index {
                continue;
            }
            decoder_ready(self.decoder.send_packet(&packet))?;
            return Ok(());
        }
    }

    fn index_from_timestamp(&self, decoded: &ffmpeg_next::util::frame::video::Video) -> u64 {
        let Some(pts) = decoded.timestamp().or_else(|| decoded.pts()) else {
            return self.next_index;
        };
        let seconds = (pts - self.start_pts) as f64 * rational_to_f64(self.time_base);
        (seconds * self.metadata.fps).round().max(0.0) as u64
    }

    fn convert(
        &mut self,
        decoded: &ffmpeg_next::util::frame::video::Video,
        index: u64,
    ) -> Result<Frame, Box<dyn std::error::Error>> {
        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        self.scaler.run(decoded, &mut rgb_frame)?;
        let (width, height) = (self.metadata.width, self.metadata.height);
        let pixels = extract_rgb_pixels(&rgb_frame, width, height);
        Ok(Frame::new(pixels, width, height, 3, index))
    }
}

impl VideoCapture for FfmpegCapture {
    fn read(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        loop {
            if let Some(decoded) = self.receive_decoded()? {
                let index = match self.seek_target {
                    Some(target) => {
                        let index = self.index_from_timestamp(&decoded);
                        if index < target {
                            continue;
                        }
                        self.seek_target = None;
                        index
                    }
                    None => self.next_index,
                };
                self.next_index = index + 1;
                return self.convert(&decoded, index).map(Some);
            }

            if self.draining {
                return Ok(None);
            }
            self.feed_decoder()?;
        }
    }

    fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    fn position(&self) -> u64 {
        self.next_index
    }

    fn position_ms(&self) -> f64 {
        if self.metadata.fps > 0.0 {
            self.next_index as f64 * 1000.0 / self.metadata.fps
        } else {
            0.0
        }
    }

    fn seek_frame(&mut self, index: u64) -> Result<(), Box<dyn std::error::Error>> {
        if self.metadata.fps <= 0.0 {
            return Err("seeking requires a known frame rate".into());
        }
        let ts = seek_timestamp(index, self.metadata.fps, self.start_pts, self.time_base);
        self.ictx.seek(ts, ..ts)?;
        self.decoder.flush();
        self.draining = false;
        self.next_index = index;
        self.seek_target = Some(index);
        Ok(())
    }

    fn seek_ms(&mut self, ms: f64) -> Result<(), Box<dyn std::error::Error>> {
        if ms < 0.0 {
            return Err(format!("negative seek position {ms} ms").into());
        }
        let index = (ms * self.metadata.fps / 1000.0).round() as u64;
        self.seek_frame(index)
    }

    fn seek_fraction(&mut self, fraction: f64) -> Result<(), Box<dyn std::error::Error>> {
        if !(0.0..=1.0).contains(&fraction) {
            return Err(format!("relative position {fraction} outside 0..=1").into());
        }
        let total = self
            .metadata
            .total_frames
            .ok_or("stream length is unknown")?;
        self.seek_frame((fraction * total as f64).round() as u64)
    }
}

fn is_again(e: &ffmpeg_next::Error) -> bool {
    matches!(e, ffmpeg_next::Error::Other { errno } if *errno == ffmpeg_next::util::error::EAGAIN)
}

/// `Ok(true)` when the decoder accepted or produced data, `Ok(false)` when it
/// needs more input or is fully drained, and the error for anything else.
fn decoder_ready(result: Result<(), ffmpeg_next::Error>) -> Result<bool, ffmpeg_next::Error> {
    match result {
        Ok(()) => Ok(true),
        Err(ffmpeg_next::Error::Eof) => Ok(false),
        Err(e) if is_again(&e) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Container timestamp, in `AV_TIME_BASE` units, of frame `index`. Streams
/// that do not start at zero (MPEG-TS, trimmed clips) are offset by their
/// first presentation time.
fn seek_timestamp(index: u64, fps: f64, start_pts: i64, time_base: ffmpeg_next::Rational) -> i64 {
    let start_seconds = start_pts as f64 * rational_to_f64(time_base);
    ((index as f64 / fps + start_seconds) * AV_TIME_BASE).round() as i64
}

fn rational_to_f64(r: ffmpeg_next::Rational) -> f64 {
    if r.denominator() != 0 {
        r.numerator() as f64 / r.denominator() as f64
    } else {
        0.0
    }
}

/// Prefers the container's frame count, then derives one from the stream
/// or container duration. Live sources report neither.
fn estimate_frame_count(
    stream_frames: i64,
    stream_seconds: f64,
    container_seconds: f64,
    fps: f64,
) -> Option<u64> {
    if stream_frames > 0 {
        return Some(stream_frames as u64);
    }
    if fps <= 0.0 {
        return None;
    }
    [stream_seconds, container_seconds]
        .into_iter()
        .find(|s| *s > 0.0)
        .map(|s| (s * fps).round() as u64)
}

/// Reads the container's codec tag, falling back to the customary tag for
/// the decoder when the container does not store one (e.g. Matroska).
fn codec_tag(parameters: &ffmpeg_next::codec::Parameters) -> FourCc {
    // Safety: the pointer is valid for the lifetime of `parameters`.
    let tag = unsafe { (*parameters.as_ptr()).codec_tag };
    if tag != 0 {
        return FourCc::from_u32(tag);
    }
    match parameters.id() {
        ffmpeg_next::codec::Id::MPEG4 => FourCc::new(*b"mp4v"),
        ffmpeg_next::codec::Id::H264 => FourCc::new(*b"avc1"),
        ffmpeg_next::codec::Id::MJPEG => FourCc::new(*b"MJPG"),
        _ => FourCc::NONE,
    }
}

fn device_url(id: u32) -> Result<(&'static str, String), Box<dyn std::error::Error>> {
    if cfg!(target_os = "linux") {
        Ok(("v4l2", format!("/dev/video{id}")))
    } else if cfg!(target_os = "macos") {
        Ok(("avfoundation", id.to_string()))
    } else {
        Err("camera capture is not supported on this platform".into())
    }
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer,
/// dropping any per-row padding (stride > width*3).
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::video_metadata::FrameSize;
    use rstest::rstest;
    use crate::video::domain::media_backend::SinkParams;
    use crate::video::domain::video_sink::VideoSink;
    use crate::video::infrastructure::ffmpeg_sink::FfmpegSink;

    /// Writes `num_frames` solid gray frames whose value is `i * 40`.
    fn create_test_video(path: &Path, num_frames: u64) {
        let params = SinkParams {
            codec: FourCc::new(*b"mp4v"),
            fps: 25.0,
            frame_size: FrameSize::new(160, 120),
            is_color: true,
        };
        let mut sink = FfmpegSink::open(path, &params).unwrap();
        for i in 0..num_frames {
            let v = ((i * 40) % 256) as u8;
            sink.write(&Frame::filled(160, 120, [v, v, v], i)).unwrap();
        }
        sink.finish().unwrap();
    }

    fn mean(frame: &Frame) -> f64 {
        frame.data().iter().map(|&b| b as f64).sum::<f64>() / frame.data().len() as f64
    }

    #[test]
    fn test_open_returns_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.mp4");
        create_test_video(&path, 6);

        let capture = FfmpegCapture::open(&path).unwrap();
        let meta = capture.metadata();
        assert_eq!(meta.frame_size(), FrameSize::new(160, 120));
        assert_eq!(meta.total_frames, Some(6));
        approx::assert_relative_eq!(meta.fps, 25.0, epsilon = 0.01);
        assert!(!meta.codec.is_none());
        assert_eq!(meta.source_path, Some(path));
        assert_eq!(capture.position(), 0);
    }

    #[test]
    fn test_open_nonexistent_returns_error() {
        assert!(FfmpegCapture::open(Path::new("/nonexistent/test.mp4")).is_err());
    }

    #[test]
    fn test_reads_every_frame_then_end_of_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.mp4");
        create_test_video(&path, 5);

        let mut capture = FfmpegCapture::open(&path).unwrap();
        let mut indices = Vec::new();
        while let Some(frame) = capture.read().unwrap() {
            assert_eq!(frame.channels(), 3);
            assert_eq!(frame.data().len(), 160 * 120 * 3);
            indices.push(frame.index());
        }
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
        assert_eq!(capture.position(), 5);
        assert!(capture.read().unwrap().is_none());
    }

    #[test]
    fn test_position_ms_follows_frame_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.mp4");
        create_test_video(&path, 3);

        let mut capture = FfmpegCapture::open(&path).unwrap();
        capture.read().unwrap();
        capture.read().unwrap();
        approx::assert_relative_eq!(capture.position_ms(), 80.0, epsilon = 0.5);
    }

    #[test]
    fn test_seek_frame_lands_on_requested_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.mp4");
        create_test_video(&path, 6);

        let mut capture = FfmpegCapture::open(&path).unwrap();
        capture.read().unwrap();
        capture.seek_frame(3).unwrap();
        assert_eq!(capture.position(), 3);

        let frame = capture.read().unwrap().unwrap();
        assert_eq!(frame.index(), 3);
        assert!((mean(&frame) - 120.0).abs() < 20.0);
        assert_eq!(capture.position(), 4);
    }

    #[test]
    fn test_seek_fraction_uses_total_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.mp4");
        create_test_video(&path, 6);

        let mut capture = FfmpegCapture::open(&path).unwrap();
        capture.seek_fraction(0.5).unwrap();
        assert_eq!(capture.position(), 3);
        assert!(capture.seek_fraction(1.5).is_err());
    }

    #[test]
    fn test_corrupted_clip_ends_without_panicking() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.mp4");
        create_test_video(&path, 10);
        let mut bytes = std::fs::read(&path).unwrap();
        let len = bytes.len();
        for b in &mut bytes[len / 3..len / 2] {
            *b = 0xAB;
        }
        std::fs::write(&path, &bytes).unwrap();

        let Ok(mut capture) = FfmpegCapture::open(&path) else {
            return;
        };
        for _ in 0..100 {
            match capture.read() {
                Ok(Some(_)) => {}
                Ok(None) | Err(_) => return,
            }
        }
        panic!("reader never reached end of stream or an error");
    }

    #[rstest]
    #[case::accepted(Ok(()), Some(true))]
    #[case::drained(Err(ffmpeg_next::Error::Eof), Some(false))]
    #[case::needs_input(
        Err(ffmpeg_next::Error::Other { errno: ffmpeg_next::util::error::EAGAIN }),
        Some(false)
    )]
    #[case::corrupt(Err(ffmpeg_next::Error::InvalidData), None)]
    #[case::missing_decoder(Err(ffmpeg_next::Error::DecoderNotFound), None)]
    fn test_decoder_ready_separates_errors_from_backpressure(
        #[case] result: Result<(), ffmpeg_next::Error>,
        #[case] expected: Option<bool>,
    ) {
        assert_eq!(decoder_ready(result).ok(), expected);
    }

    #[test]
    fn test_decoder_errors_are_returned_unchanged() {
        let err = decoder_ready(Err(ffmpeg_next::Error::InvalidData)).unwrap_err();
        assert!(matches!(err, ffmpeg_next::Error::InvalidData));
    }

    #[rstest]
    #[case::zero_start(25, 25.0, 0, ffmpeg_next::Rational::new(1, 12800), 1_000_000)]
    #[case::mpeg_ts_start(25, 25.0, 126_000, ffmpeg_next::Rational::new(1, 90000), 2_400_000)]
    #[case::first_frame(0, 30.0, 126_000, ffmpeg_next::Rational::new(1, 90000), 1_400_000)]
    #[case::millisecond_base(10, 20.0, 500, ffmpeg_next::Rational::new(1, 1000), 1_000_000)]
    fn test_seek_timestamp_includes_stream_start(
        #[case] index: u64,
        #[case] fps: f64,
        #[case] start_pts: i64,
        #[case] time_base: ffmpeg_next::Rational,
        #[case] expected: i64,
    ) {
        assert_eq!(seek_timestamp(index, fps, start_pts, time_base), expected);
    }

    #[test]
    fn test_estimate_frame_count_fallbacks() {
        assert_eq!(estimate_frame_count(10, 0.0, 0.0, 25.0), Some(10));
        assert_eq!(estimate_frame_count(0, 2.0, 0.0, 25.0), Some(50));
        assert_eq!(estimate_frame_count(0, 0.0, 1.0, 30.0), Some(30));
        assert_eq!(estimate_frame_count(0, 0.0, 0.0, 30.0), None);
        assert_eq!(estimate_frame_count(0, 2.0, 0.0, 0.0), None);
    }
}
