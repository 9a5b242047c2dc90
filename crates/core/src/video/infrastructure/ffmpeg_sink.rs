use std::path::Path;

use crate::shared::fourcc::FourCc;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::FrameSize;
use crate::video::domain::media_backend::SinkParams;
use crate::video::domain::video_sink::VideoSink;

const MPEG4_TAGS: &[&str] = &["mp4v", "fmp4", "xvid", "divx", "dx50"];
const H264_TAGS: &[&str] = &["avc1", "h264", "x264"];
const MJPEG_TAGS: &[&str] = &["mjpg"];

/// Encodes frames into a single video stream via ffmpeg-next.
///
/// Frames whose size differs from the configured one are rescaled, gray
/// frames are expanded, and a sink opened with `is_color = false` stores
/// luma only.
pub struct FfmpegSink {
    state: Option<EncoderState>,
    frame_size: FrameSize,
    is_color: bool,
    frame_count: i64,
}

struct EncoderState {
    octx: ffmpeg_next::format::context::Output,
    encoder: ffmpeg_next::codec::encoder::video::Encoder,
    encoder_time_base: ffmpeg_next::Rational,
    pixel_format: ffmpeg_next::format::Pixel,
    scaler: Option<(FrameSize, ffmpeg_next::software::scaling::Context)>,
}

// Safety: FfmpegSink is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegSink {}

impl FfmpegSink {
    pub fn open(path: &Path, params: &SinkParams) -> Result<Self, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        if params.frame_size.is_empty() {
            return Err(format!("invalid output frame size {}", params.frame_size).into());
        }
        if params.fps.is_nan() || params.fps <= 0.0 {
            return Err(format!("invalid output frame rate {}", params.fps).into());
        }
        let (codec_id, pixel_format) = encoder_for(params.codec)?;

        let mut octx = ffmpeg_next::format::output(path)?;

        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let codec = ffmpeg_next::encoder::find(codec_id)
            .ok_or_else(|| format!("no encoder available for codec tag {}", params.codec))?;

        let mut ost = octx.add_stream(Some(codec))?;

        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()?;

        encoder_ctx.set_width(params.frame_size.width);
        encoder_ctx.set_height(params.frame_size.height);
        encoder_ctx.set_format(pixel_format);

        let fps_i = (params.fps.round() as i32).max(1);
        let encoder_time_base = ffmpeg_next::Rational(1, fps_i);
        encoder_ctx.set_time_base(encoder_time_base);
        encoder_ctx.set_frame_rate(Some(ffmpeg_next::Rational(fps_i, 1)));

        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder_ctx.open_with(ffmpeg_next::Dictionary::new())?;
        ost.set_parameters(&encoder);

        octx.write_header()?;

        log::debug!(
            "Opened video sink {} ({}, {} @ {} fps, color={})",
            path.display(),
            params.codec,
            params.frame_size,
            fps_i,
            params.is_color
        );

        Ok(Self {
            state: Some(EncoderState {
                octx,
                encoder,
                encoder_time_base,
                pixel_format,
                scaler: None,
            }),
            frame_size: params.frame_size,
            is_color: params.is_color,
            frame_count: 0,
        })
    }
}

impl EncoderState {
    fn scaler_for(
        &mut self,
        input: FrameSize,
        output: FrameSize,
    ) -> Result<&mut ffmpeg_next::software::scaling::Context, Box<dyn std::error::Error>> {
        let stale = !matches!(&self.scaler, Some((size, _)) if *size == input);
        if stale {
            let ctx = ffmpeg_next::software::scaling::Context::get(
                ffmpeg_next::format::Pixel::RGB24,
                input.width,
                input.height,
                self.pixel_format,
                output.width,
                output.height,
                ffmpeg_next::software::scaling::Flags::BILINEAR,
            )?;
            self.scaler = Some((input, ctx));
        }
        match self.scaler.as_mut() {
            Some((_, ctx)) => Ok(ctx),
            None => Err("scaler unavailable".into()),
        }
    }

    fn write_pending_packets(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let ost_time_base = self
            .octx
            .stream(0)
            .ok_or("output stream missing")?
            .time_base();

        let mut encoded = ffmpeg_next::Packet::empty();
        while self.encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(0);
            encoded.rescale_ts(self.encoder_time_base, ost_time_base);
            encoded.write_interleaved(&mut self.octx)?;
        }
        Ok(())
    }
}

impl VideoSink for FfmpegSink {
    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        let state = self.state.as_mut().ok_or("FfmpegSink: already finished")?;
        if frame.is_empty() {
            return Err("cannot encode an empty frame".into());
        }

        // Also rejects buffers whose length disagrees with the dimensions.
        let frame = if self.is_color {
            frame.to_rgb()?
        } else {
            frame.to_gray()?.to_rgb()?
        };
        let (width, height) = (frame.width(), frame.height());

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::new(
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
        );

        // Copy pixel data, respecting stride
        let stride = rgb_frame.stride(0);
        let row_bytes = width as usize * 3;
        let data = rgb_frame.data_mut(0);
        for (row, src) in frame.data().chunks_exact(row_bytes).enumerate() {
            let dst_start = row * stride;
            data[dst_start..dst_start + row_bytes].copy_from_slice(src);
        }

        let mut yuv_frame = ffmpeg_next::util::frame::video::Video::empty();
        state
            .scaler_for(frame.size(), self.frame_size)?
            .run(&rgb_frame, &mut yuv_frame)?;
        yuv_frame.set_pts(Some(self.frame_count));

        state.encoder.send_frame(&yuv_frame)?;
        state.write_pending_packets()?;

        self.frame_count += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let Some(mut state) = self.state.take() else {
            return Ok(());
        };

        state.encoder.send_eof()?;
        state.write_pending_packets()?;
        state.octx.write_trailer()?;

        log::debug!("Video sink closed after {} frames", self.frame_count);
        Ok(())
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            log::warn!("Failed to finalize video output: {e}");
        }
    }
}

/// Maps a FourCC tag to the encoder and the pixel format it is fed with.
fn encoder_for(
    codec: FourCc,
) -> Result<(ffmpeg_next::codec::Id, ffmpeg_next::format::Pixel), Box<dyn std::error::Error>> {
    let is = |tags: &[&str]| tags.iter().any(|t| codec.matches(t));
    if is(MPEG4_TAGS) {
        Ok((
            ffmpeg_next::codec::Id::MPEG4,
            ffmpeg_next::format::Pixel::YUV420P,
        ))
    } else if is(H264_TAGS) {
        Ok((
            ffmpeg_next::codec::Id::H264,
            ffmpeg_next::format::Pixel::YUV420P,
        ))
    } else if is(MJPEG_TAGS) {
        Ok((
            ffmpeg_next::codec::Id::MJPEG,
            ffmpeg_next::format::Pixel::YUVJ420P,
        ))
    } else {
        Err(format!("unsupported codec tag {codec}").into())
    }
}
