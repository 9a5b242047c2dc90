use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::FrameSize;
use crate::video::domain::image_codec::ImageCodec;

/// Still-image I/O through the `image` crate.
///
/// Decoded images are always converted to RGB. Gray frames are written as
/// 8-bit luma images, RGB frames as RGB.
pub struct ImageFileCodec;

impl ImageFileCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageCodec for ImageFileCodec {
    fn read(&self, path: &Path) -> Result<Frame, Box<dyn std::error::Error>> {
        let img = image::open(path)?.to_rgb8();
        let (width, height) = img.dimensions();
        Ok(Frame::new(img.into_raw(), width, height, 3, 0))
    }

    fn dimensions(&self, path: &Path) -> Result<FrameSize, Box<dyn std::error::Error>> {
        let (width, height) = image::image_dimensions(path)?;
        Ok(FrameSize::new(width, height))
    }

    fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        if frame.is_empty() {
            return Err("cannot write an empty frame".into());
        }

        // Numbered outputs may point into a directory that does not exist yet.
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        match frame.channels() {
            1 => image::GrayImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
                .ok_or("Failed to create gray image from frame data")?
                .save(path)?,
            3 => image::RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
                .ok_or("Failed to create image from frame data")?
                .save(path)?,
            other => return Err(format!("unsupported channel count {other}").into()),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_test_image(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let path = dir.join(name);
        let mut img = image::RgbImage::new(width, height);
        for pixel in img.pixels_mut() {
            *pixel = image::Rgb([50, 100, 200]);
        }
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn test_read_returns_rgb_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_image(dir.path(), "in.png", 100, 80);

        let frame = ImageFileCodec::new().read(&path).unwrap();
        assert_eq!(frame.width(), 100);
        assert_eq!(frame.height(), 80);
        assert_eq!(frame.channels(), 3);
        assert_eq!(&frame.data()[..3], &[50, 100, 200]);
    }

    #[test]
    fn test_read_nonexistent_returns_error() {
        assert!(ImageFileCodec::new()
            .read(Path::new("/nonexistent/test.png"))
            .is_err());
    }

    #[test]
    fn test_dimensions_without_decoding() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_image(dir.path(), "in.bmp", 33, 17);
        let size = ImageFileCodec::new().dimensions(&path).unwrap();
        assert_eq!(size, FrameSize::new(33, 17));
    }

    #[test]
    fn test_write_roundtrip_preserves_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let codec = ImageFileCodec::new();
        codec.write(&path, &Frame::filled(50, 50, [50, 100, 200], 0)).unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (50, 50));
        assert_eq!(img.get_pixel(0, 0).0, [50, 100, 200]);
    }

    #[test]
    fn test_write_gray_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gray.bmp");
        let frame = Frame::new(vec![7; 4 * 3], 4, 3, 1, 0);
        ImageFileCodec::new().write(&path, &frame).unwrap();

        let img = image::open(&path).unwrap().to_luma8();
        assert_eq!(img.get_pixel(3, 2).0, [7]);
    }

    #[test]
    fn test_write_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/out.bmp");
        ImageFileCodec::new()
            .write(&path, &Frame::filled(4, 4, [0, 0, 0], 0))
            .unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_write_empty_frame_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.png");
        assert!(ImageFileCodec::new().write(&path, &Frame::default()).is_err());
    }

    #[test]
    fn test_write_unknown_extension_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.notanimage");
        assert!(ImageFileCodec::new()
            .write(&path, &Frame::filled(4, 4, [0, 0, 0], 0))
            .is_err());
    }
}
