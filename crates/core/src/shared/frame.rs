use ndarray::{ArrayView3, ArrayViewMut3};
use thiserror::Error;

use super::video_metadata::FrameSize;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("unsupported channel count {0}, expected 1 (gray) or 3 (RGB)")]
    UnsupportedChannels(u8),
    #[error("frame data holds {actual} bytes, {width}x{height}x{channels} needs {expected}")]
    LengthMismatch {
        width: u32,
        height: u32,
        channels: u8,
        expected: usize,
        actual: usize,
    },
}

/// One decoded picture: contiguous pixel bytes in row-major order.
///
/// `channels` is 3 for RGB frames produced by the backends and 1 for gray
/// frames a transform may emit. A 0x0 frame is the empty state the output
/// buffer starts in.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: u64,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: u64) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    /// Solid-color RGB frame, mostly useful for tests and placeholders.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3], index: u64) -> Self {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 3)
            .collect();
        Self::new(data, width, height, 3, index)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> FrameSize {
        FrameSize::new(self.width, self.height)
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn set_index(&mut self, index: u64) {
        self.index = index;
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Checks that the frame is gray or RGB and that its buffer matches its
    /// dimensions.
    pub fn check_layout(&self) -> Result<(), FrameError> {
        if self.channels != 1 && self.channels != 3 {
            return Err(FrameError::UnsupportedChannels(self.channels));
        }
        let expected = self.width as usize * self.height as usize * self.channels as usize;
        if self.data.len() != expected {
            return Err(FrameError::LengthMismatch {
                width: self.width,
                height: self.height,
                channels: self.channels,
                expected,
                actual: self.data.len(),
            });
        }
        Ok(())
    }

    /// Returns the frame as 3-channel RGB, expanding gray frames.
    pub fn to_rgb(&self) -> Result<Frame, FrameError> {
        self.check_layout()?;
        match self.channels {
            1 => {
                let data = self.data.iter().flat_map(|&v| [v, v, v]).collect();
                Ok(Frame::new(data, self.width, self.height, 3, self.index))
            }
            _ => Ok(self.clone()),
        }
    }

    /// Returns a single-channel luma frame (BT.601 weights).
    pub fn to_gray(&self) -> Result<Frame, FrameError> {
        self.check_layout()?;
        match self.channels {
            3 => {
                let data = self
                    .data
                    .chunks_exact(3)
                    .map(|p| luma(p[0], p[1], p[2]))
                    .collect();
                Ok(Frame::new(data, self.width, self.height, 1, self.index))
            }
            _ => Ok(self.clone()),
        }
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    pub fn as_ndarray_mut(&mut self) -> ArrayViewMut3<'_, u8> {
        ArrayViewMut3::from_shape(self.shape(), &mut self.data)
            .expect("Frame data length must match dimensions")
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}

pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    let y = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
    y.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 12]; // 2x2x3
        let frame = Frame::new(data.clone(), 2, 2, 3, 5);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.index(), 5);
        assert_eq!(frame.data(), &data[..]);
        assert_eq!(frame.size(), FrameSize::new(2, 2));
    }

    #[test]
    fn test_default_is_empty() {
        let frame = Frame::default();
        assert!(frame.is_empty());
        assert_eq!(frame.size(), FrameSize::new(0, 0));
    }

    #[test]
    fn test_filled_repeats_color() {
        let frame = Frame::filled(3, 2, [1, 2, 3], 0);
        assert_eq!(frame.data().len(), 18);
        assert!(frame.data().chunks_exact(3).all(|p| p == [1, 2, 3]));
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * channels")]
    fn test_mismatched_data_length_panics_in_debug() {
        let data = vec![0u8; 10]; // wrong size for 2x2x3
        Frame::new(data, 2, 2, 3, 0);
    }

    #[test]
    fn test_gray_roundtrip_through_rgb() {
        let gray = Frame::new(vec![10, 200], 2, 1, 1, 7);
        let rgb = gray.to_rgb().unwrap();
        assert_eq!(rgb.channels(), 3);
        assert_eq!(rgb.data(), &[10, 10, 10, 200, 200, 200]);
        assert_eq!(rgb.index(), 7);
        assert_eq!(rgb.to_gray().unwrap().data(), gray.data());
    }

    #[test]
    fn test_to_gray_uses_luma_weights() {
        let frame = Frame::new(vec![255, 0, 0, 0, 255, 0], 2, 1, 3, 0);
        assert_eq!(frame.to_gray().unwrap().data(), &[76, 150]);
    }

    #[test]
    fn test_conversions_reject_unsupported_channel_counts() {
        let rgba = Frame::new(vec![1, 2, 3, 255], 1, 1, 4, 0);
        assert_eq!(rgba.to_rgb(), Err(FrameError::UnsupportedChannels(4)));
        assert_eq!(rgba.to_gray(), Err(FrameError::UnsupportedChannels(4)));
        assert_eq!(
            Frame::default().to_rgb(),
            Err(FrameError::UnsupportedChannels(0))
        );
    }

    #[test]
    fn test_check_layout_accepts_gray_and_rgb() {
        assert_eq!(Frame::filled(3, 2, [0, 0, 0], 0).check_layout(), Ok(()));
        assert_eq!(Frame::new(vec![0; 6], 3, 2, 1, 0).check_layout(), Ok(()));
    }

    #[test]
    fn test_as_ndarray_pixel_access() {
        // 2x2 RGB: set pixel (row=1, col=0) to red
        let mut data = vec![0u8; 12];
        data[6] = 255;
        let frame = Frame::new(data, 2, 2, 3, 0);
        let arr = frame.as_ndarray();
        assert_eq!(arr.shape(), &[2, 2, 3]);
        assert_eq!(arr[[1, 0, 0]], 255);
        assert_eq!(arr[[1, 0, 1]], 0);
    }

    #[test]
    fn test_as_ndarray_mut_modification() {
        let mut frame = Frame::new(vec![0u8; 12], 2, 2, 3, 0);
        frame.as_ndarray_mut()[[0, 1, 2]] = 128;
        assert_eq!(frame.as_ndarray()[[0, 1, 2]], 128);
    }
}
