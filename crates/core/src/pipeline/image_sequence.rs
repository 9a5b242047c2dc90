use std::path::{Path, PathBuf};

use super::driver_error::DriverError;

/// Ordered list of still images consumed one per frame.
///
/// The cursor is the index of the next image to read. It may be moved past
/// the end by a seek; reads then report end of stream.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageSequence {
    paths: Vec<PathBuf>,
    cursor: u64,
}

impl ImageSequence {
    pub fn new(paths: Vec<PathBuf>) -> Result<Self, DriverError> {
        if paths.is_empty() {
            return Err(DriverError::EmptyImageList);
        }
        Ok(Self { paths, cursor: 0 })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn position(&self) -> u64 {
        self.cursor
    }

    pub fn first(&self) -> Option<&Path> {
        self.paths.first().map(PathBuf::as_path)
    }

    /// Returns the image under the cursor with its index and moves past it.
    pub fn advance(&mut self) -> Option<(u64, &Path)> {
        let index = self.cursor;
        let path = self.paths.get(usize::try_from(index).ok()?)?;
        self.cursor += 1;
        Some((index, path.as_path()))
    }

    /// Moves the cursor to `index`. The cursor moves even when `index` is
    /// out of range, in which case an error is returned as well.
    pub fn seek(&mut self, index: u64) -> Result<(), DriverError> {
        self.cursor = index;
        if index < self.paths.len() as u64 {
            Ok(())
        } else {
            Err(DriverError::SeekOutOfRange {
                index,
                len: self.paths.len(),
            })
        }
    }

    /// Seeks to `round(fraction * len)`.
    pub fn seek_fraction(&mut self, fraction: f64) -> Result<(), DriverError> {
        if !(0.0..=1.0).contains(&fraction) {
            return Err(DriverError::InvalidFraction(fraction));
        }
        let index = (fraction * self.paths.len() as f64).round() as u64;
        self.seek(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn sequence(n: usize) -> ImageSequence {
        ImageSequence::new((0..n).map(|i| PathBuf::from(format!("img{i}.bmp"))).collect()).unwrap()
    }

    #[test]
    fn test_empty_list_rejected() {
        assert!(matches!(
            ImageSequence::new(Vec::new()),
            Err(DriverError::EmptyImageList)
        ));
    }

    #[test]
    fn test_advance_yields_each_image_once() {
        let mut seq = sequence(3);
        let read: Vec<(u64, PathBuf)> =
            std::iter::from_fn(|| seq.advance().map(|(i, p)| (i, p.to_path_buf()))).collect();
        assert_eq!(read.len(), 3);
        assert_eq!(read[2], (2, PathBuf::from("img2.bmp")));
        assert_eq!(seq.position(), 3);
        assert!(seq.advance().is_none());
        assert_eq!(seq.position(), 3);
    }

    #[test]
    fn test_first_is_independent_of_cursor() {
        let mut seq = sequence(4);
        seq.seek(2).unwrap();
        assert_eq!(seq.first(), Some(Path::new("img0.bmp")));
    }

    #[test]
    fn test_seek_in_range() {
        let mut seq = sequence(10);
        seq.seek(7).unwrap();
        assert_eq!(seq.advance().map(|(i, _)| i), Some(7));
    }

    #[test]
    fn test_seek_out_of_range_still_moves_cursor() {
        let mut seq = sequence(10);
        assert!(matches!(
            seq.seek(12),
            Err(DriverError::SeekOutOfRange { index: 12, len: 10 })
        ));
        assert_eq!(seq.position(), 12);
        assert!(seq.advance().is_none());
    }

    #[rstest]
    #[case::start(0.0, 0, true)]
    #[case::quarter(0.25, 3, true)]
    #[case::half(0.5, 5, true)]
    #[case::rounds_up(0.97, 10, false)]
    #[case::end(1.0, 10, false)]
    fn test_seek_fraction_rounds_to_nearest(
        #[case] fraction: f64,
        #[case] expected_cursor: u64,
        #[case] ok: bool,
    ) {
        let mut seq = sequence(10);
        assert_eq!(seq.seek_fraction(fraction).is_ok(), ok);
        assert_eq!(seq.position(), expected_cursor);
    }

    #[rstest]
    #[case::negative(-0.1)]
    #[case::above_one(1.5)]
    #[case::nan(f64::NAN)]
    fn test_seek_fraction_rejects_invalid_values(#[case] fraction: f64) {
        let mut seq = sequence(10);
        assert!(matches!(
            seq.seek_fraction(fraction),
            Err(DriverError::InvalidFraction(_))
        ));
        assert_eq!(seq.position(), 0);
    }
}
