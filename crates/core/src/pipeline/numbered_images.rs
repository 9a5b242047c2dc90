use std::path::PathBuf;

use super::driver_error::DriverError;

/// Output sink that writes each frame to its own numbered image file.
///
/// File names are `prefix`, the index zero-padded to `digits`, then
/// `extension`. The image format follows from the extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NumberedImages {
    prefix: String,
    extension: String,
    digits: usize,
    next_index: u64,
}

impl NumberedImages {
    pub fn new(
        prefix: impl Into<String>,
        extension: &str,
        digits: i32,
        start_index: u64,
    ) -> Result<Self, DriverError> {
        let digits = usize::try_from(digits).map_err(|_| DriverError::InvalidDigits(digits))?;
        let extension = if extension.is_empty() || extension.starts_with('.') {
            extension.to_string()
        } else {
            format!(".{extension}")
        };
        Ok(Self {
            prefix: prefix.into(),
            extension,
            digits,
            next_index: start_index,
        })
    }

    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    /// Path the next frame will be written to.
    pub fn next_path(&self) -> PathBuf {
        PathBuf::from(format!(
            "{}{:0width$}{}",
            self.prefix,
            self.next_index,
            self.extension,
            width = self.digits
        ))
    }

    pub fn advance(&mut self) {
        self.next_index += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::padded("out_", ".bmp", 3, 7, "out_007.bmp")]
    #[case::wider_than_digits("f", ".png", 2, 1234, "f1234.png")]
    #[case::no_padding("frame", ".jpg", 0, 5, "frame5.jpg")]
    #[case::extension_without_dot("out_", "bmp", 3, 0, "out_000.bmp")]
    #[case::nested_prefix("dir/sub/img", ".png", 4, 42, "dir/sub/img0042.png")]
    fn test_next_path_formatting(
        #[case] prefix: &str,
        #[case] extension: &str,
        #[case] digits: i32,
        #[case] start: u64,
        #[case] expected: &str,
    ) {
        let sink = NumberedImages::new(prefix, extension, digits, start).unwrap();
        assert_eq!(sink.next_path(), PathBuf::from(expected));
    }

    #[test]
    fn test_negative_digits_rejected() {
        assert!(matches!(
            NumberedImages::new("out_", ".bmp", -1, 0),
            Err(DriverError::InvalidDigits(-1))
        ));
    }

    #[test]
    fn test_advance_moves_to_next_name() {
        let mut sink = NumberedImages::new("out_", ".bmp", 3, 9).unwrap();
        sink.advance();
        assert_eq!(sink.next_index(), 10);
        assert_eq!(sink.next_path(), PathBuf::from("out_010.bmp"));
    }
}
