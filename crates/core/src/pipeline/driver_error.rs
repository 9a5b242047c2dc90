use std::path::PathBuf;

use thiserror::Error;

/// Configuration and seek failures reported by [`FrameStreamDriver`].
///
/// [`FrameStreamDriver`]: super::frame_stream_driver::FrameStreamDriver
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("failed to open input {input}: {source}")]
    OpenInput {
        input: String,
        #[source]
        source: Box<dyn std::error::Error>,
    },
    #[error("image list is empty")]
    EmptyImageList,
    #[error("no input is open")]
    NoInput,
    #[error("input has no codec to reuse; pass one explicitly")]
    NoInputCodec,
    #[error("input has no frame rate to reuse; pass one explicitly")]
    NoInputFrameRate,
    #[error("cannot determine the input frame size")]
    UnknownFrameSize,
    #[error("failed to open output {path}: {source}")]
    OpenOutput {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error>,
    },
    #[error("number of digits must be non-negative, got {0}")]
    InvalidDigits(i32),
    #[error("failed to create window '{name}': {source}")]
    Display {
        name: String,
        #[source]
        source: Box<dyn std::error::Error>,
    },
    #[error("frame {index} is outside the image list of length {len}")]
    SeekOutOfRange { index: u64, len: usize },
    #[error("relative position {0} is outside 0..=1")]
    InvalidFraction(f64),
    #[error("seek failed: {0}")]
    Seek(#[source] Box<dyn std::error::Error>),
    #[error("{0} is not supported for image sequence input")]
    Unsupported(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_messages_name_the_offending_value() {
        assert_eq!(
            DriverError::InvalidDigits(-1).to_string(),
            "number of digits must be non-negative, got -1"
        );
        assert_eq!(
            DriverError::SeekOutOfRange { index: 12, len: 10 }.to_string(),
            "frame 12 is outside the image list of length 10"
        );
        assert_eq!(
            DriverError::Unsupported("seeking by time").to_string(),
            "seeking by time is not supported for image sequence input"
        );
    }

    #[test]
    fn test_backend_error_is_kept_as_source() {
        let err = DriverError::OpenOutput {
            path: PathBuf::from("out.avi"),
            source: "unsupported codec tag ZZZZ".into(),
        };
        assert_eq!(
            err.to_string(),
            "failed to open output out.avi: unsupported codec tag ZZZZ"
        );
        assert_eq!(
            err.source().map(|s| s.to_string()),
            Some("unsupported codec tag ZZZZ".to_string())
        );
    }
}
