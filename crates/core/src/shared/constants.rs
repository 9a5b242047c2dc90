/// Extensions recognised as still images when listing an image directory.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

/// Digits used for numbered image output when the caller does not choose.
pub const DEFAULT_IMAGE_DIGITS: i32 = 3;

/// Granularity of the headless cancel poll.
pub const CANCEL_POLL_INTERVAL_MS: u64 = 10;
