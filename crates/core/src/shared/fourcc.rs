use std::fmt;

/// Four-character codec tag, packed little-endian into a `u32` the way
/// container formats and capture APIs report it (`'m' | 'p' << 8 | ...`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FourCc(u32);

impl FourCc {
    /// Unknown / not applicable (image sequences, raw devices).
    pub const NONE: FourCc = FourCc(0);

    pub const fn new(code: [u8; 4]) -> Self {
        Self(u32::from_le_bytes(code))
    }

    pub const fn from_u32(value: u32) -> Self {
        Self(value)
    }

    /// Parses a tag like `"mp4v"`. Shorter tags are space padded, as
    /// ffmpeg does for three-letter tags.
    pub fn from_str_tag(tag: &str) -> Option<Self> {
        let bytes = tag.as_bytes();
        if bytes.is_empty() || bytes.len() > 4 || !bytes.iter().all(|b| b.is_ascii_graphic()) {
            return None;
        }
        let mut code = [b' '; 4];
        code[..bytes.len()].copy_from_slice(bytes);
        Some(Self::new(code))
    }

    pub const fn value(&self) -> u32 {
        self.0
    }

    pub const fn bytes(&self) -> [u8; 4] {
        self.0.to_le_bytes()
    }

    pub const fn is_none(&self) -> bool {
        self.0 == 0
    }

    /// Case-insensitive comparison against a textual tag.
    pub fn matches(&self, tag: &str) -> bool {
        Self::from_str_tag(tag)
            .map(|other| self.bytes().eq_ignore_ascii_case(&other.bytes()))
            .unwrap_or(false)
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            return write!(f, "none");
        }
        for b in self.bytes() {
            let c = if b.is_ascii_graphic() || b == b' ' { b as char } else { '?' };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}
