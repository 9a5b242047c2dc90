use clap::ValueEnum;

use framestream_core::{Frame, FrameStreamDriver};

/// Built-in per-frame transforms selectable from the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TransformKind {
    /// Pass frames through without calling a transform.
    None,
    /// Copy each frame unchanged (counts as processed).
    Copy,
    /// Convert to single-channel luma.
    Gray,
    /// Invert every channel.
    Invert,
}

pub fn install(driver: &mut FrameStreamDriver, kind: TransformKind) {
    match kind {
        TransformKind::None => driver.disable_processing(),
        TransformKind::Copy => driver.set_frame_function(copy),
        TransformKind::Gray => driver.set_frame_function(gray),
        TransformKind::Invert => driver.set_frame_function(invert),
    }
}

pub fn copy(input: &mut Frame, output: &mut Frame) {
    output.clone_from(input);
}

/// Frames that are neither gray nor RGB are passed through unchanged; the
/// sink then reports them.
pub fn gray(input: &mut Frame, output: &mut Frame) {
    match input.to_gray() {
        Ok(gray) => *output = gray,
        Err(e) => {
            log::warn!("Cannot convert frame {} to gray: {e}", input.index());
            output.clone_from(input);
        }
    }
}

pub fn invert(input: &mut Frame, output: &mut Frame) {
    output.clone_from(input);
    for v in output.data_mut() {
        *v = !*v;
    }
}
