use std::time::Duration;

use crate::shared::frame::Frame;

/// Opaque handle to a preview window owned by the caller that created it.
///
/// Handles are not `Clone`: destroying a window consumes its handle, so a
/// window cannot be shown after it was torn down.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct WindowHandle {
    id: u32,
    name: String,
}

impl WindowHandle {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Preview surfaces plus the user-cancel poll used as the inter-frame delay.
pub trait DisplayBackend: Send {
    fn create_window(&mut self, name: &str) -> Result<WindowHandle, Box<dyn std::error::Error>>;

    fn show(&mut self, window: &WindowHandle, frame: &Frame)
        -> Result<(), Box<dyn std::error::Error>>;

    fn destroy_window(&mut self, window: WindowHandle);

    /// Blocks for up to `timeout` and returns `true` as soon as the user
    /// asks to cancel. A zero timeout only polls.
    fn wait_for_cancel(&mut self, timeout: Duration) -> bool;
}
