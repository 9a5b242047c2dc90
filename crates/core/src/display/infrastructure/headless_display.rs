use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::display::domain::display_backend::{DisplayBackend, WindowHandle};
use crate::shared::constants::CANCEL_POLL_INTERVAL_MS;
use crate::shared::frame::Frame;

/// Display backend without any visible output.
///
/// Windows are bookkeeping only; shown frames are counted and dropped.
/// Cancellation comes from a shared flag, typically raised by a Ctrl-C
/// handler, and is consumed by the wait that observes it.
pub struct HeadlessDisplay {
    cancel: Arc<AtomicBool>,
    windows: HashMap<u32, usize>,
    next_id: u32,
}

impl HeadlessDisplay {
    pub fn new() -> Self {
        Self::with_cancel_flag(Arc::new(AtomicBool::new(false)))
    }

    pub fn with_cancel_flag(cancel: Arc<AtomicBool>) -> Self {
        Self {
            cancel,
            windows: HashMap::new(),
            next_id: 0,
        }
    }

    /// Flag that, once set, makes the next wait report a cancel.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    pub fn open_windows(&self) -> usize {
        self.windows.len()
    }
}

impl Default for HeadlessDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayBackend for HeadlessDisplay {
    fn create_window(&mut self, name: &str) -> Result<WindowHandle, Box<dyn std::error::Error>> {
        let id = self.next_id;
        self.next_id += 1;
        self.windows.insert(id, 0);
        log::debug!("Created headless window '{name}'");
        Ok(WindowHandle::new(id, name))
    }

    fn show(
        &mut self,
        window: &WindowHandle,
        frame: &Frame,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let shown = self
            .windows
            .get_mut(&window.id())
            .ok_or_else(|| format!("window '{}' does not exist", window.name()))?;
        *shown += 1;
        log::trace!(
            "Window '{}' frame {} ({})",
            window.name(),
            frame.index(),
            frame.size()
        );
        Ok(())
    }

    fn destroy_window(&mut self, window: WindowHandle) {
        if let Some(shown) = self.windows.remove(&window.id()) {
            log::debug!("Destroyed window '{}' after {shown} frames", window.name());
        }
    }

    fn wait_for_cancel(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let slice = Duration::from_millis(CANCEL_POLL_INTERVAL_MS);
        loop {
            if self.cancel.swap(false, Ordering::SeqCst) {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            std::thread::sleep(slice.min(deadline - now));
        }
    }
}
