use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Why a run ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// `run` was called without an open input.
    NotOpened,
    EndOfStream,
    /// A [`StopHandle`] was triggered.
    Requested,
    /// The display backend reported a cancel during the per-frame wait.
    Cancelled,
    /// The input reached the configured stop frame.
    StopFrame,
    ReadFailed(String),
    WriteFailed(String),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::NotOpened => f.write_str("no input opened"),
            StopReason::EndOfStream => f.write_str("end of stream"),
            StopReason::Requested => f.write_str("stop requested"),
            StopReason::Cancelled => f.write_str("cancelled by user"),
            StopReason::StopFrame => f.write_str("stop frame reached"),
            StopReason::ReadFailed(e) => write!(f, "read failed: {e}"),
            StopReason::WriteFailed(e) => write!(f, "write failed: {e}"),
        }
    }
}

/// What to do when a frame cannot be read or written mid-run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FrameErrorPolicy {
    /// End the run and report the failure in the summary.
    #[default]
    Stop,
    /// Log a warning and continue with the next frame.
    Skip,
}

/// Counters collected over one call to `run`.
#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    pub frames_read: u64,
    pub frames_processed: u64,
    pub frames_written: u64,
    pub frames_skipped: u64,
    pub elapsed: Duration,
    pub stop_reason: StopReason,
}

impl RunSummary {
    pub fn new(stop_reason: StopReason) -> Self {
        Self {
            frames_read: 0,
            frames_processed: 0,
            frames_written: 0,
            frames_skipped: 0,
            elapsed: Duration::ZERO,
            stop_reason,
        }
    }

    /// Frames read per second of wall-clock time, 0 for an instant run.
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.frames_read as f64 / secs
        } else {
            0.0
        }
    }

    /// Whether the run ended on an I/O failure rather than normally.
    pub fn failed(&self) -> bool {
        matches!(
            self.stop_reason,
            StopReason::ReadFailed(_) | StopReason::WriteFailed(_)
        )
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Run ended ({}): {} read, {} processed, {} written",
            self.stop_reason, self.frames_read, self.frames_processed, self.frames_written
        )?;
        if self.frames_skipped > 0 {
            write!(f, ", {} skipped", self.frames_skipped)?;
        }
        write!(
            f,
            " in {:.1}s ({:.1} fps)",
            self.elapsed.as_secs_f64(),
            self.throughput()
        )
    }
}

/// Cloneable handle that asks a running driver to stop.
///
/// The flag is checked once per frame, before the next read, so the frame
/// in flight always completes.
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub(crate) fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
