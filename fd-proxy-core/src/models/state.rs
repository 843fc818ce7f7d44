use super::error::ProxyError;
use super::recording_result::RecordingResult;

/// Lifecycle of one virtual file handle.
///
/// A handle is `Open` until `Release` has been delivered to its handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Open,
    Closed,
}

impl HandleState {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }
}

/// Recording session state machine.
///
/// State transitions:
/// ```text
/// idle → recording → stopping → completed / failed
///   └──────────────────────────────────────↗ (open failure)
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RecordingState {
    Idle,
    Recording { bytes_written: u64 },
    Stopping,
    Completed(Box<RecordingResult>),
    Failed(ProxyError),
}

impl RecordingState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Failed(_))
    }
}
