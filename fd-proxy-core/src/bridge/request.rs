use crossbeam_channel::Sender;

use crate::models::diagnostics::HandleDiagnostics;
use crate::models::error::ProxyError;

/// Completion channel for one request. Always `bounded(1)`.
pub(crate) type Reply<T> = Sender<Result<T, ProxyError>>;

/// A single operation dispatched from a `VirtualFile` to its worker.
pub(crate) enum IoRequest {
    GetSize { reply: Reply<u64> },
    Read { offset: u64, len: usize, reply: Reply<Vec<u8>> },
    Write { offset: u64, data: Vec<u8>, reply: Reply<usize> },
    Fsync { reply: Reply<()> },
    Release { reply: Sender<HandleDiagnostics> },
}

impl IoRequest {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::GetSize { .. } => "get_size",
            Self::Read { .. } => "read",
            Self::Write { .. } => "write",
            Self::Fsync { .. } => "fsync",
            Self::Release { .. } => "release",
        }
    }
}
