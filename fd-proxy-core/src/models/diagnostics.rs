use serde::{Deserialize, Serialize};

/// Per-handle counters, collected on the servicing worker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleDiagnostics {
    pub size_queries: u64,
    pub reads: u64,
    pub writes: u64,
    pub fsyncs: u64,
    pub faults: u64,
    pub bytes_read: u64,
    pub bytes_written: u64,
}
