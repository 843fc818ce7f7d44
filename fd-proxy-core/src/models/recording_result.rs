use serde::{Deserialize, Serialize};

use super::access_mode::HandleId;
use super::diagnostics::HandleDiagnostics;
use super::error::ProxyError;

/// Kind of media routed through a recording session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

/// How a recording session ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordingOutcome {
    /// Every chunk the source produced was accepted.
    Complete,
    /// A handler fault ended the stream early. `bytes_written` still holds
    /// what was handed off before the fault.
    Partial { error: ProxyError },
}

impl RecordingOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

/// Result returned when a recording session stops.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingResult {
    pub handle_id: HandleId,
    pub bytes_written: u64,
    pub duration_secs: f64,
    pub outcome: RecordingOutcome,
    pub diagnostics: HandleDiagnostics,
    pub metadata: RecordingMetadata,
}

/// Metadata describing a finished recording.
///
/// Serializable for a JSON sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub id: String,
    pub kind: MediaKind,
    pub duration_secs: f64,
    pub bytes_written: u64,
    pub complete: bool,
    pub failure: Option<String>,
    pub created_at: String,
}

impl RecordingMetadata {
    pub fn new(kind: MediaKind, duration_secs: f64, bytes_written: u64, outcome: &RecordingOutcome) -> Self {
        let failure = match outcome {
            RecordingOutcome::Complete => None,
            RecordingOutcome::Partial { error } => Some(error.to_string()),
        };
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            duration_secs,
            bytes_written,
            complete: outcome.is_complete(),
            failure,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
