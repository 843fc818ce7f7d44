use std::sync::Arc;

use crate::models::error::ProxyError;
use crate::models::recording_result::MediaKind;

/// Callback invoked with each encoded chunk a source produces.
///
/// Returns `false` when the sink no longer accepts data; the source should
/// stop delivering.
pub type ChunkCallback = Arc<dyn Fn(&[u8]) -> bool + Send + Sync + 'static>;

/// A producer of encoded media, e.g. an audio or video encoder.
///
/// The recording session treats it as an external collaborator that
/// streams bytes into a virtual file.
pub trait MediaSource: Send {
    /// What this source produces.
    fn kind(&self) -> MediaKind;

    /// Start producing, delivering chunks via `callback`.
    fn start(&mut self, callback: ChunkCallback) -> Result<(), ProxyError>;

    /// Stop producing. No callback may be in progress once this returns.
    fn stop(&mut self) -> Result<(), ProxyError>;
}
