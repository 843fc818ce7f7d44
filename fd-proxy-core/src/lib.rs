//! # fd-proxy-core
//!
//! Platform-agnostic virtual file bridge.
//!
//! A `VirtualFile` behaves like a regular file (`Read`, `Write`, `Seek`,
//! `sync_all`), but every operation is forwarded to a pluggable
//! `ProxyHandler` on a worker thread dedicated to that handle. Platform
//! adapters (e.g. `fd-proxy-unix`) turn a virtual file into a real OS
//! descriptor.
//!
//! ## Architecture
//!
//! ```text
//! fd-proxy-core (this crate)
//! ├── bridge/     ← ProxyBridge (descriptor table), VirtualFile, per-handle worker
//! ├── traits/     ← ProxyHandler, ProxyDelegate, MediaSource
//! ├── handlers/   ← NullHandler, MemoryHandler, FileSinkHandler
//! ├── models/     ← ProxyError, AccessMode, BridgeConfig, states, diagnostics, results
//! ├── session/    ← RecordingSession (media source → virtual file)
//! └── storage/    ← metadata sidecar
//! ```

pub mod bridge;
pub mod handlers;
pub mod models;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use bridge::proxy_bridge::ProxyBridge;
pub use bridge::virtual_file::VirtualFile;
pub use handlers::file_sink::{FileSinkHandler, FileSinkReceipt, FileSinkReport};
pub use handlers::memory_handler::{MemoryHandler, SharedBuffer};
pub use handlers::null_handler::NullHandler;
pub use models::access_mode::{AccessMode, HandleId};
pub use models::config::BridgeConfig;
pub use models::diagnostics::HandleDiagnostics;
pub use models::error::ProxyError;
pub use models::recording_result::{MediaKind, RecordingMetadata, RecordingOutcome, RecordingResult};
pub use models::state::{HandleState, RecordingState};
pub use session::recording::RecordingSession;
pub use traits::media_source::{ChunkCallback, MediaSource};
pub use traits::proxy_delegate::ProxyDelegate;
pub use traits::proxy_handler::{ProxyHandler, SharedHandler};
