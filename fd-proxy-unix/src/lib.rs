//! # fd-proxy-unix
//!
//! Unix descriptor adapter for fd-proxy-kit.
//!
//! Provides:
//! - `ProxyPipe` — a real `OwnedFd` (one end of a pipe) whose bytes are
//!   pumped into or out of a virtual file on a dedicated thread
//!
//! Pipes are not seekable, so consumers see a sequential stream. Use the
//! `VirtualFile` from `fd-proxy-core` directly when positional access is
//! needed.
//!
//! ## Usage
//! ```ignore
//! use fd_proxy_core::{AccessMode, BridgeConfig, MemoryHandler, ProxyBridge};
//! use fd_proxy_unix::ProxyPipe;
//!
//! let bridge = ProxyBridge::new(BridgeConfig::default())?;
//! let (handler, contents) = MemoryHandler::new();
//! let mut pipe = ProxyPipe::open(&bridge, AccessMode::WriteOnly, handler)?;
//! let fd = pipe.take_fd().unwrap(); // hand to an encoder
//! ```

#[cfg(unix)]
pub mod pipe;

#[cfg(unix)]
pub use pipe::{ProxyPipe, PumpReport};
