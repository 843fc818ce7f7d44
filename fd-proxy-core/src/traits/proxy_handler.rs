use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::error::ProxyError;

/// The pluggable backing of one virtual file.
///
/// Five independent operations, invoked synchronously and in issue order
/// from the handle's servicing worker. A handler instance is bound to one
/// handle for its whole lifetime.
///
/// Implemented by:
/// - `NullHandler` (accepts nothing, reports size 0)
/// - `MemoryHandler` (growable in-memory buffer)
/// - `FileSinkHandler` (positional writes into a real file)
pub trait ProxyHandler: Send {
    /// Current length of the backing. 0 is valid and means empty or
    /// streaming with unknown size.
    fn get_size(&mut self) -> Result<u64, ProxyError>;

    /// Fill `buf` from absolute `offset`. Returns `0..=buf.len()`; a short
    /// read is not end-of-file, 0 is.
    fn read(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, ProxyError>;

    /// Accept bytes at absolute `offset`. Returns `0..=data.len()`; the
    /// caller retries the remainder at `offset + accepted`. Accepted bytes
    /// must be handed off before returning.
    fn write(&mut self, offset: u64, data: &[u8]) -> Result<usize, ProxyError>;

    /// Block until every accepted write is flushed to the backing.
    fn fsync(&mut self) -> Result<(), ProxyError>;

    /// Called exactly once when the handle closes. Nothing follows it.
    fn release(&mut self);
}

/// A handler that the caller keeps a reference to after binding.
///
/// The bridge refuses to bind the same shared handler to two open handles.
pub type SharedHandler = Arc<Mutex<dyn ProxyHandler>>;

impl<H: ProxyHandler + ?Sized> ProxyHandler for Box<H> {
    fn get_size(&mut self) -> Result<u64, ProxyError> {
        (**self).get_size()
    }

    fn read(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, ProxyError> {
        (**self).read(offset, buf)
    }

    fn write(&mut self, offset: u64, data: &[u8]) -> Result<usize, ProxyError> {
        (**self).write(offset, data)
    }

    fn fsync(&mut self) -> Result<(), ProxyError> {
        (**self).fsync()
    }

    fn release(&mut self) {
        (**self).release()
    }
}
