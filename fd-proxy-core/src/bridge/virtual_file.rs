use std::io::{self, Read, Seek, SeekFrom, Write};
use std::thread;

use crossbeam_channel::{Receiver, Sender};

use crate::bridge::request::{IoRequest, Reply};
use crate::models::access_mode::{AccessMode, HandleId};
use crate::models::diagnostics::HandleDiagnostics;
use crate::models::error::ProxyError;
use crate::models::state::HandleState;

/// A file-like handle whose operations are serviced by a `ProxyHandler`.
///
/// Implements `Read`, `Write` and `Seek` with a cursor, so any code that
/// streams into a file can stream into a virtual file unchanged. Every call
/// blocks until the handle's worker has run the handler and replied.
///
/// Dropping an open handle closes it.
#[derive(Debug)]
pub struct VirtualFile {
    id: HandleId,
    mode: AccessMode,
    state: HandleState,
    position: u64,
    requests: Sender<IoRequest>,
    worker: Option<thread::JoinHandle<()>>,
}

impl VirtualFile {
    pub(crate) fn new(
        id: HandleId,
        mode: AccessMode,
        requests: Sender<IoRequest>,
        worker: thread::JoinHandle<()>,
    ) -> Self {
        Self {
            id,
            mode,
            state: HandleState::Open,
            position: 0,
            requests,
            worker: Some(worker),
        }
    }

    pub fn id(&self) -> HandleId {
        self.id
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    pub fn state(&self) -> HandleState {
        self.state
    }

    /// Current cursor position used by `Read`, `Write` and `Seek`.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Ask the handler for the current size.
    pub fn len(&self) -> io::Result<u64> {
        Ok(self.call(|reply| IoRequest::GetSize { reply })?)
    }

    pub fn is_empty(&self) -> io::Result<bool> {
        Ok(self.len()? == 0)
    }

    /// One positional read; does not move the cursor. May be short.
    pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        self.require(self.mode.can_read())?;
        if buf.is_empty() {
            return Ok(0);
        }
        let data = self.call(|reply| IoRequest::Read {
            offset,
            len: buf.len(),
            reply,
        })?;
        buf[..data.len()].copy_from_slice(&data);
        Ok(data.len())
    }

    /// One positional write; does not move the cursor. May be short.
    pub fn write_at(&self, offset: u64, data: &[u8]) -> io::Result<usize> {
        self.require(self.mode.can_write())?;
        if data.is_empty() {
            return Ok(0);
        }
        Ok(self.call(|reply| IoRequest::Write {
            offset,
            data: data.to_vec(),
            reply,
        })?)
    }

    /// Durability barrier: returns once the handler has flushed every
    /// accepted write.
    pub fn sync_all(&self) -> io::Result<()> {
        Ok(self.call(|reply| IoRequest::Fsync { reply })?)
    }

    /// Deliver `Release` to the handler and wait for the worker to exit.
    ///
    /// Requests already queued complete first. After this returns, every
    /// operation fails with `ProxyError::Closed`.
    pub fn close(&mut self) -> Result<HandleDiagnostics, ProxyError> {
        if !self.state.is_open() {
            return Err(ProxyError::Closed);
        }
        self.state = HandleState::Closed;

        let (reply, done) = crossbeam_channel::bounded(1);
        let diagnostics = match self.requests.send(IoRequest::Release { reply }) {
            Ok(()) => done.recv().ok(),
            Err(_) => None,
        };

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("virtual file {}: worker panicked", self.id);
            }
        }

        diagnostics.ok_or_else(|| {
            ProxyError::HandlerFault("worker exited before acknowledging release".into())
        })
    }

    fn require(&self, allowed: bool) -> Result<(), ProxyError> {
        if !self.state.is_open() {
            return Err(ProxyError::Closed);
        }
        if !allowed {
            return Err(ProxyError::UnsupportedMode(self.mode));
        }
        Ok(())
    }

    fn call<T>(&self, request: impl FnOnce(Reply<T>) -> IoRequest) -> Result<T, ProxyError> {
        if !self.state.is_open() {
            return Err(ProxyError::Closed);
        }
        let (reply, done): (Reply<T>, Receiver<Result<T, ProxyError>>) =
            crossbeam_channel::bounded(1);
        self.requests
            .send(request(reply))
            .map_err(|_| ProxyError::Closed)?;
        done.recv().map_err(|_| ProxyError::Closed)?
    }
}

impl Read for VirtualFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.read_at(self.position, buf)?;
        self.position += n as u64;
        Ok(n)
    }
}

impl Write for VirtualFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.write_at(self.position, buf)?;
        self.position += n as u64;
        Ok(n)
    }

    /// Nothing is buffered on this side; use `sync_all` for durability.
    fn flush(&mut self) -> io::Result<()> {
        if !self.state.is_open() {
            return Err(ProxyError::Closed.into());
        }
        Ok(())
    }
}

impl Seek for VirtualFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let (base, delta) = match pos {
            SeekFrom::Start(n) => {
                self.position = n;
                return Ok(n);
            }
            SeekFrom::Current(delta) => (self.position, delta),
            SeekFrom::End(delta) => (self.len()?, delta),
        };
        let target = base.checked_add_signed(delta).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek to a negative or overflowing position",
            )
        })?;
        self.position = target;
        Ok(target)
    }
}

impl Drop for VirtualFile {
    fn drop(&mut self) {
        if self.state.is_open() {
            if let Err(e) = self.close() {
                log::error!("virtual file {}: close on drop failed: {}", self.id, e);
            }
        }
    }
}
