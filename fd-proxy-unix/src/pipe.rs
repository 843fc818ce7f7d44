//! Pipe-backed OS descriptors for virtual files.
//!
//! Write-only: the consumer gets the write end; the pump drains the read
//! end into the virtual file until the consumer closes its end.
//!
//! Read-only: the consumer gets the read end; the pump copies the virtual
//! file from offset 0 into the pipe until the handler reports end-of-file.

use std::io::{self, PipeReader, PipeWriter};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd, RawFd};
use std::thread;

use fd_proxy_core::{
    AccessMode, HandleDiagnostics, HandleId, ProxyBridge, ProxyError, ProxyHandler, VirtualFile,
};

/// Outcome of a finished pump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PumpReport {
    /// Bytes moved between the pipe and the virtual file.
    pub bytes: u64,
    pub diagnostics: HandleDiagnostics,
}

/// A virtual file exposed as a real file descriptor.
pub struct ProxyPipe {
    id: HandleId,
    mode: AccessMode,
    fd: Option<OwnedFd>,
    pump: Option<thread::JoinHandle<Result<PumpReport, ProxyError>>>,
}

impl ProxyPipe {
    /// Open a virtual file on `handler` and connect it to a pipe.
    ///
    /// Only `ReadOnly` and `WriteOnly` are supported; `ReadWrite` fails with
    /// `UnsupportedMode` before the handler is bound.
    pub fn open<H: ProxyHandler + 'static>(
        bridge: &ProxyBridge,
        mode: AccessMode,
        handler: H,
    ) -> Result<Self, ProxyError> {
        if mode == AccessMode::ReadWrite {
            return Err(ProxyError::UnsupportedMode(mode));
        }

        let (reader, writer) = io::pipe()
            .map_err(|e| ProxyError::ResourceExhausted(format!("failed to create pipe: {}", e)))?;

        let file = bridge.open(mode, handler)?;
        let id = file.id();
        let builder = thread::Builder::new().name(format!("proxy-pump-{}", id));

        let (fd, pump) = match mode {
            AccessMode::WriteOnly => (
                OwnedFd::from(writer),
                builder.spawn(move || drain(reader, file)),
            ),
            _ => (
                OwnedFd::from(reader),
                builder.spawn(move || feed(file, writer)),
            ),
        };
        let pump = pump.map_err(|e| {
            ProxyError::ResourceExhausted(format!("failed to spawn pump thread: {}", e))
        })?;

        log::debug!("virtual file {}: exposed as fd {} ({})", id, fd.as_raw_fd(), mode);
        Ok(Self {
            id,
            mode,
            fd: Some(fd),
            pump: Some(pump),
        })
    }

    pub fn id(&self) -> HandleId {
        self.id
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Borrow the descriptor while this pipe still holds it.
    pub fn as_fd(&self) -> Option<BorrowedFd<'_>> {
        self.fd.as_ref().map(|fd| fd.as_fd())
    }

    pub fn as_raw_fd(&self) -> Option<RawFd> {
        self.fd.as_ref().map(|fd| fd.as_raw_fd())
    }

    /// Hand the descriptor to a consumer. The consumer must close it for a
    /// write-only pump to finish.
    pub fn take_fd(&mut self) -> Option<OwnedFd> {
        self.fd.take()
    }

    /// Close the held descriptor (if any), wait for the pump, and report.
    ///
    /// `Release` has been delivered to the handler once this returns, on
    /// success and on failure.
    pub fn wait(mut self) -> Result<PumpReport, ProxyError> {
        drop(self.fd.take());
        let pump = self.pump.take().ok_or(ProxyError::Closed)?;
        pump.join()
            .map_err(|_| ProxyError::HandlerFault("pump thread panicked".into()))?
    }
}

impl Drop for ProxyPipe {
    fn drop(&mut self) {
        let Some(pump) = self.pump.take() else {
            return;
        };
        if self.fd.take().is_some() {
            if let Ok(Err(e)) = pump.join() {
                log::warn!("virtual file {}: pump ended with error: {}", self.id, e);
            }
        } else {
            log::debug!("virtual file {}: pump detached, consumer owns the fd", self.id);
        }
    }
}

/// Consumer writes into the pipe; copy everything into the virtual file.
fn drain(mut reader: PipeReader, mut file: VirtualFile) -> Result<PumpReport, ProxyError> {
    let copied = io::copy(&mut reader, &mut file);
    drop(reader);
    let synced = match copied {
        Ok(_) => file.sync_all(),
        Err(_) => Ok(()),
    };
    finish(file, copied, synced)
}

/// Copy the virtual file into the pipe for the consumer to read.
fn feed(mut file: VirtualFile, mut writer: PipeWriter) -> Result<PumpReport, ProxyError> {
    let copied = io::copy(&mut file, &mut writer);
    drop(writer);
    finish(file, copied, Ok(()))
}

fn finish(
    mut file: VirtualFile,
    copied: io::Result<u64>,
    synced: io::Result<()>,
) -> Result<PumpReport, ProxyError> {
    let id = file.id();
    let pumped = copied.and_then(|bytes| synced.map(|()| bytes));
    if let Err(ref e) = pumped {
        log::error!("virtual file {}: pump failed: {}", id, e);
    }

    // Release regardless; a pump error outranks a close error.
    let closed = file.close();
    let bytes = pumped.map_err(|e| {
        ProxyError::from_io(&e)
            .cloned()
            .unwrap_or_else(|| ProxyError::Storage(format!("pump failed: {}", e)))
    })?;
    let diagnostics = closed?;
    log::debug!("virtual file {}: pump finished after {} bytes", id, bytes);
    Ok(PumpReport { bytes, diagnostics })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::{Read, Write};

    use fd_proxy_core::{BridgeConfig, MemoryHandler, NullHandler};

    fn bridge() -> ProxyBridge {
        ProxyBridge::new(BridgeConfig::default()).unwrap()
    }

    #[test]
    fn write_only_fd_streams_into_handler() {
        let bridge = bridge();
        let (handler, contents) = MemoryHandler::new();
        let mut pipe = ProxyPipe::open(&bridge, AccessMode::WriteOnly, handler).unwrap();
        assert!(pipe.as_raw_fd().is_some());

        let mut sink = File::from(pipe.take_fd().unwrap());
        assert!(pipe.as_fd().is_none());
        for i in 0..8u8 {
            sink.write_all(&[i; 1000]).unwrap();
        }
        drop(sink);

        let report = pipe.wait().unwrap();
        assert_eq!(report.bytes, 8000);
        assert_eq!(report.diagnostics.bytes_written, 8000);
        assert_eq!(report.diagnostics.fsyncs, 1);
        assert_eq!(contents.len(), 8000);
        assert_eq!(bridge.open_count(), 0);
    }

    #[test]
    fn read_only_fd_serves_handler_contents() {
        let bridge = bridge();
        let (handler, _) = MemoryHandler::with_contents(b"proxied bytes".to_vec());
        let mut pipe = ProxyPipe::open(&bridge, AccessMode::ReadOnly, handler).unwrap();

        let mut source = File::from(pipe.take_fd().unwrap());
        let mut text = String::new();
        source.read_to_string(&mut text).unwrap();
        assert_eq!(text, "proxied bytes");

        let report = pipe.wait().unwrap();
        assert_eq!(report.bytes, 13);
        assert_eq!(report.diagnostics.bytes_read, 13);
    }

    #[test]
    fn read_write_is_unsupported_and_leaves_handler_unbound() {
        let bridge = bridge();
        let err = ProxyPipe::open(&bridge, AccessMode::ReadWrite, NullHandler::new())
            .err()
            .unwrap();
        assert_eq!(err, ProxyError::UnsupportedMode(AccessMode::ReadWrite));
        assert_eq!(bridge.open_count(), 0);
    }

    #[test]
    fn rejecting_handler_fails_pump_but_still_releases() {
        let bridge = bridge();
        let mut pipe = ProxyPipe::open(&bridge, AccessMode::WriteOnly, NullHandler::new()).unwrap();

        let mut sink = File::from(pipe.take_fd().unwrap());
        sink.write_all(b"encoded frame").unwrap();
        drop(sink);

        let err = pipe.wait().unwrap_err();
        assert!(matches!(err, ProxyError::Storage(_)));
        assert_eq!(bridge.open_count(), 0);
    }

    #[test]
    fn wait_without_taking_fd_closes_it() {
        let bridge = bridge();
        let (handler, contents) = MemoryHandler::new();
        let pipe = ProxyPipe::open(&bridge, AccessMode::WriteOnly, handler).unwrap();

        let report = pipe.wait().unwrap();
        assert_eq!(report.bytes, 0);
        assert!(contents.is_empty());
        assert_eq!(bridge.open_count(), 0);
    }

    #[test]
    fn pump_error_is_kept_when_close_also_fails() {
        let bridge = bridge();
        let (handler, _) = MemoryHandler::new();
        let mut file = bridge.open(AccessMode::WriteOnly, handler).unwrap();
        file.close().unwrap();

        let copied = Err(io::Error::new(io::ErrorKind::BrokenPipe, "consumer went away"));
        let err = finish(file, copied, Ok(())).unwrap_err();
        assert!(matches!(err, ProxyError::Storage(msg) if msg.contains("consumer went away")));
    }

    #[test]
    fn close_error_surfaces_when_pump_succeeded() {
        let bridge = bridge();
        let (handler, _) = MemoryHandler::new();
        let mut file = bridge.open(AccessMode::WriteOnly, handler).unwrap();
        file.close().unwrap();

        assert_eq!(finish(file, Ok(0), Ok(())).unwrap_err(), ProxyError::Closed);
    }
}
