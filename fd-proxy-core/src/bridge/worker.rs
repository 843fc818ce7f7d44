use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crossbeam_channel::Receiver;
use parking_lot::Mutex;

use crate::bridge::registry::Registry;
use crate::bridge::request::IoRequest;
use crate::models::access_mode::HandleId;
use crate::models::diagnostics::HandleDiagnostics;
use crate::models::error::ProxyError;
use crate::traits::proxy_delegate::ProxyDelegate;
use crate::traits::proxy_handler::SharedHandler;

/// Servicing loop for one handle.
///
/// Owns the receiving end of the handle's request queue. Requests are
/// handled strictly one at a time in arrival order. The loop ends after
/// `Release`, or when the queue disconnects, in which case `Release` is
/// still delivered.
pub(crate) struct Worker {
    pub(crate) id: HandleId,
    pub(crate) handler: SharedHandler,
    pub(crate) requests: Receiver<IoRequest>,
    pub(crate) registry: Arc<Mutex<Registry>>,
    pub(crate) delegate: Option<Arc<dyn ProxyDelegate>>,
}

impl Worker {
    pub(crate) fn run(self) {
        log::debug!("virtual file {}: worker started", self.id);
        let mut diagnostics = HandleDiagnostics::default();

        while let Ok(request) = self.requests.recv() {
            log::trace!("virtual file {}: {}", self.id, request.name());
            match request {
                IoRequest::GetSize { reply } => {
                    diagnostics.size_queries += 1;
                    let result = self.guarded(|h| h.lock().get_size());
                    let _ = reply.send(self.observe(result, &mut diagnostics));
                }
                IoRequest::Read { offset, len, reply } => {
                    diagnostics.reads += 1;
                    let result = self.service_read(offset, len);
                    if let Ok(ref data) = result {
                        diagnostics.bytes_read += data.len() as u64;
                    }
                    let _ = reply.send(self.observe(result, &mut diagnostics));
                }
                IoRequest::Write { offset, data, reply } => {
                    diagnostics.writes += 1;
                    let result = self.service_write(offset, &data);
                    if let Ok(accepted) = result {
                        diagnostics.bytes_written += accepted as u64;
                    }
                    let _ = reply.send(self.observe(result, &mut diagnostics));
                }
                IoRequest::Fsync { reply } => {
                    diagnostics.fsyncs += 1;
                    let result = self.guarded(|h| h.lock().fsync());
                    let _ = reply.send(self.observe(result, &mut diagnostics));
                }
                IoRequest::Release { reply } => {
                    self.release(&diagnostics);
                    let _ = reply.send(diagnostics);
                    return;
                }
            }
        }

        log::warn!("virtual file {}: request queue dropped without release", self.id);
        self.release(&diagnostics);
    }

    fn service_read(&self, offset: u64, len: usize) -> Result<Vec<u8>, ProxyError> {
        let mut buf = vec![0u8; len];
        let n = self.guarded(|h| h.lock().read(offset, &mut buf))?;
        if n > len {
            return Err(ProxyError::HandlerFault(format!(
                "read reported {} bytes for a {}-byte request",
                n, len
            )));
        }
        buf.truncate(n);
        Ok(buf)
    }

    fn service_write(&self, offset: u64, data: &[u8]) -> Result<usize, ProxyError> {
        let accepted = self.guarded(|h| h.lock().write(offset, data))?;
        if accepted > data.len() {
            return Err(ProxyError::HandlerFault(format!(
                "write accepted {} bytes of a {}-byte buffer",
                accepted,
                data.len()
            )));
        }
        Ok(accepted)
    }

    fn release(&self, diagnostics: &HandleDiagnostics) {
        if let Err(e) = self.guarded(|h| {
            h.lock().release();
            Ok(())
        }) {
            log::error!("virtual file {}: release failed: {}", self.id, e);
        }
        let mode = self.registry.lock().unregister(self.id);
        if let Some(ref delegate) = self.delegate {
            delegate.on_released(self.id, diagnostics);
        }
        match mode {
            Some(mode) => log::debug!(
                "virtual file {}: released {} handle after {} writes, {} reads",
                self.id,
                mode,
                diagnostics.writes,
                diagnostics.reads
            ),
            None => log::warn!("virtual file {}: released but was not registered", self.id),
        }
    }

    /// Run a handler call, turning a panic into a `HandlerFault` so the
    /// worker keeps servicing the handle.
    fn guarded<T>(
        &self,
        call: impl FnOnce(&SharedHandler) -> Result<T, ProxyError>,
    ) -> Result<T, ProxyError> {
        panic::catch_unwind(AssertUnwindSafe(|| call(&self.handler)))
            .unwrap_or_else(|payload| Err(ProxyError::HandlerFault(panic_message(payload))))
    }

    fn observe<T>(
        &self,
        result: Result<T, ProxyError>,
        diagnostics: &mut HandleDiagnostics,
    ) -> Result<T, ProxyError> {
        if let Err(ref e) = result {
            diagnostics.faults += 1;
            log::warn!("virtual file {}: handler fault: {}", self.id, e);
            if let Some(ref delegate) = self.delegate {
                delegate.on_fault(self.id, e);
            }
        }
        result
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("handler panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("handler panicked: {}", s)
    } else {
        "handler panicked".into()
    }
}
