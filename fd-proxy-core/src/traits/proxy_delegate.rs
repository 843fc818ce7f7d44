use crate::models::access_mode::{AccessMode, HandleId};
use crate::models::diagnostics::HandleDiagnostics;
use crate::models::error::ProxyError;

/// Lifecycle notifications for virtual files opened through a bridge.
///
/// `on_opened` runs on the opening thread; `on_fault` and `on_released`
/// run on the handle's servicing worker. Keep them short.
pub trait ProxyDelegate: Send + Sync {
    /// Called after a handle is registered and its worker is running.
    fn on_opened(&self, id: HandleId, mode: AccessMode);

    /// Called when the handler fails a request. The handle stays open.
    fn on_fault(&self, id: HandleId, error: &ProxyError);

    /// Called after `Release` has been delivered to the handler.
    fn on_released(&self, id: HandleId, diagnostics: &HandleDiagnostics);
}
