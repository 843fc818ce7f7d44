use std::io;

use thiserror::Error;

use super::access_mode::AccessMode;

/// Errors that can occur while opening or servicing a virtual file.
///
/// Short reads and short writes are not errors: they are valid partial
/// progress that the caller retries.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProxyError {
    #[error("handler is already bound to an open virtual file")]
    AlreadyBound,

    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("handler fault: {0}")]
    HandlerFault(String),

    #[error("virtual file is closed")]
    Closed,

    #[error("unsupported access mode: {0}")]
    UnsupportedMode(AccessMode),

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("recording error: {0}")]
    Recording(String),
}

impl ProxyError {
    /// Convert into an `io::Error` for the file layer, keeping `self` as the source.
    pub fn into_io(self) -> io::Error {
        let kind = match self {
            Self::Closed => io::ErrorKind::BrokenPipe,
            Self::UnsupportedMode(_) => io::ErrorKind::PermissionDenied,
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, self)
    }

    /// Recover a `ProxyError` carried inside an `io::Error`, if there is one.
    pub fn from_io(err: &io::Error) -> Option<&ProxyError> {
        err.get_ref().and_then(|inner| inner.downcast_ref::<ProxyError>())
    }
}

impl From<ProxyError> for io::Error {
    fn from(err: ProxyError) -> Self {
        err.into_io()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_conversion_keeps_source() {
        let err = ProxyError::HandlerFault("disk full".into()).into_io();
        assert_eq!(err.kind(), io::ErrorKind::Other);
        assert_eq!(
            ProxyError::from_io(&err),
            Some(&ProxyError::HandlerFault("disk full".into()))
        );
    }

    #[test]
    fn mode_violation_maps_to_permission_denied() {
        let err: io::Error = ProxyError::UnsupportedMode(AccessMode::ReadOnly).into();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn plain_io_error_has_no_proxy_source() {
        let err = io::Error::new(io::ErrorKind::WriteZero, "zero");
        assert!(ProxyError::from_io(&err).is_none());
    }
}
