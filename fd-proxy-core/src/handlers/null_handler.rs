use crate::models::error::ProxyError;
use crate::traits::proxy_handler::ProxyHandler;

/// A handler that accepts nothing.
///
/// Reports size 0, reads 0 bytes, accepts 0 bytes of every write, and
/// ignores fsync and release. Every call is logged at debug level. Useful
/// for reproducing consumers that misbehave when a sink silently rejects
/// their output.
#[derive(Debug, Default)]
pub struct NullHandler;

impl NullHandler {
    pub fn new() -> Self {
        Self
    }
}

impl ProxyHandler for NullHandler {
    fn get_size(&mut self) -> Result<u64, ProxyError> {
        log::debug!("null handler: get_size");
        Ok(0)
    }

    fn read(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, ProxyError> {
        log::debug!("null handler: read {} bytes at {}", buf.len(), offset);
        Ok(0)
    }

    fn write(&mut self, offset: u64, data: &[u8]) -> Result<usize, ProxyError> {
        log::debug!("null handler: write {} bytes at {}", data.len(), offset);
        Ok(0)
    }

    fn fsync(&mut self) -> Result<(), ProxyError> {
        log::debug!("null handler: fsync");
        Ok(())
    }

    fn release(&mut self) {
        log::debug!("null handler: release");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_and_produces_nothing() {
        let mut handler = NullHandler::new();
        let mut buf = [0xFFu8; 4];

        assert_eq!(handler.get_size().unwrap(), 0);
        assert_eq!(handler.read(0, &mut buf).unwrap(), 0);
        assert_eq!(buf, [0xFF; 4]);
        assert_eq!(handler.write(0, b"data").unwrap(), 0);
        assert!(handler.fsync().is_ok());
        handler.release();
    }
}
