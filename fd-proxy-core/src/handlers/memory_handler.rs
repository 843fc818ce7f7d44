use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::error::ProxyError;
use crate::traits::proxy_handler::ProxyHandler;

/// Growable in-memory file contents, shared between a `MemoryHandler` and
/// whoever wants to inspect them. Survives release.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    /// Copy of the current contents.
    pub fn snapshot(&self) -> Vec<u8> {
        self.inner.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

/// Handler backed by a byte vector.
///
/// Writes past the end zero-fill the gap. Reads past the end return 0, so
/// end-of-file is stable. Size is the vector length.
#[derive(Debug)]
pub struct MemoryHandler {
    buffer: SharedBuffer,
    max_len: Option<u64>,
}

impl MemoryHandler {
    /// An empty handler and a view of its contents.
    pub fn new() -> (Self, SharedBuffer) {
        Self::with_contents(Vec::new())
    }

    /// A handler pre-filled with `contents`, e.g. to serve reads.
    pub fn with_contents(contents: Vec<u8>) -> (Self, SharedBuffer) {
        let buffer = SharedBuffer {
            inner: Arc::new(Mutex::new(contents)),
        };
        let handler = Self {
            buffer: buffer.clone(),
            max_len: None,
        };
        (handler, buffer)
    }

    /// Cap the file length. Writes reaching past the cap are short; writes
    /// starting at or past it accept nothing.
    pub fn with_max_len(mut self, max_len: u64) -> Self {
        self.max_len = Some(max_len);
        self
    }
}

impl ProxyHandler for MemoryHandler {
    fn get_size(&mut self) -> Result<u64, ProxyError> {
        Ok(self.buffer.len() as u64)
    }

    fn read(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, ProxyError> {
        let data = self.buffer.inner.lock();
        let Ok(start) = usize::try_from(offset) else {
            return Ok(0);
        };
        if start >= data.len() {
            return Ok(0);
        }
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        Ok(n)
    }

    fn write(&mut self, offset: u64, data: &[u8]) -> Result<usize, ProxyError> {
        let limit = self.max_len.unwrap_or(u64::MAX);
        if offset >= limit {
            return Ok(0);
        }
        let accepted = (data.len() as u64).min(limit - offset) as usize;

        let start = usize::try_from(offset)
            .map_err(|_| ProxyError::HandlerFault(format!("offset {} out of range", offset)))?;
        let end = start
            .checked_add(accepted)
            .ok_or_else(|| ProxyError::HandlerFault("write end overflows".into()))?;

        let mut contents = self.buffer.inner.lock();
        if contents.len() < end {
            contents.resize(end, 0);
        }
        contents[start..end].copy_from_slice(&data[..accepted]);
        Ok(accepted)
    }

    fn fsync(&mut self) -> Result<(), ProxyError> {
        Ok(())
    }

    fn release(&mut self) {
        log::debug!("memory handler released with {} bytes", self.buffer.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sparse_write_zero_fills() {
        let (mut handler, buffer) = MemoryHandler::new();
        assert_eq!(handler.write(4, b"ab").unwrap(), 2);
        assert_eq!(buffer.snapshot(), vec![0, 0, 0, 0, b'a', b'b']);
        assert_eq!(handler.get_size().unwrap(), 6);
    }

    #[test]
    fn overwrite_in_place() {
        let (mut handler, buffer) = MemoryHandler::with_contents(b"hello".to_vec());
        handler.write(1, b"EL").unwrap();
        assert_eq!(buffer.snapshot(), b"hELlo");
    }

    #[test]
    fn short_read_at_tail_then_stable_eof() {
        let (mut handler, _) = MemoryHandler::with_contents(b"abc".to_vec());
        let mut buf = [0u8; 8];

        assert_eq!(handler.read(1, &mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"bc");
        assert_eq!(handler.read(3, &mut buf).unwrap(), 0);
        assert_eq!(handler.read(3, &mut buf).unwrap(), 0);
        assert_eq!(handler.read(u64::MAX, &mut buf).unwrap(), 0);
    }

    #[test]
    fn max_len_makes_writes_short() {
        let (handler, buffer) = MemoryHandler::new();
        let mut handler = handler.with_max_len(5);

        assert_eq!(handler.write(0, b"abc").unwrap(), 3);
        assert_eq!(handler.write(3, b"defg").unwrap(), 2);
        assert_eq!(handler.write(5, b"h").unwrap(), 0);
        assert_eq!(buffer.snapshot(), b"abcde");
    }

    #[test]
    fn contents_survive_release() {
        let (mut handler, buffer) = MemoryHandler::new();
        handler.write(0, b"kept").unwrap();
        handler.release();
        drop(handler);
        assert_eq!(buffer.snapshot(), b"kept");
    }
}
