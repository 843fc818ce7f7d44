use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use crate::models::error::ProxyError;
use crate::traits::proxy_handler::ProxyHandler;

/// What a `FileSinkHandler` left behind once released.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSinkReport {
    pub file_path: PathBuf,
    pub file_size: u64,
    /// SHA-256 hex digest of the finished file.
    pub checksum: String,
}

/// Lets the opener collect the `FileSinkReport` after the handler has been
/// handed to the bridge.
#[derive(Debug, Clone, Default)]
pub struct FileSinkReceipt {
    slot: Arc<Mutex<Option<FileSinkReport>>>,
}

impl FileSinkReceipt {
    /// `None` until the handler has been released.
    pub fn report(&self) -> Option<FileSinkReport> {
        self.slot.lock().clone()
    }
}

/// Handler that stores the virtual file in a real file.
///
/// Offsets map one-to-one onto the file. `fsync` is `File::sync_all`.
/// On release the file is synced, closed, and checksummed.
pub struct FileSinkHandler {
    file_path: PathBuf,
    file: Option<File>,
    receipt: FileSinkReceipt,
}

impl FileSinkHandler {
    /// Create (or truncate) `file_path`, creating parent directories.
    pub fn create(file_path: PathBuf) -> Result<(Self, FileSinkReceipt), ProxyError> {
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ProxyError::Storage(format!("failed to create directory: {}", e)))?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&file_path)
            .map_err(|e| ProxyError::Storage(format!("failed to create file: {}", e)))?;
        Ok(Self::from_file(file_path, file))
    }

    /// Open an existing file without truncating it, e.g. to serve reads.
    pub fn open(file_path: PathBuf) -> Result<(Self, FileSinkReceipt), ProxyError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&file_path)
            .map_err(|e| ProxyError::Storage(format!("failed to open file: {}", e)))?;
        Ok(Self::from_file(file_path, file))
    }

    fn from_file(file_path: PathBuf, file: File) -> (Self, FileSinkReceipt) {
        let receipt = FileSinkReceipt::default();
        let handler = Self {
            file_path,
            file: Some(file),
            receipt: receipt.clone(),
        };
        (handler, receipt)
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    fn file(&mut self) -> Result<&mut File, ProxyError> {
        self.file
            .as_mut()
            .ok_or_else(|| ProxyError::Storage("file is not open".into()))
    }

    fn finish(&mut self) -> Result<FileSinkReport, ProxyError> {
        if let Some(mut file) = self.file.take() {
            file.flush().map_err(|e| ProxyError::Storage(e.to_string()))?;
            file.sync_all().map_err(|e| ProxyError::Storage(e.to_string()))?;
        }
        let file_size = fs::metadata(&self.file_path)
            .map_err(|e| ProxyError::Storage(e.to_string()))?
            .len();
        let checksum = sha256_file(&self.file_path)?;
        Ok(FileSinkReport {
            file_path: self.file_path.clone(),
            file_size,
            checksum,
        })
    }
}

impl ProxyHandler for FileSinkHandler {
    fn get_size(&mut self) -> Result<u64, ProxyError> {
        let metadata = self
            .file()?
            .metadata()
            .map_err(|e| ProxyError::Storage(e.to_string()))?;
        Ok(metadata.len())
    }

    fn read(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, ProxyError> {
        let file = self.file()?;
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| ProxyError::Storage(e.to_string()))?;
        file.read(buf)
            .map_err(|e| ProxyError::Storage(format!("read failed: {}", e)))
    }

    fn write(&mut self, offset: u64, data: &[u8]) -> Result<usize, ProxyError> {
        let file = self.file()?;
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| ProxyError::Storage(e.to_string()))?;
        file.write_all(data)
            .map_err(|e| ProxyError::Storage(format!("write failed: {}", e)))?;
        Ok(data.len())
    }

    fn fsync(&mut self) -> Result<(), ProxyError> {
        self.file()?
            .sync_all()
            .map_err(|e| ProxyError::Storage(format!("sync failed: {}", e)))
    }

    fn release(&mut self) {
        match self.finish() {
            Ok(report) => {
                log::info!(
                    "file sink {} finished: {} bytes, sha256 {}",
                    report.file_path.display(),
                    report.file_size,
                    report.checksum
                );
                *self.receipt.slot.lock() = Some(report);
            }
            Err(e) => log::error!("file sink {} failed to finish: {}", self.file_path.display(), e),
        }
    }
}

/// Compute SHA-256 hex digest of a file.
fn sha256_file(path: &Path) -> Result<String, ProxyError> {
    let data = fs::read(path)
        .map_err(|e| ProxyError::Storage(format!("failed to read file for checksum: {}", e)))?;
    let digest = Sha256::digest(&data);
    Ok(hex_encode(&digest))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
