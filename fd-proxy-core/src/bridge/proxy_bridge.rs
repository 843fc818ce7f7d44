use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use crate::bridge::registry::Registry;
use crate::bridge::virtual_file::VirtualFile;
use crate::bridge::worker::Worker;
use crate::models::access_mode::{AccessMode, HandleId};
use crate::models::config::BridgeConfig;
use crate::models::error::ProxyError;
use crate::traits::proxy_delegate::ProxyDelegate;
use crate::traits::proxy_handler::{ProxyHandler, SharedHandler};

/// Opens virtual files and owns their descriptor table.
///
/// Each open spawns one servicing worker for the new handle:
/// ```text
/// [VirtualFile] ─request─→ [bounded queue] → [worker] → [ProxyHandler]
///       ↑                                        │
///       └────────────── reply (bounded 1) ───────┘
/// ```
///
/// Cloning a bridge shares its table and delegate.
#[derive(Clone)]
pub struct ProxyBridge {
    config: BridgeConfig,
    registry: Arc<Mutex<Registry>>,
    delegate: Option<Arc<dyn ProxyDelegate>>,
}

impl ProxyBridge {
    pub fn new(config: BridgeConfig) -> Result<Self, ProxyError> {
        config.validate().map_err(ProxyError::ConfigurationFailed)?;
        Ok(Self {
            registry: Arc::new(Mutex::new(Registry::new(config.max_open_files))),
            config,
            delegate: None,
        })
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn ProxyDelegate>) {
        self.delegate = Some(delegate);
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Number of handles that have not yet been released.
    pub fn open_count(&self) -> usize {
        self.registry.lock().len()
    }

    /// Open a virtual file backed by `handler`, which the bridge takes over.
    pub fn open<H: ProxyHandler + 'static>(
        &self,
        mode: AccessMode,
        handler: H,
    ) -> Result<VirtualFile, ProxyError> {
        self.open_shared(mode, Arc::new(Mutex::new(handler)))
    }

    /// Open a virtual file backed by a handler the caller keeps a reference
    /// to. Fails with `AlreadyBound` while that handler backs another open
    /// handle.
    pub fn open_shared(
        &self,
        mode: AccessMode,
        handler: SharedHandler,
    ) -> Result<VirtualFile, ProxyError> {
        let id = HandleId::next();
        self.registry.lock().register(id, mode, &handler)?;

        let (requests, queue) = crossbeam_channel::bounded(self.config.queue_depth);
        let worker = Worker {
            id,
            handler,
            requests: queue,
            registry: Arc::clone(&self.registry),
            delegate: self.delegate.clone(),
        };

        let handle = thread::Builder::new()
            .name(format!("{}-{}", self.config.thread_name_prefix, id))
            .spawn(move || worker.run())
            .map_err(|e| {
                self.registry.lock().unregister(id);
                ProxyError::ResourceExhausted(format!("failed to spawn worker: {}", e))
            })?;

        log::debug!("virtual file {}: opened {}", id, mode);
        if let Some(ref delegate) = self.delegate {
            delegate.on_opened(id, mode);
        }

        Ok(VirtualFile::new(id, mode, requests, handle))
    }
}
