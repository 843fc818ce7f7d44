use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::bridge::proxy_bridge::ProxyBridge;
use crate::bridge::virtual_file::VirtualFile;
use crate::models::access_mode::AccessMode;
use crate::models::error::ProxyError;
use crate::models::recording_result::{RecordingMetadata, RecordingOutcome, RecordingResult};
use crate::models::state::RecordingState;
use crate::traits::media_source::{ChunkCallback, MediaSource};
use crate::traits::proxy_handler::ProxyHandler;

/// Internal mutable session state, protected by `parking_lot::Mutex`.
struct SessionState {
    state: RecordingState,
    started: Option<Instant>,
    bytes_written: u64,
    fault: Option<ProxyError>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            state: RecordingState::Idle,
            started: None,
            bytes_written: 0,
            fault: None,
        }
    }

    fn elapsed_secs(&self) -> f64 {
        self.started.map_or(0.0, |s| s.elapsed().as_secs_f64())
    }
}

/// Routes one media source into a write-only virtual file.
///
/// ```text
/// [MediaSource] → chunk callback → [VirtualFile] → worker → [ProxyHandler]
/// ```
///
/// A failed open aborts the start. A handler fault mid-stream stops the
/// flow of chunks; `stop` then finalizes what was written and reports a
/// `RecordingOutcome::Partial`.
pub struct RecordingSession<S: MediaSource> {
    source: S,
    bridge: ProxyBridge,
    session_state: Arc<Mutex<SessionState>>,
    file: Arc<Mutex<Option<VirtualFile>>>,
}

impl<S: MediaSource> RecordingSession<S> {
    pub fn new(source: S, bridge: ProxyBridge) -> Self {
        Self {
            source,
            bridge,
            session_state: Arc::new(Mutex::new(SessionState::new())),
            file: Arc::new(Mutex::new(None)),
        }
    }

    pub fn state(&self) -> RecordingState {
        self.session_state.lock().state.clone()
    }

    /// The handler fault that interrupted the current recording, if any.
    pub fn fault(&self) -> Option<ProxyError> {
        self.session_state.lock().fault.clone()
    }

    pub fn is_recording(&self) -> bool {
        self.session_state.lock().state.is_recording()
    }

    /// Open a virtual file on `handler` and start the source.
    /// Transitions: idle/completed/failed → recording, or → failed.
    pub fn start<H: ProxyHandler + 'static>(&mut self, handler: H) -> Result<(), ProxyError> {
        {
            let s = self.session_state.lock();
            if !s.state.is_idle() && !s.state.is_terminal() {
                return Err(ProxyError::Recording("recording already in progress".into()));
            }
        }
        *self.session_state.lock() = SessionState::new();

        let file = match self.bridge.open(AccessMode::WriteOnly, handler) {
            Ok(file) => file,
            Err(e) => {
                log::error!("failed to open {:?} recording sink: {}", self.source.kind(), e);
                self.set_state(RecordingState::Failed(e.clone()));
                return Err(e);
            }
        };
        log::info!("{:?} recording started on virtual file {}", self.source.kind(), file.id());
        *self.file.lock() = Some(file);

        {
            let mut s = self.session_state.lock();
            s.started = Some(Instant::now());
            s.state = RecordingState::Recording { bytes_written: 0 };
        }

        if let Err(e) = self.source.start(self.chunk_callback()) {
            log::error!("{:?} source failed to start: {}", self.source.kind(), e);
            if let Some(mut file) = self.file.lock().take() {
                let _ = file.close();
            }
            self.set_state(RecordingState::Failed(e.clone()));
            return Err(e);
        }
        Ok(())
    }

    /// Stop the source, sync and close the virtual file, and report.
    /// Transitions: recording → stopping → completed/failed.
    pub fn stop(&mut self) -> Result<RecordingResult, ProxyError> {
        if !self.is_recording() {
            return Err(ProxyError::Recording("not recording".into()));
        }
        self.set_state(RecordingState::Stopping);

        if let Err(e) = self.source.stop() {
            log::warn!("{:?} source failed to stop cleanly: {}", self.source.kind(), e);
        }

        let Some(mut file) = self.file.lock().take() else {
            let err = ProxyError::Recording("virtual file not available".into());
            self.set_state(RecordingState::Failed(err.clone()));
            return Err(err);
        };

        // Finalize what was accepted even after a fault; the first fault wins.
        if let Err(e) = file.sync_all() {
            log::warn!("virtual file {}: final sync failed: {}", file.id(), e);
            self.session_state
                .lock()
                .fault
                .get_or_insert_with(|| to_proxy_error(&e));
        }

        let id = file.id();
        let diagnostics = match file.close() {
            Ok(diagnostics) => diagnostics,
            Err(e) => {
                self.set_state(RecordingState::Failed(e.clone()));
                return Err(e);
            }
        };

        let (bytes_written, duration_secs, fault) = {
            let s = self.session_state.lock();
            (s.bytes_written, s.elapsed_secs(), s.fault.clone())
        };
        let outcome = match fault {
            None => RecordingOutcome::Complete,
            Some(error) => RecordingOutcome::Partial { error },
        };
        if let RecordingOutcome::Partial { ref error } = outcome {
            log::warn!("recording on virtual file {} ended early: {}", id, error);
        }

        let metadata = RecordingMetadata::new(self.source.kind(), duration_secs, bytes_written, &outcome);
        let result = RecordingResult {
            handle_id: id,
            bytes_written,
            duration_secs,
            outcome,
            diagnostics,
            metadata,
        };

        self.set_state(RecordingState::Completed(Box::new(result.clone())));
        Ok(result)
    }

    /// Start when idle, stop when recording. `make_handler` is only called
    /// when starting.
    pub fn toggle<H, F>(&mut self, make_handler: F) -> Result<Option<RecordingResult>, ProxyError>
    where
        H: ProxyHandler + 'static,
        F: FnOnce() -> H,
    {
        if self.is_recording() {
            self.stop().map(Some)
        } else {
            self.start(make_handler()).map(|()| None)
        }
    }

    fn set_state(&self, state: RecordingState) {
        self.session_state.lock().state = state;
    }

    fn chunk_callback(&self) -> ChunkCallback {
        let file = Arc::clone(&self.file);
        let session_state = Arc::clone(&self.session_state);

        Arc::new(move |chunk: &[u8]| {
            let mut guard = file.lock();
            let Some(file) = guard.as_mut() else {
                return false;
            };
            if session_state.lock().fault.is_some() {
                return false;
            }

            let result = file.write_all(chunk);
            let mut s = session_state.lock();
            s.bytes_written = file.position();
            match result {
                Ok(()) => {
                    if s.state.is_recording() {
                        s.state = RecordingState::Recording {
                            bytes_written: s.bytes_written,
                        };
                    }
                    true
                }
                Err(e) => {
                    log::error!("virtual file {}: chunk write failed: {}", file.id(), e);
                    s.fault = Some(to_proxy_error(&e));
                    false
                }
            }
        })
    }
}

fn to_proxy_error(err: &std::io::Error) -> ProxyError {
    ProxyError::from_io(err)
        .cloned()
        .unwrap_or_else(|| ProxyError::Recording(err.to_string()))
}
