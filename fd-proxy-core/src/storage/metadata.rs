use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::error::ProxyError;
use crate::models::recording_result::RecordingMetadata;

/// `clip.ogg` → `clip.ogg.metadata.json`. The media extension is kept so
/// audio and video sidecars for the same stem do not collide.
pub fn sidecar_path(recording_path: &Path) -> PathBuf {
    let mut name = recording_path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("recording"));
    name.push(".metadata.json");
    recording_path.with_file_name(name)
}

/// Write the sidecar for `recording_path`.
///
/// Written to a temporary name first and renamed, so a reader never sees
/// a half-written sidecar.
pub fn write_metadata(metadata: &RecordingMetadata, recording_path: &Path) -> Result<PathBuf, ProxyError> {
    let path = sidecar_path(recording_path);
    let json = serde_json::to_vec_pretty(metadata)
        .map_err(|e| ProxyError::Storage(format!("failed to serialize metadata: {}", e)))?;

    let staging = path.with_extension("json.tmp");
    fs::write(&staging, json)
        .map_err(|e| ProxyError::Storage(format!("failed to write metadata: {}", e)))?;
    fs::rename(&staging, &path)
        .map_err(|e| ProxyError::Storage(format!("failed to publish metadata: {}", e)))?;
    Ok(path)
}

/// Read the sidecar for `recording_path`.
pub fn read_metadata(recording_path: &Path) -> Result<RecordingMetadata, ProxyError> {
    let bytes = fs::read(sidecar_path(recording_path))
        .map_err(|e| ProxyError::Storage(format!("failed to read metadata: {}", e)))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| ProxyError::Storage(format!("failed to parse metadata: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::recording_result::{MediaKind, RecordingOutcome};

    #[test]
    fn sidecar_round_trip_keeps_failure() {
        let recording = std::env::temp_dir().join("fd_proxy_test_sidecar.ogg");
        let outcome = RecordingOutcome::Partial {
            error: ProxyError::HandlerFault("disk full".into()),
        };
        let metadata = RecordingMetadata::new(MediaKind::Video, 2.5, 4096, &outcome);

        let path = write_metadata(&metadata, &recording).unwrap();
        assert_eq!(path, std::env::temp_dir().join("fd_proxy_test_sidecar.ogg.metadata.json"));
        let loaded = read_metadata(&recording).unwrap();

        assert_eq!(loaded, metadata);
        assert_eq!(loaded.failure.as_deref(), Some("handler fault: disk full"));
        assert!(!loaded.complete);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn sidecar_keeps_media_extension() {
        assert_eq!(
            sidecar_path(Path::new("/rec/clip.ogg")),
            PathBuf::from("/rec/clip.ogg.metadata.json")
        );
        assert_eq!(
            sidecar_path(Path::new("/rec/clip.mp4")),
            PathBuf::from("/rec/clip.mp4.metadata.json")
        );
    }

    #[test]
    fn missing_sidecar_is_storage_error() {
        let recording = std::env::temp_dir().join("fd_proxy_test_no_sidecar.ogg");
        assert!(matches!(read_metadata(&recording), Err(ProxyError::Storage(_))));
    }
}
