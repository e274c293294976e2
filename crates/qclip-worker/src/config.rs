//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use qclip_media::EncodingMode;

use crate::layout::{StorageLayout, DEFAULT_STORAGE_ROOT};

/// Default CRF when re-encoding clips.
pub const DEFAULT_CRF: u8 = 23;
/// Default x264 preset when re-encoding clips.
pub const DEFAULT_PRESET: &str = "veryfast";

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Root directory holding one subdirectory per job
    pub storage_root: PathBuf,
    /// FFmpeg binary name or path
    pub ffmpeg_bin: String,
    /// FFprobe binary name or path
    pub ffprobe_bin: String,
    /// Stream copy or re-encode
    pub encoding: EncodingMode,
    /// Per-clip FFmpeg timeout (none by default)
    pub clip_timeout: Option<Duration>,
    /// Total timeout for one HTTP download (none by default)
    pub download_timeout: Option<Duration>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from(DEFAULT_STORAGE_ROOT),
            ffmpeg_bin: "ffmpeg".to_string(),
            ffprobe_bin: "ffprobe".to_string(),
            encoding: EncodingMode::StreamCopy,
            clip_timeout: None,
            download_timeout: None,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            storage_root: std::env::var("QCLIP_STORAGE_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_STORAGE_ROOT)),
            ffmpeg_bin: std::env::var("QCLIP_FFMPEG_BIN").unwrap_or_else(|_| "ffmpeg".to_string()),
            ffprobe_bin: std::env::var("QCLIP_FFPROBE_BIN")
                .unwrap_or_else(|_| "ffprobe".to_string()),
            encoding: encoding_from_parts(
                std::env::var("QCLIP_ENCODING").ok().as_deref(),
                std::env::var("QCLIP_CRF").ok().and_then(|s| s.parse().ok()),
                std::env::var("QCLIP_PRESET").ok(),
            ),
            clip_timeout: timeout_from_secs(std::env::var("QCLIP_CLIP_TIMEOUT_SECS").ok().as_deref()),
            download_timeout: timeout_from_secs(
                std::env::var("QCLIP_DOWNLOAD_TIMEOUT_SECS").ok().as_deref(),
            ),
        }
    }

    /// Storage layout rooted at `storage_root`.
    pub fn layout(&self) -> StorageLayout {
        StorageLayout::new(&self.storage_root)
    }
}

/// Optional timeout from a seconds setting. Unset, unparsable or zero means none.
fn timeout_from_secs(value: Option<&str>) -> Option<Duration> {
    value
        .and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}

/// Build the encoding mode from its raw settings.
///
/// Anything other than `reencode` (case-insensitive) means stream copy.
fn encoding_from_parts(mode: Option<&str>, crf: Option<u8>, preset: Option<String>) -> EncodingMode {
    match mode.map(|m| m.trim().to_ascii_lowercase()) {
        Some(m) if m == "reencode" => EncodingMode::Reencode {
            crf: crf.filter(|c| *c <= 51).unwrap_or(DEFAULT_CRF),
            preset: preset
                .filter(|p| !p.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_PRESET.to_string()),
        },
        _ => EncodingMode::StreamCopy,
    }
}
