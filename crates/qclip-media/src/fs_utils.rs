//! Filesystem helpers for publishing files atomically.
//!
//! Clips and downloads are written to a temporary sibling first and only
//! promoted onto their final path once complete, so a failed run never
//! leaves a truncated file where a finished one is expected.

use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

use crate::error::{MediaError, MediaResult};

/// Unique temporary sibling for `dst` that keeps its extension.
///
/// FFmpeg picks the container from the extension, so `clip001.mp4` becomes
/// `clip001.<uuid>.part.mp4` rather than `clip001.mp4.part`.
pub fn temp_sibling(dst: &Path) -> PathBuf {
    let stem = dst
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let tag = Uuid::new_v4().simple();

    let file_name = match dst.extension() {
        Some(ext) => format!("{}.{}.part.{}", stem, tag, ext.to_string_lossy()),
        None => format!("{}.{}.part", stem, tag),
    };
    dst.with_file_name(file_name)
}

/// Whether `path` is a regular file with at least one byte.
pub async fn is_nonempty_file(path: &Path) -> bool {
    match fs::metadata(path).await {
        Ok(meta) => meta.is_file() && meta.len() > 0,
        Err(_) => false,
    }
}

/// Move a finished temporary file onto `dst`, replacing any existing file.
///
/// Attempts a rename first. On EXDEV (cross-device) it falls back to copying
/// into a sibling of `dst` and renaming that, so the final path is still
/// replaced in one step.
pub async fn promote_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> MediaResult<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    if let Some(parent) = dst.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device_error(&e) => {
            tracing::debug!(
                "Cross-device rename detected, falling back to copy: {} -> {}",
                src.display(),
                dst.display()
            );
            copy_across_devices(src, dst).await
        }
        Err(e) => Err(MediaError::from(e)),
    }
}

/// Remove a temporary file, ignoring "not found".
pub async fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Failed to remove temporary file {}: {}", path.display(), e);
        }
    }
}

/// Check if an IO error is EXDEV (cross-device link).
fn is_cross_device_error(e: &std::io::Error) -> bool {
    // EXDEV is error code 18 on Linux/macOS
    e.raw_os_error() == Some(18)
}

async fn copy_across_devices(src: &Path, dst: &Path) -> MediaResult<()> {
    let staged = temp_sibling(dst);

    if let Err(e) = fs::copy(src, &staged).await {
        discard(&staged).await;
        return Err(e.into());
    }

    if let Err(e) = fs::rename(&staged, dst).await {
        discard(&staged).await;
        return Err(e.into());
    }

    discard(src).await;
    Ok(())
}
