//! FFprobe source inspection.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use crate::error::{MediaError, MediaResult};

/// Default FFprobe binary name.
pub const DEFAULT_FFPROBE_BIN: &str = "ffprobe";

/// Container-level facts about a source video.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceInfo {
    /// Duration in seconds, when the container reports one
    pub duration: Option<f64>,
    /// Container format name(s), e.g. `mov,mp4,m4a,3gp,3g2,mj2`
    pub format_name: String,
    /// Number of streams in the container
    pub stream_count: usize,
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
    #[serde(default)]
    format_name: String,
}

/// Resolve an FFprobe binary name or path to its location.
pub fn check_ffprobe(program: &str) -> MediaResult<PathBuf> {
    which::which(program).map_err(|_| MediaError::FfprobeNotFound(program.to_string()))
}

/// Probe a source video with `program` (an ffprobe binary).
pub async fn probe_source(program: &str, path: impl AsRef<Path>) -> MediaResult<SourceInfo> {
    let path = path.as_ref();

    if !matches!(tokio::fs::try_exists(path).await, Ok(true)) {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    check_ffprobe(program)?;

    let output = Command::new(program)
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: format!("FFprobe could not read {}", path.display()),
            stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
        });
    }

    parse_probe_output(&output.stdout)
}

fn parse_probe_output(stdout: &[u8]) -> MediaResult<SourceInfo> {
    let probe: FfprobeOutput = serde_json::from_slice(stdout)?;

    let duration = probe
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0);

    Ok(SourceInfo {
        duration,
        format_name: probe.format.format_name,
        stream_count: probe.streams.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe_output() {
        let json = br#"{
            "streams": [{"codec_type": "video"}, {"codec_type": "audio"}],
            "format": {"format_name": "mov,mp4,m4a,3gp,3g2,mj2", "duration": "1834.560000"}
        }"#;

        let info = parse_probe_output(json).unwrap();
        assert_eq!(info.duration, Some(1834.56));
        assert_eq!(info.stream_count, 2);
        assert!(info.format_name.contains("mp4"));
    }

    #[test]
    fn test_parse_probe_output_without_duration() {
        let info = parse_probe_output(br#"{"format": {"duration": "N/A"}}"#).unwrap();
        assert_eq!(info.duration, None);
        assert_eq!(info.stream_count, 0);
    }

    #[tokio::test]
    async fn test_missing_source_is_reported_before_ffprobe() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = probe_source("qclip-definitely-not-ffprobe", dir.path().join("gone.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));

        let source = dir.path().join("sermon.mp4");
        tokio::fs::write(&source, b"video").await.unwrap();
        let err = probe_source("qclip-definitely-not-ffprobe", &source)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::FfprobeNotFound(_)));
    }

    #[test]
    fn test_parse_probe_output_rejects_garbage() {
        assert!(matches!(
            parse_probe_output(b"not json"),
            Err(MediaError::JsonParse(_))
        ));
    }
}
