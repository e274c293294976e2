//! Quote clip extraction.
//!
//! A clip is cut from the source video into `{clips_dir}/{name}.{ext}`, where
//! `ext` follows the source container. The cut is written to a temporary
//! sibling and promoted onto the final path only when FFmpeg succeeded and
//! left a non-empty file, so failures never leave partial clips behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use qclip_models::ClipDescriptor;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::{discard, is_nonempty_file, promote_file, temp_sibling};
use crate::probe::{probe_source, DEFAULT_FFPROBE_BIN};

/// Extension used when the source has none.
pub const DEFAULT_CLIP_EXTENSION: &str = "mp4";

/// Shortest segment ever requested from FFmpeg, in seconds.
const MIN_SEGMENT_SECS: f64 = 0.01;

/// How FFmpeg writes the clip streams.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EncodingMode {
    /// Copy codec data as-is (fast, lossless, keyframe-aligned start)
    #[default]
    StreamCopy,
    /// Re-encode with libx264/aac for frame-accurate cuts
    Reencode { crf: u8, preset: String },
}

/// Capability to cut `[start, end)` out of a source video into `output`.
#[async_trait]
pub trait SegmentExtractor: Send + Sync {
    async fn extract(&self, source: &Path, start: f64, end: f64, output: &Path)
        -> MediaResult<()>;

    /// Source length in seconds, if the extractor can tell.
    async fn source_duration(&self, _source: &Path) -> MediaResult<Option<f64>> {
        Ok(None)
    }
}

/// `SegmentExtractor` backed by the FFmpeg CLI.
#[derive(Debug, Clone)]
pub struct FfmpegExtractor {
    runner: FfmpegRunner,
    encoding: EncodingMode,
    ffprobe: String,
}

impl Default for FfmpegExtractor {
    fn default() -> Self {
        Self::new(FfmpegRunner::new(), EncodingMode::default())
    }
}

impl FfmpegExtractor {
    pub fn new(runner: FfmpegRunner, encoding: EncodingMode) -> Self {
        Self {
            runner,
            encoding,
            ffprobe: DEFAULT_FFPROBE_BIN.to_string(),
        }
    }

    /// Use a specific FFprobe binary for duration checks.
    pub fn with_ffprobe(mut self, program: impl Into<String>) -> Self {
        self.ffprobe = program.into();
        self
    }

    /// Build the FFmpeg command for one segment.
    pub fn command(&self, source: &Path, start: f64, end: f64, output: &Path) -> FfmpegCommand {
        let duration = (end - start).max(MIN_SEGMENT_SECS);
        let cmd = FfmpegCommand::new(source, output).seek(start).duration(duration);

        match &self.encoding {
            EncodingMode::StreamCopy => cmd.codec_copy(),
            EncodingMode::Reencode { crf, preset } => cmd
                .video_codec("libx264")
                .preset(preset.as_str())
                .crf(*crf)
                .output_args(["-pix_fmt", "yuv420p"])
                .audio_codec("aac")
                .audio_bitrate("128k")
                .output_args(["-movflags", "+faststart"]),
        }
    }
}

#[async_trait]
impl SegmentExtractor for FfmpegExtractor {
    async fn extract(
        &self,
        source: &Path,
        start: f64,
        end: f64,
        output: &Path,
    ) -> MediaResult<()> {
        let cmd = self.command(source, start, end, output);
        self.runner.run(&cmd).await
    }

    async fn source_duration(&self, source: &Path) -> MediaResult<Option<f64>> {
        let info = probe_source(&self.ffprobe, source).await?;
        debug!(
            path = %source.display(),
            format = %info.format_name,
            streams = info.stream_count,
            "Probed source"
        );
        Ok(info.duration)
    }
}

/// Outcome of a successful `extract_clip` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// FFmpeg produced a fresh file
    Extracted(PathBuf),
    /// A non-empty file was already present and overwrite was not requested
    Existing(PathBuf),
}

impl Extraction {
    pub fn path(&self) -> &Path {
        match self {
            Extraction::Extracted(path) | Extraction::Existing(path) => path,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Extraction::Existing(_))
    }
}

/// Output path for a clip: `{clips_dir}/{name}.{source extension}`.
pub fn clip_output_path(clips_dir: &Path, source: &Path, name: &str) -> PathBuf {
    let ext = source
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| DEFAULT_CLIP_EXTENSION.to_string());
    clips_dir.join(format!("{}.{}", name, ext))
}

/// Cut one clip, or report the existing file when `reextract` is false.
///
/// An existing zero-length file is treated as a failed earlier attempt and
/// is regenerated. When `source_duration` is known, a clip starting at or
/// past the end of the source fails without invoking the extractor.
pub async fn extract_clip(
    extractor: &dyn SegmentExtractor,
    source: &Path,
    source_duration: Option<f64>,
    clip: &ClipDescriptor,
    clips_dir: &Path,
    reextract: bool,
) -> MediaResult<Extraction> {
    let output = clip_output_path(clips_dir, source, &clip.name);

    if !reextract && is_nonempty_file(&output).await {
        debug!(clip = %clip.name, path = %output.display(), "Clip already exists, skipping");
        return Ok(Extraction::Existing(output));
    }

    if !matches!(tokio::fs::try_exists(source).await, Ok(true)) {
        return Err(MediaError::FileNotFound(source.to_path_buf()));
    }

    if let Some(duration) = source_duration {
        if clip.start >= duration {
            return Err(MediaError::SegmentOutOfRange {
                start: clip.start,
                duration,
            });
        }
    }

    tokio::fs::create_dir_all(clips_dir).await?;

    let staging = temp_sibling(&output);
    info!(
        clip = %clip.name,
        "Extracting clip {} ({:.2}s) -> {}",
        clip.time_range(),
        clip.duration(),
        output.display()
    );

    if let Err(e) = extractor.extract(source, clip.start, clip.end, &staging).await {
        discard(&staging).await;
        return Err(e);
    }

    if !is_nonempty_file(&staging).await {
        discard(&staging).await;
        return Err(MediaError::MissingOutput(output));
    }

    if let Err(e) = promote_file(&staging, &output).await {
        discard(&staging).await;
        return Err(e);
    }

    info!(clip = %clip.name, "Clip extracted: {}", output.display());
    Ok(Extraction::Extracted(output))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;
    use tokio::fs;

    /// Writes a few bytes to the requested output and counts invocations.
    #[derive(Default)]
    struct WritingExtractor {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SegmentExtractor for WritingExtractor {
        async fn extract(&self, _: &Path, start: f64, end: f64, output: &Path) -> MediaResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            fs::write(output, format!("{}-{}", start, end)).await?;
            Ok(())
        }
    }

    /// Leaves a partial file behind and then fails.
    struct FailingExtractor;

    #[async_trait]
    impl SegmentExtractor for FailingExtractor {
        async fn extract(&self, _: &Path, _: f64, _: f64, output: &Path) -> MediaResult<()> {
            fs::write(output, b"partial").await?;
            Err(MediaError::ffmpeg_failed("exit 1", Some("Invalid data".into()), Some(1)))
        }
    }

    /// Exits cleanly without writing anything.
    struct SilentExtractor;

    #[async_trait]
    impl SegmentExtractor for SilentExtractor {
        async fn extract(&self, _: &Path, _: f64, _: f64, _: &Path) -> MediaResult<()> {
            Ok(())
        }
    }

    async fn fixture() -> (TempDir, PathBuf, PathBuf) {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("splits").join("sermon.mp4");
        fs::create_dir_all(source.parent().unwrap()).await.unwrap();
        fs::write(&source, b"source video").await.unwrap();
        let clips_dir = dir.path().join("clips");
        (dir, source, clips_dir)
    }

    async fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names = Vec::new();
        let mut entries = fs::read_dir(dir).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        names
    }

    #[test]
    fn test_clip_output_path_follows_source_extension() {
        let clips = Path::new("/storage/j/clips");
        assert_eq!(
            clip_output_path(clips, Path::new("/storage/j/splits/sermon.mp4"), "clip001"),
            PathBuf::from("/storage/j/clips/clip001.mp4")
        );
        assert_eq!(
            clip_output_path(clips, Path::new("/in/sermon.MOV"), "q"),
            PathBuf::from("/storage/j/clips/q.mov")
        );
        assert_eq!(
            clip_output_path(clips, Path::new("/in/sermon"), "q"),
            PathBuf::from("/storage/j/clips/q.mp4")
        );
    }

    #[test]
    fn test_stream_copy_command() {
        let extractor = FfmpegExtractor::default();
        let args = extractor
            .command(Path::new("in.mp4"), 10.0, 25.5, Path::new("out.mp4"))
            .build_args();

        assert!(args.windows(2).any(|w| w == ["-ss", "10.000"]));
        assert!(args.windows(2).any(|w| w == ["-t", "15.500"]));
        assert!(args.windows(2).any(|w| w == ["-c", "copy"]));
        assert!(!args.contains(&"libx264".to_string()));
    }

    #[test]
    fn test_reencode_command() {
        let extractor = FfmpegExtractor::new(
            FfmpegRunner::new(),
            EncodingMode::Reencode {
                crf: 23,
                preset: "veryfast".to_string(),
            },
        );
        let args = extractor
            .command(Path::new("in.mp4"), 0.0, 0.001, Path::new("out.mp4"))
            .build_args();

        assert!(args.windows(2).any(|w| w == ["-c:v", "libx264"]));
        assert!(args.windows(2).any(|w| w == ["-crf", "23"]));
        assert!(args.windows(2).any(|w| w == ["-preset", "veryfast"]));
        // Duration never drops below the minimum segment length
        assert!(args.windows(2).any(|w| w == ["-t", "0.010"]));
        assert!(!args.contains(&"copy".to_string()));
    }

    #[tokio::test]
    async fn test_extract_clip_writes_final_file() {
        let (_dir, source, clips_dir) = fixture().await;
        let extractor = WritingExtractor::default();
        let clip = ClipDescriptor::new("clip001", 10.0, 25.5);

        let outcome = extract_clip(&extractor, &source, None, &clip, &clips_dir, false)
            .await
            .unwrap();

        assert_eq!(outcome, Extraction::Extracted(clips_dir.join("clip001.mp4")));
        assert_eq!(
            fs::read_to_string(outcome.path()).await.unwrap(),
            "10-25.5"
        );
        assert_eq!(dir_entries(&clips_dir).await, vec!["clip001.mp4"]);
    }

    #[tokio::test]
    async fn test_existing_clip_is_skipped_unless_reextract() {
        let (_dir, source, clips_dir) = fixture().await;
        fs::create_dir_all(&clips_dir).await.unwrap();
        fs::write(clips_dir.join("clip001.mp4"), b"previous run").await.unwrap();

        let extractor = WritingExtractor::default();
        let clip = ClipDescriptor::new("clip001", 1.0, 2.0);

        let outcome = extract_clip(&extractor, &source, None, &clip, &clips_dir, false)
            .await
            .unwrap();
        assert!(outcome.is_skipped());
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);

        let outcome = extract_clip(&extractor, &source, None, &clip, &clips_dir, true)
            .await
            .unwrap();
        assert!(!outcome.is_skipped());
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            fs::read_to_string(clips_dir.join("clip001.mp4")).await.unwrap(),
            "1-2"
        );
    }

    #[tokio::test]
    async fn test_empty_existing_clip_is_regenerated() {
        let (_dir, source, clips_dir) = fixture().await;
        fs::create_dir_all(&clips_dir).await.unwrap();
        fs::write(clips_dir.join("clip001.mp4"), b"").await.unwrap();

        let extractor = WritingExtractor::default();
        let clip = ClipDescriptor::new("clip001", 1.0, 2.0);
        let outcome = extract_clip(&extractor, &source, None, &clip, &clips_dir, false)
            .await
            .unwrap();

        assert!(!outcome.is_skipped());
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_leaves_no_partial_file() {
        let (_dir, source, clips_dir) = fixture().await;
        let clip = ClipDescriptor::new("clip002", 9000.0, 9010.0);

        let err = extract_clip(&FailingExtractor, &source, None, &clip, &clips_dir, false)
            .await
            .unwrap_err();

        assert!(matches!(err, MediaError::FfmpegFailed { exit_code: Some(1), .. }));
        assert_eq!(err.diagnostics(), Some("Invalid data"));
        assert!(dir_entries(&clips_dir).await.is_empty());
    }

    #[tokio::test]
    async fn test_failed_reextract_keeps_previous_clip() {
        let (_dir, source, clips_dir) = fixture().await;
        fs::create_dir_all(&clips_dir).await.unwrap();
        fs::write(clips_dir.join("clip001.mp4"), b"good clip").await.unwrap();

        let clip = ClipDescriptor::new("clip001", 1.0, 2.0);
        assert!(extract_clip(&FailingExtractor, &source, None, &clip, &clips_dir, true)
            .await
            .is_err());

        assert_eq!(
            fs::read_to_string(clips_dir.join("clip001.mp4")).await.unwrap(),
            "good clip"
        );
        assert_eq!(dir_entries(&clips_dir).await, vec!["clip001.mp4"]);
    }

    #[tokio::test]
    async fn test_missing_output_is_an_error() {
        let (_dir, source, clips_dir) = fixture().await;
        let clip = ClipDescriptor::new("clip003", 1.0, 2.0);

        let err = extract_clip(&SilentExtractor, &source, None, &clip, &clips_dir, false)
            .await
            .unwrap_err();

        assert!(matches!(err, MediaError::MissingOutput(_)));
        assert!(dir_entries(&clips_dir).await.is_empty());
    }

    #[tokio::test]
    async fn test_start_past_source_end_is_rejected() {
        let (_dir, source, clips_dir) = fixture().await;
        let extractor = WritingExtractor::default();
        let clip = ClipDescriptor::new("clip002", 120.0, 130.0);

        let err = extract_clip(&extractor, &source, Some(60.0), &clip, &clips_dir, false)
            .await
            .unwrap_err();

        assert!(matches!(err, MediaError::SegmentOutOfRange { .. }));
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);

        // A clip that merely runs past the end is still cut
        let tail = ClipDescriptor::new("clip003", 55.0, 70.0);
        assert!(extract_clip(&extractor, &source, Some(60.0), &tail, &clips_dir, false)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_missing_source_is_an_error() {
        let dir = TempDir::new().unwrap();
        let extractor = WritingExtractor::default();
        let clip = ClipDescriptor::new("clip001", 1.0, 2.0);

        let err = extract_clip(
            &extractor,
            &dir.path().join("nope.mp4"),
            None,
            &clip,
            &dir.path().join("clips"),
            false,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, MediaError::FileNotFound(_)));
        assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);
    }

    /// Stand-in FFmpeg that writes to its last argument and then hangs.
    #[cfg(unix)]
    fn hanging_ffmpeg(dir: &Path) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("hanging-ffmpeg");
        std::fs::write(
            &script,
            "#!/bin/sh\nfor last; do :; done\necho partial > \"$last\"\nexec sleep 30\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timed_out_clip_leaves_no_partial_file() {
        let (dir, source, clips_dir) = fixture().await;
        let runner = FfmpegRunner::new()
            .with_program(hanging_ffmpeg(dir.path()).display().to_string())
            .with_timeout(1);
        let extractor = FfmpegExtractor::new(runner, EncodingMode::StreamCopy);
        let clip = ClipDescriptor::new("clip001", 1.0, 3.0);

        let err = extract_clip(&extractor, &source, None, &clip, &clips_dir, false)
            .await
            .unwrap_err();

        assert!(matches!(err, MediaError::Timeout(1)));
        assert!(dir_entries(&clips_dir).await.is_empty());
    }

    /// Cuts a clip out of a synthetic video with the real FFmpeg binary.
    #[tokio::test]
    #[ignore = "requires ffmpeg in PATH"]
    async fn test_ffmpeg_stream_copy_roundtrip() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("sermon.mp4");

        let status = tokio::process::Command::new("ffmpeg")
            .args(["-hide_banner", "-v", "error", "-y", "-f", "lavfi", "-i"])
            .arg("testsrc=duration=6:size=160x120:rate=25")
            .args(["-c:v", "libx264", "-g", "25"])
            .arg(&source)
            .status()
            .await
            .unwrap();
        assert!(status.success());

        let clips_dir = dir.path().join("clips");
        let extractor = FfmpegExtractor::default();
        let duration = extractor.source_duration(&source).await.unwrap();
        assert!(duration.is_some_and(|d| (d - 6.0).abs() < 0.5));

        let ok = extract_clip(
            &extractor,
            &source,
            duration,
            &ClipDescriptor::new("clip001", 1.0, 3.0),
            &clips_dir,
            false,
        )
        .await
        .unwrap();
        assert!(is_nonempty_file(ok.path()).await);

        let beyond = extract_clip(
            &extractor,
            &source,
            duration,
            &ClipDescriptor::new("clip002", 600.0, 610.0),
            &clips_dir,
            false,
        )
        .await;
        assert!(matches!(beyond, Err(MediaError::SegmentOutOfRange { .. })));
        assert_eq!(dir_entries(&clips_dir).await, vec!["clip001.mp4"]);
    }
}
