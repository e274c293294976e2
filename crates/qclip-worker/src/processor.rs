//! Job orchestration: resolve inputs, validate the manifest, cut every clip.

use std::path::Path;
use std::sync::Arc;

use tracing::Instrument;

use qclip_media::{extract_clip, FfmpegExtractor, FfmpegRunner, SegmentExtractor};
use qclip_models::{
    parse_manifest, ClipDescriptor, ClipResult, JobRequest, JobResult, ManifestError,
};

use crate::config::WorkerConfig;
use crate::download::HttpFetcher;
use crate::error::{WorkerError, WorkerResult};
use crate::layout::StorageLayout;
use crate::logging::JobLogger;
use crate::resolver::InputResolver;

const OPERATION: &str = "quote_clips";

/// Runs clip extraction jobs.
///
/// Clips are cut one at a time in manifest order. A clip that fails is
/// left out of the result and noted in its summary; the job still succeeds.
#[derive(Clone)]
pub struct JobProcessor {
    resolver: InputResolver,
    extractor: Arc<dyn SegmentExtractor>,
}

impl JobProcessor {
    /// Create a processor backed by FFmpeg.
    pub fn new(config: &WorkerConfig) -> WorkerResult<Self> {
        let mut runner = FfmpegRunner::new().with_program(&config.ffmpeg_bin);
        if let Some(timeout) = config.clip_timeout {
            runner = runner.with_timeout(timeout.as_secs());
        }
        let extractor = FfmpegExtractor::new(runner, config.encoding.clone())
            .with_ffprobe(&config.ffprobe_bin);

        Ok(Self::with_extractor(
            config.layout(),
            HttpFetcher::new(config.download_timeout)?,
            Arc::new(extractor),
        ))
    }

    /// Create a processor with a custom segment extractor.
    pub fn with_extractor(
        layout: StorageLayout,
        fetcher: HttpFetcher,
        extractor: Arc<dyn SegmentExtractor>,
    ) -> Self {
        Self {
            resolver: InputResolver::new(layout, fetcher),
            extractor,
        }
    }

    pub fn layout(&self) -> &StorageLayout {
        self.resolver.layout()
    }

    /// Process one job request.
    pub async fn process(&self, request: &JobRequest) -> WorkerResult<JobResult> {
        let job_id = request.validated_job_id()?;
        let logger = JobLogger::new(job_id, OPERATION);
        let span = logger.create_span();

        self.run(job_id, request, &logger).instrument(span).await
    }

    async fn run(
        &self,
        job_id: &str,
        request: &JobRequest,
        logger: &JobLogger,
    ) -> WorkerResult<JobResult> {
        logger.log_start(&format!(
            "mode={}, reextract={}",
            request.mode(),
            request.reextract
        ));

        let inputs = match self.resolver.resolve(job_id, request).await {
            Ok(inputs) => inputs,
            Err(e) => {
                logger.log_error(&e.to_string());
                return Err(e);
            }
        };

        let clips = match load_manifest(&inputs.manifest).await {
            Ok(clips) => clips,
            Err(e) => {
                let e = WorkerError::from(e);
                logger.log_error(&e.to_string());
                return Err(e);
            }
        };
        logger.log_progress(&format!(
            "{} clip(s) in {}",
            clips.len(),
            inputs.manifest.display()
        ));

        let source_duration = match self.extractor.source_duration(&inputs.video).await {
            Ok(duration) => duration,
            Err(e) => {
                logger.log_warning(&format!("Could not probe source duration: {}", e));
                None
            }
        };

        let clips_dir = self.layout().clips_dir(job_id);
        let mut summary = Summary::default();

        for clip in &clips {
            match extract_clip(
                self.extractor.as_ref(),
                &inputs.video,
                source_duration,
                clip,
                &clips_dir,
                request.reextract,
            )
            .await
            {
                Ok(outcome) => {
                    let path = outcome.path().display().to_string();
                    if outcome.is_skipped() {
                        summary.line(format!("{}: exists, skipped -> {}", clip.name, path));
                        summary.files.push(ClipResult::existing(&clip.name, path));
                    } else {
                        summary.line(format!(
                            "{}: extracted {} -> {}",
                            clip.name,
                            clip.time_range(),
                            path
                        ));
                        summary.files.push(ClipResult::extracted(&clip.name, path));
                    }
                }
                Err(source) => {
                    let diagnostics = source
                        .diagnostics()
                        .and_then(|d| d.lines().last())
                        .map(str::to_string);
                    let err = WorkerError::extraction(&clip.name, source);
                    logger.log_error(&err.to_string());
                    if let Some(diag) = &diagnostics {
                        logger.log_error(&format!("{}: {}", clip.name, diag));
                    }

                    summary.failed += 1;
                    summary.line(match diagnostics {
                        Some(diag) => format!("{}: FAILED: {} ({})", clip.name, err, diag),
                        None => format!("{}: FAILED: {}", clip.name, err),
                    });
                }
            }
        }

        let result = summary.finish(clips.len());
        logger.log_completion(&format!("{} of {} clip(s) available", result.count, clips.len()));
        Ok(result)
    }
}

async fn load_manifest(path: &Path) -> Result<Vec<ClipDescriptor>, ManifestError> {
    let json = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    parse_manifest(&json)
}

/// Accumulates results and the human-readable `stdout` summary.
#[derive(Default)]
struct Summary {
    files: Vec<ClipResult>,
    lines: Vec<String>,
    failed: usize,
}

impl Summary {
    fn line(&mut self, line: String) {
        self.lines.push(line);
    }

    fn finish(mut self, total: usize) -> JobResult {
        let skipped = self.files.iter().filter(|f| f.skipped).count();
        let extracted = self.files.len() - skipped;
        self.lines.push(format!(
            "Done: {} extracted, {} skipped, {} failed of {} clip(s)",
            extracted, skipped, self.failed, total
        ));
        JobResult::new(self.files, self.lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts() {
        let mut summary = Summary::default();
        summary.files.push(ClipResult::extracted("clip001", "/s/j/clips/clip001.mp4"));
        summary.files.push(ClipResult::existing("clip002", "/s/j/clips/clip002.mp4"));
        summary.failed = 1;
        summary.line("clip003: FAILED".to_string());

        let result = summary.finish(3);

        assert_eq!(result.count, 2);
        assert_eq!(
            result.stdout,
            "clip003: FAILED\nDone: 1 extracted, 1 skipped, 1 failed of 3 clip(s)"
        );
    }

    #[tokio::test]
    async fn test_invalid_job_id_fails_before_io() {
        let processor = JobProcessor::new(&WorkerConfig {
            storage_root: "/nonexistent-root".into(),
            ..WorkerConfig::default()
        })
        .unwrap();

        let err = processor.process(&JobRequest::new("  ")).await.unwrap_err();
        assert_eq!(err.to_string(), "job_id is required");

        let err = processor.process(&JobRequest::new("../etc")).await.unwrap_err();
        assert!(matches!(err, WorkerError::InvalidRequest(_)));
    }
}
