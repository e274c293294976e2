//! Input resolution: local paths for the source video and the clip manifest.

use std::path::{Path, PathBuf};

use tracing::info;

use qclip_models::{InputMode, JobRequest};

use crate::download::HttpFetcher;
use crate::error::{WorkerError, WorkerResult};
use crate::layout::StorageLayout;

/// Local inputs of one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInputs {
    pub video: PathBuf,
    pub manifest: PathBuf,
}

/// Turns a request into local input paths, downloading in URL mode.
#[derive(Debug, Clone)]
pub struct InputResolver {
    layout: StorageLayout,
    fetcher: HttpFetcher,
}

impl InputResolver {
    pub fn new(layout: StorageLayout, fetcher: HttpFetcher) -> Self {
        Self { layout, fetcher }
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    /// Resolve both inputs for `job_id`.
    ///
    /// In URL mode each resource with a URL is downloaded to its layout path;
    /// a resource without one is looked up locally as in storage mode.
    pub async fn resolve(&self, job_id: &str, request: &JobRequest) -> WorkerResult<ResolvedInputs> {
        let mode = request.mode();

        let video = self
            .resolve_one(
                mode,
                "Source video",
                request.input_video_url.as_deref(),
                request.input_video_local.as_deref(),
                self.layout.source_video(job_id),
            )
            .await?;

        let manifest = self
            .resolve_one(
                mode,
                "Clip manifest",
                request.clips_json_url.as_deref(),
                request.clips_json_local.as_deref(),
                self.layout.manifest(job_id),
            )
            .await?;

        Ok(ResolvedInputs { video, manifest })
    }

    async fn resolve_one(
        &self,
        mode: InputMode,
        what: &'static str,
        url: Option<&str>,
        local: Option<&str>,
        layout_path: PathBuf,
    ) -> WorkerResult<PathBuf> {
        if let (InputMode::Url, Some(url)) = (mode, url.filter(|u| !u.trim().is_empty())) {
            info!(url = %url, path = %layout_path.display(), "Downloading {}", what.to_lowercase());
            self.fetcher.download(url.trim(), &layout_path).await?;
            return Ok(layout_path);
        }

        let path = local
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(layout_path);
        ensure_file(what, &path).await?;
        Ok(path)
    }
}

async fn ensure_file(what: &'static str, path: &Path) -> WorkerResult<()> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Ok(()),
        _ => Err(WorkerError::not_found(what, path)),
    }
}
