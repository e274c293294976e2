//! Per-job storage layout.
//!
//! ```text
//! {root}/{job_id}/splits/sermon.mp4   source video
//! {root}/{job_id}/clips/clips.json    clip manifest
//! {root}/{job_id}/clips/{name}.mp4    extracted clips
//! ```

use std::path::PathBuf;

/// Default storage root.
pub const DEFAULT_STORAGE_ROOT: &str = "/storage";

const SPLITS_DIR: &str = "splits";
const CLIPS_DIR: &str = "clips";
const SOURCE_VIDEO_FILE: &str = "sermon.mp4";
const MANIFEST_FILE: &str = "clips.json";

/// Path conventions for job directories under a storage root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    root: PathBuf,
}

impl Default for StorageLayout {
    fn default() -> Self {
        Self::new(DEFAULT_STORAGE_ROOT)
    }
}

impl StorageLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn job_dir(&self, job_id: &str) -> PathBuf {
        self.root.join(job_id)
    }

    pub fn splits_dir(&self, job_id: &str) -> PathBuf {
        self.job_dir(job_id).join(SPLITS_DIR)
    }

    pub fn clips_dir(&self, job_id: &str) -> PathBuf {
        self.job_dir(job_id).join(CLIPS_DIR)
    }

    /// Where the split stage leaves the source video, and where downloads land.
    pub fn source_video(&self, job_id: &str) -> PathBuf {
        self.splits_dir(job_id).join(SOURCE_VIDEO_FILE)
    }

    /// Default manifest location, also the download target in URL mode.
    pub fn manifest(&self, job_id: &str) -> PathBuf {
        self.clips_dir(job_id).join(MANIFEST_FILE)
    }
}
