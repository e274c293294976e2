//! Job request definitions.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Where the source video and manifest come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    /// Files already sit in the job's storage directory (or at explicit local paths)
    #[default]
    Storage,
    /// Files are fetched over HTTP(S) into the job's storage directory
    Url,
}

impl InputMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputMode::Storage => "storage",
            InputMode::Url => "url",
        }
    }
}

impl std::fmt::Display for InputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input configuration for one clip extraction job.
///
/// Unknown fields are ignored. `video_path` and `video_url` are accepted as
/// legacy spellings of the local and remote video fields; when both
/// spellings are present the canonical one wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawJobRequest")]
pub struct JobRequest {
    /// Job identifier; selects `{storage_root}/{job_id}`
    pub job_id: String,

    /// Explicit input mode. When absent, the mode is `url` if any URL is given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_mode: Option<InputMode>,

    /// Local path to the source video
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_video_local: Option<String>,

    /// URL of the source video
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_video_url: Option<String>,

    /// Local path to the clip manifest
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clips_json_local: Option<String>,

    /// URL of the clip manifest
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clips_json_url: Option<String>,

    /// Regenerate clips even when the output file already exists
    pub reextract: bool,
}

/// Wire shape of the request: every field optional and null-tolerant, with
/// the legacy keys kept apart from the canonical ones.
#[derive(Debug, Default, Deserialize)]
struct RawJobRequest {
    #[serde(default)]
    job_id: Option<String>,
    #[serde(default)]
    input_mode: Option<InputMode>,
    #[serde(default)]
    input_video_local: Option<String>,
    #[serde(default)]
    video_path: Option<String>,
    #[serde(default)]
    input_video_url: Option<String>,
    #[serde(default)]
    video_url: Option<String>,
    #[serde(default)]
    clips_json_local: Option<String>,
    #[serde(default)]
    clips_json_url: Option<String>,
    #[serde(default)]
    reextract: Option<bool>,
}

impl From<RawJobRequest> for JobRequest {
    fn from(raw: RawJobRequest) -> Self {
        Self {
            job_id: raw.job_id.unwrap_or_default(),
            input_mode: raw.input_mode,
            input_video_local: first_nonempty(raw.input_video_local, raw.video_path),
            input_video_url: first_nonempty(raw.input_video_url, raw.video_url),
            clips_json_local: first_nonempty(raw.clips_json_local, None),
            clips_json_url: first_nonempty(raw.clips_json_url, None),
            reextract: raw.reextract.unwrap_or(false),
        }
    }
}

fn first_nonempty(preferred: Option<String>, fallback: Option<String>) -> Option<String> {
    preferred
        .filter(|v| !v.trim().is_empty())
        .or_else(|| fallback.filter(|v| !v.trim().is_empty()))
}

/// Request validation error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("job_id is required")]
    MissingJobId,

    #[error("job_id '{0}' cannot be used as a directory name")]
    InvalidJobId(String),

    #[error("invalid job payload: {0}")]
    Malformed(String),
}

impl JobRequest {
    /// Create a request for a job with default options.
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            ..Default::default()
        }
    }

    /// Build a request from a serverless event.
    ///
    /// Accepts either the `{"input": {...}}` envelope or the bare request object.
    pub fn from_event(event: Value) -> Result<Self, RequestError> {
        let payload = match event {
            Value::Object(mut map) => match map.remove("input") {
                Some(input @ Value::Object(_)) => input,
                Some(other) => {
                    map.insert("input".to_string(), other);
                    Value::Object(map)
                }
                None => Value::Object(map),
            },
            other => other,
        };

        serde_json::from_value(payload).map_err(|e| RequestError::Malformed(e.to_string()))
    }

    /// Trimmed job id, checked for use as a single path component.
    pub fn validated_job_id(&self) -> Result<&str, RequestError> {
        let job_id = self.job_id.trim();
        if job_id.is_empty() {
            return Err(RequestError::MissingJobId);
        }
        if job_id == "." || job_id == ".." || job_id.contains(['/', '\\']) {
            return Err(RequestError::InvalidJobId(job_id.to_string()));
        }
        Ok(job_id)
    }

    /// Effective input mode.
    pub fn mode(&self) -> InputMode {
        match self.input_mode {
            Some(mode) => mode,
            None if self.input_video_url.is_some() || self.clips_json_url.is_some() => {
                InputMode::Url
            }
            None => InputMode::Storage,
        }
    }

    pub fn with_mode(mut self, mode: InputMode) -> Self {
        self.input_mode = Some(mode);
        self
    }

    pub fn with_reextract(mut self, reextract: bool) -> Self {
        self.reextract = reextract;
        self
    }
}
