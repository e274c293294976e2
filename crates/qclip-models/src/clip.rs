//! Clip descriptors and job results.

use serde::{Deserialize, Serialize};

use crate::timestamp::format_seconds;

/// One validated entry of the clip manifest.
///
/// Invariant: `0 <= start < end`, and `name` is usable as a file stem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipDescriptor {
    /// Output file base name (e.g. `clip001`)
    pub name: String,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
}

impl ClipDescriptor {
    pub fn new(name: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            name: name.into(),
            start,
            end,
        }
    }

    /// Clip length in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Human-readable time range, e.g. `00:00:10 - 00:00:25.500`.
    pub fn time_range(&self) -> String {
        format!("{} - {}", format_seconds(self.start), format_seconds(self.end))
    }
}

/// One produced (or already present) output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipResult {
    pub name: String,
    pub path: String,
    /// True when extraction was skipped because the file already existed
    #[serde(skip)]
    pub skipped: bool,
}

impl ClipResult {
    pub fn extracted(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            skipped: false,
        }
    }

    pub fn existing(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            skipped: true,
        }
    }
}

/// Response payload of a successful job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    /// Produced files in manifest order
    pub files: Vec<ClipResult>,
    /// Number of entries in `files`
    pub count: usize,
    /// Human-readable summary
    pub stdout: String,
}

impl JobResult {
    pub fn new(files: Vec<ClipResult>, stdout: impl Into<String>) -> Self {
        Self {
            count: files.len(),
            files,
            stdout: stdout.into(),
        }
    }
}

/// Response payload of a failed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFailure {
    pub error: String,
}

impl JobFailure {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_job_result_serialization_shape() {
        let result = JobResult::new(
            vec![
                ClipResult::extracted("clip001", "/storage/j/clips/clip001.mp4"),
                ClipResult::existing("clip002", "/storage/j/clips/clip002.mp4"),
            ],
            "2 clips",
        );

        assert_eq!(result.count, 2);
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({
                "files": [
                    {"name": "clip001", "path": "/storage/j/clips/clip001.mp4"},
                    {"name": "clip002", "path": "/storage/j/clips/clip002.mp4"}
                ],
                "count": 2,
                "stdout": "2 clips"
            })
        );
    }

    #[test]
    fn test_job_failure_shape() {
        assert_eq!(
            serde_json::to_value(JobFailure::new("boom")).unwrap(),
            json!({"error": "boom"})
        );
    }

    #[test]
    fn test_descriptor_duration_and_range() {
        let clip = ClipDescriptor::new("clip001", 10.0, 25.5);
        assert!((clip.duration() - 15.5).abs() < f64::EPSILON);
        assert_eq!(clip.time_range(), "00:00:10 - 00:00:25.500");
    }
}
