//! Serverless event entry point.

use serde_json::Value;
use tracing::error;

use qclip_models::{JobFailure, JobRequest, JobResult};

use crate::processor::JobProcessor;

/// Handle one invocation event.
///
/// The event is either `{"input": {...}}` or the bare request object. Every
/// fatal error becomes a `JobFailure` carrying its message.
pub async fn handle_event(processor: &JobProcessor, event: Value) -> Result<JobResult, JobFailure> {
    let request = JobRequest::from_event(event).map_err(|e| {
        error!("Rejected job payload: {}", e);
        JobFailure::new(e.to_string())
    })?;

    processor
        .process(&request)
        .await
        .map_err(|e| JobFailure::new(e.to_string()))
}

/// Response JSON for a handler outcome.
pub fn response_json(outcome: &Result<JobResult, JobFailure>) -> Value {
    let serialized = match outcome {
        Ok(result) => serde_json::to_value(result),
        Err(failure) => serde_json::to_value(failure),
    };
    serialized.unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorkerConfig;
    use qclip_models::ClipResult;
    use serde_json::json;
    use tempfile::TempDir;

    fn processor(root: &std::path::Path) -> JobProcessor {
        JobProcessor::new(&WorkerConfig {
            storage_root: root.to_path_buf(),
            ..WorkerConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_blank_job_id() {
        let dir = TempDir::new().unwrap();
        let outcome = handle_event(&processor(dir.path()), json!({"input": {"job_id": "   "}})).await;

        assert_eq!(
            response_json(&outcome),
            json!({"error": "job_id is required"})
        );
    }

    #[tokio::test]
    async fn test_missing_job_id() {
        let dir = TempDir::new().unwrap();
        let outcome = handle_event(&processor(dir.path()), json!({"input": {}})).await;

        assert_eq!(outcome.unwrap_err().error, "job_id is required");
    }

    #[tokio::test]
    async fn test_null_job_id() {
        let dir = TempDir::new().unwrap();
        let outcome = handle_event(
            &processor(dir.path()),
            json!({"input": {"job_id": null, "video_url": null, "reextract": null}}),
        )
        .await;

        assert_eq!(response_json(&outcome), json!({"error": "job_id is required"}));
    }

    #[tokio::test]
    async fn test_legacy_key_beside_canonical_key() {
        let dir = TempDir::new().unwrap();
        let outcome = handle_event(
            &processor(dir.path()),
            json!({"input": {
                "job_id": "j-1",
                "input_video_local": "/nowhere/canonical.mp4",
                "video_path": "/nowhere/legacy.mp4"
            }}),
        )
        .await;

        assert_eq!(
            outcome.unwrap_err().error,
            "Source video not found: /nowhere/canonical.mp4"
        );
    }

    #[tokio::test]
    async fn test_missing_source_is_reported() {
        let dir = TempDir::new().unwrap();
        let outcome = handle_event(&processor(dir.path()), json!({"job_id": "j-1"})).await;

        let failure = outcome.unwrap_err();
        assert!(failure.error.starts_with("Source video not found:"));
        assert!(failure.error.ends_with("sermon.mp4"));
    }

    #[tokio::test]
    async fn test_malformed_payload() {
        let dir = TempDir::new().unwrap();
        let outcome = handle_event(
            &processor(dir.path()),
            json!({"input": {"job_id": "j-1", "reextract": "yes please"}}),
        )
        .await;

        assert!(outcome.unwrap_err().error.starts_with("invalid job payload"));
    }

    #[test]
    fn test_success_response_shape() {
        let outcome = Ok(JobResult::new(
            vec![ClipResult::extracted("clip001", "/storage/j-1/clips/clip001.mp4")],
            "clip001: extracted",
        ));

        assert_eq!(
            response_json(&outcome),
            json!({
                "files": [{"name": "clip001", "path": "/storage/j-1/clips/clip001.mp4"}],
                "count": 1,
                "stdout": "clip001: extracted"
            })
        );
    }
}
