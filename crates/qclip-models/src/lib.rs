//! Shared data models for the quote clip worker.
//!
//! This crate provides Serde-serializable types for:
//! - Job requests and the serverless event envelope
//! - Clip descriptors and job results
//! - Clip manifest parsing and validation
//! - Timecode parsing

pub mod clip;
pub mod job;
pub mod manifest;
pub mod timestamp;

// Re-export common types
pub use clip::{ClipDescriptor, ClipResult, JobFailure, JobResult};
pub use job::{InputMode, JobRequest, RequestError};
pub use manifest::{parse_manifest, ManifestError};
pub use timestamp::{format_seconds, parse_timestamp, TimestampError};
