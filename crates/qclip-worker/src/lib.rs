//! Serverless worker that cuts quote clips out of split sermon videos.
//!
//! One invocation handles one job:
//! - resolve the source video and clip manifest (local storage or HTTP)
//! - validate the whole manifest
//! - cut each clip with FFmpeg, in manifest order, skipping existing outputs
//! - report the produced files, continuing past individual clip failures

pub mod config;
pub mod download;
pub mod error;
pub mod handler;
pub mod layout;
pub mod logging;
pub mod processor;
pub mod resolver;

pub use config::WorkerConfig;
pub use download::HttpFetcher;
pub use error::{WorkerError, WorkerResult};
pub use handler::{handle_event, response_json};
pub use layout::StorageLayout;
pub use logging::{init_tracing, JobLogger};
pub use processor::JobProcessor;
pub use resolver::{InputResolver, ResolvedInputs};
