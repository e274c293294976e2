#![deny(unreachable_patterns)]
//! FFmpeg CLI wrapper for cutting quote clips.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building
//! - A runner with stderr capture and optional timeout
//! - Source probing for duration checks
//! - Segment extraction behind the `SegmentExtractor` trait
//! - Temp-then-rename file promotion so failed cuts leave nothing behind

pub mod clip;
pub mod command;
pub mod error;
pub mod fs_utils;
pub mod probe;

pub use clip::{
    clip_output_path, extract_clip, EncodingMode, Extraction, FfmpegExtractor, SegmentExtractor,
};
pub use command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use probe::{check_ffprobe, probe_source, SourceInfo};
