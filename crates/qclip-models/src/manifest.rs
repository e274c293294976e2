//! Clip manifest parsing and validation.
//!
//! The manifest is produced by the upstream splitting stage. It is either a
//! JSON array of clip objects or an object holding that array under `clips`.
//! Each clip carries a name (`name` or `id`), a start (`start`, `start_s` or
//! `from`) and an end (`end`, `end_s` or `to`), or a `duration` in place of
//! the end. Bounds are seconds or timecode strings.
//!
//! The whole manifest is validated before any clip is extracted, and the
//! output preserves array order.

use std::collections::HashSet;
use std::path::PathBuf;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::clip::ClipDescriptor;
use crate::timestamp::{timestamp_from_json, TimestampError};

const NAME_KEYS: &[&str] = &["name", "id"];
const START_KEYS: &[&str] = &["start", "start_s", "from"];
const END_KEYS: &[&str] = &["end", "end_s", "to"];
const DURATION_KEY: &str = "duration";

/// Manifest parsing/validation error.
///
/// Entry indexes are 1-based.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("manifest is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("manifest must be a JSON array or an object with a 'clips' array")]
    NotAList,

    #[error("manifest contains no clips")]
    Empty,

    #[error("manifest entry #{index} is not an object")]
    NotAnObject { index: usize },

    #[error("manifest entry #{index} is missing required field '{field}'")]
    MissingField { index: usize, field: &'static str },

    #[error("manifest entry #{index} has an invalid '{field}': {source}")]
    InvalidTimestamp {
        index: usize,
        field: &'static str,
        #[source]
        source: TimestampError,
    },

    #[error("manifest entry #{index} ('{name}') ends at {end}s, not after its start at {start}s")]
    InvalidRange {
        index: usize,
        name: String,
        start: f64,
        end: f64,
    },

    #[error("manifest entry #{index} has a name that cannot be used as a file name: '{name}'")]
    InvalidName { index: usize, name: String },

    #[error("manifest entry #{index} reuses the clip name '{name}'")]
    DuplicateName { index: usize, name: String },
}

/// Parse and validate a manifest document.
pub fn parse_manifest(json: &str) -> Result<Vec<ClipDescriptor>, ManifestError> {
    let document: Value = serde_json::from_str(json)?;
    parse_manifest_value(document)
}

/// Validate an already-decoded manifest document.
pub fn parse_manifest_value(document: Value) -> Result<Vec<ClipDescriptor>, ManifestError> {
    let entries = match document {
        Value::Array(entries) => entries,
        Value::Object(mut map) => match map.remove("clips") {
            Some(Value::Array(entries)) => entries,
            _ => return Err(ManifestError::NotAList),
        },
        _ => return Err(ManifestError::NotAList),
    };

    if entries.is_empty() {
        return Err(ManifestError::Empty);
    }

    let mut seen = HashSet::with_capacity(entries.len());
    let mut clips = Vec::with_capacity(entries.len());

    for (offset, entry) in entries.iter().enumerate() {
        let index = offset + 1;
        let fields = entry
            .as_object()
            .ok_or(ManifestError::NotAnObject { index })?;

        let clip = parse_entry(index, fields)?;
        if !seen.insert(clip.name.clone()) {
            return Err(ManifestError::DuplicateName {
                index,
                name: clip.name,
            });
        }
        clips.push(clip);
    }

    Ok(clips)
}

fn parse_entry(index: usize, fields: &Map<String, Value>) -> Result<ClipDescriptor, ManifestError> {
    let name = match first_present(fields, NAME_KEYS) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => {
            return Err(ManifestError::InvalidName {
                index,
                name: other.to_string(),
            })
        }
        None => return Err(ManifestError::MissingField { index, field: "name" }),
    };
    if !is_valid_file_stem(&name) {
        return Err(ManifestError::InvalidName { index, name });
    }

    let start = match first_present(fields, START_KEYS) {
        Some(value) => read_timestamp(index, "start", value)?,
        None => return Err(ManifestError::MissingField { index, field: "start" }),
    };

    let end = match first_present(fields, END_KEYS) {
        Some(value) => read_timestamp(index, "end", value)?,
        None => match fields.get(DURATION_KEY).filter(|v| !v.is_null()) {
            Some(value) => start + read_timestamp(index, DURATION_KEY, value)?,
            None => return Err(ManifestError::MissingField { index, field: "end" }),
        },
    };

    if end <= start {
        return Err(ManifestError::InvalidRange {
            index,
            name,
            start,
            end,
        });
    }

    Ok(ClipDescriptor { name, start, end })
}

/// First non-null value among `keys`.
fn first_present<'a>(fields: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| fields.get(*key))
        .find(|value| !value.is_null())
}

fn read_timestamp(index: usize, field: &'static str, value: &Value) -> Result<f64, ManifestError> {
    timestamp_from_json(value).map_err(|source| ManifestError::InvalidTimestamp {
        index,
        field,
        source,
    })
}

/// Whether `name` can be joined onto the clips directory as a single file stem.
fn is_valid_file_stem(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}
