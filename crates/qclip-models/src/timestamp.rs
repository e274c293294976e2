//! Timecode parsing for clip manifests.
//!
//! Manifest bounds arrive either as JSON numbers (seconds) or as strings in
//! one of the formats `SS[.mmm]`, `MM:SS[.mmm]` or `HH:MM:SS[.mmm]`.

use serde_json::Value;

/// Parse a timestamp string to total seconds.
///
/// # Examples
/// ```
/// use qclip_models::timestamp::parse_timestamp;
/// assert_eq!(parse_timestamp("01:30:00").unwrap(), 5400.0);
/// assert_eq!(parse_timestamp("05:30").unwrap(), 330.0);
/// assert_eq!(parse_timestamp("25.5").unwrap(), 25.5);
/// ```
pub fn parse_timestamp(ts: &str) -> Result<f64, TimestampError> {
    let ts = ts.trim();
    if ts.is_empty() {
        return Err(TimestampError::Empty);
    }

    let parts: Vec<&str> = ts.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [s] => ("0", "0", *s),
        [m, s] => ("0", *m, *s),
        [h, m, s] => (*h, *m, *s),
        _ => return Err(TimestampError::InvalidFormat(ts.to_string())),
    };

    let hours = parse_component("hours", hours)?;
    let minutes = parse_component("minutes", minutes)?;
    let seconds = parse_component("seconds", seconds)?;

    // Sub-minute components only make sense below 60 once a larger unit is present
    if parts.len() > 1 && seconds >= 60.0 {
        return Err(TimestampError::InvalidValue("seconds", seconds.to_string()));
    }
    if parts.len() > 2 && minutes >= 60.0 {
        return Err(TimestampError::InvalidValue("minutes", minutes.to_string()));
    }

    Ok(hours * 3600.0 + minutes * 60.0 + seconds)
}

fn parse_component(component: &'static str, raw: &str) -> Result<f64, TimestampError> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| TimestampError::InvalidValue(component, raw.to_string()))?;
    if !value.is_finite() {
        return Err(TimestampError::InvalidValue(component, raw.to_string()));
    }
    if value < 0.0 {
        return Err(TimestampError::Negative);
    }
    Ok(value)
}

/// Read a timestamp from a manifest JSON value (number or timecode string).
pub fn timestamp_from_json(value: &Value) -> Result<f64, TimestampError> {
    match value {
        Value::Number(n) => {
            let secs = n
                .as_f64()
                .ok_or_else(|| TimestampError::InvalidFormat(n.to_string()))?;
            if secs < 0.0 {
                return Err(TimestampError::Negative);
            }
            Ok(secs)
        }
        Value::String(s) => parse_timestamp(s),
        other => Err(TimestampError::InvalidFormat(other.to_string())),
    }
}

/// Format seconds into HH:MM:SS or HH:MM:SS.mmm string.
pub fn format_seconds(total_secs: f64) -> String {
    let hours = (total_secs / 3600.0).floor() as u32;
    let mins = ((total_secs % 3600.0) / 60.0).floor() as u32;
    let secs = total_secs % 60.0;

    if (secs - secs.floor()).abs() > 0.0001 {
        format!("{:02}:{:02}:{:06.3}", hours, mins, secs)
    } else {
        format!("{:02}:{:02}:{:02}", hours, mins, secs.floor() as u32)
    }
}

/// Timestamp parsing error.
#[derive(Debug, Clone, PartialEq)]
pub enum TimestampError {
    /// Timestamp string is empty
    Empty,
    /// Timestamp contains negative values
    Negative,
    /// Invalid numeric value for a component
    InvalidValue(&'static str, String),
    /// Invalid timestamp format
    InvalidFormat(String),
}

impl std::fmt::Display for TimestampError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "Timestamp cannot be empty"),
            Self::Negative => write!(f, "Timestamp cannot be negative"),
            Self::InvalidValue(component, value) => {
                write!(f, "Invalid {} value: {}", component, value)
            }
            Self::InvalidFormat(ts) => write!(
                f,
                "Invalid timestamp '{}'. Use seconds, MM:SS[.mmm] or HH:MM:SS[.mmm]",
                ts
            ),
        }
    }
}

impl std::error::Error for TimestampError {}
