// Chunk ingestion helpers
// Turns raw log lines (JSON or plain text) into LogChunks with best-effort timestamps

use crate::LogChunk;
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

// 2026-02-10T03:00:05Z, 2026-02-10 03:00:05.123+01:00, 2026-02-10T03:00:05
static ISO_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4}-\d{2}-\d{2})[T ](\d{2}:\d{2}:\d{2}(?:\.\d+)?)(Z|[+-]\d{2}:?\d{2})?").unwrap()
});

// [10/Feb/2026:14:30:45 +0000] (apache/nginx access logs)
static COMMON_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(\d{2}/\w{3}/\d{4}:\d{2}:\d{2}:\d{2})").unwrap());

impl LogChunk {
    /// Build a chunk from one raw log line.
    ///
    /// JSON lines contribute `timestamp|time|ts`, `level|severity`, `message|msg`
    /// and an optional `embedding` array. Non-numeric embedding entries become NaN
    /// in place, so the vector keeps its length and fails validation later instead
    /// of shrinking. Plain lines keep their text verbatim and
    /// get the first ISO-8601 or common-log timestamp found in them. A line whose
    /// timestamp can't be read stays untimed.
    pub fn from_log_line(id: impl Into<String>, line: &str) -> Self {
        let id = id.into();

        if let Ok(Value::Object(parsed)) = serde_json::from_str::<Value>(line) {
            let timestamp = parsed
                .get("timestamp")
                .or(parsed.get("time"))
                .or(parsed.get("ts"))
                .and_then(json_timestamp);

            let level = parsed
                .get("level")
                .or(parsed.get("severity"))
                .and_then(|v| v.as_str())
                .map(|s| s.to_uppercase());

            let message = parsed
                .get("message")
                .or(parsed.get("msg"))
                .and_then(|v| v.as_str());

            let text = match (level, message) {
                (Some(level), Some(message)) => format!("{}: {}", level, message),
                (None, Some(message)) => message.to_string(),
                (_, None) => line.to_string(),
            };

            let embedding = parsed.get("embedding").and_then(|v| v.as_array()).map(|values| {
                values
                    .iter()
                    .map(|v| v.as_f64().map_or(f32::NAN, |x| x as f32))
                    .collect::<Vec<f32>>()
            });

            return Self {
                id,
                text,
                timestamp,
                embedding,
            };
        }

        Self {
            id,
            text: line.to_string(),
            timestamp: extract_timestamp(line),
            embedding: None,
        }
    }
}

/// Split a log file into one chunk per non-blank line, ids are `line-<n>` (1-based)
pub fn chunks_from_lines(content: &str) -> Vec<LogChunk> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| LogChunk::from_log_line(format!("line-{}", i + 1), line))
        .collect()
}

/// Find the first recognizable timestamp inside free text
pub fn extract_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Some(caps) = ISO_PATTERN.captures(raw) {
        let naive = format!("{}T{}", &caps[1], &caps[2]);
        let naive = NaiveDateTime::parse_from_str(&naive, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
        return match caps.get(3).map(|m| m.as_str()) {
            None | Some("Z") => Some(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc)),
            Some(offset) => parse_offset(offset)?
                .from_local_datetime(&naive)
                .single()
                .map(|dt| dt.with_timezone(&Utc)),
        };
    }

    if let Some(caps) = COMMON_PATTERN.captures(raw) {
        // timezone ignored, same as the access log parsers
        return NaiveDateTime::parse_from_str(&caps[1], "%d/%b/%Y:%H:%M:%S")
            .ok()
            .map(|naive| DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc));
    }

    None
}

fn json_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|| extract_timestamp(s)),
        Value::Number(n) => {
            let raw = n.as_i64()?;
            // epoch millis vs epoch seconds
            if raw.unsigned_abs() >= 100_000_000_000 {
                DateTime::from_timestamp_millis(raw)
            } else {
                DateTime::from_timestamp(raw, 0)
            }
        }
        _ => None,
    }
}

// "+01:00" / "-0530"
fn parse_offset(offset: &str) -> Option<FixedOffset> {
    let sign = if offset.starts_with('-') { -1 } else { 1 };
    let digits: String = offset[1..].chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() != 4 {
        return None;
    }
    let hours: i32 = digits[..2].parse().ok()?;
    let minutes: i32 = digits[2..].parse().ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
