//! Map raw store events and decoded log lines onto `NormalizedEvent`.
//!
//! Structured payloads are best effort: level, message and exception are
//! lifted out when present, everything else passes through untouched.
//! Payloads that are not JSON objects become an `Info` record carrying the
//! raw text.

use serde_json::{Map, Value};
use tracing::trace;

use crate::types::{EventTime, ExceptionInfo, NormalizedEvent, RawEvent, Traceback};

/// Level given to payloads that are not structured data.
pub const DEFAULT_LEVEL: &str = "Info";

/// Keys tried, in order, for the human-oriented message.
const MESSAGE_KEYS: [&str; 3] = ["event", "message", "msg"];

/// Normalize one deduplicated store event.
pub fn normalize_event(raw: RawEvent) -> NormalizedEvent {
    let message = raw.message.replace('\r', "");
    let message = message.trim_end_matches('\n');
    let log_stream = (!raw.log_stream.is_empty()).then_some(raw.log_stream);
    let timestamp = Some(EventTime::Millis(raw.timestamp_ms));

    match parse_record(message) {
        Some(mut record) => {
            // The store timestamp is authoritative.
            record.remove("timestamp");
            let mut event = normalize_record(record, timestamp, message);
            event.log_stream = log_stream;
            event
        }
        None => {
            trace!(len = message.len(), "unstructured message");
            NormalizedEvent {
                timestamp,
                level: Some(DEFAULT_LEVEL.to_string()),
                event: message.to_string(),
                log_stream,
                fields: Map::new(),
                exception: None,
                structured: false,
            }
        }
    }
}

/// Decode a line as a JSON object. Anything else (invalid JSON, arrays,
/// scalars) yields `None`.
pub fn parse_record(line: &str) -> Option<Map<String, Value>> {
    let trimmed = line.trim();
    if !trimmed.starts_with('{') {
        return None;
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Normalize a decoded record. `fallback_event` is used when no message key
/// is present.
pub fn normalize_record(
    mut record: Map<String, Value>,
    timestamp: Option<EventTime>,
    fallback_event: &str,
) -> NormalizedEvent {
    let level = record.remove("level").map(value_to_string);

    let event = MESSAGE_KEYS
        .iter()
        .find_map(|key| record.remove(*key))
        .map(value_to_string)
        .unwrap_or_else(|| fallback_event.to_string());

    let exception = match record.remove("exception") {
        Some(value) => match extract_traceback(value) {
            Ok(tb) => Some(tb),
            Err(value) => {
                record.insert("exception".to_string(), value);
                None
            }
        },
        None => None,
    };

    NormalizedEvent {
        timestamp,
        level,
        event,
        log_stream: None,
        fields: record,
        exception,
        structured: true,
    }
}

/// Normalize a line read by the `show` command. Returns `None` for lines that
/// are not structured, which the renderer shows as malformed.
pub fn normalize_line(line: &str) -> Option<NormalizedEvent> {
    let mut record = parse_record(line)?;
    let timestamp = record.remove("timestamp").and_then(|ts| match ts {
        Value::Null => None,
        Value::String(s) => Some(EventTime::Text(s)),
        Value::Number(n) => match n.as_i64() {
            Some(ms) => Some(EventTime::Millis(ms)),
            None => Some(EventTime::Text(n.to_string())),
        },
        other => Some(EventTime::Text(other.to_string())),
    });
    Some(normalize_record(record, timestamp, line.trim()))
}

/// `Err` hands the value back when it is neither a serialized chain nor text.
fn extract_traceback(value: Value) -> Result<Traceback, Value> {
    match value {
        Value::String(text) => Ok(Traceback::Text(text)),
        Value::Array(items) if !items.is_empty() => {
            match serde_json::from_value::<Vec<ExceptionInfo>>(Value::Array(items.clone())) {
                Ok(chain) => Ok(Traceback::Structured(chain)),
                Err(_) => Err(Value::Array(items)),
            }
        }
        other => Err(other),
    }
}

fn value_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}
