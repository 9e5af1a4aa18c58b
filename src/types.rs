use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque continuation cursor handed back by the upstream store.
pub type PageToken = String;

/// One event as delivered by the upstream store. `id` is unique per real log
/// event but may repeat across responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    pub id: String,
    pub log_stream: String,
    pub timestamp_ms: i64,
    pub message: String,
}

/// Fully resolved arguments for a single `FilterEvents` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchRequest {
    pub log_group: String,
    /// Empty means every stream in the group.
    pub log_streams: Vec<String>,
    pub start_ms: Option<i64>,
    pub end_ms: Option<i64>,
    pub filter_pattern: Option<String>,
    pub next_token: Option<PageToken>,
}

/// One upstream response page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchPage {
    pub events: Vec<RawEvent>,
    pub next_token: Option<PageToken>,
}

impl FetchPage {
    pub fn new(events: Vec<RawEvent>, next_token: Option<PageToken>) -> Self {
        Self { events, next_token }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

/// Stream metadata used for pattern resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamInfo {
    pub name: String,
    pub creation_time_ms: Option<i64>,
    pub last_ingestion_time_ms: Option<i64>,
}

impl StreamInfo {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// One page of stream listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamPage {
    pub streams: Vec<StreamInfo>,
    pub next_token: Option<PageToken>,
}

/// When an event happened: epoch millis from the store, or whatever text a
/// local log line carried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventTime {
    Millis(i64),
    Text(String),
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventTime::Millis(ms) => match DateTime::<Utc>::from_timestamp_millis(*ms) {
                Some(dt) => write!(f, "{}", dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
                None => write!(f, "{ms}"),
            },
            EventTime::Text(s) => f.write_str(s),
        }
    }
}

/// A single stack frame of a serialized exception.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub lineno: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locals: Option<Map<String, Value>>,
}

/// One link of a serialized exception chain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExceptionInfo {
    pub exc_type: String,
    #[serde(default)]
    pub exc_value: String,
    #[serde(default)]
    pub is_cause: bool,
    #[serde(default)]
    pub frames: Vec<Frame>,
}

/// Exception attached to a log record.
#[derive(Debug, Clone, PartialEq)]
pub enum Traceback {
    /// Exception chain as emitted by dict-style traceback serializers, in
    /// emission order (the handled exception first).
    Structured(Vec<ExceptionInfo>),
    /// Pre-formatted traceback text.
    Text(String),
}

/// Uniform output record handed to the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEvent {
    pub timestamp: Option<EventTime>,
    /// `None` when the payload was structured but carried no level.
    pub level: Option<String>,
    pub event: String,
    pub log_stream: Option<String>,
    pub fields: Map<String, Value>,
    pub exception: Option<Traceback>,
    /// False when the payload was not structured data.
    pub structured: bool,
}
