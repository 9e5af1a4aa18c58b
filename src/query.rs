//! Query descriptor and pre-flight stream resolution.

use regex::Regex;
use tracing::{debug, info};

use crate::error::{Result, TailError};
use crate::source::LogSource;
use crate::time_windows::current_time_ms;
use crate::types::{FetchRequest, PageToken, StreamInfo};

/// Maximum number of events one filter call can return. Also the capacity of
/// the dedup window.
pub const MAX_EVENTS_PER_CALL: usize = 10_000;

/// Maximum number of stream names one filter call accepts.
pub const MAX_STREAMS: usize = 100;

/// Stream pattern meaning "every stream in the group".
pub const ALL_STREAMS: &str = "ALL";

/// Upper bound of a query window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndBound {
    /// Fixed instant, epoch millis.
    At(i64),
    /// The moment of each fetch cycle.
    Now,
}

impl EndBound {
    pub fn resolve(self) -> i64 {
        match self {
            EndBound::At(ms) => ms,
            EndBound::Now => current_time_ms(),
        }
    }
}

/// Immutable description of what to tail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    log_group: String,
    log_streams: Vec<String>,
    filter_pattern: Option<String>,
    start_ms: Option<i64>,
    end: Option<EndBound>,
}

impl LogQuery {
    pub fn new(
        log_group: impl Into<String>,
        log_streams: Vec<String>,
        filter_pattern: Option<String>,
        start_ms: Option<i64>,
        end: Option<EndBound>,
    ) -> Result<Self> {
        let log_group = log_group.into();
        if log_group.trim().is_empty() {
            return Err(TailError::MissingLogGroup);
        }
        if log_streams.len() > MAX_STREAMS {
            return Err(TailError::TooManyStreams {
                pattern: log_streams.join(","),
                matched: log_streams.len(),
                limit: MAX_STREAMS,
            });
        }
        Ok(Self {
            log_group,
            log_streams,
            filter_pattern: filter_pattern.filter(|p| !p.is_empty()),
            start_ms,
            end,
        })
    }

    /// Query over every stream of a group with no window or filter.
    pub fn all_streams(log_group: impl Into<String>) -> Result<Self> {
        Self::new(log_group, Vec::new(), None, None, None)
    }

    pub fn log_group(&self) -> &str {
        &self.log_group
    }

    pub fn log_streams(&self) -> &[String] {
        &self.log_streams
    }

    pub fn filter_pattern(&self) -> Option<&str> {
        self.filter_pattern.as_deref()
    }

    pub fn start_ms(&self) -> Option<i64> {
        self.start_ms
    }

    pub fn end(&self) -> Option<EndBound> {
        self.end
    }

    /// Upper bound as of now. `EndBound::Now` yields the current time.
    pub fn resolve_end(&self) -> Option<i64> {
        self.end.map(EndBound::resolve)
    }

    /// Build the arguments for one fetch, resolving the end bound now.
    pub fn fetch_request(&self, next_token: Option<PageToken>) -> FetchRequest {
        self.request_until(next_token, self.resolve_end())
    }

    /// Build the arguments for one fetch against an already resolved end.
    pub fn request_until(&self, next_token: Option<PageToken>, end_ms: Option<i64>) -> FetchRequest {
        FetchRequest {
            log_group: self.log_group.clone(),
            log_streams: self.log_streams.clone(),
            start_ms: self.start_ms,
            end_ms,
            filter_pattern: self.filter_pattern.clone(),
            next_token,
        }
    }
}

/// Expand a stream pattern into concrete stream names.
///
/// `ALL` yields an empty list (no stream filter). Any other pattern is a
/// regular expression anchored at the start of the stream name. Streams with
/// no ingestion since `start_ms`, or created after `end_ms`, are skipped.
pub async fn resolve_streams<S>(
    source: &S,
    log_group: &str,
    pattern: &str,
    start_ms: Option<i64>,
    end_ms: Option<i64>,
) -> Result<Vec<String>>
where
    S: LogSource + ?Sized,
{
    if pattern == ALL_STREAMS {
        return Ok(Vec::new());
    }
    let re = Regex::new(&format!("^(?:{pattern})")).map_err(|source| TailError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })?;

    let mut matched = Vec::new();
    let mut next_token: Option<PageToken> = None;
    loop {
        let page = source.list_streams(log_group, next_token.take()).await?;
        debug!(
            log_group,
            listed = page.streams.len(),
            more = page.next_token.is_some(),
            "listed streams"
        );
        matched.extend(
            page.streams
                .into_iter()
                .filter(|s| re.is_match(&s.name) && in_window(s, start_ms, end_ms))
                .map(|s| s.name),
        );
        match page.next_token {
            Some(token) => next_token = Some(token),
            None => break,
        }
    }

    if matched.len() > MAX_STREAMS {
        return Err(TailError::TooManyStreams {
            pattern: pattern.to_string(),
            matched: matched.len(),
            limit: MAX_STREAMS,
        });
    }
    if matched.is_empty() {
        return Err(TailError::NoStreamsMatched {
            pattern: pattern.to_string(),
        });
    }
    info!(log_group, pattern, streams = matched.len(), "resolved log streams");
    Ok(matched)
}

fn in_window(stream: &StreamInfo, start_ms: Option<i64>, end_ms: Option<i64>) -> bool {
    if let (Some(start), Some(last)) = (start_ms, stream.last_ingestion_time_ms) {
        if last < start {
            return false;
        }
    }
    if let (Some(end), Some(created)) = (end_ms, stream.creation_time_ms) {
        if created > end {
            return false;
        }
    }
    true
}
