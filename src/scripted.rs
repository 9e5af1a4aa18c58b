//! In-memory `LogSource` that replays a scripted sequence of responses.
//! Used by tests and for exercising the engine without network access.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Result, TailError};
use crate::source::LogSource;
use crate::types::{FetchPage, FetchRequest, PageToken, RawEvent, StreamInfo, StreamPage};

type Step = std::result::Result<FetchPage, String>;

/// Once the script runs out every fetch returns an empty, tokenless page.
#[derive(Clone, Default)]
pub struct ScriptedSource {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    steps: Mutex<VecDeque<Step>>,
    streams: Mutex<Vec<StreamInfo>>,
    stream_page_size: AtomicUsize,
    fetches: AtomicUsize,
    stream_listings: AtomicUsize,
    requests: Mutex<Vec<FetchRequest>>,
    delay: Mutex<Option<Duration>>,
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct ScriptedFailure(String);

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a page.
    pub fn push_page(&self, events: Vec<RawEvent>, next_token: Option<&str>) -> &Self {
        self.push(Ok(FetchPage::new(events, next_token.map(str::to_string))))
    }

    /// Queue a failed fetch.
    pub fn push_error(&self, message: &str) -> &Self {
        self.push(Err(message.to_string()))
    }

    fn push(&self, step: Step) -> &Self {
        lock(&self.inner.steps).push_back(step);
        self
    }

    /// Streams reported by `list_streams`, served `page_size` at a time
    /// (0 serves them all at once).
    pub fn with_streams(self, streams: Vec<StreamInfo>, page_size: usize) -> Self {
        *lock(&self.inner.streams) = streams;
        self.inner.stream_page_size.store(page_size, Ordering::SeqCst);
        self
    }

    /// Delay every fetch, to simulate a slow network call.
    pub fn with_delay(self, delay: Duration) -> Self {
        *lock(&self.inner.delay) = Some(delay);
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.inner.fetches.load(Ordering::SeqCst)
    }

    pub fn stream_listing_count(&self) -> usize {
        self.inner.stream_listings.load(Ordering::SeqCst)
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<FetchRequest> {
        lock(&self.inner.requests).clone()
    }

    pub fn remaining_steps(&self) -> usize {
        lock(&self.inner.steps).len()
    }
}

#[async_trait]
impl LogSource for ScriptedSource {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchPage> {
        self.inner.fetches.fetch_add(1, Ordering::SeqCst);
        lock(&self.inner.requests).push(request.clone());

        let delay = *lock(&self.inner.delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let step = lock(&self.inner.steps).pop_front();
        match step {
            Some(Ok(page)) => Ok(page),
            Some(Err(message)) => Err(TailError::upstream(
                "filter_log_events",
                ScriptedFailure(message),
            )),
            None => Ok(FetchPage::empty()),
        }
    }

    async fn list_streams(
        &self,
        _log_group: &str,
        next_token: Option<PageToken>,
    ) -> Result<StreamPage> {
        self.inner.stream_listings.fetch_add(1, Ordering::SeqCst);
        let streams = lock(&self.inner.streams);
        let page_size = match self.inner.stream_page_size.load(Ordering::SeqCst) {
            0 => streams.len().max(1),
            n => n,
        };
        let offset: usize = next_token.and_then(|t| t.parse().ok()).unwrap_or(0);
        let end = (offset + page_size).min(streams.len());
        let page = streams.get(offset..end).unwrap_or_default().to_vec();
        let next_token = (end < streams.len()).then(|| end.to_string());
        Ok(StreamPage {
            streams: page,
            next_token,
        })
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Build a raw event with a JSON-free message.
pub fn raw_event(id: &str, timestamp_ms: i64, message: &str) -> RawEvent {
    RawEvent {
        id: id.to_string(),
        log_stream: "stream-1".to_string(),
        timestamp_ms,
        message: message.to_string(),
    }
}
