//! Pagination driver: one filter call per step, continuation token carried
//! forward, duplicates dropped against the sliding window.

use tracing::debug;

use crate::dedup::SeenWindow;
use crate::error::Result;
use crate::query::LogQuery;
use crate::source::LogSource;
use crate::types::{PageToken, RawEvent};

/// Result of one fetch after dedup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageOutcome {
    /// New events in arrival order.
    pub events: Vec<RawEvent>,
    /// Events dropped because their id was still in the window.
    pub duplicates: usize,
    /// The response carried a continuation token.
    pub has_more: bool,
}

#[derive(Debug, Default)]
pub struct PaginationDriver {
    window: SeenWindow,
    next_token: Option<PageToken>,
    /// End bound pinned for the poll cycle in progress. `None` between
    /// cycles; `Some(None)` for a query with no end.
    cycle_end: Option<Option<i64>>,
}

impl PaginationDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_window(window: SeenWindow) -> Self {
        Self {
            window,
            next_token: None,
            cycle_end: None,
        }
    }

    /// Issue one fetch with the current token and filter its events.
    ///
    /// A returned token replaces the stored one. A tokenless response leaves
    /// the last token in place so a later watch cycle resumes from it.
    ///
    /// The end bound is resolved on the first fetch of a cycle and reused
    /// while continuation tokens are followed. A tokenless response closes
    /// the cycle, so the next fetch resolves it again.
    pub async fn fetch_next<S>(&mut self, source: &S, query: &LogQuery) -> Result<PageOutcome>
    where
        S: LogSource + ?Sized,
    {
        let end_ms = *self.cycle_end.get_or_insert_with(|| query.resolve_end());
        let request = query.request_until(self.next_token.clone(), end_ms);
        let page = source.fetch(&request).await?;

        let received = page.events.len();
        let mut events = Vec::with_capacity(received);
        for event in page.events {
            if self.window.check_and_record(&event.id) {
                events.push(event);
            }
        }
        let duplicates = received - events.len();

        let has_more = page.next_token.is_some();
        if !has_more {
            self.cycle_end = None;
        }
        if let Some(token) = page.next_token {
            // Same token twice is a known upstream quirk; the window, not the
            // token, decides what is a duplicate.
            if self.next_token.as_deref() == Some(token.as_str()) {
                debug!(token = %token, "continuation token repeated");
            }
            self.next_token = Some(token);
        }

        debug!(
            log_group = query.log_group(),
            received,
            emitted = events.len(),
            duplicates,
            has_more,
            "page processed"
        );
        Ok(PageOutcome {
            events,
            duplicates,
            has_more,
        })
    }

    pub fn token(&self) -> Option<&str> {
        self.next_token.as_deref()
    }

    pub fn window(&self) -> &SeenWindow {
        &self.window
    }
}
