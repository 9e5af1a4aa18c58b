//! Poll loop / live-tail controller.
//!
//! ```text
//! Fetching --token-----------------> Fetching
//! Fetching --no token--------------> Exhausted  (emits Idle)
//! Exhausted --bounded--------------> Done
//! Exhausted --watching-------------> IdleWait --backoff--> Fetching
//! any --cancelled------------------> Done
//! ```
//!
//! Fetch failures end the session and are returned to the caller; the loop
//! never retries on its own.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{Result, TailError};
use crate::normalize::normalize_event;
use crate::paginate::PaginationDriver;
use crate::query::LogQuery;
use crate::source::LogSource;
use crate::types::NormalizedEvent;

pub const DEFAULT_IDLE_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Clone, Debug)]
pub struct TailConfig {
    /// Wait between polls once a watch session has drained the window.
    pub idle_backoff: Duration,
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            idle_backoff: DEFAULT_IDLE_BACKOFF,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailMode {
    /// Stop once the window is drained.
    Bounded,
    /// Poll until cancelled.
    Watching,
}

impl TailMode {
    /// Watch when asked to, or when the query has no end bound.
    pub fn for_query(query: &LogQuery, watch: bool) -> Self {
        if watch || query.end().is_none() {
            TailMode::Watching
        } else {
            TailMode::Bounded
        }
    }
}

/// What a session produces on each step.
#[derive(Debug, Clone, PartialEq)]
pub enum TailSignal {
    /// New events, in arrival order. Never empty.
    Events(Vec<NormalizedEvent>),
    /// The current window is drained for now.
    Idle,
    /// The session has ended.
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailState {
    Fetching,
    Exhausted,
    IdleWait,
    Done,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TailStats {
    pub pages: u64,
    pub events_emitted: u64,
    pub duplicates_dropped: u64,
    pub idle_cycles: u64,
    pub cancelled: bool,
}

/// One tail over one query. Owns its dedup window and token state.
pub struct TailSession<S> {
    source: S,
    query: LogQuery,
    mode: TailMode,
    cfg: TailConfig,
    driver: PaginationDriver,
    state: TailState,
    cancel: CancellationToken,
    stats: TailStats,
}

impl<S: LogSource> TailSession<S> {
    pub fn new(
        source: S,
        query: LogQuery,
        mode: TailMode,
        cfg: TailConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            source,
            query,
            mode,
            cfg,
            driver: PaginationDriver::new(),
            state: TailState::Fetching,
            cancel,
            stats: TailStats::default(),
        }
    }

    pub fn state(&self) -> TailState {
        self.state
    }

    pub fn mode(&self) -> TailMode {
        self.mode
    }

    pub fn stats(&self) -> TailStats {
        self.stats
    }

    pub fn driver(&self) -> &PaginationDriver {
        &self.driver
    }

    /// Advance until there is something to report. Once `Done` is returned
    /// every later call returns `Done` again.
    pub async fn next(&mut self) -> Result<TailSignal> {
        loop {
            match self.state {
                TailState::Done => return Ok(TailSignal::Done),
                TailState::Exhausted => {
                    self.stats.idle_cycles += 1;
                    self.state = match self.mode {
                        TailMode::Bounded => TailState::Done,
                        TailMode::Watching => TailState::IdleWait,
                    };
                    return Ok(TailSignal::Idle);
                }
                TailState::IdleWait => {
                    debug!(backoff = ?self.cfg.idle_backoff, "idle wait");
                    let cancel = self.cancel.clone();
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Ok(self.finish_cancelled()),
                        _ = sleep(self.cfg.idle_backoff) => self.state = TailState::Fetching,
                    }
                }
                TailState::Fetching => {
                    if self.cancel.is_cancelled() {
                        return Ok(self.finish_cancelled());
                    }
                    let cancel = self.cancel.clone();
                    let (driver, source, query) = (&mut self.driver, &self.source, &self.query);
                    let fetched = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => None,
                        res = driver.fetch_next(source, query) => Some(res),
                    };
                    let outcome = match fetched {
                        None => return Ok(self.finish_cancelled()),
                        Some(Ok(outcome)) => outcome,
                        Some(Err(err)) => {
                            self.state = TailState::Done;
                            return Err(err);
                        }
                    };

                    self.stats.pages += 1;
                    self.stats.duplicates_dropped += outcome.duplicates as u64;
                    if !outcome.has_more {
                        self.state = TailState::Exhausted;
                    }
                    if !outcome.events.is_empty() {
                        self.stats.events_emitted += outcome.events.len() as u64;
                        let events = outcome.events.into_iter().map(normalize_event).collect();
                        return Ok(TailSignal::Events(events));
                    }
                }
            }
        }
    }

    /// Drive the session to completion, pushing every signal (the final
    /// `Done` included) into `tx`.
    pub async fn run(mut self, tx: mpsc::Sender<TailSignal>) -> Result<TailStats> {
        info!(
            log_group = self.query.log_group(),
            streams = self.query.log_streams().len(),
            mode = ?self.mode,
            "tail session started"
        );
        loop {
            let signal = self.next().await?;
            let done = signal == TailSignal::Done;
            tx.send(signal).await.map_err(|_| TailError::ChannelClosed)?;
            if done {
                break;
            }
        }
        info!(
            pages = self.stats.pages,
            events = self.stats.events_emitted,
            duplicates = self.stats.duplicates_dropped,
            "tail session finished"
        );
        Ok(self.stats)
    }

    fn finish_cancelled(&mut self) -> TailSignal {
        info!(log_group = self.query.log_group(), "tail cancelled");
        self.state = TailState::Done;
        self.stats.cancelled = true;
        TailSignal::Done
    }
}
