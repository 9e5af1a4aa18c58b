//! Tail runner - pre-flight checks, then a session feeding the renderer.
//! The session runs on its own task so rendering overlaps the next fetch.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Settings;
use crate::error::TailError;
use crate::query::{resolve_streams, EndBound, LogQuery};
use crate::render::ConsoleRenderer;
use crate::source::LogSource;
use crate::tail::{TailConfig, TailMode, TailSession, TailSignal, TailStats};

/// Signals buffered between the session and the renderer.
const SIGNAL_BUFFER: usize = 16;

/// Everything needed to start a session, validated up front.
#[derive(Debug, Clone)]
pub struct TailPlan {
    pub query: LogQuery,
    pub mode: TailMode,
    pub cfg: TailConfig,
}

/// Validate settings and expand the stream pattern. No filter call is issued.
pub async fn plan_tail<S>(
    source: &S,
    settings: &Settings,
    now: DateTime<Utc>,
) -> std::result::Result<TailPlan, TailError>
where
    S: LogSource + ?Sized,
{
    let (start_ms, end) = settings.time_window(now)?;
    let end_ms = end.map(EndBound::resolve);
    let streams = resolve_streams(
        source,
        &settings.log_group,
        &settings.log_stream_pattern,
        start_ms,
        end_ms,
    )
    .await?;

    let query = LogQuery::new(
        settings.log_group.clone(),
        streams,
        settings.filter_pattern.clone(),
        start_ms,
        end,
    )?;
    let mode = TailMode::for_query(&query, settings.watch);
    Ok(TailPlan {
        query,
        mode,
        cfg: TailConfig {
            idle_backoff: settings.poll_interval,
        },
    })
}

/// Run a planned session to completion, rendering every event into `out`.
pub async fn run_tail<S, W>(
    source: S,
    plan: TailPlan,
    renderer: &ConsoleRenderer,
    out: &mut W,
    cancel: CancellationToken,
) -> Result<TailStats>
where
    S: LogSource + 'static,
    W: Write,
{
    let session = TailSession::new(source, plan.query, plan.mode, plan.cfg, cancel.clone());
    let (tx, mut rx) = mpsc::channel(SIGNAL_BUFFER);
    let handle = tokio::spawn(session.run(tx));

    let mut rendered = 0usize;
    let mut write_result = Ok(());
    while let Some(signal) = rx.recv().await {
        match signal {
            TailSignal::Events(events) => {
                for event in &events {
                    if let Err(err) = renderer.write_event(out, event) {
                        write_result = Err(err);
                        break;
                    }
                    rendered += 1;
                }
                if write_result.is_err() {
                    break;
                }
                if let Err(err) = out.flush() {
                    write_result = Err(err);
                    break;
                }
            }
            TailSignal::Idle => {}
            TailSignal::Done => break,
        }
    }

    if let Err(err) = write_result {
        cancel.cancel();
        drop(rx);
        if let Err(join_err) = handle.await {
            warn!("tail task failed after output error: {join_err:?}");
        }
        return Err(err).context("writing rendered events");
    }
    drop(rx);

    let stats = handle.await.context("tail task panicked")??;
    info!(rendered, "tail complete");
    Ok(stats)
}
