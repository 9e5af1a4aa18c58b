//! Upstream log store boundary.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{FetchPage, FetchRequest, PageToken, StreamPage};

/// A paginated log store with at-least-once delivery.
///
/// `fetch` may return events already delivered by an earlier page, and may
/// hand back the same continuation token for different data. Callers must
/// dedup by event id and never compare tokens to decide content equality.
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Issue one filter call. Interleaving across streams is always requested.
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchPage>;

    /// List one page of the streams in `log_group`.
    async fn list_streams(&self, log_group: &str, next_token: Option<PageToken>)
        -> Result<StreamPage>;
}
