use std::time::Duration;

use async_trait::async_trait;
use aws_config::{timeout::TimeoutConfig, BehaviorVersion};
use aws_sdk_cloudwatchlogs::Client as CwClient;
use tracing::debug;

use crate::error::{Result, TailError};
use crate::query::MAX_EVENTS_PER_CALL;
use crate::source::LogSource;
use crate::types::{FetchPage, FetchRequest, PageToken, RawEvent, StreamInfo, StreamPage};

/// `LogSource` backed by CloudWatch Logs `FilterLogEvents`.
#[derive(Clone)]
pub struct CloudWatchSource {
    client: CwClient,
}

impl CloudWatchSource {
    pub fn new(client: CwClient) -> Self {
        Self { client }
    }

    /// Load credentials from the default provider chain. `region` overrides
    /// the chain's region when given.
    pub async fn from_env(region: Option<&str>, http_timeout: Duration) -> Self {
        let timeout_config = TimeoutConfig::builder()
            .connect_timeout(Duration::from_secs(10))
            .operation_timeout(http_timeout)
            .build();

        let mut loader = aws_config::defaults(BehaviorVersion::latest()).timeout_config(timeout_config);
        if let Some(region) = region {
            loader = loader.region(aws_sdk_cloudwatchlogs::config::Region::new(region.to_string()));
        }
        let sdk_config = loader.load().await;
        Self::new(CwClient::new(&sdk_config))
    }
}

#[async_trait]
impl LogSource for CloudWatchSource {
    // `interleaved` is deprecated upstream but still requested for streams
    // that honor it.
    #[allow(deprecated)]
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchPage> {
        let mut req = self
            .client
            .filter_log_events()
            .log_group_name(&request.log_group)
            .interleaved(true)
            .limit(MAX_EVENTS_PER_CALL as i32);

        if !request.log_streams.is_empty() {
            req = req.set_log_stream_names(Some(request.log_streams.clone()));
        }
        if let Some(start) = request.start_ms {
            req = req.start_time(start);
        }
        if let Some(end) = request.end_ms {
            req = req.end_time(end);
        }
        if let Some(pattern) = &request.filter_pattern {
            req = req.filter_pattern(pattern);
        }
        if let Some(token) = &request.next_token {
            req = req.next_token(token);
        }

        let resp = req
            .send()
            .await
            .map_err(|err| TailError::upstream("filter_log_events", err))?;

        let mut events = Vec::new();
        if let Some(raw) = resp.events {
            events.reserve(raw.len());
            for e in raw {
                if let (Some(id), Some(ts)) = (e.event_id, e.timestamp) {
                    events.push(RawEvent {
                        id,
                        log_stream: e.log_stream_name.unwrap_or_default(),
                        timestamp_ms: ts,
                        message: e.message.unwrap_or_default(),
                    });
                }
            }
        }
        debug!(
            log_group = %request.log_group,
            events = events.len(),
            more = resp.next_token.is_some(),
            "filter_log_events page"
        );
        Ok(FetchPage::new(events, resp.next_token))
    }

    async fn list_streams(
        &self,
        log_group: &str,
        next_token: Option<PageToken>,
    ) -> Result<StreamPage> {
        let resp = self
            .client
            .describe_log_streams()
            .log_group_name(log_group)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|err| TailError::upstream("describe_log_streams", err))?;

        let streams = resp
            .log_streams
            .unwrap_or_default()
            .into_iter()
            .filter_map(|s| {
                let name = s.log_stream_name?;
                Some(StreamInfo {
                    name,
                    creation_time_ms: s.creation_time,
                    last_ingestion_time_ms: s.last_ingestion_time,
                })
            })
            .collect();
        Ok(StreamPage {
            streams,
            next_token: resp.next_token,
        })
    }
}
