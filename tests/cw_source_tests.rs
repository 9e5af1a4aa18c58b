//! Tests for the CloudWatch source against a mock Logs endpoint.

use aws_sdk_cloudwatchlogs::config::{BehaviorVersion, Credentials, Region};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lucid_log::cw_source::CloudWatchSource;
use lucid_log::error::TailError;
use lucid_log::query::{resolve_streams, LogQuery, EndBound};
use lucid_log::source::LogSource;
use lucid_log::types::FetchRequest;

const AMZ_JSON: &str = "application/x-amz-json-1.1";
const FILTER_TARGET: &str = "Logs_20140328.FilterLogEvents";
const DESCRIBE_TARGET: &str = "Logs_20140328.DescribeLogStreams";

fn source_for(server: &MockServer) -> CloudWatchSource {
    let config = aws_sdk_cloudwatchlogs::Config::builder()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(Credentials::new("AKID", "SECRET", None, None, "test"))
        .endpoint_url(server.uri())
        .build();
    CloudWatchSource::new(aws_sdk_cloudwatchlogs::Client::from_conf(config))
}

fn json_response(body: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", AMZ_JSON)
        .set_body_string(body.to_string())
}

fn request(group: &str) -> FetchRequest {
    FetchRequest {
        log_group: group.to_string(),
        ..FetchRequest::default()
    }
}

#[tokio::test]
async fn test_fetch_maps_events_and_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("x-amz-target", FILTER_TARGET))
        .respond_with(json_response(json!({
            "events": [
                {"eventId": "e1", "logStreamName": "web-1", "timestamp": 1000, "message": "{\"event\": \"a\"}", "ingestionTime": 1001},
                {"eventId": "e2", "logStreamName": "web-2", "timestamp": 1002, "message": "plain", "ingestionTime": 1003}
            ],
            "nextToken": "tok-2"
        })))
        .mount(&server)
        .await;

    let page = source_for(&server).fetch(&request("/app")).await.unwrap();
    assert_eq!(page.events.len(), 2);
    assert_eq!(page.events[0].id, "e1");
    assert_eq!(page.events[0].log_stream, "web-1");
    assert_eq!(page.events[0].timestamp_ms, 1000);
    assert_eq!(page.events[1].message, "plain");
    assert_eq!(page.next_token.as_deref(), Some("tok-2"));
}

#[tokio::test]
async fn test_fetch_sends_query_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("x-amz-target", FILTER_TARGET))
        .and(body_partial_json(json!({
            "logGroupName": "/app",
            "logStreamNames": ["web-1", "web-2"],
            "startTime": 1000,
            "endTime": 2000,
            "filterPattern": "ERROR",
            "limit": 10000,
            "nextToken": "tok-1"
        })))
        .respond_with(json_response(json!({"events": []})))
        .expect(1)
        .mount(&server)
        .await;

    let query = LogQuery::new(
        "/app",
        vec!["web-1".into(), "web-2".into()],
        Some("ERROR".into()),
        Some(1000),
        Some(EndBound::At(2000)),
    )
    .unwrap();
    let page = source_for(&server)
        .fetch(&query.fetch_request(Some("tok-1".into())))
        .await
        .unwrap();
    assert!(page.events.is_empty());
    assert!(page.next_token.is_none());
}

#[tokio::test]
async fn test_fetch_follows_token_with_distinct_responses() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("x-amz-target", FILTER_TARGET))
        .and(body_partial_json(json!({"nextToken": "tok-2"})))
        .respond_with(json_response(json!({
            "events": [{"eventId": "e3", "logStreamName": "web-1", "timestamp": 3000, "message": "third"}]
        })))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(header("x-amz-target", FILTER_TARGET))
        .respond_with(json_response(json!({
            "events": [{"eventId": "e1", "logStreamName": "web-1", "timestamp": 1000, "message": "first"}],
            "nextToken": "tok-2"
        })))
        .mount(&server)
        .await;

    let source = source_for(&server);
    let first = source.fetch(&request("/app")).await.unwrap();
    assert_eq!(first.events[0].id, "e1");

    let mut next = request("/app");
    next.next_token = first.next_token;
    let second = source.fetch(&next).await.unwrap();
    assert_eq!(second.events[0].id, "e3");
    assert!(second.next_token.is_none());
}

#[tokio::test]
async fn test_fetch_skips_events_without_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("x-amz-target", FILTER_TARGET))
        .respond_with(json_response(json!({
            "events": [
                {"logStreamName": "web-1", "timestamp": 1000, "message": "no id"},
                {"eventId": "e2", "logStreamName": "web-1", "timestamp": 1001, "message": "kept"}
            ]
        })))
        .mount(&server)
        .await;

    let page = source_for(&server).fetch(&request("/app")).await.unwrap();
    assert_eq!(page.events.len(), 1);
    assert_eq!(page.events[0].message, "kept");
}

#[tokio::test]
async fn test_service_error_is_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(400)
                .insert_header("content-type", AMZ_JSON)
                .set_body_string(
                    json!({
                        "__type": "ResourceNotFoundException",
                        "message": "The specified log group does not exist."
                    })
                    .to_string(),
                ),
        )
        .mount(&server)
        .await;

    let err = source_for(&server).fetch(&request("/missing")).await.unwrap_err();
    assert!(matches!(
        err,
        TailError::Upstream {
            operation: "filter_log_events",
            ..
        }
    ));
    assert!(!err.is_validation());
}

#[tokio::test]
async fn test_list_streams_pages_through_describe() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("x-amz-target", DESCRIBE_TARGET))
        .and(body_partial_json(json!({"nextToken": "page-2"})))
        .respond_with(json_response(json!({
            "logStreams": [
                {"logStreamName": "web-2", "creationTime": 10, "lastIngestionTime": 5000}
            ]
        })))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(header("x-amz-target", DESCRIBE_TARGET))
        .respond_with(json_response(json!({
            "logStreams": [
                {"logStreamName": "web-1", "creationTime": 10, "lastIngestionTime": 5000},
                {"logStreamName": "db-1", "creationTime": 10, "lastIngestionTime": 5000}
            ],
            "nextToken": "page-2"
        })))
        .mount(&server)
        .await;

    let source = source_for(&server);
    let first = source.list_streams("/app", None).await.unwrap();
    assert_eq!(first.streams.len(), 2);
    assert_eq!(first.streams[0].creation_time_ms, Some(10));
    assert_eq!(first.next_token.as_deref(), Some("page-2"));

    let streams = resolve_streams(&source, "/app", "web", None, None).await.unwrap();
    assert_eq!(streams, vec!["web-1".to_string(), "web-2".to_string()]);
}
