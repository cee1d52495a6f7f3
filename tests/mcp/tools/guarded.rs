//! Tools that change what readers see and therefore need `confirm: true`.

use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;
use rmcp::handler::server::wrapper::Parameters;
use serde_json::json;
use substack_mcp::mcp::types::{DeleteDraftParams, PublishDraftParams, ScheduleDraftParams};
use wiremock::{
    Mock, ResponseTemplate,
    matchers::{body_json, method, path},
};

use crate::{McpTestFixture, extract_tool_result_json, request_json};

// ============================================================================
// delete_draft tests
// ============================================================================

#[tokio::test]
async fn test_delete_without_confirm_changes_nothing() {
    let fixture = McpTestFixture::new().await;

    let params = Parameters(DeleteDraftParams {
        post_id: 21,
        confirm: false,
    });
    let result = fixture.server().delete_draft(params).await.unwrap();
    let json_result = extract_tool_result_json(&result);

    assert_eq!(json_result["confirmed"], false);
    assert!(json_result["warning"].as_str().unwrap().contains("delete draft 21"));
    assert!(fixture.mock.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_delete_with_confirm() {
    let fixture = McpTestFixture::new().await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/drafts/21"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&fixture.mock)
        .await;

    let params = Parameters(DeleteDraftParams {
        post_id: 21,
        confirm: true,
    });
    let result = fixture.server().delete_draft(params).await.unwrap();
    let json_result = extract_tool_result_json(&result);

    assert_eq!(json_result, json!({ "id": 21, "action": "deleted" }));
}

// ============================================================================
// publish_draft tests
// ============================================================================

#[tokio::test]
async fn test_publish_without_confirm_changes_nothing() {
    let fixture = McpTestFixture::new().await;

    let params = Parameters(PublishDraftParams {
        post_id: 22,
        confirm: false,
        send: None,
    });
    let result = fixture.server().publish_draft(params).await.unwrap();
    let json_result = extract_tool_result_json(&result);

    assert_eq!(json_result["confirmed"], false);
    assert!(fixture.mock.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_publish_with_confirm_runs_prepublish_then_publish() {
    let fixture = McpTestFixture::new().await;
    fixture
        .respond("GET", "/api/v1/drafts/22/prepublish", json!({ "errors": [] }))
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/drafts/22/publish"))
        .and(body_json(json!({ "send": false, "share_automatically": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 22,
            "canonical_url": "https://example.substack.com/p/live"
        })))
        .expect(1)
        .mount(&fixture.mock)
        .await;

    let params = Parameters(PublishDraftParams {
        post_id: 22,
        confirm: true,
        send: Some(false),
    });
    let result = fixture.server().publish_draft(params).await.unwrap();
    let json_result = extract_tool_result_json(&result);

    assert_eq!(json_result["action"], "published");
    assert_eq!(json_result["url"], "https://example.substack.com/p/live");
    assert_eq!(fixture.requests_to("/api/v1/drafts/22/prepublish").await.len(), 1);
}

// ============================================================================
// schedule_draft tests
// ============================================================================

#[tokio::test]
async fn test_schedule_with_confirm() {
    let fixture = McpTestFixture::new().await;
    fixture.respond("PUT", "/api/v1/drafts/23", json!({ "id": 23 })).await;
    fixture
        .respond("POST", "/api/v1/drafts/23/schedule", json!({}))
        .await;
    fixture
        .respond("POST", "/api/v1/drafts/23/scheduled_release", json!({ "id": 1 }))
        .await;

    let at = (Utc::now() + Duration::days(2)).format("%Y-%m-%dT%H:%M:%SZ").to_string();
    let params = Parameters(ScheduleDraftParams {
        post_id: 23,
        trigger_at: at.clone(),
        confirm: true,
    });
    let result = fixture.server().schedule_draft(params).await.unwrap();
    let json_result = extract_tool_result_json(&result);
    assert_eq!(json_result["action"], "scheduled");

    let put = request_json(&fixture.requests_to("/api/v1/drafts/23").await[0]);
    assert_eq!(put["audience"], "only_paid");
    assert_eq!(put["should_send_free_preview"], true);

    let schedule = request_json(&fixture.requests_to("/api/v1/drafts/23/schedule").await[0]);
    assert_eq!(
        schedule,
        json!({ "share_automatically": false, "should_send_email": true })
    );

    let release =
        request_json(&fixture.requests_to("/api/v1/drafts/23/scheduled_release").await[0]);
    assert_eq!(release["post_audience"], "only_paid");
    // RFC 3339 with milliseconds, as the editor sends it
    let trigger_at = release["trigger_at"].as_str().unwrap();
    assert_eq!(trigger_at, at.replace('Z', ".000Z"));
}

#[tokio::test]
async fn test_schedule_without_confirm_changes_nothing() {
    let fixture = McpTestFixture::new().await;

    let at = (Utc::now() + Duration::hours(5)).to_rfc3339();
    let params = Parameters(ScheduleDraftParams {
        post_id: 23,
        trigger_at: at,
        confirm: false,
    });
    let result = fixture.server().schedule_draft(params).await.unwrap();
    assert_eq!(extract_tool_result_json(&result)["confirmed"], false);
    assert!(fixture.mock.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_schedule_rejects_past_or_invalid_time() {
    let fixture = McpTestFixture::new().await;

    for trigger_at in ["2001-01-01T00:00:00Z", "next tuesday"] {
        let params = Parameters(ScheduleDraftParams {
            post_id: 23,
            trigger_at: trigger_at.to_string(),
            confirm: true,
        });
        let err = fixture.server().schedule_draft(params).await.unwrap_err();
        assert!(err.message.contains("triggerAt"), "{}", err.message);
    }
    assert!(fixture.mock.received_requests().await.unwrap_or_default().is_empty());
}
