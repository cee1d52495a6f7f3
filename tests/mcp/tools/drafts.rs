use pretty_assertions::assert_eq;
use rmcp::handler::server::wrapper::Parameters;
use serde_json::{Value, json};
use substack_mcp::mcp::types::{ListDraftsParams, ListPublishedParams, PostIdParams};
use wiremock::{
    Mock, ResponseTemplate,
    matchers::{method, path, query_param},
};

use crate::{McpTestFixture, extract_tool_result_json};

fn drafts(ids: std::ops::Range<u64>) -> Value {
    let posts: Vec<Value> = ids
        .map(|id| {
            json!({
                "id": id,
                "draft_title": format!("Draft {}", id),
                "draft_updated_at": "2024-05-01T10:00:00.000Z",
                "audience": "everyone"
            })
        })
        .collect();
    json!({ "posts": posts })
}

// ============================================================================
// list_drafts tests
// ============================================================================

#[tokio::test]
async fn test_list_drafts_with_query() {
    let fixture = McpTestFixture::new().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/post_management/drafts"))
        .and(query_param("query", "rust"))
        .and(query_param("offset", "0"))
        .and(query_param("limit", "25"))
        .and(query_param("order_by", "relevance"))
        .respond_with(ResponseTemplate::new(200).set_body_json(drafts(1..3)))
        .expect(1)
        .mount(&fixture.mock)
        .await;

    let params = Parameters(ListDraftsParams {
        query: Some("rust".to_string()),
        limit: None,
    });
    let result = fixture.server().list_drafts(params).await.unwrap();
    let json_result = extract_tool_result_json(&result);

    assert_eq!(json_result["totalCount"], 2);
    let items = json_result["items"].as_array().unwrap();
    assert_eq!(items[0]["id"], 1);
    assert_eq!(items[0]["title"], "Draft 1");
    assert_eq!(items[0]["updatedAt"], "2024-05-01T10:00:00.000Z");
    assert_eq!(items[1]["editUrl"], fixture.edit_url(2));
}

#[tokio::test]
async fn test_list_drafts_stops_at_limit() {
    let fixture = McpTestFixture::new().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/post_management/drafts"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(drafts(0..25)))
        .expect(1)
        .mount(&fixture.mock)
        .await;

    let params = Parameters(ListDraftsParams {
        query: None,
        limit: Some(5),
    });
    let result = fixture.server().list_drafts(params).await.unwrap();
    let json_result = extract_tool_result_json(&result);

    assert_eq!(json_result["totalCount"], 5);
    assert_eq!(json_result["items"][4]["id"], 4);
}

#[tokio::test]
async fn test_list_drafts_rejects_out_of_range_limit() {
    let fixture = McpTestFixture::new().await;

    for limit in [0, 26] {
        let params = Parameters(ListDraftsParams {
            query: None,
            limit: Some(limit),
        });
        let err = fixture.server().list_drafts(params).await.unwrap_err();
        assert!(err.message.contains("limit"), "{}", err.message);
    }
    assert!(fixture.requests_to("/api/v1/post_management/drafts").await.is_empty());
}

// ============================================================================
// list_published tests
// ============================================================================

#[tokio::test]
async fn test_list_published() {
    let fixture = McpTestFixture::new().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/post_management/published"))
        .and(query_param("order_by", "post_date"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "posts": [{
                "id": 3,
                "title": "Live post",
                "post_date": "2024-04-01T08:00:00.000Z"
            }]
        })))
        .mount(&fixture.mock)
        .await;

    let params = Parameters(ListPublishedParams { limit: Some(3) });
    let result = fixture.server().list_published(params).await.unwrap();
    let json_result = extract_tool_result_json(&result);

    assert_eq!(json_result["totalCount"], 1);
    assert_eq!(json_result["items"][0]["title"], "Live post");
    assert_eq!(json_result["items"][0]["postDate"], "2024-04-01T08:00:00.000Z");
}

// ============================================================================
// get_post_content / preview_draft tests
// ============================================================================

#[tokio::test]
async fn test_get_post_content_renders_markdown() {
    let fixture = McpTestFixture::new().await;
    let body = json!({
        "type": "doc",
        "content": [
            {"type": "heading", "attrs": {"level": 2}, "content": [{"type": "text", "text": "Intro"}]},
            {"type": "paragraph", "content": [
                {"type": "text", "text": "Hello "},
                {"type": "text", "text": "world", "marks": [{"type": "strong"}]}
            ]}
        ]
    });
    fixture
        .respond(
            "GET",
            "/api/v1/drafts/11",
            json!({
                "id": 11,
                "draft_title": "Stored",
                "draft_subtitle": "Sub",
                "audience": "only_paid",
                "draft_body": body.to_string()
            }),
        )
        .await;

    let result = fixture
        .server()
        .get_post_content(Parameters(PostIdParams { post_id: 11 }))
        .await
        .unwrap();
    let json_result = extract_tool_result_json(&result);

    assert_eq!(json_result["title"], "Stored");
    assert_eq!(json_result["subtitle"], "Sub");
    assert_eq!(json_result["status"], "draft");
    assert_eq!(json_result["audience"], "only_paid");
    let markdown = json_result["markdown"].as_str().unwrap();
    assert!(markdown.contains("## Intro"), "{}", markdown);
    assert!(markdown.contains("Hello **world**"), "{}", markdown);
}

#[tokio::test]
async fn test_get_post_content_missing_post() {
    let fixture = McpTestFixture::new().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/drafts/404"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&fixture.mock)
        .await;

    let err = fixture
        .server()
        .get_post_content(Parameters(PostIdParams { post_id: 404 }))
        .await
        .unwrap_err();
    assert!(err.message.contains("404"), "{}", err.message);
}

#[tokio::test]
async fn test_preview_draft_url() {
    let fixture = McpTestFixture::new().await;
    fixture
        .respond("GET", "/api/v1/drafts/12", json!({ "id": 12 }))
        .await;

    let result = fixture
        .server()
        .preview_draft(Parameters(PostIdParams { post_id: 12 }))
        .await
        .unwrap();
    let json_result = extract_tool_result_json(&result);

    assert_eq!(
        json_result["previewUrl"],
        format!(
            "{}?back=%2Fpublish%2Fposts%2Fdrafts",
            fixture.edit_url(12)
        )
    );
}
