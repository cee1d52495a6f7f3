use pretty_assertions::assert_eq;
use rmcp::handler::server::wrapper::Parameters;
use serde_json::{Value, json};
use substack_mcp::{
    config::Config,
    markdown::ContentType,
    mcp::types::{CreateDraftParams, DuplicatePostParams, UpdateDraftParams},
    post::Audience,
};
use wiremock::{
    Mock, ResponseTemplate,
    matchers::{header, method, path},
};

use crate::{
    AUTH_COOKIE, McpTestFixture, USER_ID, block_types, draft_body, extract_tool_result_json,
    request_json,
};

fn create_params(text: &str) -> CreateDraftParams {
    CreateDraftParams {
        text: text.to_string(),
        title: None,
        subtitle: None,
        audience: None,
        content_type: None,
    }
}

// ============================================================================
// create_draft_post tests
// ============================================================================

#[tokio::test]
async fn test_create_draft_from_markdown() {
    let fixture = McpTestFixture::new().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/drafts"))
        .and(header("cookie", AUTH_COOKIE))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 101,
            "draft_title": "Hello"
        })))
        .expect(1)
        .mount(&fixture.mock)
        .await;

    let params = Parameters(CreateDraftParams {
        title: Some("Hello".to_string()),
        subtitle: Some("A first post".to_string()),
        ..create_params("Some **bold** words.\n\n- one\n- two\n\n---")
    });
    let result = fixture.server().create_draft_post(params).await.unwrap();
    let json_result = extract_tool_result_json(&result);

    assert_eq!(json_result["id"], 101);
    assert_eq!(json_result["title"], "Hello");
    assert_eq!(json_result["audience"], "everyone");
    assert_eq!(json_result["editUrl"], fixture.edit_url(101));

    let requests = fixture.requests_to("/api/v1/drafts").await;
    let payload = request_json(&requests[0]);
    assert_eq!(payload["draft_title"], "Hello");
    assert_eq!(payload["draft_subtitle"], "A first post");
    assert_eq!(payload["audience"], "everyone");
    assert_eq!(payload["section_chosen"], true);
    assert_eq!(
        payload["draft_bylines"],
        json!([{ "id": USER_ID, "is_guest": false }])
    );

    let doc = draft_body(&payload);
    assert_eq!(doc["type"], "doc");
    assert_eq!(
        block_types(&doc),
        vec!["paragraph", "bullet_list", "horizontal_rule"]
    );
    assert_eq!(doc["content"][0]["content"][1]["text"], "bold");
    assert_eq!(doc["content"][0]["content"][1]["marks"][0]["type"], "strong");
}

#[tokio::test]
async fn test_create_draft_derives_title_from_heading() {
    let fixture = McpTestFixture::new().await;
    fixture.respond("POST", "/api/v1/drafts", json!({ "id": 5 })).await;

    let params = Parameters(create_params("# My Essay\n\nFirst paragraph."));
    let result = fixture.server().create_draft_post(params).await.unwrap();
    let json_result = extract_tool_result_json(&result);
    assert_eq!(json_result["title"], "My Essay");

    let payload = request_json(&fixture.requests_to("/api/v1/drafts").await[0]);
    assert_eq!(payload["draft_title"], "My Essay");
    // the heading became the title and is not repeated in the body
    assert_eq!(block_types(&draft_body(&payload)), vec!["paragraph"]);
}

#[tokio::test]
async fn test_create_draft_paywall_restricts_audience() {
    let fixture = McpTestFixture::new().await;
    fixture.respond("POST", "/api/v1/drafts", json!({ "id": 6 })).await;

    let params = Parameters(CreateDraftParams {
        title: Some("Members".to_string()),
        ..create_params("Free part.\n\n<!-- PAYWALL -->\n\nPaid part.")
    });
    let result = fixture.server().create_draft_post(params).await.unwrap();
    let json_result = extract_tool_result_json(&result);
    assert_eq!(json_result["audience"], "only_paid");

    let payload = request_json(&fixture.requests_to("/api/v1/drafts").await[0]);
    assert_eq!(payload["audience"], "only_paid");
    assert_eq!(
        block_types(&draft_body(&payload)),
        vec!["paragraph", "paywall", "paragraph"]
    );
}

#[tokio::test]
async fn test_create_draft_uses_configured_default_audience() {
    let fixture = McpTestFixture::new().await;
    fixture.respond("POST", "/api/v1/drafts", json!({ "id": 7 })).await;

    let config = Config {
        default_audience: Audience::OnlyFree,
        ..fixture.config()
    };
    let params = Parameters(CreateDraftParams {
        title: Some("Free".to_string()),
        ..create_params("Body.")
    });
    let result = fixture.server_with(config).create_draft_post(params).await.unwrap();
    assert_eq!(extract_tool_result_json(&result)["audience"], "only_free");
}

#[tokio::test]
async fn test_create_draft_plain_text() {
    let fixture = McpTestFixture::new().await;
    fixture.respond("POST", "/api/v1/drafts", json!({ "id": 8 })).await;

    let params = Parameters(CreateDraftParams {
        title: Some("Plain".to_string()),
        content_type: Some(ContentType::Plain),
        ..create_params("# not a heading\n\nsecond *block*")
    });
    fixture.server().create_draft_post(params).await.unwrap();

    let payload = request_json(&fixture.requests_to("/api/v1/drafts").await[0]);
    let doc = draft_body(&payload);
    assert_eq!(block_types(&doc), vec!["paragraph", "paragraph"]);
    assert_eq!(doc["content"][0]["content"][0]["text"], "# not a heading");
}

#[tokio::test]
async fn test_create_draft_rejects_empty_text() {
    let fixture = McpTestFixture::new().await;

    let err = fixture
        .server()
        .create_draft_post(Parameters(create_params("   ")))
        .await
        .unwrap_err();
    assert!(err.message.contains("title"), "{}", err.message);
    assert!(fixture.requests_to("/api/v1/drafts").await.is_empty());
}

#[tokio::test]
async fn test_create_draft_rejects_html() {
    let fixture = McpTestFixture::new().await;

    let params = Parameters(CreateDraftParams {
        title: Some("Html".to_string()),
        content_type: Some(ContentType::Html),
        ..create_params("<p>hi</p>")
    });
    let err = fixture.server().create_draft_post(params).await.unwrap_err();
    assert!(err.message.contains("HTML"), "{}", err.message);
}

#[tokio::test]
async fn test_create_draft_rejects_long_title() {
    let fixture = McpTestFixture::new().await;

    let params = Parameters(CreateDraftParams {
        title: Some("x".repeat(281)),
        ..create_params("Body.")
    });
    let err = fixture.server().create_draft_post(params).await.unwrap_err();
    assert!(err.message.contains("280"), "{}", err.message);
}

#[tokio::test]
async fn test_create_draft_requires_user_id() {
    let fixture = McpTestFixture::new().await;
    let config = Config {
        user_id: None,
        ..fixture.config()
    };

    let params = Parameters(CreateDraftParams {
        title: Some("Anon".to_string()),
        ..create_params("Body.")
    });
    let err = fixture.server_with(config).create_draft_post(params).await.unwrap_err();
    assert!(err.message.contains("userId"), "{}", err.message);
}

#[tokio::test]
async fn test_create_draft_reports_api_errors() {
    let fixture = McpTestFixture::new().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/drafts"))
        .respond_with(ResponseTemplate::new(403).set_body_string("{\"error\":\"Forbidden\"}"))
        .mount(&fixture.mock)
        .await;

    let params = Parameters(CreateDraftParams {
        title: Some("Nope".to_string()),
        ..create_params("Body.")
    });
    let err = fixture.server().create_draft_post(params).await.unwrap_err();
    assert!(err.message.contains("403"), "{}", err.message);
}

// ============================================================================
// update_draft tests
// ============================================================================

/// The payload of the single `PUT` the mock received for `route`.
async fn put_payload(fixture: &McpTestFixture, route: &str) -> Value {
    let puts: Vec<_> = fixture
        .requests_to(route)
        .await
        .into_iter()
        .filter(|r| r.method.as_str() == "PUT")
        .collect();
    assert_eq!(puts.len(), 1);
    request_json(&puts[0])
}

#[tokio::test]
async fn test_update_draft_sends_only_given_fields() {
    let fixture = McpTestFixture::new().await;
    fixture.respond("GET", "/api/v1/drafts/9", json!({ "id": 9, "draft_title": "Old" })).await;
    fixture.respond("PUT", "/api/v1/drafts/9", json!({ "id": 9 })).await;

    let params = Parameters(UpdateDraftParams {
        post_id: 9,
        title: Some("New title".to_string()),
        subtitle: None,
        text: Some("Rewritten *body*.".to_string()),
        content_type: None,
    });
    let result = fixture.server().update_draft(params).await.unwrap();
    let json_result = extract_tool_result_json(&result);
    assert_eq!(json_result["id"], 9);
    assert_eq!(json_result["updatedFields"], json!(["draft_title", "draft_body"]));

    let payload = put_payload(&fixture, "/api/v1/drafts/9").await;
    assert_eq!(payload["draft_title"], "New title");
    assert!(payload.get("draft_subtitle").is_none());
    assert_eq!(block_types(&draft_body(&payload)), vec!["paragraph"]);
}

#[tokio::test]
async fn test_update_published_post_sends_live_fields() {
    let fixture = McpTestFixture::new().await;
    fixture
        .respond(
            "GET",
            "/api/v1/drafts/5",
            json!({ "id": 5, "title": "Live", "post_date": "2024-04-01T08:00:00.000Z" }),
        )
        .await;
    fixture.respond("PUT", "/api/v1/drafts/5", json!({ "id": 5 })).await;

    let params = Parameters(UpdateDraftParams {
        post_id: 5,
        title: Some("Fixed title".to_string()),
        subtitle: Some("Fixed subtitle".to_string()),
        text: Some("Corrected text.".to_string()),
        content_type: None,
    });
    let result = fixture.server().update_draft(params).await.unwrap();
    let json_result = extract_tool_result_json(&result);
    assert_eq!(json_result["updatedFields"], json!(["title", "subtitle", "body"]));

    let payload = put_payload(&fixture, "/api/v1/drafts/5").await;
    assert_eq!(payload["title"], "Fixed title");
    assert_eq!(payload["subtitle"], "Fixed subtitle");
    assert!(payload.get("draft_title").is_none());
    assert!(payload.get("draft_body").is_none());
    let body: Value = serde_json::from_str(payload["body"].as_str().unwrap()).unwrap();
    assert_eq!(block_types(&body), vec!["paragraph"]);
}

#[tokio::test]
async fn test_update_draft_needs_a_field() {
    let fixture = McpTestFixture::new().await;

    let params = Parameters(UpdateDraftParams {
        post_id: 9,
        title: None,
        subtitle: None,
        text: None,
        content_type: None,
    });
    let err = fixture.server().update_draft(params).await.unwrap_err();
    assert!(err.message.contains("Nothing to update"));
}

// ============================================================================
// duplicate_post tests
// ============================================================================

fn stored_post() -> Value {
    let body = json!({
        "type": "doc",
        "content": [
            {"type": "heading", "attrs": {"level": 2}, "content": [{"type": "text", "text": "Intro"}]},
            {"type": "paragraph", "content": [{"type": "text", "text": "Reusable text"}]}
        ]
    });
    json!({
        "id": 11,
        "draft_title": "Weekly notes",
        "draft_subtitle": "Issue 1",
        "audience": "only_paid",
        "draft_body": body.to_string()
    })
}

#[tokio::test]
async fn test_duplicate_post_copies_content() {
    let fixture = McpTestFixture::new().await;
    fixture.respond("GET", "/api/v1/drafts/11", stored_post()).await;
    Mock::given(method("POST"))
        .and(path("/api/v1/drafts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 12 })))
        .expect(1)
        .mount(&fixture.mock)
        .await;

    let params = Parameters(DuplicatePostParams {
        post_id: 11,
        new_title: None,
    });
    let result = fixture.server().duplicate_post(params).await.unwrap();
    let json_result = extract_tool_result_json(&result);
    assert_eq!(json_result["id"], 12);
    assert_eq!(json_result["title"], "Copy of Weekly notes");
    assert_eq!(json_result["audience"], "only_paid");
    assert_eq!(json_result["editUrl"], fixture.edit_url(12));

    let payload = request_json(&fixture.requests_to("/api/v1/drafts").await[0]);
    assert_eq!(payload["draft_title"], "Copy of Weekly notes");
    assert_eq!(payload["draft_subtitle"], "Issue 1");
    assert_eq!(payload["audience"], "only_paid");
    assert_eq!(payload["draft_bylines"][0]["id"], USER_ID);
    let body = draft_body(&payload);
    assert_eq!(block_types(&body), vec!["heading", "paragraph"]);
    assert_eq!(body["content"][1]["content"][0]["text"], "Reusable text");
}

#[tokio::test]
async fn test_duplicate_post_with_new_title() {
    let fixture = McpTestFixture::new().await;
    fixture.respond("GET", "/api/v1/drafts/11", stored_post()).await;
    fixture.respond("POST", "/api/v1/drafts", json!({ "id": 13 })).await;

    let params = Parameters(DuplicatePostParams {
        post_id: 11,
        new_title: Some("Weekly notes #2".to_string()),
    });
    let result = fixture.server().duplicate_post(params).await.unwrap();
    assert_eq!(extract_tool_result_json(&result)["title"], "Weekly notes #2");

    let payload = request_json(&fixture.requests_to("/api/v1/drafts").await[0]);
    assert_eq!(payload["draft_title"], "Weekly notes #2");
}

#[tokio::test]
async fn test_duplicate_missing_post_creates_nothing() {
    let fixture = McpTestFixture::new().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/drafts/404"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&fixture.mock)
        .await;

    let params = Parameters(DuplicatePostParams {
        post_id: 404,
        new_title: None,
    });
    let err = fixture.server().duplicate_post(params).await.unwrap_err();
    assert!(err.message.contains("404"), "{}", err.message);
    assert!(fixture.requests_to("/api/v1/drafts").await.is_empty());
}
