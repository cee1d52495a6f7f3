use serde_json::Value;
use substack_mcp::{api::SubstackApi, config::Config, mcp::SubstackMcpServer};
use wiremock::{
    Mock, MockServer, Request, ResponseTemplate,
    matchers::{method, path},
};

mod tools;

pub const USER_ID: u64 = 42;
pub const SID: &str = "sid-token";
pub const AUTH_COOKIE: &str = "substack.sid=sid-token; connect.sid=;";

/// Test fixture for MCP integration tests
///
/// Runs a mock Substack on localhost. The publication root and the global API
/// both live on the mock, so `/api/v1/...` serves either.
pub struct McpTestFixture {
    pub mock: MockServer,
}

impl McpTestFixture {
    pub async fn new() -> Self {
        Self {
            mock: MockServer::start().await,
        }
    }

    pub fn config(&self) -> Config {
        Config {
            publication_url: Some(self.mock.uri()),
            base_url: format!("{}/api/v1", self.mock.uri()),
            user_id: Some(USER_ID),
            auth_token: Some(SID.to_string()),
            ..Default::default()
        }
    }

    /// A server talking to the mock with the fixture config.
    pub fn server(&self) -> SubstackMcpServer {
        self.server_with(self.config())
    }

    pub fn server_with(&self, config: Config) -> SubstackMcpServer {
        let api = SubstackApi::new(config.api_config().unwrap()).unwrap();
        SubstackMcpServer::new(api, &config)
    }

    /// Answer `verb route` with `body`.
    pub async fn respond(&self, verb: &str, route: &str, body: Value) {
        Mock::given(method(verb))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.mock)
            .await;
    }

    /// Requests the mock received for `route`.
    pub async fn requests_to(&self, route: &str) -> Vec<Request> {
        self.mock
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.url.path() == route)
            .collect()
    }

    pub fn edit_url(&self, id: u64) -> String {
        format!("{}/publish/post/{}", self.mock.uri(), id)
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Extract JSON value from a successful CallToolResult
///
/// Panics if the result indicates an error or cannot be parsed
pub fn extract_tool_result_json(result: &rmcp::model::CallToolResult) -> Value {
    if let Some(true) = result.is_error {
        panic!("Tool call returned an error: {:?}", result);
    }

    assert!(
        !result.content.is_empty(),
        "Tool result should have content"
    );

    let text_content = result.content[0]
        .as_text()
        .expect("Tool result content should be text");

    serde_json::from_str(&text_content.text).expect("Tool result should be valid JSON")
}

/// The JSON body of a recorded request.
pub fn request_json(request: &Request) -> Value {
    serde_json::from_slice(&request.body).expect("request body should be JSON")
}

/// The document tree inside a draft payload, whose `draft_body` is a JSON string.
pub fn draft_body(payload: &Value) -> Value {
    let body = payload["draft_body"]
        .as_str()
        .expect("draft_body should be a JSON string");
    serde_json::from_str(body).expect("draft_body should hold JSON")
}

/// Types of the top-level blocks of a document.
pub fn block_types(doc: &Value) -> Vec<String> {
    doc["content"]
        .as_array()
        .map(|blocks| {
            blocks
                .iter()
                .filter_map(|b| b["type"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
