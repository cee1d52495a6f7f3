use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use url::Url;

use super::types::{
    CategoryPage, ImageUpload, PostRecord, PostsPage, SubscribersPage, Subscriptions,
};
use crate::config::DEFAULT_BASE_URL;
use crate::error::{Result, SubstackError};
use crate::post::{Draft, Section};

pub const DRAFTS_PAGE_SIZE: usize = 25;
pub const SUBSCRIBERS_PAGE_SIZE: usize = 100;

const SUPPORTED_IMAGE_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
];

const USER_AGENT: &str = concat!("substack-mcp/", env!("CARGO_PKG_VERSION"));

// Error bodies can be whole HTML pages; keep messages readable.
const MAX_ERROR_BODY: usize = 500;

/// Connection settings for [`SubstackApi`].
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub email: Option<String>,
    pub password: Option<String>,
    pub base_url: Option<String>,
    pub publication_url: String,
    pub auth_token: Option<String>,
    pub auth_legacy_token: Option<String>,
    pub timeout: Duration,
}

impl ApiConfig {
    pub fn new(publication_url: impl Into<String>) -> Self {
        Self {
            email: None,
            password: None,
            base_url: None,
            publication_url: publication_url.into(),
            auth_token: None,
            auth_legacy_token: None,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_tokens(mut self, auth_token: impl Into<String>, legacy: Option<String>) -> Self {
        self.auth_token = Some(auth_token.into());
        self.auth_legacy_token = legacy;
        self
    }
}

#[derive(Debug, Default)]
struct Session {
    /// Raw `Set-Cookie` values from the first login attempt.
    login_cookies: Vec<String>,
    auth_cookie: Option<String>,
}

/// Client for Substack's private REST API.
///
/// Requests are sequential; list endpoints are paged by offset until a short
/// page comes back.
#[derive(Debug)]
pub struct SubstackApi {
    client: Client,
    email: Option<String>,
    password: Option<String>,
    base_url: String,
    publication_url: String,
    publication_api: String,
    publication_host: String,
    session: RwLock<Session>,
}

impl SubstackApi {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let publication = Url::parse(&config.publication_url)?;
        let publication_host = publication.host_str().unwrap_or_default().to_string();
        let publication_api = with_trailing_slash(publication).join("api/v1")?;
        let publication_url = config.publication_url.trim_end_matches('/').to_string();

        let base_url = config
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let auth_cookie = config.auth_token.as_ref().map(|token| {
            format!(
                "substack.sid={}; connect.sid={};",
                token,
                config.auth_legacy_token.as_deref().unwrap_or_default()
            )
        });

        let client = http_client(config.timeout, USER_AGENT);

        Ok(Self {
            client,
            email: config.email,
            password: config.password,
            base_url,
            publication_url,
            publication_api: publication_api.as_str().trim_end_matches('/').to_string(),
            publication_host,
            session: RwLock::new(Session {
                login_cookies: Vec::new(),
                auth_cookie,
            }),
        })
    }

    pub fn publication_url(&self) -> &str {
        &self.publication_url
    }

    pub fn publication_api(&self) -> &str {
        &self.publication_api
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Editor URL of a draft.
    pub fn edit_url(&self, draft_id: u64) -> String {
        format!("{}/publish/post/{}", self.publication_url, draft_id)
    }

    /// Author-only preview URL of a draft.
    pub fn preview_url(&self, draft_id: u64) -> String {
        format!(
            "{}?back=%2Fpublish%2Fposts%2Fdrafts",
            self.edit_url(draft_id)
        )
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth_cookie().is_some()
    }

    /// Decodes a response: 2xx bodies become JSON, anything else an error.
    pub async fn handle_response(response: Response) -> Result<Value> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(SubstackError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
                body: truncate(&body, MAX_ERROR_BODY),
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body)
            .map_err(|_| SubstackError::InvalidResponse(truncate(&body, MAX_ERROR_BODY)))
    }

    // ------------------------------------------------------------------
    // Authentication
    // ------------------------------------------------------------------

    fn login_body(&self) -> Value {
        json!({
            "captcha_response": null,
            "email": self.email,
            "for_pub": "",
            "password": self.password,
            "redirect": "/",
        })
    }

    /// First login attempt. Keeps the cookies Substack hands back so the
    /// second attempt can present them.
    pub async fn login(&self) -> Result<Value> {
        let url = format!("{}/login", self.base_url);
        tracing::debug!(%url, "logging in");

        let response = self.client.post(&url).json(&self.login_body()).send().await?;
        let cookies = set_cookies(&response);
        let body = Self::handle_response(response).await?;

        self.write_session().login_cookies = cookies;
        Ok(body)
    }

    /// Second login attempt carrying the first attempt's cookies; adopts the
    /// `substack.sid` cookie it returns.
    pub async fn second_attempt_login(&self) -> Result<Value> {
        let url = format!("{}/login", self.base_url);
        let cookie_header = self
            .read_session()
            .login_cookies
            .iter()
            .map(|cookie| cookie_pair(cookie).to_string())
            .collect::<Vec<_>>()
            .join("; ");

        let mut request = self.client.post(&url).json(&self.login_body());
        if !cookie_header.is_empty() {
            request = request.header(COOKIE, cookie_header);
        }
        let response = request.send().await?;
        let sid = set_cookies(&response)
            .into_iter()
            .find(|cookie| cookie.starts_with("substack.sid="));
        let body = Self::handle_response(response).await?;

        let sid = sid.ok_or_else(|| {
            SubstackError::Auth("login response did not set a substack.sid cookie".to_string())
        })?;
        self.write_session().auth_cookie = Some(cookie_pair(&sid).to_string());
        tracing::info!("logged in to Substack");
        Ok(body)
    }

    /// Makes sure a session cookie exists, logging in with email and password
    /// when no token was configured.
    pub async fn ensure_authenticated(&self) -> Result<()> {
        if self.is_authenticated() {
            return Ok(());
        }
        if self.email.is_none() || self.password.is_none() {
            return Err(SubstackError::Auth(
                "no session token and no email/password configured".to_string(),
            ));
        }
        self.login().await?;
        self.second_attempt_login().await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Subscribers and publication
    // ------------------------------------------------------------------

    /// All subscribers matching `filters`, newest first.
    pub async fn get_subscriber_by_filters(&self, filters: Map<String, Value>) -> Result<Vec<Value>> {
        let url = format!("{}/subscriber-stats", self.publication_api);
        let mut filters = filters;
        filters.insert(
            "order_by_desc_nulls_last".to_string(),
            Value::String("subscription_created_at".to_string()),
        );

        let mut subscribers = Vec::new();
        let mut offset = 0;
        loop {
            let body = json!({
                "filters": filters,
                "limit": SUBSCRIBERS_PAGE_SIZE,
                "offset": offset,
            });
            tracing::debug!(%url, offset, "fetching subscribers page");
            let page: SubscribersPage = decode(self.send(self.client.post(&url).json(&body)).await?)?;

            let count = page.subscribers.len();
            subscribers.extend(page.subscribers);
            offset += SUBSCRIBERS_PAGE_SIZE;
            if count != SUBSCRIBERS_PAGE_SIZE {
                break;
            }
        }
        Ok(subscribers)
    }

    pub async fn create_subscriber_set_for_email(&self, subscriber_ids: &[u64]) -> Result<Value> {
        let url = format!("{}/subscriber_set", self.publication_api);
        self.send(self.client.post(&url).json(&json!({ "user_ids": subscriber_ids })))
            .await
    }

    pub async fn get_publication_users(&self) -> Result<Value> {
        let url = format!("{}/publication/users", self.publication_api);
        self.send(self.client.get(&url)).await
    }

    /// The launch checklist, which carries the subscriber count.
    pub async fn get_publication_launch_checklist(&self) -> Result<Value> {
        let url = format!("{}/publication_launch_checklist", self.publication_api);
        self.send(self.client.get(&url)).await
    }

    pub async fn get_publication_subscriber_count(&self) -> Result<u64> {
        let checklist = self.get_publication_launch_checklist().await?;
        checklist
            .get("subscriberCount")
            .and_then(Value::as_u64)
            .ok_or_else(|| {
                SubstackError::InvalidResponse("launch checklist has no subscriberCount".to_string())
            })
    }

    pub async fn get_posts(&self) -> Result<Value> {
        let url = format!("{}/reader/posts", self.base_url);
        self.send(self.client.get(&url)).await
    }

    // ------------------------------------------------------------------
    // Drafts
    // ------------------------------------------------------------------

    async fn drafts_page(&self, query: Option<&str>, offset: usize) -> Result<Vec<PostRecord>> {
        let url = format!("{}/post_management/drafts", self.publication_api);
        let mut params: Vec<(&str, String)> = vec![
            ("order_by", "relevance".to_string()),
            ("order_direction", "desc".to_string()),
            ("limit", DRAFTS_PAGE_SIZE.to_string()),
            ("offset", offset.to_string()),
        ];
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            params.push(("query", query.to_string()));
        }

        tracing::debug!(%url, offset, "fetching drafts page");
        let page: PostsPage = decode(self.send(self.client.get(&url).query(&params)).await?)?;
        Ok(page.posts)
    }

    /// Every draft, optionally filtered by a search query.
    pub async fn get_drafts(&self, query: Option<&str>) -> Result<Vec<PostRecord>> {
        self.get_drafts_limited(query, usize::MAX).await
    }

    /// Drafts, stopping once `max` have been collected.
    pub async fn get_drafts_limited(&self, query: Option<&str>, max: usize) -> Result<Vec<PostRecord>> {
        let mut posts = Vec::new();
        let mut offset = 0;
        loop {
            let page = self.drafts_page(query, offset).await?;
            let count = page.len();
            posts.extend(page);
            offset += DRAFTS_PAGE_SIZE;
            if count != DRAFTS_PAGE_SIZE || posts.len() >= max {
                break;
            }
        }
        posts.truncate(max);
        Ok(posts)
    }

    /// Published posts, newest first.
    pub async fn get_published(&self, max: usize) -> Result<Vec<PostRecord>> {
        let url = format!("{}/post_management/published", self.publication_api);
        let mut posts = Vec::new();
        let mut offset = 0;
        loop {
            let params = [
                ("order_by", "post_date".to_string()),
                ("order_direction", "desc".to_string()),
                ("limit", DRAFTS_PAGE_SIZE.to_string()),
                ("offset", offset.to_string()),
            ];
            tracing::debug!(%url, offset, "fetching published page");
            let page: PostsPage = decode(self.send(self.client.get(&url).query(&params)).await?)?;

            let count = page.posts.len();
            posts.extend(page.posts);
            offset += DRAFTS_PAGE_SIZE;
            if count != DRAFTS_PAGE_SIZE || posts.len() >= max {
                break;
            }
        }
        posts.truncate(max);
        Ok(posts)
    }

    pub async fn get_draft(&self, draft_id: u64) -> Result<PostRecord> {
        let url = format!("{}/drafts/{}", self.publication_api, draft_id);
        decode(self.send(self.client.get(&url)).await?)
    }

    pub async fn delete_draft(&self, draft_id: u64) -> Result<Value> {
        let url = format!("{}/drafts/{}", self.publication_api, draft_id);
        self.send(self.client.delete(&url)).await
    }

    pub async fn post_draft(&self, draft: &Draft) -> Result<PostRecord> {
        let url = format!("{}/drafts", self.publication_api);
        let created: PostRecord = decode(self.send(self.client.post(&url).json(draft)).await?)?;
        tracing::info!(id = created.id, title = created.display_title(), "created draft");
        Ok(created)
    }

    /// Updates the given draft fields.
    pub async fn put_draft<B: Serialize + ?Sized>(&self, draft_id: u64, body: &B) -> Result<Value> {
        let url = format!("{}/drafts/{}", self.publication_api, draft_id);
        self.send(self.client.put(&url).json(body)).await
    }

    pub async fn prepublish_draft(&self, draft_id: u64) -> Result<Value> {
        let url = format!("{}/drafts/{}/prepublish", self.publication_api, draft_id);
        self.send(self.client.get(&url)).await
    }

    pub async fn publish_draft(&self, draft_id: u64, send: bool, share_automatically: bool) -> Result<Value> {
        let url = format!("{}/drafts/{}/publish", self.publication_api, draft_id);
        let body = json!({
            "send": send,
            "share_automatically": share_automatically,
        });
        let published = self.send(self.client.post(&url).json(&body)).await?;
        tracing::info!(draft_id, send, "published draft");
        Ok(published)
    }

    /// Schedules a draft for release to paid subscribers at `at`.
    pub async fn schedule_draft(&self, draft_id: u64, at: DateTime<Utc>) -> Result<Value> {
        self.put_draft(
            draft_id,
            &json!({
                "audience": "only_paid",
                "section_chosen": true,
                "should_send_email": true,
                "should_send_free_preview": true,
            }),
        )
        .await?;

        let url = format!("{}/drafts/{}/schedule", self.publication_api, draft_id);
        let body = json!({
            "share_automatically": false,
            "should_send_email": true,
        });
        self.send(self.client.post(&url).json(&body)).await?;

        let released = self.schedule_release(draft_id, at).await?;
        tracing::info!(draft_id, trigger_at = %at, "scheduled draft");
        Ok(released)
    }

    pub async fn schedule_release(&self, draft_id: u64, at: DateTime<Utc>) -> Result<Value> {
        let url = format!("{}/drafts/{}/scheduled_release", self.publication_api, draft_id);
        let body = json!({
            "email_audience": "only_paid",
            "post_audience": "only_paid",
            "share_automatically": false,
            "trigger_at": at.to_rfc3339_opts(SecondsFormat::Millis, true),
        });
        self.send(self.client.post(&url).json(&body)).await
    }

    pub async fn unschedule_draft(&self, draft_id: u64) -> Result<Value> {
        let url = format!("{}/drafts/{}/schedule", self.publication_api, draft_id);
        self.send(self.client.post(&url).json(&json!({ "post_date": null })))
            .await
    }

    /// Deletes drafts until none are left. Returns how many were deleted.
    pub async fn delete_all_drafts(&self) -> Result<usize> {
        let mut deleted = std::collections::HashSet::new();
        loop {
            let page = self.drafts_page(None, 0).await?;
            let pending: Vec<u64> = page
                .iter()
                .map(|draft| draft.id)
                .filter(|id| !deleted.contains(id))
                .collect();
            if pending.is_empty() {
                break;
            }
            for id in pending {
                self.delete_draft(id).await?;
                deleted.insert(id);
            }
        }
        tracing::info!(count = deleted.len(), "deleted all drafts");
        Ok(deleted.len())
    }

    // ------------------------------------------------------------------
    // Categories and sections
    // ------------------------------------------------------------------

    pub async fn get_categories(&self) -> Result<Value> {
        let url = format!("{}/categories", self.base_url);
        self.send(self.client.get(&url)).await
    }

    pub async fn get_category(&self, category_id: u64, category_type: &str, page: u32) -> Result<CategoryPage> {
        let url = format!("{}/category/public/{}/{}", self.base_url, category_id, category_type);
        decode(self.send(self.client.get(&url).query(&[("page", page)])).await?)
    }

    /// One category page when `page` is given; otherwise pages until the
    /// listing ends or `limit` publications were collected.
    pub async fn get_single_category(
        &self,
        category_id: u64,
        category_type: &str,
        page: Option<u32>,
        limit: Option<usize>,
    ) -> Result<CategoryPage> {
        if let Some(page) = page {
            return self.get_category(category_id, category_type, page).await;
        }

        let mut publications = Vec::new();
        let mut current_page = 0;
        loop {
            let output = self.get_category(category_id, category_type, current_page).await?;
            publications.extend(output.publications);
            current_page += 1;

            let reached_limit = limit.is_some_and(|limit| limit <= publications.len());
            if reached_limit || !output.more {
                break;
            }
        }
        if let Some(limit) = limit {
            publications.truncate(limit);
        }
        Ok(CategoryPage {
            publications,
            more: false,
        })
    }

    /// Sections of the configured publication.
    pub async fn get_sections(&self) -> Result<Vec<Section>> {
        let url = format!("{}/subscriptions", self.publication_api);
        let subscriptions: Subscriptions = decode(self.send(self.client.get(&url)).await?)?;
        Ok(subscriptions
            .publications
            .into_iter()
            .find(|p| p.matches_host(&self.publication_host))
            .map(|p| p.sections)
            .unwrap_or_default())
    }

    // ------------------------------------------------------------------
    // Images
    // ------------------------------------------------------------------

    /// Uploads an image to the Substack CDN.
    pub async fn upload_image(&self, bytes: &[u8], filename: &str) -> Result<ImageUpload> {
        let mime = image_mime_type(filename)?;
        let data_uri = format!("data:{};base64,{}", mime, BASE64.encode(bytes));
        let url = format!("{}/image", self.publication_api);

        let uploaded: ImageUpload =
            decode(self.send(self.client.post(&url).json(&json!({ "image": data_uri }))).await?)?;
        tracing::info!(url = %uploaded.url, filename, "uploaded image");
        Ok(uploaded)
    }

    // ------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------

    async fn send(&self, request: RequestBuilder) -> Result<Value> {
        let request = match self.auth_cookie() {
            Some(cookie) => request.header(COOKIE, cookie),
            None => request,
        };
        let response = request.send().await?;
        Self::handle_response(response).await
    }

    fn auth_cookie(&self) -> Option<String> {
        self.read_session().auth_cookie.clone()
    }

    fn read_session(&self) -> std::sync::RwLockReadGuard<'_, Session> {
        self.session.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_session(&self) -> std::sync::RwLockWriteGuard<'_, Session> {
        self.session.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| SubstackError::InvalidResponse(e.to_string()))
}

fn http_client(timeout: Duration, user_agent: &str) -> Client {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .user_agent(user_agent)
        .build()
        .unwrap_or_else(|err| {
            tracing::warn!(error = %err, "HTTP client setup failed, using defaults without timeouts");
            Client::new()
        })
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .map(str::to_string)
        .collect()
}

/// `name=value` part of a `Set-Cookie` header.
fn cookie_pair(cookie: &str) -> &str {
    cookie.split(';').next().unwrap_or(cookie).trim()
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(max).collect();
        cut.push('…');
        cut
    }
}

/// MIME type for a supported image file name.
pub fn image_mime_type(filename: &str) -> Result<&'static str> {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    SUPPORTED_IMAGE_TYPES
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, mime)| *mime)
        .ok_or_else(|| {
            SubstackError::UnsupportedImage(format!(
                "'{}' (supported: jpg, jpeg, png, gif, webp)",
                filename
            ))
        })
}
