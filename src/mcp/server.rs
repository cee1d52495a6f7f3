use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use rmcp::{
    ErrorData as McpError, ServerHandler, ServiceExt,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{CallToolResult, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use serde_json::{Map, Value};

use crate::{
    api::SubstackApi,
    config::Config,
    error::SubstackError,
    markdown::{
        MAX_TITLE_LEN, PostInput, append_content, build_post, derive_title, validate_fields,
    },
    post::{Audience, PostOptions, SubstackPost, parse_body, to_markdown},
};

use super::helpers::{
    api_error, confirmation_required, json_result, list_limit, parse_trigger_at,
};
use super::types::{
    CreateDraftParams, CreateDraftResult, DeleteDraftParams, DraftActionResult, DuplicatePostParams,
    ListDraftsParams, ListPublishedParams, PostContentResult, PostIdParams, PostListResult,
    PostSummary, PreviewResult, PublishDraftParams, ScheduleDraftParams, SectionsResult,
    SubscriberCountResult, UpdateDraftParams, UpdateDraftResult, UploadImageParams,
    UploadImageResult,
};

#[derive(Clone)]
pub struct SubstackMcpServer {
    api: Arc<SubstackApi>,
    user_id: Option<u64>,
    default_audience: Audience,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl SubstackMcpServer {
    pub fn new(api: SubstackApi, config: &Config) -> Self {
        Self {
            api: Arc::new(api),
            user_id: config.user_id,
            default_audience: config.default_audience,
            tool_router: Self::tool_router(),
        }
    }

    /// The client, logged in if it was not already.
    async fn session(&self) -> Result<&SubstackApi, McpError> {
        self.api
            .ensure_authenticated()
            .await
            .map_err(|e| api_error("Authentication failed", e))?;
        Ok(self.api.as_ref())
    }

    /// Create a draft from markdown or plain text
    #[tool(
        description = "Create a draft post on the Substack publication. `text` is markdown unless contentType is 'plain'. A '<!-- PAYWALL -->' line inserts a paywall. Returns the draft id and its editor URL."
    )]
    pub async fn create_draft_post(
        &self,
        params: Parameters<CreateDraftParams>,
    ) -> Result<CallToolResult, McpError> {
        let params = params.0;
        let user_id = self.user_id.ok_or_else(|| {
            McpError::internal_error(
                "No author configured: set 'userId' in .substackrc.json or SUBSTACK_USER_ID",
                None,
            )
        })?;

        let title = match params.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => derive_title(&params.text).ok_or_else(|| {
                McpError::invalid_params("Cannot derive a title from empty text", None)
            })?,
        };

        let input = PostInput {
            title: &title,
            subtitle: params.subtitle.as_deref(),
            body: &params.text,
            content_type: params.content_type.unwrap_or_default(),
            audience: params.audience,
        };
        let mut post = build_post(user_id, &input)
            .map_err(|e| McpError::invalid_params(format!("{:#}", e), None))?;
        if params.audience.is_none() && post.audience() == Audience::Everyone {
            post.set_audience(self.default_audience);
        }

        let api = self.session().await?;
        let created = api
            .post_draft(&post.get_draft())
            .await
            .map_err(|e| api_error("Failed to create draft", e))?;

        json_result(&CreateDraftResult {
            id: created.id,
            title,
            audience: post.audience(),
            edit_url: api.edit_url(created.id),
        })
    }

    /// Update title, subtitle or body of an existing post
    #[tool(
        description = "Update an existing draft or published post. Only the given fields change; `text` replaces the whole body. Published posts get their live title, subtitle and body updated."
    )]
    pub async fn update_draft(
        &self,
        params: Parameters<UpdateDraftParams>,
    ) -> Result<CallToolResult, McpError> {
        let params = params.0;
        validate_fields(
            params.title.as_deref(),
            params.subtitle.as_deref(),
            params.text.as_deref(),
        )
        .map_err(|e| McpError::invalid_params(e.to_string(), None))?;

        if params.title.is_none() && params.subtitle.is_none() && params.text.is_none() {
            return Err(McpError::invalid_params(
                "Nothing to update: give at least one of title, subtitle or text",
                None,
            ));
        }

        let api = self.session().await?;
        let current = api
            .get_draft(params.post_id)
            .await
            .map_err(|e| api_error("Failed to fetch post", e))?;
        // published posts keep their live fields apart from the draft ones
        let prefix = if current.is_published() { "" } else { "draft_" };

        let mut fields = Map::new();
        if let Some(title) = &params.title {
            fields.insert(format!("{}title", prefix), Value::String(title.trim().to_string()));
        }
        if let Some(subtitle) = &params.subtitle {
            fields.insert(format!("{}subtitle", prefix), Value::String(subtitle.clone()));
        }
        if let Some(text) = &params.text {
            let mut post = SubstackPost::new(self.user_id.unwrap_or_default(), PostOptions::default());
            append_content(
                &mut post,
                text,
                params.content_type.unwrap_or_default(),
                params.title.as_deref(),
            )
            .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
            let body = serde_json::to_string(post.body()).map_err(|e| {
                McpError::internal_error(format!("JSON serialization failed: {}", e), None)
            })?;
            fields.insert(format!("{}body", prefix), Value::String(body));
        }

        api.put_draft(params.post_id, &fields)
            .await
            .map_err(|e| api_error("Failed to update draft", e))?;
        tracing::info!(id = params.post_id, published = current.is_published(), "updated post");

        json_result(&UpdateDraftResult {
            id: params.post_id,
            updated_fields: fields.keys().cloned().collect(),
            edit_url: api.edit_url(params.post_id),
        })
    }

    /// Copy a post into a new draft
    #[tool(
        description = "Copy a draft or published post into a new draft with the same subtitle, audience and body. The title defaults to 'Copy of <original title>'."
    )]
    pub async fn duplicate_post(
        &self,
        params: Parameters<DuplicatePostParams>,
    ) -> Result<CallToolResult, McpError> {
        let params = params.0;
        let user_id = self.user_id.ok_or_else(|| {
            McpError::internal_error(
                "No author configured: set 'userId' in .substackrc.json or SUBSTACK_USER_ID",
                None,
            )
        })?;
        validate_fields(params.new_title.as_deref(), None, None)
            .map_err(|e| McpError::invalid_params(e.to_string(), None))?;

        let api = self.session().await?;
        let original = api
            .get_draft(params.post_id)
            .await
            .map_err(|e| api_error("Failed to fetch post", e))?;

        let title = match params.new_title.as_deref().map(str::trim) {
            Some(title) => title.to_string(),
            None => format!("Copy of {}", original.display_title())
                .chars()
                .take(MAX_TITLE_LEN)
                .collect(),
        };
        let audience = original
            .audience
            .as_deref()
            .and_then(|a| a.parse::<Audience>().ok())
            .unwrap_or_default();
        let subtitle = original.display_subtitle();

        let mut post = SubstackPost::new(
            user_id,
            PostOptions {
                title: Some(title.clone()),
                subtitle: (!subtitle.is_empty()).then(|| subtitle.to_string()),
                audience: Some(audience),
                ..Default::default()
            },
        );
        if let Some(body) = original.current_body() {
            match parse_body(body) {
                Some(doc) => {
                    post.set_body(doc);
                }
                // bodies that are not a document are kept as text
                None => {
                    if let Some(text) = body.as_str().filter(|t| !t.trim().is_empty()) {
                        post.paragraph(text);
                    }
                }
            }
        }

        let created = api
            .post_draft(&post.get_draft())
            .await
            .map_err(|e| api_error("Failed to create draft", e))?;
        tracing::info!(from = params.post_id, id = created.id, "duplicated post");

        json_result(&CreateDraftResult {
            id: created.id,
            title,
            audience,
            edit_url: api.edit_url(created.id),
        })
    }

    /// List drafts, optionally filtered by a search query
    #[tool(description = "List drafts of the publication, most relevant first. Optional search query; limit 1-25 (default 10).")]
    pub async fn list_drafts(
        &self,
        params: Parameters<ListDraftsParams>,
    ) -> Result<CallToolResult, McpError> {
        let limit = list_limit(params.0.limit)?;
        let api = self.session().await?;
        let drafts = api
            .get_drafts_limited(params.0.query.as_deref(), limit)
            .await
            .map_err(|e| api_error("Failed to list drafts", e))?;

        let items: Vec<PostSummary> = drafts
            .iter()
            .map(|d| PostSummary::from_record(d, api.edit_url(d.id)))
            .collect();
        json_result(&PostListResult {
            total_count: items.len(),
            items,
        })
    }

    /// List published posts, newest first
    #[tool(description = "List published posts, newest first. Limit 1-25 (default 10).")]
    pub async fn list_published(
        &self,
        params: Parameters<ListPublishedParams>,
    ) -> Result<CallToolResult, McpError> {
        let limit = list_limit(params.0.limit)?;
        let api = self.session().await?;
        let posts = api
            .get_published(limit)
            .await
            .map_err(|e| api_error("Failed to list published posts", e))?;

        let items: Vec<PostSummary> = posts
            .iter()
            .map(|p| PostSummary::from_record(p, api.edit_url(p.id)))
            .collect();
        json_result(&PostListResult {
            total_count: items.len(),
            items,
        })
    }

    /// Read a post back as markdown
    #[tool(description = "Get the title, status and body (as markdown) of a draft or published post.")]
    pub async fn get_post_content(
        &self,
        params: Parameters<PostIdParams>,
    ) -> Result<CallToolResult, McpError> {
        let api = self.session().await?;
        let record = api
            .get_draft(params.0.post_id)
            .await
            .map_err(|e| api_error("Failed to fetch post", e))?;

        let markdown = record
            .current_body()
            .and_then(parse_body)
            .map(|doc| to_markdown(&doc))
            .unwrap_or_default();
        let status = if record.is_published() { "published" } else { "draft" };

        json_result(&PostContentResult {
            id: record.id,
            title: record.display_title().to_string(),
            subtitle: record.display_subtitle().to_string(),
            status: status.to_string(),
            audience: record.audience.clone(),
            markdown,
        })
    }

    /// Delete a draft (requires confirm)
    #[tool(description = "Delete a draft. Irreversible: does nothing unless confirm is true.")]
    pub async fn delete_draft(
        &self,
        params: Parameters<DeleteDraftParams>,
    ) -> Result<CallToolResult, McpError> {
        let params = params.0;
        if !params.confirm {
            return json_result(&confirmation_required("delete", params.post_id));
        }

        let api = self.session().await?;
        api.delete_draft(params.post_id)
            .await
            .map_err(|e| api_error("Failed to delete draft", e))?;
        tracing::info!(id = params.post_id, "deleted draft");

        json_result(&DraftActionResult {
            id: params.post_id,
            action: "deleted".to_string(),
            url: None,
            trigger_at: None,
        })
    }

    /// Publish a draft (requires confirm)
    #[tool(
        description = "Publish a draft now, emailing subscribers unless send is false. Does nothing unless confirm is true."
    )]
    pub async fn publish_draft(
        &self,
        params: Parameters<PublishDraftParams>,
    ) -> Result<CallToolResult, McpError> {
        let params = params.0;
        if !params.confirm {
            return json_result(&confirmation_required("publish", params.post_id));
        }

        let api = self.session().await?;
        api.prepublish_draft(params.post_id)
            .await
            .map_err(|e| api_error("Draft failed prepublish checks", e))?;
        let published = api
            .publish_draft(params.post_id, params.send.unwrap_or(true), false)
            .await
            .map_err(|e| api_error("Failed to publish draft", e))?;

        let url = published
            .get("canonical_url")
            .and_then(Value::as_str)
            .map(str::to_string);
        json_result(&DraftActionResult {
            id: params.post_id,
            action: "published".to_string(),
            url,
            trigger_at: None,
        })
    }

    /// Schedule a draft for later release (requires confirm)
    #[tool(
        description = "Schedule a draft for release at triggerAt (RFC 3339, must be in the future). Does nothing unless confirm is true."
    )]
    pub async fn schedule_draft(
        &self,
        params: Parameters<ScheduleDraftParams>,
    ) -> Result<CallToolResult, McpError> {
        let params = params.0;
        let at = parse_trigger_at(&params.trigger_at, Utc::now())?;
        if !params.confirm {
            return json_result(&confirmation_required("schedule", params.post_id));
        }

        let api = self.session().await?;
        api.schedule_draft(params.post_id, at)
            .await
            .map_err(|e| api_error("Failed to schedule draft", e))?;

        json_result(&DraftActionResult {
            id: params.post_id,
            action: "scheduled".to_string(),
            url: None,
            trigger_at: Some(at.to_rfc3339()),
        })
    }

    /// Author preview link for a draft
    #[tool(description = "Get the author-only preview URL of a draft.")]
    pub async fn preview_draft(
        &self,
        params: Parameters<PostIdParams>,
    ) -> Result<CallToolResult, McpError> {
        let api = self.session().await?;
        let record = api
            .get_draft(params.0.post_id)
            .await
            .map_err(|e| api_error("Failed to fetch draft", e))?;

        json_result(&PreviewResult {
            id: record.id,
            preview_url: api.preview_url(record.id),
        })
    }

    /// Sections of the publication
    #[tool(description = "List the sections of the publication.")]
    pub async fn get_sections(&self) -> Result<CallToolResult, McpError> {
        let api = self.session().await?;
        let sections = api
            .get_sections()
            .await
            .map_err(|e| api_error("Failed to fetch sections", e))?;
        json_result(&SectionsResult { sections })
    }

    /// Subscriber count of the publication
    #[tool(description = "Get the publication's subscriber count.")]
    pub async fn get_subscriber_count(&self) -> Result<CallToolResult, McpError> {
        let api = self.session().await?;
        let subscriber_count = api
            .get_publication_subscriber_count()
            .await
            .map_err(|e| api_error("Failed to fetch subscriber count", e))?;
        json_result(&SubscriberCountResult { subscriber_count })
    }

    /// Upload a local image to the Substack CDN
    #[tool(
        description = "Upload a local image (jpg, png, gif, webp) to Substack and return its URL plus a markdown snippet."
    )]
    pub async fn upload_image(
        &self,
        params: Parameters<UploadImageParams>,
    ) -> Result<CallToolResult, McpError> {
        let path = Path::new(&params.0.path);
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .ok_or_else(|| McpError::invalid_params("path has no file name", None))?;
        let bytes = std::fs::read(path).map_err(|e| {
            McpError::invalid_params(format!("Failed to read {}: {}", path.display(), e), None)
        })?;

        let api = self.session().await?;
        let uploaded = api.upload_image(&bytes, &filename).await.map_err(|e| match e {
            SubstackError::UnsupportedImage(_) => McpError::invalid_params(e.to_string(), None),
            e => api_error("Failed to upload image", e),
        })?;

        json_result(&UploadImageResult {
            markdown: format!("![]({})", uploaded.url),
            url: uploaded.url,
            width: uploaded.image_width,
            height: uploaded.image_height,
        })
    }
}

#[tool_handler]
impl ServerHandler for SubstackMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Substack MCP lets you write and manage posts on one Substack publication.\n\n\
                 Available tools:\n\
                 1. create_draft_post - Create a draft from markdown or plain text\n\
                 2. update_draft - Change title, subtitle or body of a draft or published post\n\
                 3. duplicate_post - Copy a post into a new draft\n\
                 4. list_drafts - List drafts (optional search query)\n\
                 5. list_published - List published posts\n\
                 6. get_post_content - Read a post back as markdown\n\
                 7. preview_draft - Get the author preview URL of a draft\n\
                 8. delete_draft - Delete a draft (needs confirm: true)\n\
                 9. publish_draft - Publish a draft now (needs confirm: true)\n\
                 10. schedule_draft - Schedule a draft release (needs confirm: true)\n\
                 11. get_sections - List publication sections\n\
                 12. get_subscriber_count - Get the subscriber count\n\
                 13. upload_image - Upload a local image and get its URL\n\n\
                 Markdown notes: a line '<!-- PAYWALL -->' splits free and paid content,\n\
                 and a paragraph holding only an image becomes a captioned image.\n\n\
                 IMPORTANT: delete, publish and schedule are irreversible for readers.\n\
                 Call them without confirm first, show the user the warning, and only\n\
                 repeat with confirm: true once the user agreed."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

/// Entry point for the MCP server.
pub fn run_server(config: Config) -> Result<()> {
    let api = SubstackApi::new(config.api_config()?)?;
    tracing::info!(publication = api.publication_url(), "starting MCP server on stdio");

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(async {
            let service = SubstackMcpServer::new(api, &config);
            let server = service.serve(rmcp::transport::stdio()).await?;
            server.waiting().await?;
            Ok(())
        })
}
