use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::api::PostRecord;
use crate::markdown::ContentType;
use crate::post::{Audience, Section};

// ============================================================
// Draft creation (create_draft_post, update_draft, duplicate_post)
// ============================================================

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateDraftParams {
    /// Post body. Markdown by default.
    pub text: String,
    /// Defaults to the first heading or first line of `text`.
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    /// everyone, only_paid, founding or only_free.
    #[serde(default)]
    pub audience: Option<Audience>,
    /// markdown (default) or plain.
    #[serde(default)]
    pub content_type: Option<ContentType>,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateDraftResult {
    pub id: u64,
    pub title: String,
    pub audience: Audience,
    pub edit_url: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDraftParams {
    pub post_id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    /// Replaces the whole body when given.
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub content_type: Option<ContentType>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DuplicatePostParams {
    pub post_id: u64,
    /// Defaults to "Copy of <original title>".
    #[serde(default)]
    pub new_title: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDraftResult {
    pub id: u64,
    /// Post fields that were sent.
    pub updated_fields: Vec<String>,
    pub edit_url: String,
}

// ============================================================
// Listing (list_drafts, list_published)
// ============================================================

#[derive(Debug, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListDraftsParams {
    /// Search text.
    #[serde(default)]
    pub query: Option<String>,
    /// 1 to 25, default 10.
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListPublishedParams {
    /// 1 to 25, default 10.
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    pub id: u64,
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub subtitle: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_date: Option<String>,
    pub edit_url: String,
}

impl PostSummary {
    pub fn from_record(record: &PostRecord, edit_url: String) -> Self {
        Self {
            id: record.id,
            title: record.display_title().to_string(),
            subtitle: record.display_subtitle().to_string(),
            audience: record.audience.clone(),
            updated_at: record.draft_updated_at.clone(),
            post_date: record.post_date.clone(),
            edit_url,
        }
    }
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostListResult {
    pub total_count: usize,
    pub items: Vec<PostSummary>,
}

// ============================================================
// Single post (get_post_content, preview_draft)
// ============================================================

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostIdParams {
    pub post_id: u64,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostContentResult {
    pub id: u64,
    pub title: String,
    pub subtitle: String,
    /// "draft" or "published".
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
    pub markdown: String,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResult {
    pub id: u64,
    pub preview_url: String,
}

// ============================================================
// Destructive operations (delete_draft, publish_draft, schedule_draft)
// ============================================================

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteDraftParams {
    pub post_id: u64,
    /// Must be true to actually delete.
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublishDraftParams {
    pub post_id: u64,
    /// Must be true to actually publish.
    #[serde(default)]
    pub confirm: bool,
    /// Email the post to subscribers. Default true.
    #[serde(default)]
    pub send: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleDraftParams {
    pub post_id: u64,
    /// Release time, RFC 3339 (e.g. 2026-01-31T09:00:00Z).
    pub trigger_at: String,
    /// Must be true to actually schedule.
    #[serde(default)]
    pub confirm: bool,
}

/// Returned instead of acting when `confirm` was not set.
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationRequired {
    pub confirmed: bool,
    pub warning: String,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DraftActionResult {
    pub id: u64,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_at: Option<String>,
}

// ============================================================
// Publication (get_sections, get_subscriber_count, upload_image)
// ============================================================

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SectionsResult {
    pub sections: Vec<Section>,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriberCountResult {
    pub subscriber_count: u64,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadImageParams {
    /// Local path of a jpg, png, gif or webp file.
    pub path: String,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadImageResult {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Ready to paste into a draft body.
    pub markdown: String,
}
