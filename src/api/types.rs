//! Response shapes of the Substack API.
//!
//! The API is undocumented, so every field we do not rely on is optional and
//! unknown fields are kept in `extra` rather than dropped.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::post::Section;

/// A draft or published post as returned by the drafts endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub draft_title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub draft_subtitle: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub post_date: Option<String>,
    #[serde(default)]
    pub draft_updated_at: Option<String>,
    #[serde(default)]
    pub audience: Option<String>,
    #[serde(default)]
    pub body: Option<Value>,
    #[serde(default)]
    pub draft_body: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PostRecord {
    /// Draft title first, since that is what the editor shows.
    pub fn display_title(&self) -> &str {
        self.draft_title
            .as_deref()
            .filter(|t| !t.is_empty())
            .or(self.title.as_deref().filter(|t| !t.is_empty()))
            .unwrap_or("Untitled")
    }

    pub fn display_subtitle(&self) -> &str {
        self.draft_subtitle
            .as_deref()
            .filter(|t| !t.is_empty())
            .or(self.subtitle.as_deref())
            .unwrap_or_default()
    }

    pub fn is_published(&self) -> bool {
        self.post_date.is_some()
    }

    /// The body that is currently being edited.
    pub fn current_body(&self) -> Option<&Value> {
        self.draft_body
            .as_ref()
            .filter(|b| !b.is_null())
            .or(self.body.as_ref().filter(|b| !b.is_null()))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PostsPage {
    #[serde(default)]
    pub posts: Vec<PostRecord>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SubscribersPage {
    #[serde(default)]
    pub subscribers: Vec<Value>,
}

/// One page of a public category listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryPage {
    #[serde(default)]
    pub publications: Vec<Value>,
    #[serde(default)]
    pub more: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Subscriptions {
    #[serde(default)]
    pub publications: Vec<SubscribedPublication>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SubscribedPublication {
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub custom_domain: Option<String>,
    #[serde(default)]
    pub subdomain: Option<String>,
    #[serde(default)]
    pub sections: Vec<Section>,
}

impl SubscribedPublication {
    pub fn matches_host(&self, host: &str) -> bool {
        let by_subdomain = self
            .subdomain
            .as_deref()
            .map(|sub| format!("{}.substack.com", sub));
        [self.hostname.as_deref(), self.custom_domain.as_deref(), by_subdomain.as_deref()]
            .into_iter()
            .flatten()
            .any(|candidate| candidate.eq_ignore_ascii_case(host))
    }
}

/// Result of uploading an image to the Substack CDN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageUpload {
    pub url: String,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub bytes: Option<u64>,
    #[serde(default)]
    pub image_width: Option<u32>,
    #[serde(default)]
    pub image_height: Option<u32>,
}
