//! `SubstackPost` assembles the draft document from simple append instructions.
//!
//! Every operation appends to the end of the document or modifies its last
//! block, mirroring how the Substack editor builds a post top to bottom.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Value, json};
use url::Url;

use super::node::{Audience, Content, Mark, MarkSpec, Node, TextChunk};
use crate::error::{BuilderError, SubstackError};

pub const DEFAULT_SUBSCRIBE_MESSAGE: &str = "Thanks for reading this newsletter!\nSubscribe for free to receive new posts and support my work.";

/// A publication section a post can be filed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Section {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Byline {
    pub id: u64,
    pub is_guest: bool,
}

/// Attributes of an `image2` node. Defaults match what the editor emits for a
/// freshly uploaded image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageAttrs {
    pub src: String,
    #[serde(default)]
    pub fullscreen: bool,
    #[serde(default = "default_image_size")]
    pub image_size: String,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_resize_width")]
    pub resize_width: u32,
    #[serde(default)]
    pub bytes: Option<u64>,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, rename = "type")]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub below_the_fold: bool,
    #[serde(default)]
    pub internal_redirect: Option<String>,
}

fn default_image_size() -> String {
    "normal".to_string()
}

fn default_height() -> u32 {
    819
}

fn default_width() -> u32 {
    1456
}

fn default_resize_width() -> u32 {
    728
}

impl ImageAttrs {
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            fullscreen: false,
            image_size: default_image_size(),
            height: default_height(),
            width: default_width(),
            resize_width: default_resize_width(),
            bytes: None,
            alt: None,
            title: None,
            mime_type: None,
            href: None,
            below_the_fold: false,
            internal_redirect: None,
        }
    }

    pub fn with_alt(mut self, alt: impl Into<String>) -> Self {
        self.alt = Some(alt.into());
        self
    }

    fn to_node(&self) -> Node {
        let attrs = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        };
        Node {
            kind: "image2".to_string(),
            attrs,
            ..Default::default()
        }
    }
}

/// A simplified block instruction consumed by [`SubstackPost::add`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BlockItem {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marks: Option<Vec<MarkSpec>>,
    /// Video id for `youtube2` blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    /// Caption for `subscribeWidget` blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Image attributes for `captionedImage` blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageAttrs>,
}

impl BlockItem {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Default::default()
        }
    }

    pub fn with_content(mut self, content: impl Into<Content>) -> Self {
        self.content = Some(content.into());
        self
    }
}

/// Request payload for creating a draft.
///
/// `draft_body` is sent as a JSON *string*, which is what the drafts endpoint
/// expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Draft {
    pub draft_title: Option<String>,
    pub draft_subtitle: Option<String>,
    #[serde(serialize_with = "serialize_as_json_string")]
    pub draft_body: Node,
    pub draft_bylines: Vec<Byline>,
    pub audience: Audience,
    pub draft_section_id: Option<u64>,
    pub section_chosen: bool,
    pub write_comment_permissions: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscriber_set_id: Option<u64>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub post_type: Option<String>,
}

fn serialize_as_json_string<S: Serializer>(node: &Node, serializer: S) -> Result<S::Ok, S::Error> {
    let body = serde_json::to_string(node).map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&body)
}

/// Options for [`SubstackPost::new`].
#[derive(Debug, Clone, Default)]
pub struct PostOptions {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub audience: Option<Audience>,
    pub write_comment_permissions: Option<String>,
    pub subscriber_set_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubstackPost {
    draft_title: Option<String>,
    draft_subtitle: Option<String>,
    draft_body: Node,
    draft_bylines: Vec<Byline>,
    audience: Audience,
    draft_section_id: Option<u64>,
    section_chosen: bool,
    write_comment_permissions: String,
    subscriber_set_id: Option<u64>,
    post_type: Option<String>,
}

impl SubstackPost {
    pub fn new(user_id: u64, options: PostOptions) -> Self {
        let audience = options.audience.unwrap_or_default();
        let write_comment_permissions = options
            .write_comment_permissions
            .unwrap_or_else(|| audience.as_str().to_string());
        let post_type = options
            .subscriber_set_id
            .map(|_| "adhoc_email".to_string());

        Self {
            draft_title: options.title,
            draft_subtitle: options.subtitle,
            draft_body: Node::doc(),
            draft_bylines: vec![Byline {
                id: user_id,
                is_guest: false,
            }],
            audience,
            draft_section_id: None,
            section_chosen: true,
            write_comment_permissions,
            subscriber_set_id: options.subscriber_set_id,
            post_type,
        }
    }

    /// Shorthand for a post with only a title.
    pub fn titled(user_id: u64, title: impl Into<String>) -> Self {
        Self::new(
            user_id,
            PostOptions {
                title: Some(title.into()),
                ..Default::default()
            },
        )
    }

    pub fn title(&self) -> Option<&str> {
        self.draft_title.as_deref()
    }

    pub fn subtitle(&self) -> Option<&str> {
        self.draft_subtitle.as_deref()
    }

    pub fn audience(&self) -> Audience {
        self.audience
    }

    pub fn body(&self) -> &Node {
        &self.draft_body
    }

    pub fn blocks(&self) -> &[Node] {
        self.draft_body.children()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks().is_empty()
    }

    pub fn section_id(&self) -> Option<u64> {
        self.draft_section_id
    }

    pub fn set_body(&mut self, body: Node) -> &mut Self {
        self.draft_body = body;
        self
    }

    pub fn set_title(&mut self, title: impl Into<String>) -> &mut Self {
        self.draft_title = Some(title.into());
        self
    }

    pub fn set_subtitle(&mut self, subtitle: impl Into<String>) -> &mut Self {
        self.draft_subtitle = Some(subtitle.into());
        self
    }

    pub fn set_audience(&mut self, audience: Audience) -> &mut Self {
        self.audience = audience;
        self
    }

    /// Files the post under the section called `name`.
    pub fn set_section(&mut self, name: &str, sections: &[Section]) -> Result<&mut Self, SubstackError> {
        let section = sections
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| SubstackError::SectionNotFound(name.to_string()))?;
        self.draft_section_id = Some(section.id);
        Ok(self)
    }

    /// Appends a block described by a simplified instruction.
    pub fn add(&mut self, item: BlockItem) -> Result<&mut Self, BuilderError> {
        self.push_item(&item);

        if let Some(marks) = &item.marks {
            self.marks(marks)?;
        }
        Ok(self)
    }

    fn push_item(&mut self, item: &BlockItem) {
        self.blocks_mut().push(Node::new(item.kind.as_str()));

        match item.kind.as_str() {
            "captionedImage" => {
                let attrs = item
                    .image
                    .clone()
                    .unwrap_or_else(|| ImageAttrs::new(item.src.clone().unwrap_or_default()));
                self.last_block().push_child(attrs.to_node());
            }
            "youtube2" => {
                let video_id = item.src.clone().unwrap_or_default();
                self.last_block().set_attr("videoId", video_id);
            }
            "subscribeWidget" => {
                self.apply_subscribe_caption(item.message.as_deref());
            }
            _ => {
                if let Some(content) = &item.content {
                    self.append_complex_text(content);
                }
            }
        }

        if item.kind == "heading" {
            self.last_block().set_attr("level", item.level.unwrap_or(1).clamp(1, 6));
        }
    }

    pub fn paragraph(&mut self, content: impl Into<Content>) -> &mut Self {
        self.push_item(&BlockItem::new("paragraph").with_content(content));
        self
    }

    pub fn empty_paragraph(&mut self) -> &mut Self {
        self.push_item(&BlockItem::new("paragraph"));
        self
    }

    pub fn heading(&mut self, content: impl Into<Content>, level: u8) -> &mut Self {
        let mut item = BlockItem::new("heading").with_content(content);
        item.level = Some(level);
        self.push_item(&item);
        self
    }

    pub fn horizontal_rule(&mut self) -> &mut Self {
        self.push_item(&BlockItem::new("horizontal_rule"));
        self
    }

    /// Appends a YouTube embed. `resource` is a watch URL, a `youtu.be` short
    /// link, or a bare video id.
    pub fn youtube_video(&mut self, resource: &str) -> Result<&mut Self, BuilderError> {
        let video_id = if resource.starts_with("http") {
            let url = Url::parse(resource).map_err(|e| BuilderError::InvalidUrl(e.to_string()))?;
            url.query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned())
                .unwrap_or_else(|| url.path().trim_start_matches('/').to_string())
        } else {
            resource.to_string()
        };

        let mut item = BlockItem::new("youtube2");
        item.src = Some(video_id);
        self.push_item(&item);
        Ok(self)
    }

    pub fn bullet_list<S: AsRef<str>>(&mut self, items: &[S]) -> &mut Self {
        let chunks: Vec<Vec<TextChunk>> = items
            .iter()
            .map(|item| vec![TextChunk::plain(item.as_ref())])
            .collect();
        self.rich_list(&chunks, None)
    }

    pub fn ordered_list<S: AsRef<str>>(&mut self, items: &[S]) -> &mut Self {
        let chunks: Vec<Vec<TextChunk>> = items
            .iter()
            .map(|item| vec![TextChunk::plain(item.as_ref())])
            .collect();
        self.rich_list(&chunks, Some(1))
    }

    /// Appends a list whose items carry marked text. `start` makes it an
    /// ordered list beginning at that number.
    pub fn rich_list(&mut self, items: &[Vec<TextChunk>], start: Option<u64>) -> &mut Self {
        let list_items = items
            .iter()
            .map(|chunks| {
                Node::new("list_item")
                    .with_content(vec![Node::new("paragraph").with_content(text_nodes(chunks))])
            })
            .collect();

        let list = match start {
            Some(start) => Node::new("ordered_list")
                .with_attr("start", start)
                .with_attr("order", start),
            None => Node::new("bullet_list"),
        };
        self.blocks_mut().push(list.with_content(list_items));
        self
    }

    pub fn italic(&mut self, text: &str) -> &mut Self {
        self.marked_paragraph(text, Mark::em())
    }

    pub fn bold(&mut self, text: &str) -> &mut Self {
        self.marked_paragraph(text, Mark::strong())
    }

    fn marked_paragraph(&mut self, text: &str, mark: Mark) -> &mut Self {
        let paragraph = Node::new("paragraph").with_content(vec![Node::text(text).with_marks(vec![mark])]);
        self.blocks_mut().push(paragraph);
        self
    }

    /// Appends a paragraph built from marked chunks.
    pub fn rich_paragraph(&mut self, chunks: &[TextChunk]) -> &mut Self {
        self.blocks_mut()
            .push(Node::new("paragraph").with_content(text_nodes(chunks)));
        self
    }

    pub fn blockquote(&mut self, chunks: &[TextChunk]) -> &mut Self {
        let quote = Node::new("blockquote")
            .with_content(vec![Node::new("paragraph").with_content(text_nodes(chunks))]);
        self.blocks_mut().push(quote);
        self
    }

    pub fn code_block(&mut self, code: &str, language: Option<&str>) -> &mut Self {
        let mut block = Node::new("code_block");
        if let Some(language) = language.filter(|l| !l.is_empty()) {
            block.set_attr("language", language);
        }
        if !code.is_empty() {
            block.push_child(Node::text(code));
        }
        self.blocks_mut().push(block);
        self
    }

    pub fn paywall(&mut self) -> &mut Self {
        self.blocks_mut().push(Node::new("paywall"));
        self
    }

    pub fn share_button(&mut self) -> &mut Self {
        self.custom_button("%%share_url%%", "Share")
    }

    pub fn comment_button(&mut self) -> &mut Self {
        self.custom_button("%%half_magic_comments_url%%", "Leave a comment")
    }

    pub fn custom_button(&mut self, url: &str, text: &str) -> &mut Self {
        let button = Node::new("button")
            .with_attr("url", url)
            .with_attr("text", text)
            .with_attr("action", Value::Null)
            .with_attr("class", "button-wrapper");
        self.blocks_mut().push(button);
        self
    }

    /// Button pointing at the publication's subscribe page.
    pub fn subscribe_button(&mut self, publication_url: &str, text: &str) -> &mut Self {
        let url = format!("{}/subscribe?", publication_url.trim_end_matches('/'));
        self.custom_button(&url, text)
    }

    /// Appends a `captionedImage` block holding the image and an optional caption.
    pub fn image(&mut self, attrs: ImageAttrs, caption: Option<&str>) -> &mut Self {
        let mut block = Node::new("captionedImage").with_content(vec![attrs.to_node()]);
        if let Some(caption) = caption.filter(|c| !c.is_empty()) {
            block.push_child(Node::new("caption").with_content(vec![Node::text(caption)]));
        }
        self.blocks_mut().push(block);
        self
    }

    /// Adds an `image2` node to the last block.
    pub fn captioned_image(&mut self, attrs: ImageAttrs) -> Result<&mut Self, BuilderError> {
        self.try_last_block()?.push_child(attrs.to_node());
        Ok(self)
    }

    /// Adds a text node to the last block.
    pub fn text(&mut self, value: &str) -> Result<&mut Self, BuilderError> {
        self.try_last_block()?.push_child(Node::text(value));
        Ok(self)
    }

    /// Adds marks to the last text node of the last block.
    pub fn marks(&mut self, marks: &[MarkSpec]) -> Result<&mut Self, BuilderError> {
        let block = self.try_last_block()?;
        let node = block
            .content
            .as_mut()
            .and_then(|content| content.last_mut())
            .ok_or(BuilderError::NoTextNode)?;

        let existing = node.marks.get_or_insert_with(Vec::new);
        existing.extend(marks.iter().map(Mark::from));
        Ok(self)
    }

    /// Drops the last block, returning it.
    pub fn remove_last_paragraph(&mut self) -> Option<Node> {
        self.blocks_mut().pop()
    }

    /// Turns the last block into a subscribe widget with a caption.
    pub fn subscribe_with_caption(&mut self, message: Option<&str>) -> Result<&mut Self, BuilderError> {
        self.try_last_block()?;
        self.apply_subscribe_caption(message);
        Ok(self)
    }

    fn apply_subscribe_caption(&mut self, message: Option<&str>) {
        let message = message.unwrap_or(DEFAULT_SUBSCRIBE_MESSAGE);
        let block = self.last_block();
        let attrs = json!({"url": "%%checkout_url%%", "text": "Subscribe", "language": "en"});
        if let Value::Object(map) = attrs {
            block.attrs = Some(map);
        }
        block.content = Some(vec![
            Node::new("ctaCaption").with_content(vec![Node::text(message)]),
        ]);
    }

    /// Sets the video id of the last block.
    pub fn youtube(&mut self, video_id: &str) -> Result<&mut Self, BuilderError> {
        self.try_last_block()?.set_attr("videoId", video_id);
        Ok(self)
    }

    /// The payload for the drafts endpoint.
    pub fn get_draft(&self) -> Draft {
        Draft {
            draft_title: self.draft_title.clone(),
            draft_subtitle: self.draft_subtitle.clone(),
            draft_body: self.draft_body.clone(),
            draft_bylines: self.draft_bylines.clone(),
            audience: self.audience,
            draft_section_id: self.draft_section_id,
            section_chosen: self.section_chosen,
            write_comment_permissions: self.write_comment_permissions.clone(),
            subscriber_set_id: self.subscriber_set_id,
            post_type: self.post_type.clone(),
        }
    }

    fn append_complex_text(&mut self, content: &Content) {
        let block = self.last_block();
        match content {
            Content::Plain(text) => block.push_child(Node::text(text.as_str())),
            Content::Chunks(chunks) => {
                for node in text_nodes(chunks) {
                    block.push_child(node);
                }
            }
        }
    }

    fn blocks_mut(&mut self) -> &mut Vec<Node> {
        self.draft_body.content.get_or_insert_with(Vec::new)
    }

    fn try_last_block(&mut self) -> Result<&mut Node, BuilderError> {
        self.blocks_mut().last_mut().ok_or(BuilderError::EmptyDocument)
    }

    // Only called right after a block was pushed.
    fn last_block(&mut self) -> &mut Node {
        let blocks = self.blocks_mut();
        if blocks.is_empty() {
            blocks.push(Node::new("paragraph"));
        }
        let last = blocks.len() - 1;
        &mut blocks[last]
    }
}

fn text_nodes(chunks: &[TextChunk]) -> Vec<Node> {
    chunks
        .iter()
        .filter(|chunk| !chunk.content.is_empty())
        .map(|chunk| Node::text(chunk.content.as_str()).with_marks(chunk.marks.iter().map(Mark::from).collect()))
        .collect()
}
