//! Markdown to Substack document conversion.
//!
//! Markdown is parsed with pulldown-cmark and replayed onto a [`SubstackPost`].
//! A `<!-- PAYWALL -->` comment (any case, optional inner whitespace) marks
//! where free content ends.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use anyhow::{Result, bail};
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::post::{Audience, ImageAttrs, MarkSpec, PostOptions, SubstackPost, TextChunk};

pub const MAX_TITLE_LEN: usize = 280;

// Matches <!-- PAYWALL -->, <!--paywall--> and friends
static PAYWALL_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^<!--\s*paywall\s*-->$").unwrap());

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Markdown,
    Plain,
    Html,
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ContentType::Markdown => "markdown",
            ContentType::Plain => "plain",
            ContentType::Html => "html",
        })
    }
}

impl FromStr for ContentType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "markdown" => Ok(ContentType::Markdown),
            "plain" => Ok(ContentType::Plain),
            "html" => Ok(ContentType::Html),
            other => bail!("content_type must be one of: markdown, html, plain (got '{}')", other),
        }
    }
}

/// Everything needed to build a new draft from user text.
#[derive(Debug, Clone)]
pub struct PostInput<'a> {
    pub title: &'a str,
    pub subtitle: Option<&'a str>,
    pub body: &'a str,
    pub content_type: ContentType,
    pub audience: Option<Audience>,
}

/// Checks title, subtitle and body the way the Substack editor limits them.
pub fn validate_fields(title: Option<&str>, subtitle: Option<&str>, body: Option<&str>) -> Result<()> {
    if let Some(title) = title {
        if title.trim().is_empty() {
            bail!("Title must be a non-empty string");
        }
        if title.chars().count() > MAX_TITLE_LEN {
            bail!("Title must be {} characters or less", MAX_TITLE_LEN);
        }
    }
    if let Some(subtitle) = subtitle
        && subtitle.chars().count() > MAX_TITLE_LEN
    {
        bail!("Subtitle must be {} characters or less", MAX_TITLE_LEN);
    }
    if let Some(body) = body
        && body.trim().is_empty()
    {
        bail!("Content must be a non-empty string");
    }
    Ok(())
}

/// Builds a complete post from user text.
pub fn build_post(user_id: u64, input: &PostInput<'_>) -> Result<SubstackPost> {
    validate_fields(Some(input.title), input.subtitle, Some(input.body))?;

    let mut post = SubstackPost::new(
        user_id,
        PostOptions {
            title: Some(input.title.trim().to_string()),
            subtitle: input.subtitle.map(str::to_string),
            audience: input.audience,
            ..Default::default()
        },
    );

    let has_paywall = append_content(&mut post, input.body, input.content_type, Some(input.title))?;
    if has_paywall && input.audience.is_none() {
        post.set_audience(Audience::OnlyPaid);
    }
    Ok(post)
}

/// Appends converted content to `post`, returning whether a paywall marker was
/// found. A leading heading equal to `title` is dropped.
pub fn append_content(
    post: &mut SubstackPost,
    body: &str,
    content_type: ContentType,
    title: Option<&str>,
) -> Result<bool> {
    match content_type {
        ContentType::Markdown => Ok(MarkdownWriter::new(post, title).write(body)),
        ContentType::Plain => {
            append_plain(post, body);
            Ok(false)
        }
        ContentType::Html => bail!("HTML content is not supported; send markdown or plain text"),
    }
}

fn append_plain(post: &mut SubstackPost, body: &str) {
    let normalized = body.replace("\r\n", "\n");
    for block in normalized.split("\n\n") {
        let text = block
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if !text.is_empty() {
            post.paragraph(text);
        }
    }
}

/// Picks a title for text that came without one: the first heading, else the
/// first non-empty line, cut to the title limit.
pub fn derive_title(body: &str) -> Option<String> {
    let mut in_heading = false;
    let mut heading = String::new();
    for event in Parser::new(body) {
        match event {
            Event::Start(Tag::Heading { .. }) => in_heading = true,
            Event::End(TagEnd::Heading(_)) => {
                if !heading.trim().is_empty() {
                    return Some(truncate_title(heading.trim()));
                }
                in_heading = false;
            }
            Event::Text(text) | Event::Code(text) if in_heading => heading.push_str(&text),
            _ => {}
        }
    }

    body.lines()
        .map(|line| line.trim().trim_start_matches('#').trim())
        .find(|line| !line.is_empty())
        .map(truncate_title)
}

fn truncate_title(title: &str) -> String {
    title.chars().take(MAX_TITLE_LEN).collect()
}

struct ListFrame {
    start: Option<u64>,
    items: Vec<Vec<TextChunk>>,
    current: Option<Vec<TextChunk>>,
}

struct PendingImage {
    src: String,
    title: String,
    alt: String,
}

struct MarkdownWriter<'a> {
    post: &'a mut SubstackPost,
    title: Option<String>,
    wrote_block: bool,
    has_paywall: bool,
    marks: Vec<MarkSpec>,
    chunks: Vec<TextChunk>,
    images: Vec<PendingImage>,
    image: Option<PendingImage>,
    in_heading: bool,
    lists: Vec<ListFrame>,
    quote_depth: usize,
    quote: Vec<TextChunk>,
    code: Option<(Option<String>, String)>,
    paywall_after_block: bool,
}

impl<'a> MarkdownWriter<'a> {
    fn new(post: &'a mut SubstackPost, title: Option<&str>) -> Self {
        Self {
            post,
            title: title.map(|t| t.trim().to_lowercase()),
            wrote_block: false,
            has_paywall: false,
            marks: Vec::new(),
            chunks: Vec::new(),
            images: Vec::new(),
            image: None,
            in_heading: false,
            lists: Vec::new(),
            quote_depth: 0,
            quote: Vec::new(),
            code: None,
            paywall_after_block: false,
        }
    }

    fn write(mut self, markdown: &str) -> bool {
        let parser = Parser::new_ext(markdown, Options::ENABLE_STRIKETHROUGH);
        for event in parser {
            self.handle(event);
        }
        if self.paywall_after_block {
            self.post.paywall();
        }
        self.has_paywall
    }

    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => {
                if let Some((_, code)) = &mut self.code {
                    code.push_str(&text);
                } else if let Some(image) = &mut self.image {
                    image.alt.push_str(&text);
                } else {
                    self.push_text(&text, &[]);
                }
            }
            Event::Code(text) => self.push_text(&text, &[MarkSpec::new("code")]),
            Event::SoftBreak | Event::HardBreak => {
                if let Some(image) = &mut self.image {
                    image.alt.push(' ');
                } else {
                    self.push_text(" ", &[]);
                }
            }
            Event::Rule => {
                if self.in_container() {
                    tracing::debug!("dropping horizontal rule nested in a list or quote");
                } else {
                    self.post.horizontal_rule();
                    self.block_written();
                }
            }
            Event::Html(html) | Event::InlineHtml(html) => {
                if PAYWALL_MARKER.is_match(html.trim()) {
                    self.has_paywall = true;
                    if self.in_inline_context() {
                        self.paywall_after_block = true;
                    } else {
                        self.post.paywall();
                        self.block_written();
                    }
                }
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Emphasis => self.marks.push(MarkSpec::new("em")),
            Tag::Strong => self.marks.push(MarkSpec::new("strong")),
            Tag::Strikethrough => self.marks.push(MarkSpec::new("strikethrough")),
            Tag::Link { dest_url, .. } => self.marks.push(MarkSpec::link(dest_url.to_string())),
            Tag::Image { dest_url, title, .. } => {
                self.image = Some(PendingImage {
                    src: dest_url.to_string(),
                    title: title.to_string(),
                    alt: String::new(),
                });
            }
            Tag::Heading { .. } => self.in_heading = true,
            Tag::BlockQuote(_) => self.quote_depth += 1,
            Tag::List(start) => {
                // nested lists are flattened into their parent
                if let Some(parent) = self.lists.last_mut()
                    && let Some(mut item) = parent.current.take()
                {
                    append_with_space(&mut item, std::mem::take(&mut self.chunks));
                    if !item.is_empty() {
                        parent.items.push(item);
                    }
                }
                self.lists.push(ListFrame {
                    start,
                    items: Vec::new(),
                    current: None,
                });
            }
            Tag::Item => {
                if let Some(list) = self.lists.last_mut() {
                    list.current = Some(Vec::new());
                }
            }
            Tag::CodeBlock(kind) => {
                let language = match kind {
                    CodeBlockKind::Fenced(info) => info.split_whitespace().next().map(str::to_string),
                    CodeBlockKind::Indented => None,
                };
                self.code = Some((language, String::new()));
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough | TagEnd::Link => {
                self.marks.pop();
            }
            TagEnd::Image => self.finish_image(),
            TagEnd::Heading(level) => {
                self.in_heading = false;
                let chunks = std::mem::take(&mut self.chunks);
                if self.in_container() {
                    let strong = chunks
                        .into_iter()
                        .map(|mut chunk| {
                            chunk.marks.push(MarkSpec::new("strong"));
                            chunk
                        })
                        .collect();
                    self.fold_into_container(strong);
                    return;
                }

                let text: String = chunks.iter().map(|c| c.content.as_str()).collect();
                let duplicate_title = !self.wrote_block
                    && self
                        .title
                        .as_deref()
                        .is_some_and(|title| text.trim().to_lowercase() == title);
                if duplicate_title {
                    tracing::debug!(heading = %text.trim(), "dropping heading that repeats the title");
                } else if !chunks.is_empty() {
                    self.post.heading(chunks, level as u8);
                }
                self.block_written();
                self.flush_paywall();
            }
            TagEnd::Paragraph => self.finish_paragraph(),
            TagEnd::Item => {
                let chunks = std::mem::take(&mut self.chunks);
                if let Some(list) = self.lists.last_mut()
                    && let Some(mut item) = list.current.take()
                {
                    append_with_space(&mut item, chunks);
                    if !item.is_empty() {
                        list.items.push(item);
                    }
                }
            }
            TagEnd::List(_) => {
                let Some(frame) = self.lists.pop() else {
                    return;
                };
                if let Some(parent) = self.lists.last_mut() {
                    parent.items.extend(frame.items);
                    // text after the nested list starts a fresh item
                    parent.current = Some(Vec::new());
                } else if self.quote_depth > 0 {
                    for item in frame.items {
                        append_with_space(&mut self.quote, item);
                    }
                } else if !frame.items.is_empty() {
                    self.post.rich_list(&frame.items, frame.start);
                    self.block_written();
                    self.flush_paywall();
                }
            }
            TagEnd::BlockQuote(_) => {
                self.quote_depth = self.quote_depth.saturating_sub(1);
                if self.quote_depth == 0 && self.lists.is_empty() {
                    let quote = std::mem::take(&mut self.quote);
                    if !quote.is_empty() {
                        self.post.blockquote(&quote);
                        self.block_written();
                    }
                    self.flush_paywall();
                }
            }
            TagEnd::CodeBlock => {
                let Some((language, code)) = self.code.take() else {
                    return;
                };
                let code = code.trim_end_matches('\n');
                if self.in_container() {
                    let code = code.lines().map(str::trim_end).collect::<Vec<_>>().join(" ");
                    self.fold_into_container(vec![TextChunk::marked(code, vec![MarkSpec::new("code")])]);
                } else {
                    self.post.code_block(code, language.as_deref());
                    self.block_written();
                    self.flush_paywall();
                }
            }
            _ => {}
        }
    }

    fn finish_image(&mut self) {
        let Some(image) = self.image.take() else {
            return;
        };
        let standalone = !self.in_heading && !self.in_container();
        if standalone && self.chunks.iter().all(|c| c.content.trim().is_empty()) {
            self.images.push(image);
        } else {
            let alt = if image.alt.is_empty() { image.src.clone() } else { image.alt };
            self.push_text(&alt, &[MarkSpec::link(image.src)]);
        }
    }

    fn finish_paragraph(&mut self) {
        let chunks = std::mem::take(&mut self.chunks);
        let images = std::mem::take(&mut self.images);
        let only_images = chunks.iter().all(|c| c.content.trim().is_empty());

        if let Some(target) = self.container() {
            append_with_space(target, chunks);
            return;
        }

        if !images.is_empty() && only_images {
            for image in images {
                let mut attrs = ImageAttrs::new(image.src);
                if !image.alt.is_empty() {
                    attrs = attrs.with_alt(image.alt);
                }
                let caption = (!image.title.is_empty()).then_some(image.title.as_str());
                self.post.image(attrs, caption);
            }
            self.block_written();
        } else if !chunks.is_empty() {
            self.post.rich_paragraph(&chunks);
            self.block_written();
        }

        self.flush_paywall();
    }

    /// Text of the list item or quote currently being collected.
    fn container(&mut self) -> Option<&mut Vec<TextChunk>> {
        if let Some(list) = self.lists.last_mut() {
            return Some(list.current.get_or_insert_with(Vec::new));
        }
        (self.quote_depth > 0).then_some(&mut self.quote)
    }

    fn in_container(&self) -> bool {
        !self.lists.is_empty() || self.quote_depth > 0
    }

    /// Folds a block nested in a list item or quote into the container's
    /// text, after whatever inline text is still pending.
    fn fold_into_container(&mut self, block: Vec<TextChunk>) {
        let pending = std::mem::take(&mut self.chunks);
        if let Some(target) = self.container() {
            append_with_space(target, pending);
            append_with_space(target, block);
        }
    }

    fn flush_paywall(&mut self) {
        if self.paywall_after_block && !self.in_container() {
            self.paywall_after_block = false;
            self.post.paywall();
        }
    }

    fn push_text(&mut self, text: &str, extra: &[MarkSpec]) {
        let mut marks = self.marks.clone();
        marks.extend_from_slice(extra);
        self.chunks.push(TextChunk::marked(text, marks));
    }

    fn in_inline_context(&self) -> bool {
        !self.chunks.is_empty() || self.in_container()
    }

    fn block_written(&mut self) {
        self.wrote_block = true;
    }
}

fn append_with_space(target: &mut Vec<TextChunk>, mut chunks: Vec<TextChunk>) {
    if chunks.is_empty() {
        return;
    }
    if !target.is_empty() {
        target.push(TextChunk::plain(" "));
    }
    target.append(&mut chunks);
}
