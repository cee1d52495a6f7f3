//! ProseMirror-style nodes as stored by the Substack editor.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single node of the draft document tree.
///
/// Absent fields are omitted on serialization so the output matches what the
/// editor itself sends (`{"type":"horizontal_rule"}`, not a node full of nulls).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<Node>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marks: Option<Vec<Mark>>,
}

impl Node {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Default::default()
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self {
            kind: "text".to_string(),
            text: Some(value.into()),
            ..Default::default()
        }
    }

    /// An empty `doc` root.
    pub fn doc() -> Self {
        Self {
            kind: "doc".to_string(),
            content: Some(Vec::new()),
            ..Default::default()
        }
    }

    pub fn with_content(mut self, content: Vec<Node>) -> Self {
        self.content = Some(content);
        self
    }

    pub fn with_marks(mut self, marks: Vec<Mark>) -> Self {
        if !marks.is_empty() {
            self.marks = Some(marks);
        }
        self
    }

    pub fn with_attr(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set_attr(key, value);
        self
    }

    pub fn set_attr(&mut self, key: &str, value: impl Into<Value>) {
        self.attrs
            .get_or_insert_with(Map::new)
            .insert(key.to_string(), value.into());
    }

    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.attrs.as_ref().and_then(|attrs| attrs.get(key))
    }

    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attr(key).and_then(Value::as_str)
    }

    pub fn children(&self) -> &[Node] {
        self.content.as_deref().unwrap_or_default()
    }

    pub fn push_child(&mut self, child: Node) {
        self.content.get_or_insert_with(Vec::new).push(child);
    }

    pub fn is_text(&self) -> bool {
        self.kind == "text"
    }

    /// Concatenated text of this node and all its descendants.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if let Some(text) = &self.text {
            out.push_str(text);
        }
        for child in self.children() {
            child.collect_text(out);
        }
    }
}

/// An inline mark applied to a text node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Map<String, Value>>,
}

impl Mark {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attrs: None,
        }
    }

    pub fn strong() -> Self {
        Self::new("strong")
    }

    pub fn em() -> Self {
        Self::new("em")
    }

    pub fn code() -> Self {
        Self::new("code")
    }

    pub fn strikethrough() -> Self {
        Self::new("strikethrough")
    }

    pub fn link(href: impl Into<String>) -> Self {
        let mut attrs = Map::new();
        attrs.insert("href".to_string(), Value::String(href.into()));
        Self {
            kind: "link".to_string(),
            attrs: Some(attrs),
        }
    }

    pub fn href(&self) -> Option<&str> {
        self.attrs
            .as_ref()
            .and_then(|attrs| attrs.get("href"))
            .and_then(Value::as_str)
    }
}

/// Simplified mark instruction: `{"type": "link", "href": "..."}`.
///
/// Links may also carry `target`, `rel` and `class`; each is only emitted
/// when set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MarkSpec {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
}

impl MarkSpec {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            href: None,
            target: None,
            rel: None,
            class: None,
        }
    }

    pub fn link(href: impl Into<String>) -> Self {
        Self {
            href: Some(href.into()),
            ..Self::new("link")
        }
    }

    /// Link that opens in a new tab.
    pub fn external_link(href: impl Into<String>) -> Self {
        Self {
            target: Some("_blank".to_string()),
            rel: Some("noopener noreferrer nofollow".to_string()),
            ..Self::link(href)
        }
    }
}

impl From<&MarkSpec> for Mark {
    fn from(spec: &MarkSpec) -> Self {
        if spec.kind != "link" {
            return Mark::new(spec.kind.clone());
        }

        // href may be missing; the editor still expects the attrs object
        let mut attrs = Map::new();
        attrs.insert(
            "href".to_string(),
            spec.href.clone().map_or(Value::Null, Value::String),
        );
        for (key, value) in [("target", &spec.target), ("rel", &spec.rel), ("class", &spec.class)] {
            if let Some(value) = value {
                attrs.insert(key.to_string(), Value::String(value.clone()));
            }
        }
        Mark {
            kind: spec.kind.clone(),
            attrs: Some(attrs),
        }
    }
}

/// One run of text with its marks, as used by "complex text" content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TextChunk {
    pub content: String,
    #[serde(default)]
    pub marks: Vec<MarkSpec>,
}

impl TextChunk {
    pub fn plain(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            marks: Vec::new(),
        }
    }

    pub fn marked(content: impl Into<String>, marks: Vec<MarkSpec>) -> Self {
        Self {
            content: content.into(),
            marks,
        }
    }
}

/// Text content of a block: a plain string or a sequence of marked chunks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Content {
    Plain(String),
    Chunks(Vec<TextChunk>),
}

impl From<&str> for Content {
    fn from(value: &str) -> Self {
        Content::Plain(value.to_string())
    }
}

impl From<String> for Content {
    fn from(value: String) -> Self {
        Content::Plain(value)
    }
}

impl From<Vec<TextChunk>> for Content {
    fn from(value: Vec<TextChunk>) -> Self {
        Content::Chunks(value)
    }
}

/// Who can read a post (and, by default, who can comment on it).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    #[default]
    Everyone,
    OnlyPaid,
    Founding,
    OnlyFree,
}

impl Audience {
    pub fn as_str(&self) -> &'static str {
        match self {
            Audience::Everyone => "everyone",
            Audience::OnlyPaid => "only_paid",
            Audience::Founding => "founding",
            Audience::OnlyFree => "only_free",
        }
    }
}

impl fmt::Display for Audience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Audience {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "everyone" => Ok(Audience::Everyone),
            "only_paid" => Ok(Audience::OnlyPaid),
            "founding" => Ok(Audience::Founding),
            "only_free" => Ok(Audience::OnlyFree),
            other => Err(format!(
                "unknown audience '{}', expected one of: everyone, only_paid, founding, only_free",
                other
            )),
        }
    }
}
