//! Renders a stored draft body back into Markdown for reading.

use serde_json::Value;

use super::node::{Mark, Node};

/// Parses a draft body as returned by the API. The drafts endpoints hand the
/// body back either as a JSON string or as an already decoded object.
pub fn parse_body(value: &Value) -> Option<Node> {
    match value {
        Value::String(raw) if !raw.trim().is_empty() => serde_json::from_str(raw).ok(),
        Value::Object(_) => serde_json::from_value(value.clone()).ok(),
        _ => None,
    }
}

/// Renders a document tree as Markdown.
pub fn to_markdown(doc: &Node) -> String {
    let blocks: Vec<String> = doc
        .children()
        .iter()
        .map(render_block)
        .filter(|block| !block.is_empty())
        .collect();
    blocks.join("\n\n")
}

fn render_block(node: &Node) -> String {
    match node.kind.as_str() {
        "heading" => {
            let level = node
                .attr("level")
                .and_then(Value::as_u64)
                .unwrap_or(1)
                .clamp(1, 6) as usize;
            format!("{} {}", "#".repeat(level), render_inline(node.children()))
        }
        "paragraph" => render_inline(node.children()),
        "horizontal_rule" => "---".to_string(),
        "paywall" => "<!-- PAYWALL -->".to_string(),
        "bullet_list" => render_list(node, None),
        "ordered_list" => {
            let start = node.attr("start").and_then(Value::as_u64).unwrap_or(1);
            render_list(node, Some(start))
        }
        "blockquote" => node
            .children()
            .iter()
            .map(render_block)
            .flat_map(|block| block.lines().map(|line| format!("> {}", line)).collect::<Vec<_>>())
            .collect::<Vec<_>>()
            .join("\n"),
        "code_block" => {
            let language = node.attr_str("language").unwrap_or_default();
            format!("```{}\n{}\n```", language, node.plain_text())
        }
        "captionedImage" => render_image(node),
        "image2" => render_image_node(node),
        "button" => {
            let text = node.attr_str("text").unwrap_or("Button");
            let url = node.attr_str("url").unwrap_or_default();
            format!("[{}]({})", text, url)
        }
        "youtube2" => match node.attr_str("videoId") {
            Some(id) => format!("[YouTube video](https://www.youtube.com/watch?v={})", id),
            None => String::new(),
        },
        "subscribeWidget" => node.plain_text(),
        _ => {
            if node.children().iter().all(Node::is_text) {
                render_inline(node.children())
            } else {
                node.children()
                    .iter()
                    .map(render_block)
                    .collect::<Vec<_>>()
                    .join("\n\n")
            }
        }
    }
}

fn render_list(node: &Node, start: Option<u64>) -> String {
    node.children()
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let marker = match start {
                Some(start) => format!("{}.", start + index as u64),
                None => "-".to_string(),
            };
            let body = item
                .children()
                .iter()
                .map(render_block)
                .collect::<Vec<_>>()
                .join(" ");
            format!("{} {}", marker, body)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_image(node: &Node) -> String {
    let mut parts = Vec::new();
    for child in node.children() {
        match child.kind.as_str() {
            "image2" => parts.push(render_image_node(child)),
            "caption" => parts.push(format!("*{}*", child.plain_text())),
            _ => {}
        }
    }
    parts.join("\n")
}

fn render_image_node(node: &Node) -> String {
    let src = node.attr_str("src").unwrap_or_default();
    let alt = node.attr_str("alt").unwrap_or_default();
    format!("![{}]({})", alt, src)
}

fn render_inline(nodes: &[Node]) -> String {
    nodes.iter().map(render_text).collect()
}

fn render_text(node: &Node) -> String {
    if node.kind == "hard_break" {
        return "\n".to_string();
    }
    if !node.is_text() {
        return node.plain_text();
    }

    let mut text = node.text.clone().unwrap_or_default();
    let Some(marks) = &node.marks else {
        return text;
    };

    for mark in marks {
        text = apply_mark(text, mark);
    }
    text
}

fn apply_mark(text: String, mark: &Mark) -> String {
    match mark.kind.as_str() {
        "strong" => format!("**{}**", text),
        "em" => format!("*{}*", text),
        "code" => format!("`{}`", text),
        "strikethrough" => format!("~~{}~~", text),
        "link" => match mark.href() {
            Some(href) => format!("[{}]({})", text, href),
            None => text,
        },
        _ => text,
    }
}
