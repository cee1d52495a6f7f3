//! Draft documents in Substack's editor format.
//!
//! ## Module Structure
//!
//! - `node`: ProseMirror-style nodes, marks and audiences
//! - `builder`: `SubstackPost`, the append-only document builder
//! - `render`: stored document back to Markdown

mod builder;
mod node;
mod render;

pub use builder::{
    BlockItem, Byline, DEFAULT_SUBSCRIBE_MESSAGE, Draft, ImageAttrs, PostOptions, Section,
    SubstackPost,
};
pub use node::{Audience, Content, Mark, MarkSpec, Node, TextChunk};
pub use render::{parse_body, to_markdown};
