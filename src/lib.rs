//! substack-mcp - MCP server for drafting Substack posts
//!
//! Lets an LLM client create and manage drafts on a Substack publication
//! through the Model Context Protocol. Markdown is converted into Substack's
//! ProseMirror-style document tree and sent to Substack's private REST API.
//!
//! ## Module Structure
//!
//! - `api`: `SubstackApi` REST client and response types
//! - `cli`: Command-line interface (serve, init, drafts, sections)
//! - `config`: Configuration file loading and overrides
//! - `error`: Error types of the API client and document builder
//! - `logging`: tracing subscriber setup
//! - `markdown`: Markdown and plain text to `SubstackPost`
//! - `mcp`: Model Context Protocol server implementation
//! - `post`: `SubstackPost` document builder and markdown rendering

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod markdown;
pub mod mcp;
pub mod post;
