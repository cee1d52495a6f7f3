//! Error types for the Substack API client and document builder.
//!
//! Library callers can match on these to decide what to report; application
//! code (CLI, config, converters) keeps using `anyhow::Result` for context chains.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SubstackError {
    #[error("SubstackRequestException: {0}")]
    Http(#[from] reqwest::Error),

    #[error("SubstackAPIException: {status} {reason}: {body}")]
    Status {
        status: u16,
        reason: String,
        body: String,
    },

    #[error("SubstackRequestException: Invalid Response: {0}")]
    InvalidResponse(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Section {0} does not exist")]
    SectionNotFound(String),

    #[error("unsupported image: {0}")]
    UnsupportedImage(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl SubstackError {
    /// True when Substack answered with the given HTTP status.
    pub fn is_status(&self, code: u16) -> bool {
        matches!(self, Self::Status { status, .. } if *status == code)
    }
}

/// Errors raised while building a document.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuilderError {
    #[error("document has no blocks to modify")]
    EmptyDocument,

    #[error("last block has no text node to mark")]
    NoTextNode,

    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

pub type Result<T, E = SubstackError> = std::result::Result<T, E>;
