//! Client for Substack's private REST API.
//!
//! ## Module Structure
//!
//! - `client`: `SubstackApi`, authentication and every endpoint wrapper
//! - `types`: response shapes

mod client;
pub mod types;

pub use client::{
    ApiConfig, DRAFTS_PAGE_SIZE, SUBSCRIBERS_PAGE_SIZE, SubstackApi, image_mime_type,
};
pub use types::{CategoryPage, ImageUpload, PostRecord};
