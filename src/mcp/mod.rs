//! Model Context Protocol (MCP) server.
//!
//! Exposes draft creation and management on one Substack publication as MCP
//! tools over stdio.
//!
//! ## Module Structure
//!
//! - `helpers`: result serialization, limits and confirmation checks
//! - `server`: `SubstackMcpServer` and its tools
//! - `types`: tool parameters and results

mod helpers;
mod server;
pub mod types;

pub use server::{SubstackMcpServer, run_server};
