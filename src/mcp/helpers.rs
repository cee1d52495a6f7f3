//! Helper functions for MCP tool handlers.

use chrono::{DateTime, Utc};
use rmcp::ErrorData as McpError;
use rmcp::model::{CallToolResult, Content};
use serde::Serialize;

use crate::error::SubstackError;

use super::types::ConfirmationRequired;

pub const DEFAULT_LIST_LIMIT: u32 = 10;
pub const MAX_LIST_LIMIT: u32 = 25;

/// Serializes a tool result as pretty JSON text content.
pub fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json_str = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("JSON serialization failed: {}", e), None))?;
    Ok(CallToolResult::success(vec![Content::text(json_str)]))
}

pub fn api_error(context: &str, err: SubstackError) -> McpError {
    tracing::warn!(error = %err, "{}", context);
    McpError::internal_error(format!("{}: {}", context, err), None)
}

/// Clamps a list limit to 1..=25.
pub fn list_limit(limit: Option<u32>) -> Result<usize, McpError> {
    match limit {
        None => Ok(DEFAULT_LIST_LIMIT as usize),
        Some(0) => Err(McpError::invalid_params("limit must be at least 1", None)),
        Some(n) if n > MAX_LIST_LIMIT => Err(McpError::invalid_params(
            format!("limit must be {} or less", MAX_LIST_LIMIT),
            None,
        )),
        Some(n) => Ok(n as usize),
    }
}

/// The warning returned when a destructive tool is called without `confirm`.
pub fn confirmation_required(action: &str, post_id: u64) -> ConfirmationRequired {
    ConfirmationRequired {
        confirmed: false,
        warning: format!(
            "This will {} draft {}. Nothing was changed; call again with confirm: true to proceed.",
            action, post_id
        ),
    }
}

/// Parses an RFC 3339 release time that must lie after `now`.
pub fn parse_trigger_at(value: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, McpError> {
    let at = DateTime::parse_from_rfc3339(value)
        .map_err(|e| {
            McpError::invalid_params(format!("triggerAt is not RFC 3339 ('{}'): {}", value, e), None)
        })?
        .with_timezone(&Utc);
    if at <= now {
        return Err(McpError::invalid_params(
            format!("triggerAt must be in the future (got {})", value),
            None,
        ));
    }
    Ok(at)
}
