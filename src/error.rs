//! Error types shared by the spreadsheet client and the tool layer.
//!
//! Caller-input problems are detected before any remote call and map to
//! `invalid_params`. Remote failures keep the message returned by Google and
//! are surfaced without translation.

use rmcp::ErrorData;
use serde::Serialize;
use thiserror::Error;

/// Errors produced while serving a single tool invocation.
#[derive(Debug, Error)]
pub enum SheetsError {
    /// A required argument is missing or out of range.
    #[error("{0}")]
    InvalidArgument(String),
    #[error("spreadsheet not found: {0}")]
    SpreadsheetNotFound(String),
    #[error("worksheet not found: {0}")]
    WorksheetNotFound(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("rate limit exceeded: {0}")]
    RateLimited(String),
    /// Any other non-success response from the Google APIs.
    #[error("google api error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("http transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response payload: {0}")]
    Decode(String),
}

impl SheetsError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            SheetsError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            SheetsError::SpreadsheetNotFound(_) | SheetsError::WorksheetNotFound(_) => {
                ErrorCode::NotFound
            }
            SheetsError::PermissionDenied(_) => ErrorCode::PermissionDenied,
            SheetsError::RateLimited(_) => ErrorCode::RateLimited,
            SheetsError::Api { .. } | SheetsError::Decode(_) => ErrorCode::RemoteError,
            SheetsError::Auth(_) => ErrorCode::AuthError,
            SheetsError::Transport(_) => ErrorCode::TransportError,
        }
    }

    /// True when the error was raised before contacting Google.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, SheetsError::InvalidArgument(_))
    }
}

/// Coarse classification used for metrics labels and MCP error mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidArgument,
    NotFound,
    PermissionDenied,
    RateLimited,
    RemoteError,
    AuthError,
    TransportError,
    ToolDisabled,
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidArgument => "invalid_argument",
            ErrorCode::NotFound => "not_found",
            ErrorCode::PermissionDenied => "permission_denied",
            ErrorCode::RateLimited => "rate_limited",
            ErrorCode::RemoteError => "remote_error",
            ErrorCode::AuthError => "auth_error",
            ErrorCode::TransportError => "transport_error",
            ErrorCode::ToolDisabled => "tool_disabled",
            ErrorCode::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("tool '{tool_name}' is disabled by server configuration")]
pub struct ToolDisabledError {
    tool_name: String,
}

impl ToolDisabledError {
    pub fn new(tool_name: &str) -> Self {
        Self {
            tool_name: tool_name.to_ascii_lowercase(),
        }
    }
}

/// Classifies an error that crossed the `anyhow` boundary.
pub fn classify_error(error: &anyhow::Error) -> ErrorCode {
    if let Some(sheets) = error.downcast_ref::<SheetsError>() {
        sheets.code()
    } else if error.downcast_ref::<ToolDisabledError>().is_some() {
        ErrorCode::ToolDisabled
    } else {
        ErrorCode::Internal
    }
}

/// Maps an application error onto the MCP error channel.
///
/// The message is the error's own text; only the JSON-RPC code varies.
pub fn to_mcp_error(error: anyhow::Error) -> ErrorData {
    let message = error.to_string();
    match classify_error(&error) {
        ErrorCode::InvalidArgument => ErrorData::invalid_params(message, None),
        ErrorCode::ToolDisabled => ErrorData::invalid_request(message, None),
        ErrorCode::NotFound => ErrorData::resource_not_found(message, None),
        _ => ErrorData::internal_error(message, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::model::ErrorCode as McpCode;

    #[test]
    fn caller_errors_map_to_invalid_params() {
        let error = to_mcp_error(
            SheetsError::invalid_argument("Either spreadsheet_id or title must be provided.")
                .into(),
        );
        assert_eq!(error.code, McpCode::INVALID_PARAMS);
        assert_eq!(
            error.message,
            "Either spreadsheet_id or title must be provided."
        );
    }

    #[test]
    fn not_found_maps_to_resource_not_found() {
        let error = to_mcp_error(SheetsError::WorksheetNotFound("Sheet9".into()).into());
        assert_eq!(error.code, McpCode::RESOURCE_NOT_FOUND);
        assert!(error.message.contains("Sheet9"));
    }

    #[test]
    fn remote_errors_keep_message() {
        let error = to_mcp_error(
            SheetsError::Api {
                status: 500,
                message: "backend exploded".into(),
            }
            .into(),
        );
        assert_eq!(error.code, McpCode::INTERNAL_ERROR);
        assert!(error.message.contains("backend exploded"));
    }

    #[test]
    fn disabled_tools_map_to_invalid_request() {
        let error = to_mcp_error(ToolDisabledError::new("Del_Row").into());
        assert_eq!(error.code, McpCode::INVALID_REQUEST);
        assert!(error.message.contains("del_row"));
    }

    #[test]
    fn unknown_errors_are_internal() {
        assert_eq!(
            classify_error(&anyhow::anyhow!("boom")),
            ErrorCode::Internal
        );
    }
}
