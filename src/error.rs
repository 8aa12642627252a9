//! Error types for the Store Greeter MCP server.

use thiserror::Error;

use crate::mcp::protocol::error_codes;

/// Result type alias for Store Greeter operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed underlying cause, kept for logging only.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Generic client-facing message for store search failures.
pub const UPSTREAM_CLIENT_MESSAGE: &str = "데이터베이스 조회 중 오류가 발생했습니다";

/// Generic client-facing message for unclassified failures.
pub const INTERNAL_CLIENT_MESSAGE: &str = "업체 조회 중 오류가 발생했습니다";

/// Main error type for the Store Greeter.
#[derive(Error, Debug)]
pub enum Error {
    // ===== Domain Errors =====
    #[error("{0}")]
    InvalidInput(String),

    #[error("'{query}'와 유사한 업체를 찾을 수 없습니다. (유사도 임계값: {threshold} 이상)")]
    NotFound { query: String, threshold: f64 },

    #[error("Upstream failure: {message}")]
    Upstream {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    // ===== MCP Errors =====
    #[error("Invalid session")]
    InvalidSession,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Tool already registered: {0}")]
    ToolAlreadyRegistered(String),

    #[error("Tool output does not match its schema: {0}")]
    SchemaViolation(String),

    // ===== Infrastructure Errors =====
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Timeout: operation timed out after {seconds} seconds")]
    Timeout { seconds: u64 },
}

/// The coarse classification every [`Error`] collapses into at the
/// protocol boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    UpstreamFailure,
    InternalUnexpected,
    /// Generated by the protocol layer itself; never reaches a tool.
    Protocol,
}

impl ErrorKind {
    /// Label used for logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::NotFound => "not_found",
            Self::UpstreamFailure => "upstream_failure",
            Self::InternalUnexpected => "internal_unexpected",
            Self::Protocol => "protocol",
        }
    }
}

impl Error {
    /// Create an upstream failure with the underlying cause attached.
    pub fn upstream(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Upstream {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create an internal error without a wrapped cause.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Upstream { .. } => ErrorKind::UpstreamFailure,
            Self::InvalidSession
            | Self::InvalidRequest(_)
            | Self::InvalidParams(_)
            | Self::MethodNotFound(_)
            | Self::ToolNotFound(_) => ErrorKind::Protocol,
            Self::Internal { .. }
            | Self::ToolAlreadyRegistered(_)
            | Self::SchemaViolation(_)
            | Self::Config(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Http(_)
            | Self::Timeout { .. } => ErrorKind::InternalUnexpected,
        }
    }

    /// JSON-RPC error code sent to the client.
    pub fn code(&self) -> i32 {
        match self.kind() {
            ErrorKind::InvalidInput | ErrorKind::NotFound => error_codes::INVALID_REQUEST,
            ErrorKind::UpstreamFailure | ErrorKind::InternalUnexpected => {
                error_codes::INTERNAL_ERROR
            }
            ErrorKind::Protocol => match self {
                Self::InvalidSession => error_codes::INVALID_SESSION,
                Self::MethodNotFound(_) => error_codes::METHOD_NOT_FOUND,
                Self::ToolNotFound(_) | Self::InvalidParams(_) => error_codes::INVALID_PARAMS,
                _ => error_codes::INVALID_REQUEST,
            },
        }
    }

    /// Message sent to the client. Upstream and internal failures are
    /// reduced to a fixed phrase; the detail stays in the logs.
    pub fn client_message(&self) -> String {
        match self.kind() {
            ErrorKind::UpstreamFailure => UPSTREAM_CLIENT_MESSAGE.to_string(),
            ErrorKind::InternalUnexpected => INTERNAL_CLIENT_MESSAGE.to_string(),
            ErrorKind::InvalidInput | ErrorKind::NotFound | ErrorKind::Protocol => {
                self.to_string()
            }
        }
    }
}
