//! Caller-facing error taxonomy.
//!
//! # Responsibilities
//! - Classify every failure with an `ErrorCode`
//! - Carry message, details and the envelope request ID
//! - Derive the auth flag from the code
//!
//! # Design Decisions
//! - `AppError` is the only error a caller of the client ever sees
//! - Fields are private; an error is immutable once built
//! - Backend codes the relay does not know round-trip through `Business`

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure classification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ErrorCode {
    /// Timeouts and transport faults.
    NetworkError,
    /// A thrown value that could not be classified.
    UnknownError,
    /// Credential missing or rejected.
    Unauthorized,
    /// Credential expired.
    TokenExpired,
    /// Backend-defined code (validation, not-found, ...).
    Business(String),
}

impl ErrorCode {
    /// Wire representation.
    pub fn as_str(&self) -> &str {
        match self {
            ErrorCode::NetworkError => "NETWORK_ERROR",
            ErrorCode::UnknownError => "UNKNOWN_ERROR",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::TokenExpired => "TOKEN_EXPIRED",
            ErrorCode::Business(code) => code,
        }
    }

    /// True for the codes that trigger a credential refresh.
    pub fn is_auth(&self) -> bool {
        matches!(self, ErrorCode::Unauthorized | ErrorCode::TokenExpired)
    }
}

impl From<&str> for ErrorCode {
    fn from(code: &str) -> Self {
        match code {
            "NETWORK_ERROR" => ErrorCode::NetworkError,
            "UNKNOWN_ERROR" => ErrorCode::UnknownError,
            "UNAUTHORIZED" => ErrorCode::Unauthorized,
            "TOKEN_EXPIRED" => ErrorCode::TokenExpired,
            other => ErrorCode::Business(other.to_string()),
        }
    }
}

impl From<String> for ErrorCode {
    fn from(code: String) -> Self {
        ErrorCode::from(code.as_str())
    }
}

impl From<ErrorCode> for String {
    fn from(code: ErrorCode) -> Self {
        code.as_str().to_string()
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform failure surfaced by the command client.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("[{code}] {message}")]
pub struct AppError {
    code: ErrorCode,
    message: String,
    details: Option<String>,
    request_id: Option<String>,
}

impl AppError {
    /// Failure reported by the backend inside a `success: false` envelope.
    pub fn from_envelope(
        code: impl Into<ErrorCode>,
        message: impl Into<String>,
        details: Option<String>,
        request_id: Option<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details,
            request_id,
        }
    }

    /// Transport-level fault (connection, I/O, timeout).
    pub fn network(message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            code: ErrorCode::NetworkError,
            message: message.into(),
            details,
            request_id: None,
        }
    }

    /// Anything that is not an error value, stringified.
    pub fn unknown(message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            code: ErrorCode::UnknownError,
            message: message.into(),
            details,
            request_id: None,
        }
    }

    pub fn code(&self) -> &ErrorCode {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// True iff the code is `UNAUTHORIZED` or `TOKEN_EXPIRED`.
    pub fn is_auth_error(&self) -> bool {
        self.code.is_auth()
    }
}
