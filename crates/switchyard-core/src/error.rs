//! Error types for request dispatch.
//!
//! This module provides [`DispatchError`], the error a step returns or
//! attaches to a [`Context`](crate::Context), and [`ErrorResponse`], the JSON
//! envelope written to clients:
//!
//! ```json
//! {"error": "user not found", "code": 404, "details": {"id": "7"}}
//! ```
//!
//! The `stack` field is only filled in [`Mode::Debug`]. Outside debug mode,
//! panics and internal errors are answered with [`INTERNAL_MESSAGE`] so
//! their text stays in the logs.

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mode::Mode;

/// Client-facing message for panics and internal errors outside debug mode.
pub const INTERNAL_MESSAGE: &str = "internal server error";

/// Result type returned by every step.
pub type HandlerResult = Result<(), DispatchError>;

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    /// Name of the offending field.
    pub field: String,
    /// Human-readable description.
    pub message: String,
    /// Name of the failed rule (e.g. `required`, `min`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// The rejected value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

impl FieldError {
    /// Creates a field error.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            tag: None,
            value: None,
        }
    }

    /// Sets the rule tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Sets the rejected value.
    pub fn with_value(mut self, value: serde_json::Value) -> Self {
        self.value = Some(value);
        self
    }
}

/// Error produced while dispatching a request.
///
/// # Example
///
/// ```
/// use switchyard_core::DispatchError;
/// use http::StatusCode;
///
/// let err = DispatchError::not_found("user 7 not found");
/// assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
/// assert_eq!(err.message(), "user 7 not found");
/// ```
#[derive(Error, Debug)]
pub enum DispatchError {
    /// Request validation failed.
    #[error("validation error: {message}")]
    Validation {
        /// Human-readable error message.
        message: String,
        /// Field-specific failures.
        errors: Vec<FieldError>,
    },

    /// Malformed request.
    #[error("bad request: {message}")]
    BadRequest {
        /// Human-readable error message.
        message: String,
    },

    /// Missing or invalid credentials.
    #[error("unauthorized: {message}")]
    Unauthorized {
        /// Human-readable error message.
        message: String,
    },

    /// Permission denied.
    #[error("forbidden: {message}")]
    Forbidden {
        /// Human-readable error message.
        message: String,
    },

    /// Resource not found.
    #[error("not found: {message}")]
    NotFound {
        /// Human-readable error message.
        message: String,
    },

    /// Path exists but not for this method.
    #[error("method not allowed: {message}")]
    MethodNotAllowed {
        /// Human-readable error message.
        message: String,
    },

    /// Deadline exceeded.
    #[error("timeout: {message}")]
    Timeout {
        /// Human-readable error message.
        message: String,
    },

    /// Internal server error.
    #[error("internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
        /// The underlying error (not exposed to clients).
        #[source]
        source: Option<anyhow::Error>,
    },

    /// Error with an explicit status code.
    #[error("{message}")]
    Status {
        /// Status code to respond with.
        status: StatusCode,
        /// Human-readable error message.
        message: String,
        /// Extra payload for the `details` field.
        details: Option<serde_json::Value>,
    },

    /// A step panicked.
    #[error("panic: {message}")]
    Panic {
        /// The panic payload rendered as text.
        message: String,
        /// Captured backtrace, if any.
        stack: Option<String>,
    },
}

impl DispatchError {
    /// Creates a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>, errors: Vec<FieldError>) -> Self {
        Self::Validation {
            message: message.into(),
            errors,
        }
    }

    /// Creates a bad request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Creates an unauthorized error.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Creates a forbidden error.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Creates a not found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates a method-not-allowed error.
    #[must_use]
    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        Self::MethodNotAllowed {
            message: message.into(),
        }
    }

    /// Creates a timeout error.
    #[must_use]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an internal error with a source error.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Creates an error with an explicit status code.
    #[must_use]
    pub fn status(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
            details: None,
        }
    }

    /// Creates an error with an explicit status code and details payload.
    #[must_use]
    pub fn status_with_details(
        status: StatusCode,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self::Status {
            status,
            message: message.into(),
            details: Some(details),
        }
    }

    /// Creates a panic error.
    #[must_use]
    pub fn panic(message: impl Into<String>, stack: Option<String>) -> Self {
        Self::Panic {
            message: message.into(),
            stack,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } | Self::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::Internal { .. } | Self::Panic { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Status { status, .. } => *status,
        }
    }

    /// Returns the client-facing message without the category prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Validation { message, .. }
            | Self::BadRequest { message }
            | Self::Unauthorized { message }
            | Self::Forbidden { message }
            | Self::NotFound { message }
            | Self::MethodNotAllowed { message }
            | Self::Timeout { message }
            | Self::Internal { message, .. }
            | Self::Status { message, .. }
            | Self::Panic { message, .. } => message,
        }
    }

    /// Converts this error to the JSON envelope written to clients.
    ///
    /// The `stack` field is only populated in debug mode. Panic and internal
    /// messages are replaced by [`INTERNAL_MESSAGE`] in every other mode.
    #[must_use]
    pub fn to_response(&self, mode: Mode) -> ErrorResponse {
        let details = match self {
            Self::Status { details, .. } => details.clone(),
            _ => None,
        };
        let errors = match self {
            Self::Validation { errors, .. } if !errors.is_empty() => Some(errors.clone()),
            _ => None,
        };
        let stack = if mode.is_debug() {
            match self {
                Self::Panic { stack, .. } => stack.clone(),
                Self::Internal {
                    source: Some(source),
                    ..
                } => Some(format!("{source:?}")),
                _ => None,
            }
        } else {
            None
        };

        let error = match self {
            Self::Panic { .. } | Self::Internal { .. } if !mode.is_debug() => {
                INTERNAL_MESSAGE.to_string()
            }
            _ => self.message().to_string(),
        };

        ErrorResponse {
            error,
            code: self.status_code().as_u16(),
            details,
            stack,
            errors,
        }
    }
}

/// The JSON error envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable message.
    pub error: String,
    /// HTTP status code.
    pub code: u16,
    /// Arbitrary extra payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Stack trace, debug mode only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    /// Field-level validation failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}
