//! Framework-wide error types
//!
//! Provides a unified error type that can be used throughout the framework
//! and automatically converts to appropriate HTTP responses.

use crate::negotiation::DecodeError;
use thiserror::Error;

/// Trait for errors that can be converted to HTTP responses
///
/// Implement this trait on your domain errors to customize the HTTP status code
/// and message that will be returned when the error is converted to a response.
///
/// # Example
///
/// ```rust,ignore
/// use kit::HttpError;
///
/// #[derive(Debug)]
/// struct UserNotFoundError { user_id: i32 }
///
/// impl std::fmt::Display for UserNotFoundError {
///     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
///         write!(f, "User {} not found", self.user_id)
///     }
/// }
///
/// impl std::error::Error for UserNotFoundError {}
///
/// impl HttpError for UserNotFoundError {
///     fn status_code(&self) -> u16 { 404 }
/// }
/// ```
pub trait HttpError: std::error::Error + Send + Sync + 'static {
    /// HTTP status code (default: 500)
    fn status_code(&self) -> u16 {
        500
    }

    /// Error message for HTTP response (default: error's Display)
    fn error_message(&self) -> String {
        self.to_string()
    }
}

/// Framework-wide error type
///
/// It implements `From<FrameworkError> for HttpResponse` so errors can be
/// propagated using the `?` operator in controller handlers.
///
/// # Example
///
/// ```rust,ignore
/// use kit::{FrameworkError, Request, Response};
///
/// pub async fn show(req: Request) -> Response {
///     let params = req.parameters().ok_or_else(|| FrameworkError::internal("not negotiated"))?;
///     // ...
/// }
/// ```
#[derive(Debug, Clone, Error)]
pub enum FrameworkError {
    /// Parameter extraction failed (missing or invalid parameter)
    #[error("Missing required parameter: {param_name}")]
    ParamError {
        /// The name of the parameter that failed extraction
        param_name: String,
    },

    /// Request body could not be decoded (400 Bad Request)
    #[error("{0}")]
    Decode(DecodeError),

    /// Request body exceeded the configured size limit (413 Payload Too Large)
    #[error("Request body exceeds the limit of {limit} bytes")]
    PayloadTooLarge {
        /// The configured limit in bytes
        limit: usize,
    },

    /// Generic internal server error
    #[error("Internal server error: {message}")]
    Internal {
        /// The error message
        message: String,
    },

    /// Domain/application error with custom status code
    #[error("{message}")]
    Domain {
        /// The error message
        message: String,
        /// HTTP status code
        status_code: u16,
    },
}

impl FrameworkError {
    /// Create a ParamError for a missing parameter
    pub fn param(name: impl Into<String>) -> Self {
        Self::ParamError {
            param_name: name.into(),
        }
    }

    /// Create an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create a Domain error with custom status code
    pub fn domain(message: impl Into<String>, status_code: u16) -> Self {
        Self::Domain {
            message: message.into(),
            status_code,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::ParamError { .. } => 400,
            Self::Decode(err) => err.status_code(),
            Self::PayloadTooLarge { .. } => 413,
            Self::Internal { .. } => 500,
            Self::Domain { status_code, .. } => *status_code,
        }
    }
}

impl From<DecodeError> for FrameworkError {
    fn from(e: DecodeError) -> Self {
        Self::Decode(e)
    }
}
