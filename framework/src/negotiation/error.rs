//! Decode failures produced while negotiating a request body

use crate::error::HttpError;
use thiserror::Error;

/// Why a JSON body was rejected
///
/// The messages form a fixed table so clients see the same wording no matter
/// which parser internals produced the failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonErrorKind {
    /// Nesting exceeded the parser's recursion limit
    Depth,
    /// A container was closed with the wrong bracket
    StateMismatch,
    /// Raw control character inside a string
    ControlCharacter,
    /// Any other syntax or truncation error
    Syntax,
    /// Input (or an escape) is not valid UTF-8
    Utf8,
    /// Valid JSON with a non-keyed root, or an unclassified failure
    Unknown,
}

impl JsonErrorKind {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Depth => "Maximum stack depth exceeded",
            Self::StateMismatch => "Underflow or the modes mismatch",
            Self::ControlCharacter => "Unexpected control character found",
            Self::Syntax => "Syntax error, malformed JSON",
            Self::Utf8 => "Malformed UTF-8 characters, possibly incorrectly encoded",
            Self::Unknown => "Unknown error.",
        }
    }
}

/// Which decoder rejected the body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeErrorKind {
    MalformedJson(JsonErrorKind),
    MalformedMultipart,
}

/// Terminal body decoding failure (always 400 Bad Request)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DecodeError {
    status: u16,
    message: String,
    kind: DecodeErrorKind,
}

impl DecodeError {
    /// Create a JSON decoding error from the message table
    pub fn json(kind: JsonErrorKind) -> Self {
        Self {
            status: 400,
            message: format!("JSON decoding error: {}", kind.message()),
            kind: DecodeErrorKind::MalformedJson(kind),
        }
    }

    /// Create a multipart error carrying the parser's message verbatim
    pub fn multipart(message: impl Into<String>) -> Self {
        Self {
            status: 400,
            message: message.into(),
            kind: DecodeErrorKind::MalformedMultipart,
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &DecodeErrorKind {
        &self.kind
    }
}

impl HttpError for DecodeError {
    fn status_code(&self) -> u16 {
        self.status
    }

    fn error_message(&self) -> String {
        self.message.clone()
    }
}
