//! Request error types and backend error-payload normalization.
//!
//! The backend reports failures as `{"detail": ...}` where `detail` is either
//! a single message string or a list of `{"msg": ...}` field errors. Both
//! forms are flattened to one display string, and the recognized validation
//! prefix is stripped for user-facing display. Recognized prefixes:
//!
//! - `"Value error"` (optional trailing comma and whitespace,
//!   case-insensitive)
//!
//! Error *content* is preserved otherwise.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport-level failure; no response was received.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("HTTP {status}: {}", display_detail(.body.as_ref()))]
    Status {
        /// HTTP status code of the response.
        status: StatusCode,
        /// Best-effort parsed error payload; `None` when unparseable.
        body: Option<ErrorBody>,
    },

    /// A success response body could not be parsed as JSON.
    #[error("response parse error: {0}")]
    Decode(#[from] serde_json::Error),

    /// The backend answered success with no body where one was required.
    #[error("empty response body")]
    EmptyBody,
}

impl ApiError {
    /// The HTTP status, when a response was received.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether this is a business-rule rejection (duplicate review, invalid
    /// state transition). The backend answers 400 for these; 409 is also
    /// recognized.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        self.status()
            .is_some_and(|s| s == StatusCode::BAD_REQUEST || s == StatusCode::CONFLICT)
    }

    /// Whether the backend rejected the credential.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status().is_some_and(|s| s == StatusCode::UNAUTHORIZED)
    }

    /// One display string for the invoking view.
    ///
    /// Uses the normalized backend detail when present, `fallback` otherwise.
    #[must_use]
    pub fn display_message(&self, fallback: &str) -> String {
        match self {
            Self::Status {
                body: Some(body), ..
            } => body.display_message().unwrap_or_else(|| fallback.to_owned()),
            _ => fallback.to_owned(),
        }
    }
}

/// Parsed backend error payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    /// Either a single message or a list of field errors.
    pub detail: Option<Detail>,
}

impl ErrorBody {
    /// Flatten the detail payload to one normalized display string.
    #[must_use]
    pub fn display_message(&self) -> Option<String> {
        let flattened = match self.detail.as_ref()? {
            Detail::Message(message) => message.clone(),
            Detail::Fields(fields) => {
                let joined = fields
                    .iter()
                    .map(|f| f.msg.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                if joined.is_empty() {
                    return None;
                }
                joined
            }
        };
        Some(strip_value_error_prefix(&flattened).to_owned())
    }
}

/// The two shapes the backend uses for `detail`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Detail {
    /// Single message string.
    Message(String),
    /// List of field errors.
    Fields(Vec<FieldError>),
}

/// One entry of a field-error list.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldError {
    /// The field error message.
    pub msg: String,
}

static VALUE_ERROR_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^value error,?\s*").expect("valid prefix pattern"));

/// Strip the recognized validation prefix from a backend message.
#[must_use]
pub fn strip_value_error_prefix(message: &str) -> &str {
    VALUE_ERROR_PREFIX
        .find(message)
        .map_or(message, |m| message.get(m.end()..).unwrap_or(""))
}

fn display_detail(body: Option<&ErrorBody>) -> String {
    body.and_then(ErrorBody::display_message)
        .unwrap_or_else(|| "(no error details provided)".to_owned())
}
