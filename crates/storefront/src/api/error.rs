//! Normalized gateway errors.

use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;

/// Message used when the backend gives no usable explanation.
pub const GENERIC_MESSAGE: &str = "An error occurred";

/// Field name mapped to the validation messages for that field.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Errors that can occur when calling the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never got a response (connection, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("{message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Backend-provided explanation.
        message: String,
        /// Per-field validation messages, possibly empty.
        field_errors: FieldErrors,
    },

    /// A success response did not have the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// An endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// A rejection without field errors.
    #[must_use]
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
            field_errors: FieldErrors::new(),
        }
    }

    /// A rejection carrying per-field validation messages.
    #[must_use]
    pub fn with_field_errors(status: u16, message: impl Into<String>, fields: FieldErrors) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
            field_errors: fields,
        }
    }

    /// HTTP status, when the backend answered at all.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            Self::Parse(_) | Self::Url(_) => None,
        }
    }

    /// Whether the backend refused our credentials.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Per-field validation messages, if there are any.
    #[must_use]
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Rejected { field_errors, .. } if !field_errors.is_empty() => Some(field_errors),
            _ => None,
        }
    }

    /// Message suitable for a notice.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Rejected { message, .. } if !message.trim().is_empty() => message.clone(),
            Self::Rejected { .. } => GENERIC_MESSAGE.to_string(),
            Self::Http(e) if e.is_timeout() => "The server took too long to respond".to_string(),
            Self::Http(_) => "Network error, please check your connection".to_string(),
            Self::Parse(_) | Self::Url(_) => GENERIC_MESSAGE.to_string(),
        }
    }
}

/// A field's messages arrive as a list or, from some endpoints, a bare string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Messages {
    Many(Vec<String>),
    One(String),
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    errors: Option<BTreeMap<String, Messages>>,
}

/// Build an [`ApiError::Rejected`] from a non-success response.
///
/// The message is taken from `error`, then `message`, then `detail`, then
/// the status reason; field errors come from `errors`.
#[must_use]
pub fn normalize_rejection(status: reqwest::StatusCode, body: &str) -> ApiError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();

    let message = [parsed.error, parsed.message, parsed.detail]
        .into_iter()
        .flatten()
        .find(|m| !m.trim().is_empty())
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| GENERIC_MESSAGE.to_string());

    let field_errors = parsed
        .errors
        .unwrap_or_default()
        .into_iter()
        .map(|(field, messages)| {
            let messages = match messages {
                Messages::Many(list) => list,
                Messages::One(single) => vec![single],
            };
            (field, messages)
        })
        .collect();

    ApiError::Rejected {
        status: status.as_u16(),
        message,
        field_errors,
    }
}
