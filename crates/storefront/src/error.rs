//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type for callers driving the storefront
//! core end to end, plus helpers that keep Sentry's user context and
//! breadcrumbs in step with the session and cart.

use thiserror::Error;

use crate::api::ApiError;
use crate::checkout::OrderError;
use crate::config::ConfigError;
use crate::session::SessionError;
use crate::storage::StorageError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Persisted mirror operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Backend call failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Session operation failed.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Order operation failed.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Requested resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad input from the user.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// Whether the failure needs a signed-in user.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        match self {
            Self::Api(e) => e.is_unauthorized(),
            Self::Session(SessionError::NotAuthenticated)
            | Self::Order(OrderError::NotAuthenticated) => true,
            Self::Session(SessionError::Api(e)) | Self::Order(OrderError::Api(e)) => {
                e.is_unauthorized()
            }
            _ => false,
        }
    }

    /// Process exit code for a command that failed with this error.
    ///
    /// Follows the BSD `sysexits` conventions.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        if self.is_unauthorized() {
            return 77;
        }
        match self {
            Self::Config(_) => 78,
            Self::Storage(_) => 74,
            Self::NotFound(_) => 66,
            Self::BadRequest(_)
            | Self::Session(SessionError::Validation(_))
            | Self::Order(OrderError::Validation(_)) => 65,
            Self::Api(_) | Self::Session(_) | Self::Order(_) => 69,
        }
    }

    /// Log the error, capturing unexpected failures to Sentry.
    pub fn report(&self) {
        let unexpected = matches!(
            self,
            Self::Storage(_)
                | Self::Api(ApiError::Parse(_) | ApiError::Url(_))
                | Self::Order(OrderError::InvalidRedirect(_))
        );
        if unexpected {
            let event_id = sentry::capture_error(self);
            tracing::error!(error = %self, sentry_event_id = %event_id, "Command error");
        } else {
            tracing::debug!(error = %self, "Command error");
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
