//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `EASYBUY_API_URL` - Backend base URL (default: `http://localhost:8000/api`)
//! - `EASYBUY_API_TIMEOUT_SECS` - Per-request timeout (default: 10)
//! - `EASYBUY_CACHE_TTL_SECS` - Catalog cache lifetime (default: 300)
//! - `EASYBUY_STATE_FILE` - Persisted mirror file (default: `.easybuy/state.json`)
//! - `EASYBUY_SUPPORT_WHATSAPP` - Support line for special requests
//!   (default: +2250700000000)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_API_URL: &str = "http://localhost:8000/api";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_STATE_FILE: &str = ".easybuy/state.json";
const DEFAULT_SUPPORT_WHATSAPP: &str = "+2250700000000";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Clone)]
pub struct StorefrontConfig {
    /// Backend API configuration
    pub api: ApiConfig,
    /// File backing the persisted cart and session mirror
    pub state_file: PathBuf,
    /// WhatsApp number answering special requests
    pub support_whatsapp: String,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl std::fmt::Debug for StorefrontConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontConfig")
            .field("api", &self.api)
            .field("state_file", &self.state_file)
            .field("support_whatsapp", &self.support_whatsapp)
            .field("sentry_dsn", &self.sentry_dsn.as_ref().map(|_| "[REDACTED]"))
            .field("sentry_environment", &self.sentry_environment)
            .finish()
    }
}

/// Backend API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL every endpoint path is appended to
    pub base_url: Url,
    /// Per-request timeout
    pub timeout: Duration,
    /// Lifetime of cached product, category, and city reads
    pub cache_ttl: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_url(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
        }
    }
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
            support_whatsapp: DEFAULT_SUPPORT_WHATSAPP.to_string(),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api = ApiConfig::from_lookup(&lookup)?;
        let state_file = PathBuf::from(get_or_default(&lookup, "EASYBUY_STATE_FILE", DEFAULT_STATE_FILE));
        let support_whatsapp =
            get_or_default(&lookup, "EASYBUY_SUPPORT_WHATSAPP", DEFAULT_SUPPORT_WHATSAPP);

        Ok(Self {
            api,
            state_file,
            support_whatsapp,
            sentry_dsn: get_optional(&lookup, "SENTRY_DSN"),
            sentry_environment: get_optional(&lookup, "SENTRY_ENVIRONMENT"),
        })
    }
}

impl ApiConfig {
    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = match get_optional(lookup, "EASYBUY_API_URL") {
            Some(raw) => parse_base_url(&raw)
                .map_err(|e| ConfigError::InvalidEnvVar("EASYBUY_API_URL".to_string(), e))?,
            None => default_api_url(),
        };

        Ok(Self {
            base_url,
            timeout: get_secs(lookup, "EASYBUY_API_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?,
            cache_ttl: get_secs(lookup, "EASYBUY_CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS)?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional variable; blank values count as unset.
fn get_optional(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Get a variable with a default value.
fn get_or_default(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    get_optional(lookup, key).unwrap_or_else(|| default.to_string())
}

/// Get a whole number of seconds.
fn get_secs(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: u64,
) -> Result<Duration, ConfigError> {
    let secs = match get_optional(lookup, key) {
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?,
        None => default,
    };
    Ok(Duration::from_secs(secs))
}

/// Parse a base URL, requiring an HTTP(S) scheme.
fn parse_base_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("unsupported scheme '{other}'")),
    }
}

#[allow(clippy::expect_used)] // Constant URL, covered by tests
fn default_api_url() -> Url {
    Url::parse(DEFAULT_API_URL).expect("default API URL is valid")
}
