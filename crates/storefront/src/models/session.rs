//! Session-related types.
//!
//! What a successful sign-in hands back, and the credentials kept in the
//! persisted mirror afterwards.

use secrecy::SecretString;

use crate::models::User;

/// Credentials issued by the backend.
#[derive(Debug, Clone)]
pub struct AuthTokens {
    /// Bearer credential for authenticated calls.
    pub access: SecretString,
    /// Long-lived credential for minting new bearer credentials.
    pub refresh: Option<SecretString>,
}

impl AuthTokens {
    #[must_use]
    pub fn new(access: impl Into<String>, refresh: Option<String>) -> Self {
        Self {
            access: SecretString::from(access.into()),
            refresh: refresh.map(SecretString::from),
        }
    }
}

/// Result of a successful sign-in, sign-up, or social exchange.
#[derive(Debug, Clone)]
pub struct AuthResponse {
    pub user: User,
    pub tokens: AuthTokens,
}

/// Third-party identity providers accepted for social sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocialProvider {
    /// Exchanges a Google ID token.
    Google,
    /// Exchanges a Facebook access token.
    Facebook,
}

impl SocialProvider {
    /// Provider segment of the exchange endpoint.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Facebook => "facebook",
        }
    }

    /// Name of the JSON field carrying the third-party token.
    #[must_use]
    pub const fn token_field(self) -> &'static str {
        match self {
            Self::Google => "id_token",
            Self::Facebook => "access_token",
        }
    }
}

impl std::fmt::Display for SocialProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Google => write!(f, "Google"),
            Self::Facebook => write!(f, "Facebook"),
        }
    }
}
