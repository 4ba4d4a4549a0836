//! Remote API gateway.
//!
//! # Architecture
//!
//! - [`ApiGateway`] is the seam the managers depend on; tests substitute a
//!   scripted fake, production uses [`HttpGateway`]
//! - Every call attaches the persisted bearer credential when present
//! - An unauthorized response is handled once, here: persisted credentials
//!   are dropped, listeners are told, and the visitor is sent to login
//! - Product, category, and city reads are cached via `moka`
//!
//! # Example
//!
//! ```rust,ignore
//! use easybuy_storefront::api::{ApiGateway, HttpGateway};
//!
//! let gateway = HttpGateway::new(&config, store, navigator)?;
//! let product = gateway.fetch_product("ventilateur-sur-pied").await?;
//! ```

mod cache;
mod error;
mod http;

pub use error::{ApiError, FieldErrors, GENERIC_MESSAGE, normalize_rejection};
pub use http::HttpGateway;

use async_trait::async_trait;

use easybuy_core::{OrderId, OrderStatus};

use crate::models::{
    AuthResponse, Category, City, InitiateCartOrder, InitiateCartOrderResponse, InitiateOrder,
    InitiateOrderResponse, LoginCredentials, Order, OrderStats, Paginated, PasswordChange,
    Product, ProductFilters, RegistrationData, SocialProvider, User, UserPatch,
};

/// Call contract of the storefront backend.
#[async_trait]
pub trait ApiGateway: Send + Sync {
    // =========================================================================
    // Authentication
    // =========================================================================

    /// Exchange email and password for a session.
    async fn authenticate(&self, credentials: &LoginCredentials) -> Result<AuthResponse, ApiError>;

    /// Create an account; the backend issues a session directly.
    async fn register(&self, data: &RegistrationData) -> Result<AuthResponse, ApiError>;

    /// Exchange a third-party credential for a session.
    async fn exchange_social_credential(
        &self,
        provider: SocialProvider,
        token: &str,
    ) -> Result<AuthResponse, ApiError>;

    /// Authoritative profile of the current bearer.
    async fn fetch_current_profile(&self) -> Result<User, ApiError>;

    /// Revoke the refresh credential server-side.
    async fn invalidate_session(&self, refresh_token: &str) -> Result<(), ApiError>;

    async fn update_profile(&self, patch: &UserPatch) -> Result<User, ApiError>;

    async fn change_password(&self, change: &PasswordChange) -> Result<(), ApiError>;

    /// Mint a new bearer credential from a refresh credential.
    async fn refresh_access_token(&self, refresh_token: &str) -> Result<String, ApiError>;

    // =========================================================================
    // Catalog
    // =========================================================================

    async fn list_products(&self, filters: &ProductFilters)
    -> Result<Paginated<Product>, ApiError>;

    async fn fetch_product(&self, slug: &str) -> Result<Product, ApiError>;

    async fn search_products(&self, query: &str) -> Result<Vec<Product>, ApiError>;

    async fn list_categories(&self) -> Result<Vec<Category>, ApiError>;

    /// Delivery cities for the messaging-redirect flow.
    async fn list_cities(&self) -> Result<Vec<City>, ApiError>;

    // =========================================================================
    // Orders
    // =========================================================================

    async fn initiate_order(&self, request: &InitiateOrder)
    -> Result<InitiateOrderResponse, ApiError>;

    async fn initiate_cart_order(
        &self,
        request: &InitiateCartOrder,
    ) -> Result<InitiateCartOrderResponse, ApiError>;

    async fn order_history(&self) -> Result<Vec<Order>, ApiError>;

    async fn order_stats(&self) -> Result<OrderStats, ApiError>;

    async fn update_order_status(&self, id: OrderId, status: OrderStatus)
    -> Result<Order, ApiError>;
}

/// Accept a list payload that is either a bare array or `{ "results": [...] }`.
///
/// Any other shape is logged and read as an empty list.
///
/// # Errors
///
/// Returns `ApiError::Parse` if the items themselves do not deserialize.
pub fn normalize_list<T: serde::de::DeserializeOwned>(
    value: serde_json::Value,
    what: &str,
) -> Result<Vec<T>, ApiError> {
    let items = match value {
        serde_json::Value::Array(_) => value,
        serde_json::Value::Object(mut map) => match map.remove("results") {
            Some(results @ serde_json::Value::Array(_)) => results,
            _ => {
                tracing::warn!(what = %what, "Unexpected list payload shape");
                return Ok(Vec::new());
            }
        },
        other => {
            tracing::warn!(what = %what, payload = %other, "Unexpected list payload shape");
            return Ok(Vec::new());
        }
    };
    Ok(serde_json::from_value(items)?)
}
