//! Integration tests for the EasyBuy storefront.
//!
//! Every test runs the real [`AppState`] wiring (HTTP gateway, cart,
//! session, orders) against a `wiremock` backend, so no network or live
//! API is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p easybuy-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `gateway` - Wire format, credentials, caching
//! - `session_flow` - Sign-in, restore, forced sign-out
//! - `checkout_flow` - Cart to WhatsApp order, persistence across runs

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use serde_json::{Value, json};
use url::Url;
use wiremock::MockServer;

use easybuy_storefront::config::{ApiConfig, StorefrontConfig};
use easybuy_storefront::navigation::{Location, MemoryNavigator};
use easybuy_storefront::notice::NoticeLog;
use easybuy_storefront::state::AppState;
use easybuy_storefront::storage::{KeyValueStore, MemoryStore};

/// WhatsApp number configured for support links.
pub const SUPPORT_WHATSAPP: &str = "+225 07 00 00 00 00";

/// Storefront configuration pointing at `server`, under an `/api` prefix.
///
/// # Panics
///
/// Panics if the mock server URI is not a valid URL.
#[must_use]
pub fn config_for(server: &MockServer) -> StorefrontConfig {
    #[allow(clippy::expect_used)]
    let base_url = Url::parse(&format!("{}/api", server.uri())).expect("mock server URI");
    StorefrontConfig {
        api: ApiConfig {
            base_url,
            ..ApiConfig::default()
        },
        support_whatsapp: SUPPORT_WHATSAPP.to_string(),
        ..StorefrontConfig::default()
    }
}

/// Everything a test needs to drive the storefront and inspect its effects.
pub struct TestContext {
    pub server: MockServer,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub notices: Arc<NoticeLog>,
    pub navigator: Arc<MemoryNavigator>,
}

impl TestContext {
    /// Fresh visitor on the home page with an empty store.
    pub async fn new() -> Self {
        Self::starting_at(Location::new("/")).await
    }

    /// Fresh visitor starting at `location`.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    pub async fn starting_at(location: Location) -> Self {
        let server = MockServer::start().await;
        let store = Arc::new(MemoryStore::new());
        let notices = Arc::new(NoticeLog::new());
        let navigator = Arc::new(MemoryNavigator::new(location));
        let state = build_state(&server, store.clone(), notices.clone(), navigator.clone());
        Self {
            server,
            state,
            store,
            notices,
            navigator,
        }
    }

    /// Persisted value under `key`.
    ///
    /// # Panics
    ///
    /// Panics if the store cannot be read.
    #[must_use]
    pub fn stored(&self, key: &str) -> Option<String> {
        #[allow(clippy::expect_used)]
        self.store.get(key).expect("memory store read")
    }

    /// Messages of every notice raised so far.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.notices
            .notices()
            .into_iter()
            .map(|notice| notice.message)
            .collect()
    }

    /// Path the visitor is currently on.
    #[must_use]
    pub fn current_path(&self) -> String {
        use easybuy_storefront::navigation::Navigator;
        self.navigator.current().path
    }
}

/// Wire an [`AppState`] to `server` over an arbitrary store.
///
/// # Panics
///
/// Panics if the HTTP client cannot be built.
#[must_use]
pub fn build_state(
    server: &MockServer,
    store: Arc<dyn KeyValueStore>,
    notices: Arc<NoticeLog>,
    navigator: Arc<MemoryNavigator>,
) -> AppState {
    #[allow(clippy::expect_used)]
    AppState::new(config_for(server), store, notices, navigator).expect("app state")
}

// =============================================================================
// Backend fixtures
// =============================================================================

/// Profile payload for a client account.
#[must_use]
pub fn user_json(id: i64, email: &str) -> Value {
    json!({
        "id": id,
        "username": email.split('@').next().unwrap_or(email),
        "email": email,
        "first_name": "Awa",
        "last_name": "Kone",
        "full_name": "Awa Kone",
        "phone": "+2250700000001",
        "whatsapp": "+2250700000001",
        "user_type": "client",
        "user_type_display": "Client",
        "city": "Abidjan",
        "is_verified": true
    })
}

/// Sign-in payload with a user and a token pair.
#[must_use]
pub fn auth_json(user: &Value, access: &str, refresh: &str) -> Value {
    json!({
        "user": user,
        "tokens": { "access": access, "refresh": refresh },
        "message": "Login successful"
    })
}

/// Product payload with a string-encoded price, as the backend sends it.
#[must_use]
pub fn product_json(id: i64, slug: &str, price: &str, stock: u32) -> Value {
    json!({
        "id": id,
        "name": slug.replace('-', " "),
        "slug": slug,
        "description": "",
        "price": price,
        "stock": stock,
        "in_stock": stock > 0,
        "is_available": true,
        "is_featured": false,
        "category": {
            "id": 1,
            "name": "Electromenager",
            "slug": "electromenager",
            "is_active": true,
            "product_count": 12
        },
        "images": []
    })
}

/// Delivery city payload.
#[must_use]
pub fn city_json(id: i64, name: &str, whatsapp: &str, display_order: u32) -> Value {
    json!({
        "id": id,
        "name": name,
        "whatsapp_number": whatsapp,
        "display_order": display_order
    })
}
