//! `reqwest` implementation of the gateway.
//!
//! JSON over HTTPS against the storefront backend, using its trailing-slash
//! endpoint convention.

use std::sync::Arc;

use async_trait::async_trait;
use moka::future::Cache;
use reqwest::header::ACCEPT;
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use easybuy_core::{OrderId, OrderStatus, UserType};

use super::cache::{CacheKey, CacheValue};
use super::{ApiError, ApiGateway, normalize_list, normalize_rejection};
use crate::config::ApiConfig;
use crate::models::{
    AuthResponse, AuthTokens, Category, City, InitiateCartOrder, InitiateCartOrderResponse,
    InitiateOrder, InitiateOrderResponse, LoginCredentials, Order, OrderStats, Paginated,
    PasswordChange, Product, ProductFilters, RegistrationData, SocialProvider, User, UserPatch,
};
use crate::navigation::{Location, Navigator, View};
use crate::observe::{Observers, Subscription};
use crate::storage::{self, KeyValueStore, keys};

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
struct LoginBody<'a> {
    /// The backend authenticates by username field but accepts the email.
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RegisterBody<'a> {
    username: String,
    email: &'a str,
    phone: &'a str,
    password: &'a str,
    password2: &'a str,
    first_name: &'a str,
    last_name: &'a str,
    whatsapp: &'a str,
    address: &'a str,
    city: &'a str,
    user_type: UserType,
}

#[derive(Debug, Serialize)]
struct RefreshBody<'a> {
    refresh: &'a str,
}

#[derive(Debug, Serialize)]
struct ChangePasswordBody<'a> {
    old_password: &'a str,
    new_password: &'a str,
    new_password2: &'a str,
}

#[derive(Debug, Serialize)]
struct StatusBody {
    status: OrderStatus,
}

#[derive(Debug, Deserialize)]
struct TokenPair {
    access: String,
    #[serde(default)]
    refresh: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthPayload {
    user: User,
    tokens: TokenPair,
}

impl From<AuthPayload> for AuthResponse {
    fn from(payload: AuthPayload) -> Self {
        Self {
            user: payload.user,
            tokens: AuthTokens::new(payload.tokens.access, payload.tokens.refresh),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AccessPayload {
    access: String,
}

// =============================================================================
// HttpGateway
// =============================================================================

/// Gateway to the storefront REST backend.
///
/// Cheap to clone; clones share the HTTP connection pool, the catalog cache,
/// and the unauthorized listeners.
#[derive(Clone)]
pub struct HttpGateway {
    inner: Arc<HttpGatewayInner>,
}

struct HttpGatewayInner {
    client: reqwest::Client,
    base_url: String,
    store: Arc<dyn KeyValueStore>,
    navigator: Arc<dyn Navigator>,
    unauthorized: Observers<()>,
    cache: Cache<CacheKey, CacheValue>,
}

impl HttpGateway {
    /// Create a gateway.
    ///
    /// The bearer credential is read from `store` on every request, and
    /// `navigator` receives the forced redirect to login on a 401.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the HTTP client cannot be built.
    pub fn new(
        config: &ApiConfig,
        store: Arc<dyn KeyValueStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        let cache = Cache::builder()
            .max_capacity(500)
            .time_to_live(config.cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(HttpGatewayInner {
                client,
                base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
                store,
                navigator,
                unauthorized: Observers::new(),
                cache,
            }),
        })
    }

    /// Register a listener run whenever the backend answers 401, after the
    /// persisted credentials have been dropped.
    pub fn on_unauthorized<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.unauthorized.subscribe(move |()| listener())
    }

    /// Drop every cached catalog response.
    pub fn invalidate_cache(&self) {
        self.inner.cache.invalidate_all();
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        Ok(Url::parse(&format!("{}{path}", self.inner.base_url))?)
    }

    /// Start a request with the JSON accept header and, when one is
    /// persisted, the bearer credential.
    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let mut builder = self
            .inner
            .client
            .request(method, self.url(path)?)
            .header(ACCEPT, "application/json");

        match self.inner.store.get(keys::AUTH_TOKEN) {
            Ok(Some(token)) if !token.is_empty() => builder = builder.bearer_auth(token),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "Could not read bearer credential"),
        }

        Ok(builder)
    }

    /// Send a request and return the body of a success response.
    async fn execute(&self, builder: RequestBuilder) -> Result<String, ApiError> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            debug!(
                status = %status,
                body = %body.chars().take(200).collect::<String>(),
                "Backend returned non-success status"
            );
            if status == StatusCode::UNAUTHORIZED {
                self.handle_unauthorized();
            }
            return Err(normalize_rejection(status, &body));
        }

        Ok(body)
    }

    /// Send a request and deserialize the success body.
    async fn fetch<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let body = self.execute(builder).await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse backend response"
            );
            ApiError::Parse(e)
        })
    }

    /// Send a request whose success body is a list in either shape.
    async fn fetch_list<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        what: &str,
    ) -> Result<Vec<T>, ApiError> {
        let value: serde_json::Value = self.fetch(builder).await?;
        normalize_list(value, what)
    }

    fn handle_unauthorized(&self) {
        tracing::info!("Backend rejected credentials, clearing session");
        storage::remove_all(self.inner.store.as_ref(), &keys::IDENTITY);
        self.inner.unauthorized.notify(&());

        let on_auth_view = self
            .inner
            .navigator
            .current()
            .view()
            .is_some_and(|view| view.is_auth_view());
        if !on_auth_view {
            self.inner.navigator.navigate(Location::from(View::Login));
        }
    }
}

#[async_trait]
impl ApiGateway for HttpGateway {
    #[instrument(skip_all, fields(email = %credentials.email))]
    async fn authenticate(&self, credentials: &LoginCredentials) -> Result<AuthResponse, ApiError> {
        let body = LoginBody {
            username: credentials.email.trim(),
            password: credentials.password.expose_secret(),
        };
        let payload: AuthPayload = self
            .fetch(self.request(Method::POST, "/users/login/")?.json(&body))
            .await?;
        Ok(payload.into())
    }

    #[instrument(skip_all, fields(email = %data.email))]
    async fn register(&self, data: &RegistrationData) -> Result<AuthResponse, ApiError> {
        let body = RegisterBody {
            username: data.effective_username(),
            email: data.email.trim(),
            phone: data.phone.trim(),
            password: data.password.expose_secret(),
            password2: data.password_confirmation.expose_secret(),
            first_name: data.first_name.as_deref().unwrap_or_default(),
            last_name: data.last_name.as_deref().unwrap_or_default(),
            whatsapp: data.effective_whatsapp(),
            address: data.address.as_deref().unwrap_or_default(),
            city: data.effective_city(),
            user_type: data.user_type.unwrap_or_default(),
        };
        let payload: AuthPayload = self
            .fetch(self.request(Method::POST, "/users/register/")?.json(&body))
            .await?;
        Ok(payload.into())
    }

    #[instrument(skip(self, token))]
    async fn exchange_social_credential(
        &self,
        provider: SocialProvider,
        token: &str,
    ) -> Result<AuthResponse, ApiError> {
        let mut body = serde_json::Map::new();
        body.insert(provider.token_field().to_string(), token.into());
        let path = format!("/users/auth/{}/", provider.slug());
        let payload: AuthPayload = self
            .fetch(self.request(Method::POST, &path)?.json(&body))
            .await?;
        Ok(payload.into())
    }

    async fn fetch_current_profile(&self) -> Result<User, ApiError> {
        self.fetch(self.request(Method::GET, "/users/profile/")?)
            .await
    }

    async fn invalidate_session(&self, refresh_token: &str) -> Result<(), ApiError> {
        let body = RefreshBody {
            refresh: refresh_token,
        };
        self.execute(self.request(Method::POST, "/users/logout/")?.json(&body))
            .await
            .map(drop)
    }

    async fn update_profile(&self, patch: &UserPatch) -> Result<User, ApiError> {
        self.fetch(self.request(Method::PATCH, "/users/profile/")?.json(patch))
            .await
    }

    async fn change_password(&self, change: &PasswordChange) -> Result<(), ApiError> {
        let body = ChangePasswordBody {
            old_password: change.old_password.expose_secret(),
            new_password: change.new_password.expose_secret(),
            new_password2: change.new_password_confirmation.expose_secret(),
        };
        self.execute(
            self.request(Method::POST, "/users/change-password/")?
                .json(&body),
        )
        .await
        .map(drop)
    }

    async fn refresh_access_token(&self, refresh_token: &str) -> Result<String, ApiError> {
        let body = RefreshBody {
            refresh: refresh_token,
        };
        let payload: AccessPayload = self
            .fetch(
                self.request(Method::POST, "/users/token/refresh/")?
                    .json(&body),
            )
            .await?;
        Ok(payload.access)
    }

    #[instrument(skip(self))]
    async fn list_products(
        &self,
        filters: &ProductFilters,
    ) -> Result<Paginated<Product>, ApiError> {
        self.fetch(
            self.request(Method::GET, "/products/")?
                .query(&filters.to_query()),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn fetch_product(&self, slug: &str) -> Result<Product, ApiError> {
        let key = CacheKey::Product(slug.to_string());
        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let path = format!("/products/{}/", urlencoding::encode(slug));
        let product: Product = self.fetch(self.request(Method::GET, &path)?).await?;
        self.inner
            .cache
            .insert(key, CacheValue::Product(Box::new(product.clone())))
            .await;
        Ok(product)
    }

    #[instrument(skip(self))]
    async fn search_products(&self, query: &str) -> Result<Vec<Product>, ApiError> {
        self.fetch_list(
            self.request(Method::GET, "/products/search/")?
                .query(&[("q", query.trim())]),
            "product search",
        )
        .await
    }

    async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        if let Some(CacheValue::Categories(categories)) =
            self.inner.cache.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let categories: Vec<Category> = self
            .fetch_list(
                self.request(Method::GET, "/products/categories/")?,
                "categories",
            )
            .await?;
        self.inner
            .cache
            .insert(
                CacheKey::Categories,
                CacheValue::Categories(categories.clone()),
            )
            .await;
        Ok(categories)
    }

    async fn list_cities(&self) -> Result<Vec<City>, ApiError> {
        if let Some(CacheValue::Cities(cities)) = self.inner.cache.get(&CacheKey::Cities).await {
            debug!("Cache hit for cities");
            return Ok(cities);
        }

        let mut cities: Vec<City> = self
            .fetch_list(self.request(Method::GET, "/orders/cities/")?, "cities")
            .await?;
        cities.sort_by_key(|city| city.display_order);
        self.inner
            .cache
            .insert(CacheKey::Cities, CacheValue::Cities(cities.clone()))
            .await;
        Ok(cities)
    }

    #[instrument(skip(self))]
    async fn initiate_order(
        &self,
        request: &InitiateOrder,
    ) -> Result<InitiateOrderResponse, ApiError> {
        self.fetch(
            self.request(Method::POST, "/orders/orders/initiate/")?
                .json(request),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn initiate_cart_order(
        &self,
        request: &InitiateCartOrder,
    ) -> Result<InitiateCartOrderResponse, ApiError> {
        self.fetch(
            self.request(Method::POST, "/orders/orders/initiate_cart/")?
                .json(request),
        )
        .await
    }

    async fn order_history(&self) -> Result<Vec<Order>, ApiError> {
        self.fetch_list(
            self.request(Method::GET, "/orders/orders/history/")?,
            "order history",
        )
        .await
    }

    async fn order_stats(&self) -> Result<OrderStats, ApiError> {
        self.fetch(self.request(Method::GET, "/orders/orders/stats/")?)
            .await
    }

    #[instrument(skip(self))]
    async fn update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, ApiError> {
        let path = format!("/orders/orders/{id}/update_status/");
        self.fetch(
            self.request(Method::PATCH, &path)?
                .json(&StatusBody { status }),
        )
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::navigation::MemoryNavigator;
    use crate::storage::MemoryStore;

    fn gateway(base: &str) -> HttpGateway {
        let config = ApiConfig {
            base_url: Url::parse(base).unwrap(),
            timeout: Duration::from_secs(1),
            cache_ttl: Duration::from_secs(60),
        };
        HttpGateway::new(
            &config,
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryNavigator::default()),
        )
        .unwrap()
    }

    #[test]
    fn test_url_keeps_base_path() {
        let gw = gateway("http://localhost:8000/api/");
        assert_eq!(
            gw.url("/users/login/").unwrap().as_str(),
            "http://localhost:8000/api/users/login/"
        );
    }

    #[test]
    fn test_auth_payload_conversion() {
        let json = r#"{
            "message": "ok",
            "user": {"id": 1, "email": "a@b.ci"},
            "tokens": {"access": "acc", "refresh": "ref"}
        }"#;
        let payload: AuthPayload = serde_json::from_str(json).unwrap();
        let response = AuthResponse::from(payload);
        assert_eq!(response.tokens.access.expose_secret(), "acc");
        assert_eq!(
            response.tokens.refresh.as_ref().map(ExposeSecret::expose_secret),
            Some("ref")
        );
    }

    #[test]
    fn test_unauthorized_clears_identity_and_redirects() {
        let store = Arc::new(MemoryStore::new());
        let navigator = Arc::new(MemoryNavigator::new(Location::new("/profil")));
        let config = ApiConfig {
            base_url: Url::parse("http://localhost:8000/api").unwrap(),
            timeout: Duration::from_secs(1),
            cache_ttl: Duration::from_secs(60),
        };
        let gw = HttpGateway::new(&config, store.clone(), navigator.clone()).unwrap();

        for key in keys::IDENTITY {
            store.set(key, "x").unwrap();
        }
        store.set(keys::CART, "[]").unwrap();

        let fired = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        let _subscription = gw.on_unauthorized(move || {
            flag.store(true, std::sync::atomic::Ordering::SeqCst);
        });

        gw.handle_unauthorized();

        assert!(fired.load(std::sync::atomic::Ordering::SeqCst));
        assert!(!store.contains(keys::AUTH_TOKEN));
        assert!(!store.contains(keys::AUTH_USER));
        assert!(store.contains(keys::CART));
        assert_eq!(navigator.current().path, "/login");
    }

    #[test]
    fn test_unauthorized_on_login_view_does_not_redirect() {
        let navigator = Arc::new(MemoryNavigator::new(Location::new("/inscription")));
        let config = ApiConfig {
            base_url: Url::parse("http://localhost:8000/api").unwrap(),
            timeout: Duration::from_secs(1),
            cache_ttl: Duration::from_secs(60),
        };
        let gw = HttpGateway::new(&config, Arc::new(MemoryStore::new()), navigator.clone())
            .unwrap();

        gw.handle_unauthorized();

        assert!(navigator.history().is_empty());
    }
}
