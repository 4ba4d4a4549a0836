//! Scripted gateway and fixture wiring for unit tests.

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use easybuy_core::{OrderId, OrderStatus};

use crate::api::{ApiError, ApiGateway};
use crate::models::{
    AuthResponse, AuthTokens, Category, City, InitiateCartOrder, InitiateCartOrderResponse,
    InitiateOrder, InitiateOrderResponse, LoginCredentials, Order, OrderStats, Paginated,
    PasswordChange, Product, ProductFilters, RegistrationData, SocialProvider, User, UserPatch,
};
use crate::navigation::MemoryNavigator;
use crate::notice::NoticeLog;
use crate::storage::MemoryStore;

/// Queue of canned results for one gateway method.
pub(crate) struct Script<T> {
    queue: Mutex<VecDeque<Result<T, ApiError>>>,
}

impl<T> Default for Script<T> {
    fn default() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
        }
    }
}

impl<T> Script<T> {
    pub(crate) fn push(&self, result: Result<T, ApiError>) {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(result);
    }

    pub(crate) fn ok(&self, value: T) {
        self.push(Ok(value));
    }

    pub(crate) fn err(&self, error: ApiError) {
        self.push(Err(error));
    }

    fn next(&self, method: &str) -> Result<T, ApiError> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::rejected(501, format!("unscripted call: {method}"))))
    }
}

/// Gateway whose every answer is queued up by the test.
///
/// Unscripted calls fail with a 501 rejection.
#[derive(Default)]
pub(crate) struct FakeGateway {
    pub authenticate: Script<AuthResponse>,
    pub register: Script<AuthResponse>,
    pub social: Script<AuthResponse>,
    pub profile: Script<User>,
    pub invalidate: Script<()>,
    pub update_profile: Script<User>,
    pub change_password: Script<()>,
    pub refresh: Script<String>,
    pub products: Script<Paginated<Product>>,
    pub product: Script<Product>,
    pub search: Script<Vec<Product>>,
    pub categories: Script<Vec<Category>>,
    pub cities: Script<Vec<City>>,
    pub initiate: Script<InitiateOrderResponse>,
    pub initiate_cart: Script<InitiateCartOrderResponse>,
    pub history: Script<Vec<Order>>,
    pub stats: Script<OrderStats>,
    pub order_status: Script<Order>,
    calls: Mutex<Vec<String>>,
    cart_requests: Mutex<Vec<InitiateCartOrder>>,
}

impl FakeGateway {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Names of the methods called so far, in order.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn was_called(&self, method: &str) -> bool {
        self.calls().iter().any(|c| c == method)
    }

    pub(crate) fn cart_requests(&self) -> Vec<InitiateCartOrder> {
        self.cart_requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, method: &str) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(method.to_string());
    }
}

#[async_trait]
impl ApiGateway for FakeGateway {
    async fn authenticate(&self, _credentials: &LoginCredentials) -> Result<AuthResponse, ApiError> {
        self.record("authenticate");
        self.authenticate.next("authenticate")
    }

    async fn register(&self, _data: &RegistrationData) -> Result<AuthResponse, ApiError> {
        self.record("register");
        self.register.next("register")
    }

    async fn exchange_social_credential(
        &self,
        provider: SocialProvider,
        _token: &str,
    ) -> Result<AuthResponse, ApiError> {
        self.record(&format!("social:{}", provider.slug()));
        self.social.next("exchange_social_credential")
    }

    async fn fetch_current_profile(&self) -> Result<User, ApiError> {
        self.record("fetch_current_profile");
        self.profile.next("fetch_current_profile")
    }

    async fn invalidate_session(&self, _refresh_token: &str) -> Result<(), ApiError> {
        self.record("invalidate_session");
        self.invalidate.next("invalidate_session")
    }

    async fn update_profile(&self, _patch: &UserPatch) -> Result<User, ApiError> {
        self.record("update_profile");
        self.update_profile.next("update_profile")
    }

    async fn change_password(&self, _change: &PasswordChange) -> Result<(), ApiError> {
        self.record("change_password");
        self.change_password.next("change_password")
    }

    async fn refresh_access_token(&self, _refresh_token: &str) -> Result<String, ApiError> {
        self.record("refresh_access_token");
        self.refresh.next("refresh_access_token")
    }

    async fn list_products(
        &self,
        _filters: &ProductFilters,
    ) -> Result<Paginated<Product>, ApiError> {
        self.record("list_products");
        self.products.next("list_products")
    }

    async fn fetch_product(&self, _slug: &str) -> Result<Product, ApiError> {
        self.record("fetch_product");
        self.product.next("fetch_product")
    }

    async fn search_products(&self, _query: &str) -> Result<Vec<Product>, ApiError> {
        self.record("search_products");
        self.search.next("search_products")
    }

    async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        self.record("list_categories");
        self.categories.next("list_categories")
    }

    async fn list_cities(&self) -> Result<Vec<City>, ApiError> {
        self.record("list_cities");
        self.cities.next("list_cities")
    }

    async fn initiate_order(
        &self,
        _request: &InitiateOrder,
    ) -> Result<InitiateOrderResponse, ApiError> {
        self.record("initiate_order");
        self.initiate.next("initiate_order")
    }

    async fn initiate_cart_order(
        &self,
        request: &InitiateCartOrder,
    ) -> Result<InitiateCartOrderResponse, ApiError> {
        self.record("initiate_cart_order");
        self.cart_requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        self.initiate_cart.next("initiate_cart_order")
    }

    async fn order_history(&self) -> Result<Vec<Order>, ApiError> {
        self.record("order_history");
        self.history.next("order_history")
    }

    async fn order_stats(&self) -> Result<OrderStats, ApiError> {
        self.record("order_stats");
        self.stats.next("order_stats")
    }

    async fn update_order_status(
        &self,
        _id: OrderId,
        _status: OrderStatus,
    ) -> Result<Order, ApiError> {
        self.record("update_order_status");
        self.order_status.next("update_order_status")
    }
}

/// A successful auth payload for `user`.
pub(crate) fn auth_response(user: User) -> AuthResponse {
    AuthResponse {
        user,
        tokens: AuthTokens::new("access-1", Some("refresh-1".to_string())),
    }
}

/// Fresh collaborators for one test.
pub(crate) struct Fixture {
    pub gateway: Arc<FakeGateway>,
    pub store: Arc<MemoryStore>,
    pub notices: Arc<NoticeLog>,
    pub navigator: Arc<MemoryNavigator>,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        Self {
            gateway: FakeGateway::new(),
            store: Arc::new(MemoryStore::new()),
            notices: Arc::new(NoticeLog::new()),
            navigator: Arc::new(MemoryNavigator::default()),
        }
    }

    /// Messages of every notice recorded so far.
    pub(crate) fn messages(&self) -> Vec<String> {
        self.notices
            .notices()
            .into_iter()
            .map(|n| n.message)
            .collect()
    }
}
