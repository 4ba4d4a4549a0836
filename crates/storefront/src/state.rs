//! Application state shared across consumers.

use std::sync::Arc;

use crate::api::{ApiError, ApiGateway, HttpGateway};
use crate::cart::CartManager;
use crate::checkout::OrderService;
use crate::config::StorefrontConfig;
use crate::guard::RouteGuard;
use crate::navigation::Navigator;
use crate::notice::Notifier;
use crate::session::SessionManager;
use crate::storage::KeyValueStore;

/// Application state shared across all consumers.
///
/// This struct is cheaply cloneable via `Arc` and owns one instance of each
/// manager, all wired to the same store, notifier, and navigator.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    gateway: HttpGateway,
    navigator: Arc<dyn Navigator>,
    cart: CartManager,
    session: SessionManager,
    orders: OrderService,
    guard: RouteGuard,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `store` - Persisted mirror shared by the cart and the session
    /// * `notifier` - Receives user-facing notices
    /// * `navigator` - Moves the visitor between views
    ///
    /// The gateway's unauthorized hook is wired to the session, so a 401 on
    /// any call signs the visitor out.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        config: StorefrontConfig,
        store: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ApiError> {
        let gateway = HttpGateway::new(&config.api, Arc::clone(&store), Arc::clone(&navigator))?;
        let api: Arc<dyn ApiGateway> = Arc::new(gateway.clone());

        let cart = CartManager::restore(Arc::clone(&store), Arc::clone(&notifier));
        let session = SessionManager::new(
            Arc::clone(&api),
            store,
            Arc::clone(&notifier),
            Arc::clone(&navigator),
        );
        gateway
            .on_unauthorized(session.invalidation_handler())
            .detach();

        let orders = OrderService::new(
            api,
            cart.clone(),
            session.clone(),
            notifier,
            Arc::clone(&navigator),
            config.support_whatsapp.clone(),
        );
        let guard = RouteGuard::new(session.clone());

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                gateway,
                navigator,
                cart,
                session,
                orders,
                guard,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the backend gateway.
    #[must_use]
    pub fn gateway(&self) -> &HttpGateway {
        &self.inner.gateway
    }

    #[must_use]
    pub fn navigator(&self) -> &dyn Navigator {
        self.inner.navigator.as_ref()
    }

    #[must_use]
    pub fn cart(&self) -> &CartManager {
        &self.inner.cart
    }

    #[must_use]
    pub fn session(&self) -> &SessionManager {
        &self.inner.session
    }

    #[must_use]
    pub fn orders(&self) -> &OrderService {
        &self.inner.orders
    }

    #[must_use]
    pub fn guard(&self) -> &RouteGuard {
        &self.inner.guard
    }
}
