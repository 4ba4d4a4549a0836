//! WhatsApp-redirect order initiation.
//!
//! Orders are not paid or fulfilled here. The backend records the order and
//! hands back a messaging deep link prefilled with the order text; the
//! visitor finishes the purchase in that conversation.

use std::sync::Arc;

use rust_decimal::Decimal;
use thiserror::Error;
use url::Url;

use easybuy_core::{OrderId, OrderStatus};

use crate::api::{ApiError, ApiGateway};
use crate::cart::CartManager;
use crate::models::{
    City, InitiateCartOrder, InitiateOrder, Order, OrderLineRequest, OrderStats, Product,
};
use crate::navigation::{Location, Navigator, View};
use crate::notice::{Notice, Notifier};
use crate::session::SessionManager;

/// Errors returned by order operations.
///
/// A notice describing the failure has always been emitted already.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("{0}")]
    Validation(String),

    #[error("Not signed in")]
    NotAuthenticated,

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Invalid redirect URL: {0}")]
    InvalidRedirect(String),
}

/// Where to send the visitor to finish an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRedirect {
    /// Messaging deep link prefilled with the order text.
    pub url: Url,
    pub order_ids: Vec<OrderId>,
    /// Delivery city name.
    pub city: String,
    /// Order total as computed by the backend.
    pub total: Decimal,
}

/// Build a WhatsApp chat link to `number` with `message` prefilled.
///
/// Everything but digits is stripped from `number`.
///
/// # Errors
///
/// Returns `OrderError::Validation` if the message is blank or the number
/// has no digits.
pub fn whatsapp_link(number: &str, message: &str) -> Result<Url, OrderError> {
    let digits: String = number.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return Err(OrderError::Validation("Invalid WhatsApp number".to_string()));
    }
    let message = message.trim();
    if message.is_empty() {
        return Err(OrderError::Validation("Message cannot be empty".to_string()));
    }

    let raw = format!(
        "https://wa.me/{digits}?text={}",
        urlencoding::encode(message)
    );
    Url::parse(&raw).map_err(|e| OrderError::InvalidRedirect(e.to_string()))
}

/// Order initiation and history for the signed-in visitor.
#[derive(Clone)]
pub struct OrderService {
    gateway: Arc<dyn ApiGateway>,
    cart: CartManager,
    session: SessionManager,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
    support_whatsapp: String,
}

impl OrderService {
    #[must_use]
    pub fn new(
        gateway: Arc<dyn ApiGateway>,
        cart: CartManager,
        session: SessionManager,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
        support_whatsapp: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            cart,
            session,
            notifier,
            navigator,
            support_whatsapp: support_whatsapp.into(),
        }
    }

    /// Order `quantity` units of one product for delivery in `city`.
    ///
    /// An anonymous visitor is sent to login, to come back to the product.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotAuthenticated` for anonymous visitors,
    /// `OrderError::Validation` if the product cannot be bought in that
    /// quantity, or `OrderError::Api` if the backend refuses the order.
    pub async fn order_product(
        &self,
        product: &Product,
        city: &City,
        quantity: u32,
    ) -> Result<OrderRedirect, OrderError> {
        self.require_session(View::ProductDetail(product.slug.clone()))?;

        if !product.can_purchase(quantity) {
            let message = if product.is_available {
                "Insufficient stock"
            } else {
                "This product is not available"
            };
            return Err(self.refuse(message));
        }

        let request = InitiateOrder {
            product_id: product.id,
            city_id: city.id,
            quantity,
        };
        let response = self
            .gateway
            .initiate_order(&request)
            .await
            .map_err(|e| self.report(e, "Order initiation failed"))?;

        let url = self.redirect_url(&response.whatsapp_url)?;
        tracing::info!(order_id = %response.order_id, city = %city.name, "Order initiated");
        self.notifier.notify(Notice::success(format!(
            "Redirecting to WhatsApp {}...",
            city.name
        )));

        Ok(OrderRedirect {
            url,
            order_ids: vec![response.order_id],
            city: response.city,
            total: response.price,
        })
    }

    /// Order everything in the cart for delivery in `city`.
    ///
    /// The cart is emptied once the backend accepts the order.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Validation` for an empty cart,
    /// `OrderError::NotAuthenticated` for anonymous visitors, or
    /// `OrderError::Api` if the backend refuses the order.
    pub async fn order_cart(&self, city: &City) -> Result<OrderRedirect, OrderError> {
        let snapshot = self.cart.cart();
        if snapshot.is_empty() {
            return Err(self.refuse("Your cart is empty"));
        }
        self.require_session(View::Cart)?;

        let request = InitiateCartOrder {
            items: snapshot
                .items
                .iter()
                .map(|line| OrderLineRequest {
                    product_id: line.product.id,
                    quantity: line.quantity,
                })
                .collect(),
            city_id: city.id,
        };
        let response = self
            .gateway
            .initiate_cart_order(&request)
            .await
            .map_err(|e| self.report(e, "Cart order initiation failed"))?;

        let url = self.redirect_url(&response.whatsapp_url)?;
        tracing::info!(
            orders = response.order_ids.len(),
            items = response.items_count,
            city = %city.name,
            "Cart order initiated"
        );
        self.cart.clear_silently();
        self.notifier.notify(Notice::success(format!(
            "Redirecting to WhatsApp {}...",
            city.name
        )));

        Ok(OrderRedirect {
            url,
            order_ids: response.order_ids,
            city: response.city,
            total: response.total_price,
        })
    }

    /// Chat link to the support line with `message` prefilled.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Validation` if the message is blank.
    pub fn support_link(&self, message: &str) -> Result<Url, OrderError> {
        whatsapp_link(&self.support_whatsapp, message).inspect_err(|e| {
            self.notifier.notify(Notice::error(e.to_string()));
        })
    }

    /// Orders placed by the signed-in visitor.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotAuthenticated` for anonymous visitors, or
    /// `OrderError::Api` if the backend call fails.
    pub async fn order_history(&self) -> Result<Vec<Order>, OrderError> {
        self.require_session(View::Orders)?;
        self.gateway
            .order_history()
            .await
            .map_err(|e| self.report(e, "Failed to load orders"))
    }

    /// Per-status counts of the signed-in visitor's orders.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotAuthenticated` for anonymous visitors, or
    /// `OrderError::Api` if the backend call fails.
    pub async fn order_stats(&self) -> Result<OrderStats, OrderError> {
        self.require_session(View::Orders)?;
        self.gateway
            .order_stats()
            .await
            .map_err(|e| self.report(e, "Failed to load order statistics"))
    }

    /// Mark an order as cancelled.
    ///
    /// # Errors
    ///
    /// See [`order_history`](Self::order_history).
    pub async fn cancel_order(&self, id: OrderId) -> Result<Order, OrderError> {
        self.set_status(id, OrderStatus::Cancelled, "Order cancelled")
            .await
    }

    /// Mark an order as completed.
    ///
    /// # Errors
    ///
    /// See [`order_history`](Self::order_history).
    pub async fn complete_order(&self, id: OrderId) -> Result<Order, OrderError> {
        self.set_status(id, OrderStatus::Completed, "Order marked as completed")
            .await
    }

    async fn set_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        success: &str,
    ) -> Result<Order, OrderError> {
        self.require_session(View::OrderDetail(id))?;
        let order = self
            .gateway
            .update_order_status(id, status)
            .await
            .map_err(|e| self.report(e, "Order status update failed"))?;
        self.notifier.notify(Notice::success(success));
        Ok(order)
    }

    /// Send anonymous visitors to login, remembering `return_to`.
    fn require_session(&self, return_to: View) -> Result<(), OrderError> {
        if self.session.is_authenticated() {
            return Ok(());
        }
        self.notifier
            .notify(Notice::info("Please sign in to place an order"));
        self.navigator
            .navigate(Location::with_from(View::Login.path(), return_to.path()));
        Err(OrderError::NotAuthenticated)
    }

    fn refuse(&self, message: &str) -> OrderError {
        self.notifier.notify(Notice::error(message));
        OrderError::Validation(message.to_string())
    }

    fn report(&self, error: ApiError, context: &str) -> OrderError {
        tracing::error!(error = %error, "{context}");
        self.notifier.notify(Notice::error(error.user_message()));
        OrderError::Api(error)
    }

    fn redirect_url(&self, raw: &str) -> Result<Url, OrderError> {
        Url::parse(raw).map_err(|e| {
            tracing::error!(url = %raw, error = %e, "Backend returned an unusable redirect");
            self.notifier
                .notify(Notice::error(crate::api::GENERIC_MESSAGE));
            OrderError::InvalidRedirect(e.to_string())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use easybuy_core::CityId;

    use super::*;
    use crate::models::product::tests::product;
    use crate::models::user::tests::user;
    use crate::models::{InitiateCartOrderResponse, InitiateOrderResponse, LoginCredentials};
    use crate::storage::{KeyValueStore, keys};
    use crate::test_support::{Fixture, auth_response};

    struct Harness {
        fx: Fixture,
        cart: CartManager,
        session: SessionManager,
        orders: OrderService,
    }

    async fn harness(signed_in: bool) -> Harness {
        let fx = Fixture::new();
        let cart = CartManager::restore(fx.store.clone(), fx.notices.clone());
        let session = SessionManager::new(
            fx.gateway.clone(),
            fx.store.clone(),
            fx.notices.clone(),
            fx.navigator.clone(),
        );
        session.start().await;
        if signed_in {
            fx.gateway.authenticate.ok(auth_response(user(1, "a@b.ci")));
            session
                .login(&LoginCredentials::new("a@b.ci", "pw"))
                .await
                .unwrap();
        }
        let orders = OrderService::new(
            fx.gateway.clone(),
            cart.clone(),
            session.clone(),
            fx.notices.clone(),
            fx.navigator.clone(),
            "+225 07 00 00 00 00",
        );
        fx.notices.drain();
        Harness {
            fx,
            cart,
            session,
            orders,
        }
    }

    fn abidjan() -> City {
        City {
            id: CityId::new(2),
            name: "Abidjan".to_string(),
            whatsapp_number: "+2250700000001".to_string(),
            display_order: 1,
        }
    }

    #[test]
    fn test_whatsapp_link_encodes_message() {
        let url = whatsapp_link("+225 07 00 00 00 00", "Bonjour, une demande spéciale").unwrap();
        assert_eq!(url.host_str(), Some("wa.me"));
        assert_eq!(url.path(), "/2250700000000");
        assert_eq!(
            url.query(),
            Some("text=Bonjour%2C%20une%20demande%20sp%C3%A9ciale")
        );
    }

    #[test]
    fn test_whatsapp_link_rejects_blank_message() {
        assert!(matches!(
            whatsapp_link("+225", "   "),
            Err(OrderError::Validation(_))
        ));
        assert!(matches!(
            whatsapp_link("none", "hi"),
            Err(OrderError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_anonymous_order_redirects_to_login_with_return() {
        let h = harness(false).await;
        let p = product(1, 1000, 5);

        let result = h.orders.order_product(&p, &abidjan(), 1).await;

        assert!(matches!(result, Err(OrderError::NotAuthenticated)));
        assert_eq!(
            h.fx.navigator.current(),
            Location::with_from("/login", "/produits/product-1")
        );
        assert!(!h.fx.gateway.was_called("initiate_order"));
        assert!(!h.session.is_authenticated());
    }

    #[tokio::test]
    async fn test_order_product_returns_redirect() {
        let h = harness(true).await;
        h.fx.gateway.initiate.ok(InitiateOrderResponse {
            order_id: OrderId::new(77),
            whatsapp_url: "https://wa.me/2250700000001?text=Commande%2077".to_string(),
            city: "Abidjan".to_string(),
            product: "Product 1".to_string(),
            price: Decimal::from(2000),
        });

        let redirect = h
            .orders
            .order_product(&product(1, 1000, 5), &abidjan(), 2)
            .await
            .unwrap();

        assert_eq!(redirect.order_ids, vec![OrderId::new(77)]);
        assert_eq!(redirect.url.host_str(), Some("wa.me"));
        assert_eq!(h.fx.messages(), vec!["Redirecting to WhatsApp Abidjan..."]);
    }

    #[tokio::test]
    async fn test_order_product_over_stock_is_refused_locally() {
        let h = harness(true).await;

        let result = h
            .orders
            .order_product(&product(1, 1000, 2), &abidjan(), 3)
            .await;

        assert!(matches!(result, Err(OrderError::Validation(_))));
        assert!(!h.fx.gateway.was_called("initiate_order"));
    }

    #[tokio::test]
    async fn test_order_cart_empty_is_refused() {
        let h = harness(true).await;
        let result = h.orders.order_cart(&abidjan()).await;
        assert!(matches!(result, Err(OrderError::Validation(_))));
        assert_eq!(h.fx.messages(), vec!["Your cart is empty"]);
    }

    #[tokio::test]
    async fn test_order_cart_anonymous_remembers_cart() {
        let h = harness(false).await;
        h.cart.add_to_cart(&product(1, 1000, 5), 1);

        let result = h.orders.order_cart(&abidjan()).await;

        assert!(matches!(result, Err(OrderError::NotAuthenticated)));
        assert_eq!(h.fx.navigator.current().from.as_deref(), Some("/panier"));
        assert_eq!(h.cart.cart().item_count, 1);
    }

    #[tokio::test]
    async fn test_order_cart_sends_lines_and_clears_cart() {
        let h = harness(true).await;
        h.cart.add_to_cart(&product(1, 1000, 5), 2);
        h.cart.add_to_cart(&product(2, 500, 5), 1);
        h.fx.gateway.initiate_cart.ok(InitiateCartOrderResponse {
            order_ids: vec![OrderId::new(10), OrderId::new(11)],
            whatsapp_url: "https://wa.me/2250700000001?text=Panier".to_string(),
            city: "Abidjan".to_string(),
            items_count: 3,
            total_price: Decimal::from(2500),
        });

        let redirect = h.orders.order_cart(&abidjan()).await.unwrap();

        assert_eq!(redirect.total, Decimal::from(2500));
        let requests = h.fx.gateway.cart_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].items.len(), 2);
        assert_eq!(requests[0].city_id, CityId::new(2));
        assert!(h.cart.cart().is_empty());
        assert_eq!(h.fx.store.get(keys::CART).unwrap().as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn test_order_cart_failure_keeps_cart() {
        let h = harness(true).await;
        h.cart.add_to_cart(&product(1, 1000, 5), 2);
        h.fx.notices.drain();
        h.fx
            .gateway
            .initiate_cart
            .err(ApiError::rejected(400, "Stock insuffisant"));

        let result = h.orders.order_cart(&abidjan()).await;

        assert!(matches!(result, Err(OrderError::Api(_))));
        assert_eq!(h.cart.cart().item_count, 2);
        assert_eq!(h.fx.messages(), vec!["Stock insuffisant"]);
    }

    #[tokio::test]
    async fn test_unusable_redirect_is_an_error() {
        let h = harness(true).await;
        h.fx.gateway.initiate.ok(InitiateOrderResponse {
            order_id: OrderId::new(1),
            whatsapp_url: "not a url".to_string(),
            city: "Abidjan".to_string(),
            product: "P".to_string(),
            price: Decimal::ONE,
        });

        let result = h
            .orders
            .order_product(&product(1, 1, 5), &abidjan(), 1)
            .await;

        assert!(matches!(result, Err(OrderError::InvalidRedirect(_))));
    }

    #[tokio::test]
    async fn test_support_link_uses_configured_number() {
        let h = harness(false).await;
        let url = h.orders.support_link("Besoin d'aide").unwrap();
        assert_eq!(url.path(), "/2250700000000");
        assert!(h.orders.support_link("").is_err());
        assert_eq!(h.fx.notices.at_level(crate::notice::NoticeLevel::Error).len(), 1);
    }

    #[tokio::test]
    async fn test_order_history_requires_session() {
        let h = harness(false).await;
        assert!(matches!(
            h.orders.order_history().await,
            Err(OrderError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn test_cancel_order_notifies() {
        let h = harness(true).await;
        h.fx.gateway.order_status.ok(Order {
            id: OrderId::new(5),
            user: easybuy_core::UserId::new(1),
            product_name: "P".to_string(),
            product_price: Decimal::from(100),
            city_name: "Abidjan".to_string(),
            status: OrderStatus::Cancelled,
            status_display: "Cancelled".to_string(),
            created_at: None,
            updated_at: None,
        });

        let order = h.orders.cancel_order(OrderId::new(5)).await.unwrap();

        assert_eq!(order.status, OrderStatus::Cancelled);
        assert_eq!(h.fx.messages(), vec!["Order cancelled"]);
    }
}
