//! Delivery cities and messaging-redirect orders.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use easybuy_core::{CityId, OrderId, OrderStatus, ProductId, UserId};

/// A delivery city with its own WhatsApp order line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    pub id: CityId,
    pub name: String,
    pub whatsapp_number: String,
    #[serde(default)]
    pub display_order: u32,
}

/// An order as listed in the order history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user: UserId,
    pub product_name: String,
    pub product_price: Decimal,
    pub city_name: String,
    pub status: OrderStatus,
    #[serde(default)]
    pub status_display: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Per-status order counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStats {
    pub total_orders: u64,
    pub redirected: u64,
    pub completed: u64,
    pub cancelled: u64,
}

/// Request to order a single product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InitiateOrder {
    pub product_id: ProductId,
    pub city_id: CityId,
    pub quantity: u32,
}

/// One line of a cart order request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Request to order the whole cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InitiateCartOrder {
    pub items: Vec<OrderLineRequest>,
    pub city_id: CityId,
}

/// Backend reply to [`InitiateOrder`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InitiateOrderResponse {
    pub order_id: OrderId,
    /// Messaging deep link prefilled with the order text.
    pub whatsapp_url: String,
    pub city: String,
    pub product: String,
    pub price: Decimal,
}

/// Backend reply to [`InitiateCartOrder`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InitiateCartOrderResponse {
    pub order_ids: Vec<OrderId>,
    /// Messaging deep link prefilled with the order text.
    pub whatsapp_url: String,
    pub city: String,
    pub items_count: u32,
    pub total_price: Decimal,
}
