//! Cart manager.
//!
//! Owns the visitor's cart lines. Every mutation is validated against the
//! product's stock and availability, applied under one lock, mirrored to the
//! persisted store, and then announced to subscribers and the notifier.
//!
//! Rejections never surface as errors: they produce a notice and a
//! [`CartOutcome::Rejected`] and leave the cart untouched.

use std::sync::{Arc, Mutex, PoisonError};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use easybuy_core::{Price, ProductId};

use crate::error::add_breadcrumb;
use crate::models::Product;
use crate::notice::{Notice, Notifier};
use crate::observe::{Observers, Subscription};
use crate::storage::{self, KeyValueStore, keys};

/// One product and how many of it are in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    /// Product as it was when first added.
    pub product: Product,
    /// Always at least 1.
    pub quantity: u32,
}

impl CartLine {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.product.price * Decimal::from(self.quantity)
    }
}

/// Read-only view of the cart, with totals computed from the lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartSnapshot {
    pub items: Vec<CartLine>,
    /// Sum of unit price times quantity over all lines.
    pub total: Decimal,
    /// Sum of quantities over all lines.
    pub item_count: u32,
}

impl CartSnapshot {
    fn from_lines(lines: &[CartLine]) -> Self {
        Self {
            items: lines.to_vec(),
            total: lines.iter().map(CartLine::line_total).sum(),
            item_count: lines.iter().map(|line| line.quantity).sum(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total with currency, for display.
    #[must_use]
    pub const fn total_price(&self) -> Price {
        Price::xaf(self.total)
    }
}

/// What a cart operation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartOutcome {
    /// A new line was appended.
    Added,
    /// An existing line's quantity changed.
    Updated,
    /// A line was deleted.
    Removed,
    /// All lines were deleted.
    Cleared,
    /// Nothing to do; the cart is unchanged.
    Unchanged,
    /// The request was refused; the cart is unchanged.
    Rejected(CartRejection),
}

impl CartOutcome {
    /// Whether the cart changed.
    #[must_use]
    pub const fn is_applied(self) -> bool {
        matches!(
            self,
            Self::Added | Self::Updated | Self::Removed | Self::Cleared
        )
    }
}

/// Why a cart operation was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartRejection {
    /// The product is flagged unavailable.
    Unavailable,
    /// Quantity must be at least 1.
    InvalidQuantity,
    /// More units requested than the product has in stock.
    InsufficientStock { available: u32 },
    /// Adding to the existing line would exceed stock.
    ExceedsStock { available: u32 },
}

impl CartRejection {
    /// Notice text shown for this rejection.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Unavailable => "This product is not available",
            Self::InvalidQuantity => "Quantity must be at least 1",
            Self::InsufficientStock { .. } => "Insufficient stock",
            Self::ExceedsStock { .. } => "Requested quantity exceeds available stock",
        }
    }
}

/// The cart store.
///
/// Cheap to clone; clones share the same cart.
#[derive(Clone)]
pub struct CartManager {
    inner: Arc<CartInner>,
}

struct CartInner {
    lines: Mutex<Vec<CartLine>>,
    store: Arc<dyn KeyValueStore>,
    notifier: Arc<dyn Notifier>,
    observers: Observers<CartSnapshot>,
}

impl CartManager {
    /// Create a cart from whatever the store holds.
    ///
    /// A missing entry is an empty cart. An unreadable entry is logged,
    /// discarded, and also yields an empty cart.
    #[must_use]
    pub fn restore(store: Arc<dyn KeyValueStore>, notifier: Arc<dyn Notifier>) -> Self {
        let lines = match storage::read_json::<Vec<CartLine>>(store.as_ref(), keys::CART) {
            Ok(Some(lines)) => lines
                .into_iter()
                .filter(|line| line.quantity >= 1)
                .collect(),
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable persisted cart");
                storage::remove_all(store.as_ref(), &[keys::CART]);
                Vec::new()
            }
        };

        tracing::debug!(lines = lines.len(), "Cart restored");

        Self {
            inner: Arc::new(CartInner {
                lines: Mutex::new(lines),
                store,
                notifier,
                observers: Observers::new(),
            }),
        }
    }

    /// Current cart with freshly computed totals.
    #[must_use]
    pub fn cart(&self) -> CartSnapshot {
        CartSnapshot::from_lines(&self.lock())
    }

    #[must_use]
    pub fn is_in_cart(&self, product_id: ProductId) -> bool {
        self.lock().iter().any(|line| line.product.id == product_id)
    }

    /// Quantity of `product_id` in the cart, 0 when absent.
    #[must_use]
    pub fn get_item_quantity(&self, product_id: ProductId) -> u32 {
        self.lock()
            .iter()
            .find(|line| line.product.id == product_id)
            .map_or(0, |line| line.quantity)
    }

    /// Be told of every committed change.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&CartSnapshot) + Send + Sync + 'static,
    {
        self.inner.observers.subscribe(listener)
    }

    /// Put `quantity` units of `product` in the cart.
    ///
    /// Adding a product already in the cart raises that line's quantity. If
    /// the combined quantity would exceed stock, nothing changes.
    pub fn add_to_cart(&self, product: &Product, quantity: u32) -> CartOutcome {
        let outcome = self.mutate(|lines| {
            if !product.is_available {
                return CartOutcome::Rejected(CartRejection::Unavailable);
            }
            if quantity == 0 {
                return CartOutcome::Rejected(CartRejection::InvalidQuantity);
            }
            if quantity > product.stock {
                return CartOutcome::Rejected(CartRejection::InsufficientStock {
                    available: product.stock,
                });
            }

            match lines.iter_mut().find(|line| line.product.id == product.id) {
                Some(line) => {
                    let combined = line.quantity.saturating_add(quantity);
                    if combined > product.stock {
                        return CartOutcome::Rejected(CartRejection::ExceedsStock {
                            available: product.stock,
                        });
                    }
                    line.quantity = combined;
                    CartOutcome::Updated
                }
                None => {
                    lines.push(CartLine {
                        product: product.clone(),
                        quantity,
                    });
                    CartOutcome::Added
                }
            }
        });

        match outcome {
            CartOutcome::Added => self.announce(Notice::success("Product added to cart")),
            CartOutcome::Updated => self.announce(Notice::success("Cart quantity updated")),
            CartOutcome::Rejected(reason) => self.announce(Notice::error(reason.message())),
            _ => {}
        }

        if outcome.is_applied() {
            let id = product.id.to_string();
            let qty = quantity.to_string();
            add_breadcrumb(
                "cart",
                "Added to cart",
                Some(&[("product_id", id.as_str()), ("quantity", qty.as_str())]),
            );
        }

        outcome
    }

    /// Delete the line for `product_id`. Absent products are ignored.
    pub fn remove_from_cart(&self, product_id: ProductId) -> CartOutcome {
        let outcome = self.mutate(|lines| {
            let before = lines.len();
            lines.retain(|line| line.product.id != product_id);
            if lines.len() == before {
                CartOutcome::Unchanged
            } else {
                CartOutcome::Removed
            }
        });

        if outcome == CartOutcome::Removed {
            self.announce(Notice::success("Product removed from cart"));
            let id = product_id.to_string();
            add_breadcrumb("cart", "Removed from cart", Some(&[("product_id", id.as_str())]));
        }

        outcome
    }

    /// Set the quantity of an existing line.
    ///
    /// Zero or less removes the line. Unknown products are ignored.
    pub fn update_quantity(&self, product_id: ProductId, quantity: i64) -> CartOutcome {
        if quantity <= 0 {
            return self.remove_from_cart(product_id);
        }

        let outcome = self.mutate(|lines| {
            let Some(line) = lines.iter_mut().find(|line| line.product.id == product_id) else {
                return CartOutcome::Unchanged;
            };
            let available = line.product.stock;
            match u32::try_from(quantity) {
                Ok(quantity) if quantity <= available => {
                    if line.quantity == quantity {
                        CartOutcome::Unchanged
                    } else {
                        line.quantity = quantity;
                        CartOutcome::Updated
                    }
                }
                _ => CartOutcome::Rejected(CartRejection::InsufficientStock { available }),
            }
        });

        if let CartOutcome::Rejected(reason) = outcome {
            self.announce(Notice::error(reason.message()));
        }

        outcome
    }

    /// Empty the cart.
    pub fn clear_cart(&self) -> CartOutcome {
        let outcome = self.clear_silently();
        self.announce(Notice::success("Cart emptied"));
        add_breadcrumb("cart", "Cart cleared", None);
        outcome
    }

    /// Empty the cart without a notice, after a completed checkout.
    pub(crate) fn clear_silently(&self) -> CartOutcome {
        self.mutate(|lines| {
            lines.clear();
            CartOutcome::Cleared
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<CartLine>> {
        self.inner.lines.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `op` under the lock and mirror the result; subscribers hear
    /// about applied changes after the lock is released.
    fn mutate(&self, op: impl FnOnce(&mut Vec<CartLine>) -> CartOutcome) -> CartOutcome {
        let (outcome, snapshot) = {
            let mut lines = self.lock();
            let outcome = op(&mut lines);
            if !outcome.is_applied() {
                return outcome;
            }
            if let Err(e) = storage::write_json(self.inner.store.as_ref(), keys::CART, &*lines) {
                tracing::error!(error = %e, "Failed to persist cart");
            }
            (outcome, CartSnapshot::from_lines(&lines))
        };

        tracing::debug!(
            outcome = ?outcome,
            item_count = snapshot.item_count,
            total = %snapshot.total,
            "Cart changed"
        );
        self.inner.observers.notify(&snapshot);
        outcome
    }

    fn announce(&self, notice: Notice) {
        self.inner.notifier.notify(notice);
    }
}
