//! Cart commands.

use easybuy_core::ProductId;
use easybuy_storefront::api::ApiGateway;
use easybuy_storefront::cart::CartOutcome;
use easybuy_storefront::error::AppError;
use easybuy_storefront::state::AppState;

/// Refused cart operations fail the command; the notice explains why.
fn check(outcome: CartOutcome) -> Result<(), AppError> {
    match outcome {
        CartOutcome::Rejected(reason) => Err(AppError::BadRequest(reason.message().to_string())),
        _ => Ok(()),
    }
}

/// Print the cart with its totals.
#[allow(clippy::print_stdout)]
pub fn show(state: &AppState) {
    let cart = state.cart().cart();
    if cart.is_empty() {
        println!("Your cart is empty.");
        return;
    }

    for line in &cart.items {
        println!(
            "{:>5}  {:<40}  {:>3} x {:>12}  = {:>14}",
            line.product.id,
            line.product.name,
            line.quantity,
            line.product.unit_price().display(),
            easybuy_core::Price::xaf(line.line_total()).display()
        );
    }
    println!(
        "{} item(s), total {}",
        cart.item_count,
        cart.total_price().display()
    );
}

/// Fetch a product and put it in the cart.
pub async fn add(state: &AppState, slug: &str, quantity: u32) -> Result<(), AppError> {
    let product = state.gateway().fetch_product(slug).await?;
    check(state.cart().add_to_cart(&product, quantity))
}

pub fn set(state: &AppState, id: ProductId, quantity: i64) -> Result<(), AppError> {
    if !state.cart().is_in_cart(id) {
        return Err(AppError::NotFound(format!("product {id} is not in the cart")));
    }
    check(state.cart().update_quantity(id, quantity))
}

pub fn remove(state: &AppState, id: ProductId) {
    state.cart().remove_from_cart(id);
}

pub fn clear(state: &AppState) {
    state.cart().clear_cart();
}
