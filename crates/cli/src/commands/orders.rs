//! WhatsApp order commands.

use easybuy_core::{CityId, OrderId, Price};
use easybuy_storefront::api::ApiGateway;
use easybuy_storefront::checkout::OrderRedirect;
use easybuy_storefront::error::AppError;
use easybuy_storefront::models::City;
use easybuy_storefront::navigation::View;
use easybuy_storefront::state::AppState;

use super::enter;

async fn find_city(state: &AppState, id: CityId) -> Result<City, AppError> {
    state
        .gateway()
        .list_cities()
        .await?
        .into_iter()
        .find(|city| city.id == id)
        .ok_or_else(|| AppError::NotFound(format!("city {id}")))
}

#[allow(clippy::print_stdout)]
fn print_redirect(redirect: &OrderRedirect) {
    let ids: Vec<String> = redirect.order_ids.iter().map(ToString::to_string).collect();
    println!(
        "Order {} for {} ({})",
        ids.join(", "),
        redirect.city,
        Price::xaf(redirect.total).display()
    );
    println!("Finish on WhatsApp: {}", redirect.url);
}

/// List the signed-in user's orders with per-status counts.
#[allow(clippy::print_stdout)]
pub async fn history(state: &AppState) -> Result<(), AppError> {
    enter(state, &View::Orders)?;

    let orders = state.orders().order_history().await?;
    if orders.is_empty() {
        println!("No orders yet.");
    }
    for order in &orders {
        let status = if order.status_display.is_empty() {
            order.status.to_string()
        } else {
            order.status_display.clone()
        };
        let placed = order
            .created_at
            .map(|at| at.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        println!(
            "{:>6}  {:<10}  {:<36}  {:>14}  {:<12}  {}",
            order.id,
            placed,
            order.product_name,
            Price::xaf(order.product_price).display(),
            order.city_name,
            status
        );
    }

    let stats = state.orders().order_stats().await?;
    println!(
        "{} order(s): {} redirected, {} completed, {} cancelled",
        stats.total_orders, stats.redirected, stats.completed, stats.cancelled
    );
    Ok(())
}

/// Order one product for delivery in `city`.
pub async fn order_product(
    state: &AppState,
    slug: &str,
    city: CityId,
    quantity: u32,
) -> Result<(), AppError> {
    enter(state, &View::ProductDetail(slug.to_string()))?;

    let product = state.gateway().fetch_product(slug).await?;
    let city = find_city(state, city).await?;
    let redirect = state
        .orders()
        .order_product(&product, &city, quantity)
        .await?;
    print_redirect(&redirect);
    Ok(())
}

/// Order the whole cart for delivery in `city`.
pub async fn checkout(state: &AppState, city: CityId) -> Result<(), AppError> {
    enter(state, &View::Checkout)?;

    let city = find_city(state, city).await?;
    let redirect = state.orders().order_cart(&city).await?;
    print_redirect(&redirect);
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn cancel(state: &AppState, id: OrderId) -> Result<(), AppError> {
    enter(state, &View::Orders)?;
    let order = state.orders().cancel_order(id).await?;
    println!("Order {} is now {}", order.id, order.status);
    Ok(())
}

#[allow(clippy::print_stdout)]
pub fn support(state: &AppState, message: &str) -> Result<(), AppError> {
    let url = state.orders().support_link(message)?;
    println!("{url}");
    Ok(())
}
