//! Catalog commands.

use easybuy_storefront::api::ApiGateway;
use easybuy_storefront::error::AppError;
use easybuy_storefront::models::{Product, ProductFilters};
use easybuy_storefront::navigation::View;
use easybuy_storefront::state::AppState;

use super::enter;

#[allow(clippy::print_stdout)]
fn print_row(product: &Product) {
    let stock = if !product.is_available {
        "unavailable".to_string()
    } else if product.stock == 0 {
        "out of stock".to_string()
    } else {
        format!("{} in stock", product.stock)
    };
    println!(
        "{:>5}  {:<40}  {:>14}  {}",
        product.id,
        product.slug,
        product.unit_price().display(),
        stock
    );
}

/// List products matching `filters`.
#[allow(clippy::print_stdout)]
pub async fn products(state: &AppState, filters: &ProductFilters) -> Result<(), AppError> {
    enter(state, &View::Products)?;

    let products = match filters.search.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(query) if filters.category.is_none() && filters.page.is_none() => {
            state.gateway().search_products(query).await?
        }
        _ => {
            let page = state.gateway().list_products(filters).await?;
            if page.has_next() {
                tracing::debug!(count = page.count, "More pages available");
            }
            page.results
        }
    };

    if products.is_empty() {
        println!("No products found.");
    }
    for product in &products {
        print_row(product);
    }
    Ok(())
}

/// Show one product in full.
#[allow(clippy::print_stdout)]
pub async fn product(state: &AppState, slug: &str) -> Result<(), AppError> {
    enter(state, &View::ProductDetail(slug.to_string()))?;

    let product = state.gateway().fetch_product(slug).await?;
    let price = product.unit_price();

    println!("{}", product.name);
    println!("  category: {}", product.category.name);
    if let Some(original) = product.original_price.filter(|_| product.is_discounted()) {
        println!(
            "  price:    {} (was {})",
            price.display(),
            easybuy_core::Price::xaf(original).display()
        );
    } else {
        println!("  price:    {}", price.display());
    }
    println!("  stock:    {}", product.stock);
    if let Some(image) = product.primary_image() {
        println!("  image:    {image}");
    }
    let in_cart = state.cart().get_item_quantity(product.id);
    if in_cart > 0 {
        println!("  in cart:  {in_cart}");
    }
    if !product.description.is_empty() {
        println!();
        println!("{}", product.description);
    }
    for (key, value) in &product.specifications {
        println!("  {key}: {value}");
    }
    Ok(())
}

/// List active categories.
#[allow(clippy::print_stdout)]
pub async fn categories(state: &AppState) -> Result<(), AppError> {
    for category in state
        .gateway()
        .list_categories()
        .await?
        .iter()
        .filter(|c| c.is_active)
    {
        println!(
            "{:<24}  {} ({} products)",
            category.slug, category.name, category.product_count
        );
    }
    Ok(())
}

/// List delivery cities.
#[allow(clippy::print_stdout)]
pub async fn cities(state: &AppState) -> Result<(), AppError> {
    for city in state.gateway().list_cities().await? {
        println!("{:>3}  {:<20}  {}", city.id, city.name, city.whatsapp_number);
    }
    Ok(())
}
