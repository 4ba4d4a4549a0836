//! Catalog types: products, categories, and listing filters.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use easybuy_core::{CategoryId, Price, ProductId, ProductImageId};

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub product_count: u32,
}

/// An image attached to a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    pub id: ProductImageId,
    pub url: String,
    #[serde(default)]
    pub alt_text: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub order: u32,
}

/// A product as served by the catalog.
///
/// Read-only on the client. `stock` is unsigned, so it can never go below
/// zero; an unavailable product cannot be carted whatever its stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    /// Unit price in XAF.
    pub price: Decimal,
    /// Price before discount, for strike-through display.
    #[serde(default)]
    pub original_price: Option<Decimal>,
    #[serde(default)]
    pub discount_percentage: Option<Decimal>,
    pub stock: u32,
    #[serde(default)]
    pub in_stock: bool,
    pub is_available: bool,
    #[serde(default)]
    pub is_featured: bool,
    pub category: Category,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub images: Vec<ProductImage>,
    #[serde(default)]
    pub specifications: BTreeMap<String, String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Unit price with currency.
    #[must_use]
    pub const fn unit_price(&self) -> Price {
        Price::xaf(self.price)
    }

    /// Whether `quantity` units could be put in a cart right now.
    #[must_use]
    pub const fn can_purchase(&self, quantity: u32) -> bool {
        self.is_available && quantity >= 1 && quantity <= self.stock
    }

    /// Whether the product is shown with a reduced price.
    #[must_use]
    pub fn is_discounted(&self) -> bool {
        self.original_price.is_some_and(|original| original > self.price)
    }

    /// URL of the image to show first: the primary image, else the first
    /// gallery image, else the legacy single image.
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.images
            .iter()
            .find(|img| img.is_primary)
            .or_else(|| self.images.first())
            .map(|img| img.url.as_str())
            .or(self.image_url.as_deref())
    }
}

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Paginated<T> {
    /// Whether another page follows this one.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.next.is_some()
    }
}

/// Listing sort orders understood by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    PriceAsc,
    PriceDesc,
    NameAsc,
    NameDesc,
    Newest,
}

impl SortBy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PriceAsc => "price_asc",
            Self::PriceDesc => "price_desc",
            Self::NameAsc => "name_asc",
            Self::NameDesc => "name_desc",
            Self::Newest => "newest",
        }
    }
}

/// Filters for the product listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilters {
    /// Category slug.
    pub category: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub search: Option<String>,
    pub sort_by: Option<SortBy>,
    pub is_featured: Option<bool>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl ProductFilters {
    /// Query parameters for this filter set. Unset filters are omitted.
    #[must_use]
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(category) = &self.category {
            params.push(("category", category.clone()));
        }
        if let Some(min) = self.min_price {
            params.push(("min_price", min.to_string()));
        }
        if let Some(max) = self.max_price {
            params.push(("max_price", max.to_string()));
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.trim().is_empty()) {
            params.push(("search", search.trim().to_string()));
        }
        if let Some(sort_by) = self.sort_by {
            params.push(("sort_by", sort_by.as_str().to_string()));
        }
        if let Some(featured) = self.is_featured {
            params.push(("is_featured", featured.to_string()));
        }
        if let Some(page) = self.page {
            params.push(("page", page.to_string()));
        }
        if let Some(page_size) = self.page_size {
            params.push(("page_size", page_size.to_string()));
        }
        params
    }
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    /// Minimal product for tests elsewhere in the crate.
    pub(crate) fn product(id: i64, price: i64, stock: u32) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            slug: format!("product-{id}"),
            description: String::new(),
            price: Decimal::from(price),
            original_price: None,
            discount_percentage: None,
            stock,
            in_stock: stock > 0,
            is_available: true,
            is_featured: false,
            category: Category {
                id: CategoryId::new(1),
                name: "Electronics".to_string(),
                slug: "electronics".to_string(),
                description: None,
                is_active: true,
                product_count: 0,
            },
            image_url: None,
            images: Vec::new(),
            specifications: BTreeMap::new(),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_deserialize_backend_payload() {
        let json = r#"{
            "id": 3,
            "name": "Fer a repasser",
            "slug": "fer-a-repasser",
            "price": 15000,
            "original_price": "18000.00",
            "stock": 4,
            "is_available": true,
            "category": {"id": 2, "name": "Maison", "slug": "maison"},
            "images": [
                {"id": 1, "url": "https://cdn/a.jpg", "order": 1},
                {"id": 2, "url": "https://cdn/b.jpg", "is_primary": true, "order": 2}
            ],
            "created_at": "2025-01-10T08:30:00Z"
        }"#;

        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.price, Decimal::from(15_000));
        assert_eq!(product.original_price, Some(Decimal::from(18_000)));
        assert!(product.is_discounted());
        assert_eq!(product.primary_image(), Some("https://cdn/b.jpg"));
        assert!(product.category.is_active);
        assert!(product.created_at.is_some());
    }

    #[test]
    fn test_can_purchase() {
        let mut p = product(1, 1000, 5);
        assert!(p.can_purchase(5));
        assert!(!p.can_purchase(6));
        assert!(!p.can_purchase(0));

        p.is_available = false;
        assert!(!p.can_purchase(1));
    }

    #[test]
    fn test_primary_image_falls_back_to_legacy_url() {
        let mut p = product(1, 1000, 5);
        assert_eq!(p.primary_image(), None);
        p.image_url = Some("https://cdn/legacy.jpg".to_string());
        assert_eq!(p.primary_image(), Some("https://cdn/legacy.jpg"));
    }

    #[test]
    fn test_filters_to_query_skips_unset_and_blank() {
        let filters = ProductFilters {
            category: Some("maison".to_string()),
            search: Some("   ".to_string()),
            sort_by: Some(SortBy::PriceDesc),
            page: Some(2),
            ..ProductFilters::default()
        };

        assert_eq!(
            filters.to_query(),
            vec![
                ("category", "maison".to_string()),
                ("sort_by", "price_desc".to_string()),
                ("page", "2".to_string()),
            ]
        );
    }
}
