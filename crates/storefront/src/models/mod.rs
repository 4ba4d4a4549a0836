//! Domain models for the storefront.
//!
//! These mirror the backend's JSON payloads. Fields the backend may omit
//! carry `#[serde(default)]` so an older or leaner response still parses.

pub mod order;
pub mod product;
pub mod session;
pub mod user;

pub use order::{
    City, InitiateCartOrder, InitiateCartOrderResponse, InitiateOrder, InitiateOrderResponse,
    Order, OrderLineRequest, OrderStats,
};
pub use product::{Category, Paginated, Product, ProductFilters, ProductImage, SortBy};
pub use session::{AuthResponse, AuthTokens, SocialProvider};
pub use user::{LoginCredentials, PasswordChange, RegistrationData, User, UserPatch};
