//! Views, locations, and navigation.
//!
//! [`View`] is the storefront's route table. A [`Location`] is where the
//! visitor is, optionally remembering where they were headed before a
//! redirect, and a [`Navigator`] moves them around.

use std::sync::{Mutex, PoisonError};

use easybuy_core::OrderId;

use crate::guard::Access;

/// A place in the storefront.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Path of the view, e.g. `/produits/tv-55`.
    pub path: String,
    /// Path to return to once the visitor is allowed there.
    pub from: Option<String>,
}

impl Location {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            from: None,
        }
    }

    /// Location that remembers `from` as the return target.
    #[must_use]
    pub fn with_from(path: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            from: Some(from.into()),
        }
    }

    /// The view this location points at, if it is a known route.
    #[must_use]
    pub fn view(&self) -> Option<View> {
        View::parse(&self.path)
    }
}

impl From<View> for Location {
    fn from(view: View) -> Self {
        Self::new(view.path())
    }
}

/// Every routable view of the storefront.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Home,
    Products,
    ProductDetail(String),
    Cart,
    Checkout,
    Login,
    Register,
    Profile,
    Orders,
    OrderDetail(OrderId),
    SpecialRequest,
    About,
    HowItWorks,
    Faq,
    Contact,
    Terms,
    Privacy,
}

impl View {
    /// Path of this view.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Home => "/".to_string(),
            Self::Products => "/produits".to_string(),
            Self::ProductDetail(slug) => format!("/produits/{slug}"),
            Self::Cart => "/panier".to_string(),
            Self::Checkout => "/commander".to_string(),
            Self::Login => "/login".to_string(),
            Self::Register => "/inscription".to_string(),
            Self::Profile => "/profil".to_string(),
            Self::Orders => "/mes-commandes".to_string(),
            Self::OrderDetail(id) => format!("/commande/{id}"),
            Self::SpecialRequest => "/demande-speciale".to_string(),
            Self::About => "/a-propos".to_string(),
            Self::HowItWorks => "/comment-ca-marche".to_string(),
            Self::Faq => "/faq".to_string(),
            Self::Contact => "/contact".to_string(),
            Self::Terms => "/conditions".to_string(),
            Self::Privacy => "/politique-confidentialite".to_string(),
        }
    }

    /// Match a path against the route table.
    ///
    /// Query strings, fragments, and a trailing slash are ignored.
    #[must_use]
    pub fn parse(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');
        let segments: Vec<&str> = trimmed.split('/').skip(1).collect();

        let view = match segments.as_slice() {
            [] => Self::Home,
            ["produits"] => Self::Products,
            ["produits", slug] if !slug.is_empty() => Self::ProductDetail((*slug).to_string()),
            ["panier"] => Self::Cart,
            ["commander"] => Self::Checkout,
            ["login"] => Self::Login,
            ["inscription"] => Self::Register,
            ["profil"] => Self::Profile,
            ["mes-commandes"] => Self::Orders,
            ["commande", id] => Self::OrderDetail(id.parse().ok()?),
            ["demande-speciale"] => Self::SpecialRequest,
            ["a-propos"] => Self::About,
            ["comment-ca-marche"] => Self::HowItWorks,
            ["faq"] => Self::Faq,
            ["contact"] => Self::Contact,
            ["conditions"] => Self::Terms,
            ["politique-confidentialite"] => Self::Privacy,
            _ => return None,
        };
        Some(view)
    }

    /// Access requirement declared by this view.
    #[must_use]
    pub const fn access(&self) -> Access {
        match self {
            Self::Checkout
            | Self::Profile
            | Self::Orders
            | Self::OrderDetail(_)
            | Self::SpecialRequest => Access::Protected,
            Self::Login | Self::Register => Access::GuestOnly,
            _ => Access::Public,
        }
    }

    /// Whether this is a sign-in or sign-up view.
    #[must_use]
    pub const fn is_auth_view(&self) -> bool {
        matches!(self, Self::Login | Self::Register)
    }
}

/// Moves the visitor between locations.
///
/// Navigation replaces the current location, like a redirect.
pub trait Navigator: Send + Sync {
    /// Where the visitor currently is.
    fn current(&self) -> Location;

    /// Move the visitor to `to`.
    fn navigate(&self, to: Location);
}

/// Navigator that tracks the current location and a history in memory.
#[derive(Debug)]
pub struct MemoryNavigator {
    state: Mutex<NavState>,
}

#[derive(Debug)]
struct NavState {
    current: Location,
    history: Vec<Location>,
}

impl MemoryNavigator {
    /// Start at `start`.
    #[must_use]
    pub fn new(start: Location) -> Self {
        Self {
            state: Mutex::new(NavState {
                current: start,
                history: Vec::new(),
            }),
        }
    }

    /// Locations navigated to, oldest first. The start location is not
    /// included.
    #[must_use]
    pub fn history(&self) -> Vec<Location> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .history
            .clone()
    }
}

impl Default for MemoryNavigator {
    fn default() -> Self {
        Self::new(Location::from(View::Home))
    }
}

impl Navigator for MemoryNavigator {
    fn current(&self) -> Location {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .current
            .clone()
    }

    fn navigate(&self, to: Location) {
        tracing::debug!(path = %to.path, from = ?to.from, "navigate");
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.history.push(to.clone());
        state.current = to;
    }
}
