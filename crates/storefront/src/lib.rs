//! EasyBuy Storefront library.
//!
//! The client-side state core of the storefront: a cart and a session, both
//! observable in-memory stores mirrored to a durable key-value store, plus
//! the REST gateway they talk to and the route guard that reads the session.
//!
//! # Modules
//!
//! - [`storage`] - Persisted key-value mirror (memory and file backed)
//! - [`api`] - Remote API gateway trait and its `reqwest` implementation
//! - [`cart`] - Cart manager
//! - [`session`] - Session/auth manager
//! - [`guard`] - Route guard over session state
//! - [`checkout`] - WhatsApp-redirect order initiation
//! - [`state`] - Wiring of all of the above into one shared handle

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod error;
pub mod guard;
pub mod models;
pub mod navigation;
pub mod notice;
pub mod observe;
pub mod session;
pub mod state;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_support;
