//! Route guard.
//!
//! Decides, from session state alone, whether a requested view renders, waits,
//! or redirects. Unknown paths are treated as public.

use crate::navigation::{Location, Navigator, View};
use crate::session::{SessionManager, SessionSnapshot};

/// Access requirement declared by a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    /// Anyone may view.
    Public,
    /// Requires a signed-in user.
    Protected,
    /// Only for visitors who are not signed in (login, register).
    GuestOnly,
}

/// Outcome of a guard check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session state is still settling; show a neutral placeholder.
    Loading,
    /// Show the requested view.
    Render,
    /// Send the visitor elsewhere.
    Redirect(Location),
}

/// Decide what to do with a request for `location`.
///
/// Public views render immediately, even while the session is loading.
#[must_use]
pub fn evaluate(location: &Location, session: &SessionSnapshot) -> GuardDecision {
    let access = location.view().map_or(Access::Public, |view| view.access());

    match access {
        Access::Public => GuardDecision::Render,
        _ if session.is_loading => GuardDecision::Loading,
        Access::Protected if !session.is_authenticated() => {
            GuardDecision::Redirect(Location::with_from(View::Login.path(), location.path.clone()))
        }
        Access::GuestOnly if session.is_authenticated() => {
            GuardDecision::Redirect(return_target(location))
        }
        Access::Protected | Access::GuestOnly => GuardDecision::Render,
    }
}

/// Where an authenticated visitor leaving a guest-only view should land.
fn return_target(location: &Location) -> Location {
    location
        .from
        .as_deref()
        .filter(|from| View::parse(from).is_none_or(|view| view.access() != Access::GuestOnly))
        .map_or_else(|| Location::from(View::Home), Location::new)
}

/// Route guard bound to a session.
#[derive(Clone)]
pub struct RouteGuard {
    session: SessionManager,
}

impl RouteGuard {
    #[must_use]
    pub const fn new(session: SessionManager) -> Self {
        Self { session }
    }

    /// Decide what to do with a request for `location` given the current
    /// session.
    #[must_use]
    pub fn check(&self, location: &Location) -> GuardDecision {
        evaluate(location, &self.session.snapshot())
    }

    /// Check the navigator's current location and follow a redirect, if any.
    ///
    /// Returns the decision taken for the location that was current on entry.
    pub fn apply(&self, navigator: &dyn Navigator) -> GuardDecision {
        let current = navigator.current();
        let decision = self.check(&current);
        if let GuardDecision::Redirect(to) = &decision {
            tracing::debug!(from = %current.path, to = %to.path, "Route guard redirect");
            navigator.navigate(to.clone());
        }
        decision
    }
}
