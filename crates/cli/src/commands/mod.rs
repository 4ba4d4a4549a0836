//! CLI command implementations.

pub mod account;
pub mod cart;
pub mod catalog;
pub mod orders;

use std::process::ExitCode;

use easybuy_storefront::error::AppError;
use easybuy_storefront::guard::GuardDecision;
use easybuy_storefront::navigation::{Location, View};
use easybuy_storefront::notice::{Notice, NoticeLevel};
use easybuy_storefront::session::SessionError;
use easybuy_storefront::state::AppState;

/// Move to `view` and let the route guard decide whether the command may
/// go on.
pub fn enter(state: &AppState, view: &View) -> Result<(), AppError> {
    state.navigator().navigate(Location::from(view.clone()));
    match state.guard().apply(state.navigator()) {
        GuardDecision::Render => Ok(()),
        GuardDecision::Redirect(to) if to.path == View::Login.path() => {
            Err(SessionError::NotAuthenticated.into())
        }
        GuardDecision::Redirect(_) | GuardDecision::Loading => Ok(()),
    }
}

/// Print notices the way a toast would show them.
#[allow(clippy::print_stdout, clippy::print_stderr)]
pub fn print_notices(notices: &[Notice]) {
    for notice in notices {
        match notice.level {
            NoticeLevel::Success => println!("✓ {}", notice.message),
            NoticeLevel::Info => println!("ℹ {}", notice.message),
            NoticeLevel::Error => eprintln!("✗ {}", notice.message),
        }
    }
}

/// Report a failed command and pick its exit code.
#[allow(clippy::print_stderr)]
pub fn fail(error: &AppError) -> ExitCode {
    error.report();
    if error.is_unauthorized() {
        eprintln!("error: sign in first with `easybuy login`");
    } else {
        eprintln!("error: {error}");
    }
    ExitCode::from(error.exit_code())
}
