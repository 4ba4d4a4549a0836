//! Session manager.
//!
//! Holds at most one signed-in [`User`] and mirrors it, along with the bearer
//! and refresh credentials, to the persisted store.
//!
//! # State
//!
//! ```text
//! Anonymous --login/register/social--> Authenticated
//! Authenticated --logout/revalidation failure/401--> Anonymous
//! ```
//!
//! `is_loading` overlaps either state. It is true until [`SessionManager::start`]
//! has finished and while any other async operation is in flight.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use secrecy::ExposeSecret;
use thiserror::Error;

use crate::api::{ApiError, ApiGateway};
use crate::error::{clear_sentry_user, set_sentry_user};
use crate::models::{
    AuthResponse, LoginCredentials, PasswordChange, RegistrationData, SocialProvider, User,
    UserPatch,
};
use crate::navigation::{Location, Navigator, View};
use crate::notice::{Notice, Notifier};
use crate::observe::{Observers, Subscription};
use crate::storage::{self, KeyValueStore, keys};

/// Errors returned to the caller of a session operation.
///
/// A notice describing the failure has always been emitted already.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Input was refused before any network call.
    #[error("{0}")]
    Validation(String),

    /// The backend refused or could not be reached.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The operation needs a signed-in user.
    #[error("Not signed in")]
    NotAuthenticated,
}

/// Read-only view of the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub user: Option<User>,
    pub is_loading: bool,
}

impl SessionSnapshot {
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

#[derive(Debug)]
struct SessionState {
    user: Option<User>,
    booting: bool,
    pending: usize,
}

impl SessionState {
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            user: self.user.clone(),
            is_loading: self.booting || self.pending > 0,
        }
    }
}

/// The session store.
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    gateway: Arc<dyn ApiGateway>,
    store: Arc<dyn KeyValueStore>,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
    state: Mutex<SessionState>,
    observers: Observers<SessionSnapshot>,
}

/// Marks an operation in flight for as long as it lives.
struct Loading<'a> {
    session: &'a SessionManager,
}

impl Drop for Loading<'_> {
    fn drop(&mut self) {
        self.session
            .update(|state| state.pending = state.pending.saturating_sub(1));
    }
}

impl SessionManager {
    /// Create a session that is loading until [`start`](Self::start) runs.
    #[must_use]
    pub fn new(
        gateway: Arc<dyn ApiGateway>,
        store: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                gateway,
                store,
                notifier,
                navigator,
                state: Mutex::new(SessionState {
                    user: None,
                    booting: true,
                    pending: 0,
                }),
                observers: Observers::new(),
            }),
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.lock().snapshot()
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.lock().user.clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.lock().user.is_some()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.lock().snapshot().is_loading
    }

    /// Be told of every change to the user or the loading flag.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&SessionSnapshot) + Send + Sync + 'static,
    {
        self.inner.observers.subscribe(listener)
    }

    // =========================================================================
    // Startup
    // =========================================================================

    /// Restore a persisted session and revalidate it against the backend.
    ///
    /// The cached user is shown optimistically while the profile is fetched.
    /// Any failure drops the persisted identity. Loading ends only after
    /// this completes.
    pub async fn start(&self) {
        let token = self.read_key(keys::AUTH_TOKEN);
        let cached = match storage::read_json::<User>(self.inner.store.as_ref(), keys::AUTH_USER) {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable persisted user");
                self.clear_identity();
                None
            }
        };

        if let (Some(_), Some(user)) = (token, cached) {
            self.update(|state| state.user = Some(user));

            match self.inner.gateway.fetch_current_profile().await {
                Ok(user) => {
                    tracing::info!(user_id = %user.id, "Session restored");
                    self.store_user(user);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Persisted session failed revalidation");
                    self.clear_identity();
                }
            }
        }

        self.update(|state| state.booting = false);
    }

    // =========================================================================
    // Sign-in flows
    // =========================================================================

    /// Sign in with email and password.
    ///
    /// Navigation is left to the route guard, which returns the visitor to
    /// where they were headed.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Api` if the backend refuses the credentials.
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<User, SessionError> {
        let _loading = self.begin();

        match self.inner.gateway.authenticate(credentials).await {
            Ok(response) => {
                let user = self.establish(response);
                self.announce(Notice::success("Signed in successfully"));
                Ok(user)
            }
            Err(e) => Err(self.report_failure(e, "Login failed")),
        }
    }

    /// Create an account and sign in with it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Validation` if the form is invalid, or
    /// `SessionError::Api` if the backend refuses it.
    pub async fn register(&self, data: &RegistrationData) -> Result<User, SessionError> {
        if let Err(message) = data.validate() {
            self.announce(Notice::error(message.clone()));
            return Err(SessionError::Validation(message));
        }

        let _loading = self.begin();

        match self.inner.gateway.register(data).await {
            Ok(response) => {
                let user = self.establish(response);
                self.announce(Notice::success("Account created successfully"));
                Ok(user)
            }
            Err(e) => Err(self.report_failure(e, "Registration failed")),
        }
    }

    /// Sign in with a Google ID token, then go home.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Api` if the exchange fails.
    pub async fn google_login(&self, id_token: &str) -> Result<User, SessionError> {
        self.social_login(SocialProvider::Google, id_token).await
    }

    /// Sign in with a Facebook access token, then go home.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Api` if the exchange fails.
    pub async fn facebook_login(&self, access_token: &str) -> Result<User, SessionError> {
        self.social_login(SocialProvider::Facebook, access_token).await
    }

    async fn social_login(
        &self,
        provider: SocialProvider,
        token: &str,
    ) -> Result<User, SessionError> {
        let _loading = self.begin();

        match self
            .inner
            .gateway
            .exchange_social_credential(provider, token)
            .await
        {
            Ok(response) => {
                let user = self.establish(response);
                self.announce(Notice::success(format!("Signed in with {provider}")));
                self.inner.navigator.navigate(Location::from(View::Home));
                Ok(user)
            }
            Err(e) => Err(self.report_failure(e, &format!("{provider} sign-in failed"))),
        }
    }

    // =========================================================================
    // Sign-out
    // =========================================================================

    /// Sign out.
    ///
    /// The backend is asked to revoke the refresh credential, but local
    /// sign-out happens whatever it answers.
    pub async fn logout(&self) {
        let _loading = self.begin();

        if let Some(refresh) = self.read_key(keys::REFRESH_TOKEN) {
            if let Err(e) = self.inner.gateway.invalidate_session(&refresh).await {
                tracing::error!(error = %e, "Backend logout failed, signing out locally");
            }
        }

        self.clear_identity();
        self.announce(Notice::success("Signed out"));
        self.inner.navigator.navigate(Location::from(View::Home));
    }

    /// Drop the session without contacting the backend.
    ///
    /// Runs when the gateway sees a 401. Safe to call when already signed out.
    pub fn invalidate(&self) {
        if self.is_authenticated() {
            tracing::info!("Session invalidated");
        }
        self.clear_identity();
    }

    /// Callback that invalidates this session, for the gateway's
    /// unauthorized hook.
    ///
    /// Holds the session weakly, so the gateway does not keep it alive.
    #[must_use]
    pub fn invalidation_handler(&self) -> impl Fn() + Send + Sync + 'static {
        let weak: Weak<SessionInner> = Arc::downgrade(&self.inner);
        move || {
            if let Some(inner) = weak.upgrade() {
                Self { inner }.invalidate();
            }
        }
    }

    // =========================================================================
    // Profile
    // =========================================================================

    /// Merge `patch` into the local user without calling the backend.
    ///
    /// Returns `false` when nobody is signed in.
    pub fn update_user(&self, patch: &UserPatch) -> bool {
        let Some(mut user) = self.user() else {
            return false;
        };
        patch.apply(&mut user);
        self.store_user(user);
        true
    }

    /// Re-fetch the authoritative profile.
    ///
    /// A 401 signs the visitor out; other failures are logged and the local
    /// user is kept.
    pub async fn refresh_user(&self) -> Option<User> {
        let _loading = self.begin();

        match self.inner.gateway.fetch_current_profile().await {
            Ok(user) => {
                self.store_user(user.clone());
                Some(user)
            }
            Err(e) if e.is_unauthorized() => {
                tracing::info!("Profile refresh unauthorized, signing out");
                self.clear_identity();
                None
            }
            Err(e) => {
                tracing::error!(error = %e, "Profile refresh failed");
                None
            }
        }
    }

    /// Send a profile update and store the user the backend returns.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotAuthenticated` when nobody is signed in, or
    /// `SessionError::Api` if the backend refuses the update.
    pub async fn save_profile(&self, patch: &UserPatch) -> Result<User, SessionError> {
        if !self.is_authenticated() {
            return Err(SessionError::NotAuthenticated);
        }

        let _loading = self.begin();

        match self.inner.gateway.update_profile(patch).await {
            Ok(user) => {
                self.store_user(user.clone());
                self.announce(Notice::success("Profile updated"));
                Ok(user)
            }
            Err(e) => Err(self.report_failure(e, "Profile update failed")),
        }
    }

    /// Change the password of the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Validation` if the new password is empty or
    /// unconfirmed, `SessionError::NotAuthenticated` when nobody is signed
    /// in, or `SessionError::Api` if the backend refuses.
    pub async fn change_password(&self, change: &PasswordChange) -> Result<(), SessionError> {
        if !self.is_authenticated() {
            return Err(SessionError::NotAuthenticated);
        }
        if let Err(message) = change.validate() {
            self.announce(Notice::error(message.clone()));
            return Err(SessionError::Validation(message));
        }

        let _loading = self.begin();

        match self.inner.gateway.change_password(change).await {
            Ok(()) => {
                self.announce(Notice::success("Password changed"));
                Ok(())
            }
            Err(e) => Err(self.report_failure(e, "Password change failed")),
        }
    }

    /// Mint a new bearer credential from the persisted refresh credential.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Validation` when no refresh credential is
    /// stored, or `SessionError::Api` if the backend refuses it.
    pub async fn refresh_access_token(&self) -> Result<(), SessionError> {
        let Some(refresh) = self.read_key(keys::REFRESH_TOKEN) else {
            return Err(SessionError::Validation(
                "No refresh credential stored".to_string(),
            ));
        };

        let _loading = self.begin();

        match self.inner.gateway.refresh_access_token(&refresh).await {
            Ok(access) => {
                if let Err(e) = self.inner.store.set(keys::AUTH_TOKEN, &access) {
                    tracing::error!(error = %e, "Failed to persist bearer credential");
                }
                tracing::debug!("Bearer credential refreshed");
                Ok(())
            }
            Err(e) => {
                if e.is_unauthorized() {
                    self.clear_identity();
                }
                Err(e.into())
            }
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `op` to the state, then notify subscribers outside the lock.
    fn update(&self, op: impl FnOnce(&mut SessionState)) {
        let snapshot = {
            let mut state = self.lock();
            op(&mut state);
            state.snapshot()
        };
        self.inner.observers.notify(&snapshot);
    }

    fn begin(&self) -> Loading<'_> {
        self.update(|state| state.pending += 1);
        Loading { session: self }
    }

    fn announce(&self, notice: Notice) {
        self.inner.notifier.notify(notice);
    }

    fn read_key(&self, key: &str) -> Option<String> {
        match self.inner.store.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to read persisted key");
                None
            }
        }
    }

    /// Persist fresh credentials and adopt the user.
    fn establish(&self, response: AuthResponse) -> User {
        let AuthResponse { user, tokens } = response;

        if let Err(e) = self
            .inner
            .store
            .set(keys::AUTH_TOKEN, tokens.access.expose_secret())
        {
            tracing::error!(error = %e, "Failed to persist bearer credential");
        }
        match &tokens.refresh {
            Some(refresh) => {
                if let Err(e) = self.inner.store.set(keys::REFRESH_TOKEN, refresh.expose_secret()) {
                    tracing::error!(error = %e, "Failed to persist refresh credential");
                }
            }
            None => storage::remove_all(self.inner.store.as_ref(), &[keys::REFRESH_TOKEN]),
        }

        tracing::info!(user_id = %user.id, "Signed in");
        self.store_user(user.clone());
        user
    }

    /// Mirror `user` and make it the current user.
    fn store_user(&self, user: User) {
        if let Err(e) = storage::write_json(self.inner.store.as_ref(), keys::AUTH_USER, &user) {
            tracing::error!(error = %e, "Failed to persist user");
        }
        set_sentry_user(&user.id, Some(user.email.as_str()));
        self.update(|state| state.user = Some(user));
    }

    fn clear_identity(&self) {
        storage::remove_all(self.inner.store.as_ref(), &keys::IDENTITY);
        clear_sentry_user();
        self.update(|state| state.user = None);
    }

    /// Emit notices for a backend failure and wrap it for the caller.
    ///
    /// Field errors give one notice per `field: message` pair; otherwise a
    /// single notice carries the backend's message.
    fn report_failure(&self, error: ApiError, context: &str) -> SessionError {
        tracing::warn!(error = %error, "{context}");

        match error.field_errors() {
            Some(fields) => {
                for (field, messages) in fields {
                    for message in messages {
                        self.announce(Notice::error(format!("{field}: {message}")));
                    }
                }
            }
            None => self.announce(Notice::error(error.user_message())),
        }

        SessionError::Api(error)
    }
}
