//! services/client/src/stores/session.rs
//!
//! The session store: holds the authenticated identity, persists it to durable
//! storage and talks to the remote auth endpoints, falling back to a locally
//! synthesized identity when the service cannot be reached.

use crate::error::{ClientError, ClientResult, Notice};
use arc_swap::ArcSwap;
use nutri_chat_core::domain::{email_local_part, Identity};
use nutri_chat_core::ports::{AuthService, KeyValueStore, PortError};
use regex::Regex;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::{error, info, warn};

/// Durable storage key holding the serialized identity.
pub const USER_STORAGE_KEY: &str = "user";

const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

//=========================================================================================
// State
//=========================================================================================

/// An immutable view of the session, replaced wholesale on every change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub identity: Option<Identity>,
    pub loading: bool,
    pub error: Option<String>,
    pub notice: Option<Notice>,
}

/// The result of a successful login or signup.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthOutcome {
    pub identity: Identity,
    /// Set when the identity was synthesized because the backend was unreachable.
    pub notice: Option<Notice>,
}

//=========================================================================================
// SessionStore
//=========================================================================================

pub struct SessionStore {
    auth: Arc<dyn AuthService>,
    storage: Arc<dyn KeyValueStore>,
    fallback_delay: Duration,
    state: ArcSwap<SessionSnapshot>,
}

impl SessionStore {
    /// Creates the store and restores any persisted session.
    pub fn new(
        auth: Arc<dyn AuthService>,
        storage: Arc<dyn KeyValueStore>,
        fallback_delay: Duration,
    ) -> Self {
        let store = Self {
            auth,
            storage,
            fallback_delay,
            state: ArcSwap::from_pointee(SessionSnapshot::default()),
        };
        store.restore_session();
        store
    }

    /// Reads the persisted identity. A corrupt entry is discarded.
    pub fn restore_session(&self) {
        let raw = match self.storage.get(USER_STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return,
            Err(e) => {
                warn!("Failed to read stored session: {}", e);
                return;
            }
        };

        match serde_json::from_str::<Identity>(&raw) {
            Ok(identity) => {
                info!("Restored session for {}", identity.email);
                self.update(|state| state.identity = Some(identity.clone()));
            }
            Err(e) => {
                warn!("Discarding corrupt stored session: {}", e);
                if let Err(e) = self.storage.remove(USER_STORAGE_KEY) {
                    error!("Failed to remove corrupt stored session: {}", e);
                }
            }
        }
    }

    pub fn snapshot(&self) -> Arc<SessionSnapshot> {
        self.state.load_full()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.state.load().identity.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.load().identity.is_some()
    }

    pub fn loading(&self) -> bool {
        self.state.load().loading
    }

    pub fn error(&self) -> Option<String> {
        self.state.load().error.clone()
    }

    pub fn clear_error(&self) {
        self.update(|state| state.error = None);
    }

    /// Logs in against the remote service, or locally when it is unreachable.
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<AuthOutcome> {
        let attempt = AuthAttempt::begin(self);
        let result = self.login_inner(email, password).await;
        attempt.finish(&result);
        result
    }

    /// Creates an account against the remote service, or locally when it is unreachable.
    pub async fn signup(&self, name: &str, email: &str, password: &str) -> ClientResult<AuthOutcome> {
        let attempt = AuthAttempt::begin(self);
        let result = self.signup_inner(name, email, password).await;
        attempt.finish(&result);
        result
    }

    /// Clears the identity and its persisted entry. Safe to call repeatedly.
    pub fn logout(&self) {
        self.update(|state| {
            state.identity = None;
            state.error = None;
            state.notice = None;
        });
        if let Err(e) = self.storage.remove(USER_STORAGE_KEY) {
            error!("Failed to remove stored session: {}", e);
        }
        info!("Logged out.");
    }

    async fn login_inner(&self, email: &str, password: &str) -> ClientResult<AuthOutcome> {
        if email.is_empty() || password.is_empty() {
            return Err(ClientError::validation("Please enter both email and password"));
        }

        match self.auth.login(email, password).await {
            Ok(profile) => {
                let identity = Identity::from_remote(profile, email, email_local_part(email));
                Ok(self.activate(identity, None).await)
            }
            Err(e) if e.is_unavailable() => {
                warn!("Backend not available, using local authentication: {}", e);
                check_password_length(password)?;
                tokio::time::sleep(self.fallback_delay).await;
                let identity = Identity::synthesized(email_local_part(email), email);
                Ok(self.activate(identity, Some(Notice::BackendUnavailable)).await)
            }
            Err(PortError::Unauthorized) => Err(ClientError::InvalidCredentials),
            Err(e) => {
                error!("Login failed: {}", e);
                Err(ClientError::Remote("Login failed. Please try again.".to_string()))
            }
        }
    }

    async fn signup_inner(&self, name: &str, email: &str, password: &str) -> ClientResult<AuthOutcome> {
        validate_signup(name, email, password)?;

        match self.auth.signup(name, email, password).await {
            Ok(profile) => {
                let identity = Identity::from_remote(profile, email, name);
                Ok(self.activate(identity, None).await)
            }
            Err(e) if e.is_unavailable() => {
                warn!("Backend not available, using local signup: {}", e);
                tokio::time::sleep(self.fallback_delay).await;
                let identity = Identity::synthesized(name, email);
                Ok(self.activate(identity, Some(Notice::BackendUnavailable)).await)
            }
            Err(PortError::Conflict(_)) => Err(ClientError::DuplicateAccount),
            Err(e) => {
                error!("Signup failed: {}", e);
                Err(ClientError::Remote("Signup failed. Please try again.".to_string()))
            }
        }
    }

    /// Activates `identity` and persists it.
    async fn activate(&self, identity: Identity, notice: Option<Notice>) -> AuthOutcome {
        info!("Signed in as {}", identity.email);
        self.update(|state| {
            state.identity = Some(identity.clone());
            state.notice = notice;
        });
        self.persist_identity(&identity).await;
        AuthOutcome { identity, notice }
    }

    async fn persist_identity(&self, identity: &Identity) {
        let json = match serde_json::to_string(identity) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize session: {}", e);
                return;
            }
        };

        let storage = Arc::clone(&self.storage);
        match tokio::task::spawn_blocking(move || storage.set(USER_STORAGE_KEY, &json)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Failed to persist session: {}", e),
            Err(e) => error!("Failed to spawn blocking task: {}", e),
        }
    }

    fn update<F>(&self, mutate: F)
    where
        F: Fn(&mut SessionSnapshot),
    {
        self.state.rcu(|current| {
            let mut next = SessionSnapshot::clone(current);
            mutate(&mut next);
            next
        });
    }
}

/// Marks the session as loading for the lifetime of one login or signup.
///
/// Dropping it unfinished, e.g. when the caller abandons the future,
/// clears `loading` without touching `error`.
struct AuthAttempt<'a> {
    store: &'a SessionStore,
    finished: bool,
}

impl<'a> AuthAttempt<'a> {
    fn begin(store: &'a SessionStore) -> Self {
        store.update(|state| {
            state.loading = true;
            state.error = None;
            state.notice = None;
        });
        Self {
            store,
            finished: false,
        }
    }

    fn finish(mut self, result: &ClientResult<AuthOutcome>) {
        self.finished = true;
        let message = result.as_ref().err().map(ClientError::user_message);
        self.store.update(|state| {
            state.loading = false;
            state.error = message.clone();
        });
    }
}

impl Drop for AuthAttempt<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.store.update(|state| state.loading = false);
        }
    }
}

fn check_password_length(password: &str) -> ClientResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ClientError::validation(
            "Password must be at least 6 characters long",
        ));
    }
    Ok(())
}

fn validate_signup(name: &str, email: &str, password: &str) -> ClientResult<()> {
    if name.trim().is_empty() {
        return Err(ClientError::validation("Name is required"));
    }
    if email.trim().is_empty() {
        return Err(ClientError::validation("Email is required"));
    }
    check_password_length(password)?;
    if !EMAIL_SHAPE.is_match(email) {
        return Err(ClientError::validation("Please enter a valid email address"));
    }
    Ok(())
}
