//! crates/nutri_chat_core/src/ports.rs
//!
//! Defines the service contracts (traits) the client stores depend on.
//! These traits form the boundary of the hexagonal architecture: the stores
//! only see these ports, while HTTP, durable storage and the host
//! presentation root are plugged in as adapters.

use crate::domain::{RemoteProfile, ThemeMode, ThreadId};
use crate::image::ImageData;
use async_trait::async_trait;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., HTTP, filesystem).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Conflict: {0}")]
    Conflict(String),
    /// The remote service could not be reached at all.
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("Remote service answered with status {0}")]
    Status(u16),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Storage error: {0}")]
    Storage(String),
}

impl PortError {
    /// True for transport-level failures, the only errors that trigger local fallbacks.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, PortError::Unavailable(_))
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait AuthService: Send + Sync {
    /// `POST /api/auth/login`.
    async fn login(&self, email: &str, password: &str) -> PortResult<RemoteProfile>;

    /// `POST /api/auth/signup`.
    async fn signup(&self, name: &str, email: &str, password: &str) -> PortResult<RemoteProfile>;
}

#[async_trait]
pub trait ChatService: Send + Sync {
    /// Sends one user turn and returns the assistant's reply text.
    async fn send_message(
        &self,
        thread_id: ThreadId,
        content: &str,
        image: Option<&ImageData>,
    ) -> PortResult<String>;
}

/// Durable, string-keyed storage, the equivalent of browser local storage.
///
/// Calls are synchronous and some are made from async code, so an
/// implementation must stay small and bounded (one local file or memory).
/// A failed `set` or `remove` must leave `get` reporting the previous value.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> PortResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> PortResult<()>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> PortResult<()>;
}

/// The global presentation root the theme is applied to.
pub trait ThemeHost: Send + Sync {
    /// The environment's ambient colour-scheme preference, if it exposes one.
    fn prefers_dark(&self) -> Option<bool>;

    fn apply_theme(&self, mode: ThemeMode);
}
