//! services/client/src/error.rs
//!
//! Defines the primary error type for the client stores, plus the advisory
//! notices that accompany results produced by a local fallback.

use crate::config::ConfigError;
use nutri_chat_core::ports::PortError;
use std::fmt;

/// The primary error type for the `client` library.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Bad input, rejected before any network call.
    #[error("{0}")]
    Validation(String),

    /// The auth service rejected the email/password pair.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// The auth service already has an account for this email.
    #[error("An account with this email already exists")]
    DuplicateAccount,

    /// The remote service answered with an unexpected non-2xx status.
    #[error("{0}")]
    Remote(String),

    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the ports,
    /// e.g. the HTTP client failing to build.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),
}

impl ClientError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// The message the presentation layer shows for this error.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Validation(_)
            | ClientError::InvalidCredentials
            | ClientError::DuplicateAccount
            | ClientError::Remote(_) => self.to_string(),
            _ => "An unexpected error occurred. Please try again.".to_string(),
        }
    }
}

/// A convenience type alias for `Result<T, ClientError>`.
pub type ClientResult<T> = Result<T, ClientError>;

/// A non-fatal notice shown while an operation still completes via a fallback path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    /// The remote service could not be reached; the result was synthesized locally.
    BackendUnavailable,
}

impl Notice {
    pub fn message(self) -> &'static str {
        match self {
            Notice::BackendUnavailable => "Backend server is not available. Using demo responses.",
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_messages_hide_internal_details() {
        assert_eq!(
            ClientError::InvalidCredentials.user_message(),
            "Invalid email or password"
        );
        assert_eq!(
            ClientError::validation("Name is required").user_message(),
            "Name is required"
        );
        assert_eq!(
            ClientError::Port(PortError::Storage("disk full".into())).user_message(),
            "An unexpected error occurred. Please try again."
        );
    }
}
