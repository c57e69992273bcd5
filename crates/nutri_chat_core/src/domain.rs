//! crates/nutri_chat_core/src/domain.rs
//!
//! Defines the core data structures for the chat client.
//! These structs carry no transport or storage logic; the serde derives only
//! describe how an `Identity` is persisted and how wire payloads map onto them.

use crate::image::ImageData;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub type ThreadId = Uuid;
pub type MessageId = Uuid;

/// Title given to every freshly created thread.
pub const DEFAULT_THREAD_TITLE: &str = "New Chat";

/// Number of characters of the first message kept as the thread title.
pub const TITLE_MAX_CHARS: usize = 50;

const DEFAULT_IDENTITY_ID: &str = "1";
const AVATAR_BASE_URL: &str = "https://api.dicebear.com/7.x/avataaars/svg";

//=========================================================================================
// Identity
//=========================================================================================

/// The authenticated user's profile data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// The profile body returned by the remote auth endpoints. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RemoteProfile {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl Identity {
    /// Builds an identity from a remote profile, filling gaps from the submitted form.
    pub fn from_remote(profile: RemoteProfile, email: &str, default_name: &str) -> Self {
        Self {
            id: profile.id.unwrap_or_else(|| DEFAULT_IDENTITY_ID.to_string()),
            name: profile.name.unwrap_or_else(|| default_name.to_string()),
            email: profile.email.unwrap_or_else(|| email.to_string()),
            avatar: Some(profile.avatar.unwrap_or_else(|| placeholder_avatar(email))),
        }
    }

    /// Builds the identity used when the auth service cannot be reached.
    pub fn synthesized(name: &str, email: &str) -> Self {
        Self {
            id: DEFAULT_IDENTITY_ID.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            avatar: Some(placeholder_avatar(email)),
        }
    }
}

/// Deterministic placeholder avatar keyed by email.
pub fn placeholder_avatar(email: &str) -> String {
    format!("{}?seed={}", AVATAR_BASE_URL, email)
}

/// The part of an email address before the first `@`.
pub fn email_local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

//=========================================================================================
// Messages and Threads
//=========================================================================================

/// One turn in a conversation, authored by the user or the assistant.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub content: String,
    pub image: Option<ImageData>,
    pub timestamp: DateTime<Utc>,
    pub is_from_user: bool,
}

impl Message {
    pub fn from_user(content: impl Into<String>, image: Option<ImageData>) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            image,
            timestamp: Utc::now(),
            is_from_user: true,
        }
    }

    pub fn from_assistant(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            image: None,
            timestamp: Utc::now(),
            is_from_user: false,
        }
    }
}

/// One conversation, an append-only log of messages.
#[derive(Debug, Clone, PartialEq)]
pub struct Thread {
    pub id: ThreadId,
    pub title: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Thread {
    /// Creates an empty thread titled "New Chat".
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: DEFAULT_THREAD_TITLE.to_string(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns a copy of this thread with `message` appended.
    ///
    /// The first message appended to an empty thread also sets the title.
    pub fn with_message(&self, message: Message) -> Self {
        let title = if self.messages.is_empty() {
            truncate_title(&message.content)
        } else {
            self.title.clone()
        };
        let updated_at = message.timestamp.max(self.updated_at);

        let mut messages = Vec::with_capacity(self.messages.len() + 1);
        messages.extend(self.messages.iter().cloned());
        messages.push(message);

        Self {
            id: self.id,
            title,
            messages,
            created_at: self.created_at,
            updated_at,
        }
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}

impl Default for Thread {
    fn default() -> Self {
        Self::new()
    }
}

fn truncate_title(content: &str) -> String {
    content.chars().take(TITLE_MAX_CHARS).collect()
}

//=========================================================================================
// Theme
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

impl ThemeMode {
    pub fn toggled(self) -> Self {
        match self {
            ThemeMode::Light => ThemeMode::Dark,
            ThemeMode::Dark => ThemeMode::Light,
        }
    }

    pub fn is_dark(self) -> bool {
        self == ThemeMode::Dark
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
        }
    }
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a theme; expected 'light' or 'dark'")]
pub struct ParseThemeError(pub String);

impl FromStr for ThemeMode {
    type Err = ParseThemeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(ThemeMode::Light),
            "dark" => Ok(ThemeMode::Dark),
            other => Err(ParseThemeError(other.to_string())),
        }
    }
}
