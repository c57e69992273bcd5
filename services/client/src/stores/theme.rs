//! services/client/src/stores/theme.rs
//!
//! The persisted light/dark preference.

use arc_swap::ArcSwap;
use nutri_chat_core::domain::ThemeMode;
use nutri_chat_core::ports::{KeyValueStore, ThemeHost};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Durable storage key holding `light` or `dark`.
pub const THEME_STORAGE_KEY: &str = "theme";

pub struct ThemeStore {
    storage: Arc<dyn KeyValueStore>,
    host: Arc<dyn ThemeHost>,
    mode: ArcSwap<ThemeMode>,
}

impl ThemeStore {
    /// Resolves the initial theme and applies it to the host.
    ///
    /// A stored preference wins over the host's ambient preference, which wins
    /// over light.
    pub fn new(storage: Arc<dyn KeyValueStore>, host: Arc<dyn ThemeHost>) -> Self {
        let mode = initial_mode(storage.as_ref(), host.as_ref());
        host.apply_theme(mode);
        Self {
            storage,
            host,
            mode: ArcSwap::from_pointee(mode),
        }
    }

    pub fn theme(&self) -> ThemeMode {
        **self.mode.load()
    }

    /// Flips between light and dark, persists the choice and applies it.
    pub fn toggle_theme(&self) -> ThemeMode {
        let previous = self.mode.rcu(|mode| mode.toggled());
        let mode = previous.toggled();

        if let Err(e) = self.storage.set(THEME_STORAGE_KEY, mode.as_str()) {
            error!("Failed to persist theme: {}", e);
        }
        self.host.apply_theme(mode);
        info!("Switched to {} theme", mode);
        mode
    }
}

fn initial_mode(storage: &dyn KeyValueStore, host: &dyn ThemeHost) -> ThemeMode {
    match storage.get(THEME_STORAGE_KEY) {
        Ok(Some(raw)) => match raw.parse::<ThemeMode>() {
            Ok(mode) => return mode,
            Err(e) => warn!("Ignoring stored theme: {}", e),
        },
        Ok(None) => {}
        Err(e) => warn!("Failed to read stored theme: {}", e),
    }

    match host.prefers_dark() {
        Some(true) => ThemeMode::Dark,
        _ => ThemeMode::Light,
    }
}
