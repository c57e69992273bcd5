//! services/client/src/adapters/host.rs
//!
//! A `ThemeHost` for embedders that render elsewhere: the ambient preference
//! comes from configuration and the applied theme is recorded for the
//! embedder to read back.

use arc_swap::ArcSwapOption;
use nutri_chat_core::domain::ThemeMode;
use nutri_chat_core::ports::ThemeHost;
use std::sync::Arc;
use tracing::debug;

pub struct HeadlessThemeHost {
    ambient: Option<ThemeMode>,
    applied: ArcSwapOption<ThemeMode>,
}

impl HeadlessThemeHost {
    pub fn new(ambient: Option<ThemeMode>) -> Self {
        Self {
            ambient,
            applied: ArcSwapOption::empty(),
        }
    }

    /// The theme most recently applied to the presentation root.
    pub fn applied(&self) -> Option<ThemeMode> {
        self.applied.load_full().map(|mode| *mode)
    }
}

impl Default for HeadlessThemeHost {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ThemeHost for HeadlessThemeHost {
    fn prefers_dark(&self) -> Option<bool> {
        self.ambient.map(ThemeMode::is_dark)
    }

    fn apply_theme(&self, mode: ThemeMode) {
        debug!("applying {} theme to presentation root", mode);
        self.applied.store(Some(Arc::new(mode)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_ambient_preference_and_applied_theme() {
        let host = HeadlessThemeHost::new(Some(ThemeMode::Dark));
        assert_eq!(host.prefers_dark(), Some(true));
        assert_eq!(host.applied(), None);

        host.apply_theme(ThemeMode::Light);
        assert_eq!(host.applied(), Some(ThemeMode::Light));

        assert_eq!(HeadlessThemeHost::default().prefers_dark(), None);
    }
}
