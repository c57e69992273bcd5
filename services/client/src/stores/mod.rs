pub mod fallback;
pub mod session;
pub mod theme;
pub mod threads;

// Re-export the stores so embedders can reach them from one place.
pub use session::{AuthOutcome, SessionSnapshot, SessionStore, USER_STORAGE_KEY};
pub use theme::{ThemeStore, THEME_STORAGE_KEY};
pub use threads::{SendOutcome, ThreadSnapshot, ThreadStore};
