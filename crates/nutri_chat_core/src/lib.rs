pub mod domain;
pub mod image;
pub mod ports;

pub use domain::{
    email_local_part, placeholder_avatar, Identity, Message, MessageId, ParseThemeError,
    RemoteProfile, ThemeMode, Thread, ThreadId, DEFAULT_THREAD_TITLE, TITLE_MAX_CHARS,
};
pub use image::{ImageData, ImageError};
pub use ports::{AuthService, ChatService, KeyValueStore, PortError, PortResult, ThemeHost};
