pub mod host;
pub mod http;
pub mod storage;

pub use host::HeadlessThemeHost;
pub use http::HttpBackend;
pub use storage::{FileStore, MemoryStore};
