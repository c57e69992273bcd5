pub mod adapters;
pub mod config;
pub mod error;
pub mod state;
pub mod stores;
pub mod telemetry;

pub use config::Config;
pub use error::{ClientError, ClientResult, Notice};
pub use state::ClientState;
