//! services/client/src/telemetry.rs
//!
//! Logging setup for embedders that do not install their own subscriber.

use crate::config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Installs a global `tracing` subscriber filtered at the configured level.
///
/// Returns `false` when a global subscriber was already set, which is left in place.
pub fn init(config: &Config) -> bool {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}
