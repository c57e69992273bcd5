//! services/client/src/state.rs
//!
//! Defines `ClientState`, the explicitly constructed bundle of stores handed
//! to the presentation layer.

use crate::adapters::{FileStore, HeadlessThemeHost, HttpBackend};
use crate::config::Config;
use crate::error::ClientResult;
use crate::stores::{SessionStore, ThemeStore, ThreadStore};
use nutri_chat_core::ports::{AuthService, ChatService, KeyValueStore, ThemeHost};
use std::sync::Arc;
use tracing::info;

/// The ports a `ClientState` is wired from.
#[derive(Clone)]
pub struct Ports {
    pub auth: Arc<dyn AuthService>,
    pub chat: Arc<dyn ChatService>,
    pub storage: Arc<dyn KeyValueStore>,
    pub host: Arc<dyn ThemeHost>,
}

/// The shared client state, created once at startup.
#[derive(Clone)]
pub struct ClientState {
    pub config: Arc<Config>,
    pub session: Arc<SessionStore>,
    pub threads: Arc<ThreadStore>,
    pub theme: Arc<ThemeStore>,
}

impl ClientState {
    /// Wires the stores to the HTTP backend, the JSON file store and a headless host.
    pub fn from_config(config: Config) -> ClientResult<Self> {
        let backend = Arc::new(HttpBackend::new(
            config.api_base_url.clone(),
            config.request_timeout,
        )?);
        info!("Using storage at {:?}", config.storage_path);
        let storage = Arc::new(FileStore::open(&config.storage_path));
        let host = Arc::new(HeadlessThemeHost::new(config.ambient_theme));

        let ports = Ports {
            auth: backend.clone(),
            chat: backend,
            storage,
            host,
        };
        Ok(Self::with_ports(config, ports))
    }

    /// Wires the stores to caller-supplied ports. Restores the session and
    /// applies the initial theme.
    pub fn with_ports(config: Config, ports: Ports) -> Self {
        let session = SessionStore::new(
            ports.auth,
            ports.storage.clone(),
            config.fallback_auth_delay,
        );
        let threads = ThreadStore::new(ports.chat, config.fallback_reply_delay);
        let theme = ThemeStore::new(ports.storage, ports.host);

        Self {
            config: Arc::new(config),
            session: Arc::new(session),
            threads: Arc::new(threads),
            theme: Arc::new(theme),
        }
    }
}
