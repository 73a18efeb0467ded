pub mod booking;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod session;

pub use error::ClientError;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::booking::{BookingAggregator, BookingLifecycle};
use crate::catalog::Catalog;
use crate::config::Config;
use crate::gateway::Gateway;
use crate::session::{FileTokenStorage, SessionHandle, SessionStore};

/// The wired-up client: one gateway, one session store, and the services
/// built on top of them. All components share the same session snapshot.
pub struct AppState {
    pub config: Config,
    pub session: SessionStore,
    pub catalog: Catalog,
    pub aggregator: BookingAggregator,
    pub lifecycle: BookingLifecycle,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let handle = SessionHandle::new();
        let gateway = Gateway::new(
            &config.api.base_url,
            Duration::from_secs(config.api.timeout_secs),
            handle.clone(),
        )?;
        let storage = Arc::new(FileTokenStorage::new(
            config.storage.credentials_path.clone(),
        ));
        let session = SessionStore::new(storage, handle.clone(), gateway.clone());
        let catalog = Catalog::new(gateway.clone());
        let aggregator = BookingAggregator::new(gateway.clone(), handle.clone());
        let lifecycle = BookingLifecycle::new(gateway, handle);

        Ok(Self {
            config,
            session,
            catalog,
            aggregator,
            lifecycle,
        })
    }
}
