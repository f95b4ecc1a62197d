pub mod admin;
pub mod shell;

use anyhow::Result;
use std::path::PathBuf;
use toynet_core::config::ServiceConfig;
use toynet_infrastructure::{ConfigService, TomlStore, ToynetPaths};

/// Resolved configuration and store shared by every subcommand.
pub struct Environment {
    pub config: ServiceConfig,
    pub store: TomlStore,
}

impl Environment {
    pub fn load(config_path: Option<PathBuf>, store_path: Option<PathBuf>) -> Result<Self> {
        let config_service = match config_path {
            Some(path) => ConfigService::with_path(path),
            None => ConfigService::new()?,
        };
        let config = config_service.get_config()?;

        let store_path = match store_path.or_else(|| config.storage.store_path.clone()) {
            Some(path) => path,
            None => ToynetPaths::default().store_file()?,
        };
        tracing::debug!(config = %config_service.path().display(), store = %store_path.display(), "Loaded environment");

        Ok(Self {
            config,
            store: TomlStore::new(store_path),
        })
    }
}
