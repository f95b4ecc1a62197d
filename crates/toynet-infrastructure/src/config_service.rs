//! Configuration service implementation.
//!
//! Loads [`ServiceConfig`] from `config.toml`, applies environment
//! overrides and caches the result.
//!
//! Recognized environment variables:
//!
//! | Variable | Effect |
//! |---|---|
//! | `TOYNET_IMAGE_TAG` | emulator image |
//! | `COMPOSE_NETWORK` | docker network emulators join (ignored when empty) |
//! | `MINI_FLASK_PORT` | control-API port inside the emulator |
//! | `FLASK_ENV=development` | enables dev mode |

use crate::paths::ToynetPaths;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use toynet_core::config::ServiceConfig;
use toynet_core::error::{Result, ToynetError};

/// Configuration service that loads and caches the service configuration.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: PathBuf,
    config: Arc<RwLock<Option<ServiceConfig>>>,
}

impl ConfigService {
    /// Creates a service reading `config.toml` from the platform config dir.
    pub fn new() -> Result<Self> {
        Ok(Self::with_path(ToynetPaths::default().config_file()?))
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self {
            path,
            config: Arc::new(RwLock::new(None)),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Returns the configuration, loading it on first access.
    ///
    /// # Errors
    ///
    /// Returns a `Config` error if the file exists but cannot be parsed, or
    /// if an environment override holds an invalid value.
    pub fn get_config(&self) -> Result<ServiceConfig> {
        {
            let cached = self
                .config
                .read()
                .map_err(|_| ToynetError::internal("config cache poisoned"))?;
            if let Some(config) = cached.as_ref() {
                return Ok(config.clone());
            }
        }

        let mut config = self.load()?;
        apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;

        let mut cached = self
            .config
            .write()
            .map_err(|_| ToynetError::internal("config cache poisoned"))?;
        *cached = Some(config.clone());
        Ok(config)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        if let Ok(mut cached) = self.config.write() {
            *cached = None;
        }
    }

    fn load(&self) -> Result<ServiceConfig> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "No config file, using defaults");
            return Ok(ServiceConfig::default());
        }

        let content = std::fs::read_to_string(&self.path)?;
        toml::from_str(&content).map_err(|e| {
            ToynetError::config(format!("{}: {}", self.path.display(), e))
        })
    }
}

/// Applies environment overrides, reading variables through `var`.
pub(crate) fn apply_env_overrides<F>(config: &mut ServiceConfig, var: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(image) = var("TOYNET_IMAGE_TAG").filter(|v| !v.is_empty()) {
        config.emulator.image = image;
    }
    if let Some(network) = var("COMPOSE_NETWORK").filter(|v| !v.is_empty()) {
        config.emulator.network = network;
    }
    if let Some(port) = var("MINI_FLASK_PORT").filter(|v| !v.is_empty()) {
        config.emulator.api_port = port
            .trim()
            .parse()
            .map_err(|_| ToynetError::config(format!("invalid MINI_FLASK_PORT: {}", port)))?;
    }
    if var("FLASK_ENV").as_deref() == Some("development") {
        config.emulator.dev_mode = true;
    }
    Ok(())
}
