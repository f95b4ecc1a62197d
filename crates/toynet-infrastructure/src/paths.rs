//! Path management for toynet configuration and data files.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/toynet/            # Config directory
//! └── config.toml              # Service configuration
//!
//! ~/.local/share/toynet/       # Data directory
//! └── store.toml               # Templates, users and sessions
//! ```

use std::path::PathBuf;
use toynet_core::error::{Result, ToynetError};

const APP_DIR: &str = "toynet";

/// Resolves toynet's well-known paths, optionally under a base directory.
///
/// A base directory replaces both the platform config and data dirs, which
/// keeps tests and throwaway runs out of the user's home.
#[derive(Debug, Clone, Default)]
pub struct ToynetPaths {
    base_dir: Option<PathBuf>,
}

impl ToynetPaths {
    pub fn new(base_dir: Option<PathBuf>) -> Self {
        Self { base_dir }
    }

    pub fn config_dir(&self) -> Result<PathBuf> {
        match &self.base_dir {
            Some(base) => Ok(base.clone()),
            None => dirs::config_dir()
                .map(|dir| dir.join(APP_DIR))
                .ok_or_else(|| ToynetError::config("Cannot find config directory")),
        }
    }

    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.base_dir {
            Some(base) => Ok(base.clone()),
            None => dirs::data_dir()
                .map(|dir| dir.join(APP_DIR))
                .ok_or_else(|| ToynetError::config("Cannot find data directory")),
        }
    }

    /// Path to `config.toml`.
    pub fn config_file(&self) -> Result<PathBuf> {
        Ok(self.config_dir()?.join("config.toml"))
    }

    /// Default path of the TOML store.
    pub fn store_file(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("store.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_dir_overrides_platform_dirs() {
        let paths = ToynetPaths::new(Some(PathBuf::from("/tmp/toynet-test")));
        assert_eq!(
            paths.config_file().unwrap(),
            PathBuf::from("/tmp/toynet-test/config.toml")
        );
        assert_eq!(
            paths.store_file().unwrap(),
            PathBuf::from("/tmp/toynet-test/store.toml")
        );
    }

    #[test]
    fn test_platform_dirs_end_with_app_dir() {
        let paths = ToynetPaths::default();
        if let Ok(dir) = paths.config_dir() {
            assert!(dir.ends_with("toynet"));
        }
    }
}
