use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root of `config.toml`.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct ServiceConfig {
    #[serde(default)]
    pub emulator: EmulatorConfig,
    #[serde(default)]
    pub readiness: ReadinessConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EmulatorConfig {
    /// Image tag of the emulator container
    pub image: String,
    /// Docker network the emulators join (`bridge` is the default network)
    pub network: String,
    /// Port of the emulator's control API inside the container
    pub api_port: u16,
    /// Development mode, forwarded to the emulator
    pub dev_mode: bool,
    /// Prefix for container names
    pub name_prefix: String,
    /// CPUs set aside for each running emulator
    pub cpus_per_instance: f64,
    /// Memory set aside for each running emulator
    pub memory_per_instance_mb: u64,
    /// Timeout of a single control-API request, in seconds
    pub request_timeout_secs: u64,
    /// Timeout of a topology push, in seconds; `None` waits for the
    /// emulator to finish rebuilding the network
    pub push_timeout_secs: Option<u64>,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            image: "toynet/mininet:latest".to_string(),
            network: "bridge".to_string(),
            api_port: 8000,
            dev_mode: false,
            name_prefix: "toynet".to_string(),
            cpus_per_instance: 1.0,
            memory_per_instance_mb: 512,
            request_timeout_secs: 120,
            push_timeout_secs: None,
        }
    }
}

impl EmulatorConfig {
    pub fn uses_default_network(&self) -> bool {
        self.network == "bridge"
    }

    pub fn memory_per_instance_bytes(&self) -> u64 {
        self.memory_per_instance_mb * 1024 * 1024
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn push_timeout(&self) -> Option<Duration> {
        self.push_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ReadinessConfig {
    pub boot_poll_interval_secs: u64,
    pub boot_max_attempts: u32,
    pub probe_interval_secs: u64,
    /// Upper bound for the control-API phase; unbounded when absent
    pub probe_timeout_secs: Option<u64>,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            boot_poll_interval_secs: 10,
            boot_max_attempts: 500,
            probe_interval_secs: 10,
            probe_timeout_secs: None,
        }
    }
}

impl ReadinessConfig {
    pub fn boot_poll_interval(&self) -> Duration {
        Duration::from_secs(self.boot_poll_interval_secs)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs)
    }

    pub fn probe_timeout(&self) -> Option<Duration> {
        self.probe_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// Path of the store file; the platform data directory when absent
    pub store_path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_file() {
        let config: ServiceConfig = toml::from_str("").unwrap();
        assert_eq!(config, ServiceConfig::default());
        assert_eq!(config.readiness.boot_max_attempts, 500);
        assert_eq!(config.readiness.probe_interval(), Duration::from_secs(10));
        assert!(config.readiness.probe_timeout().is_none());
        assert!(config.emulator.push_timeout().is_none());
        assert_eq!(config.emulator.request_timeout(), Duration::from_secs(120));
        assert!(config.emulator.uses_default_network());
    }

    #[test]
    fn test_partial_sections() {
        let config: ServiceConfig = toml::from_str(
            r#"
            [emulator]
            network = "toynet_default"
            memory_per_instance_mb = 1024
            push_timeout_secs = 900

            [readiness]
            probe_timeout_secs = 600
            "#,
        )
        .unwrap();

        assert_eq!(config.emulator.network, "toynet_default");
        assert!(!config.emulator.uses_default_network());
        assert_eq!(config.emulator.memory_per_instance_bytes(), 1024 * 1024 * 1024);
        assert_eq!(config.emulator.api_port, 8000);
        assert_eq!(config.emulator.push_timeout(), Some(Duration::from_secs(900)));
        assert_eq!(config.readiness.probe_timeout(), Some(Duration::from_secs(600)));
        assert_eq!(config.readiness.boot_poll_interval_secs, 10);
    }
}
