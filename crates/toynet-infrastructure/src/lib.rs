//! Infrastructure adapters for ToyNet.
//!
//! Concrete implementations of the core contracts: the TOML file store, the
//! Docker container driver, the HTTP emulator client and the command parser,
//! plus configuration loading.

pub mod command_parser;
pub mod config_service;
pub mod docker_driver;
pub mod dto;
pub mod http_emulator_client;
pub mod paths;
pub mod storage;
pub mod toml_store;

pub use command_parser::SimpleCommandParser;
pub use config_service::ConfigService;
pub use docker_driver::DockerDriver;
pub use http_emulator_client::HttpEmulatorClient;
pub use paths::ToynetPaths;
pub use toml_store::TomlStore;
