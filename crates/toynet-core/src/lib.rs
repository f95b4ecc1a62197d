//! Domain layer for the ToyNet session orchestrator.
//!
//! This crate holds the topology document model, the session record and the
//! contracts of every external collaborator (store, container driver,
//! emulator control API, command parser, clock). It performs no I/O itself.

pub mod clock;
pub mod command;
pub mod config;
pub mod container;
pub mod emulator;
pub mod error;
pub mod session;
pub mod topology;

// Re-export common error type
pub use error::{Result, ToynetError};
