//! Emulator control API contract.

use async_trait::async_trait;

use crate::container::ContainerHandle;
use crate::error::Result;

/// Client for a live emulator instance's control API.
///
/// Implementations surface non-success answers as
/// [`ToynetError::Remote`](crate::error::ToynetError::Remote) with the
/// instance's status and message preserved, and transport failures as
/// [`ToynetError::Unreachable`](crate::error::ToynetError::Unreachable).
#[async_trait]
pub trait EmulatorClient: Send + Sync {
    /// Liveness probe against `GET /`.
    ///
    /// Returns the HTTP status the instance answered with; a connection
    /// failure is an `Unreachable` error.
    async fn probe(&self, handle: &ContainerHandle) -> Result<u16>;

    /// Installs a complete topology document on the instance.
    async fn push_topology(&self, handle: &ContainerHandle, topology: &str) -> Result<()>;

    /// Runs a command inside the emulated network and returns its output.
    async fn run_command(&self, handle: &ContainerHandle, command: &str) -> Result<String>;

    /// Asks the instance to shut down. Best effort.
    async fn terminate(&self, handle: &ContainerHandle) -> Result<()>;
}
