//! Emulator containers and the driver contract.
//!
//! The driver creates, inspects and kills emulator containers and reports
//! host capacity. It is an external collaborator; the orchestrator only
//! depends on [`ContainerDriver`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Handle to a running emulator container.
///
/// Owned by the container registry on behalf of a single session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerHandle {
    /// Container ID assigned by the runtime.
    pub id: String,
    /// Container name.
    pub name: String,
    /// Address of the container on the emulator network, once known.
    pub ip_address: Option<String>,
}

impl ContainerHandle {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ip_address: None,
        }
    }

    /// Returns the short container ID (first 12 characters).
    pub fn short_id(&self) -> &str {
        if self.id.len() > 12 {
            &self.id[..12]
        } else {
            &self.id
        }
    }
}

/// Point-in-time view of a container's OS-level state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContainerStatus {
    pub running: bool,
    pub ip_address: Option<String>,
}

/// Result of an admission-control query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capacity {
    pub cpu_available: bool,
    pub memory_available: bool,
}

impl Capacity {
    /// Returns true if a new emulator may be provisioned.
    pub fn admits(&self) -> bool {
        self.cpu_available && self.memory_available
    }
}

/// Container runtime used to run emulator instances.
#[async_trait]
pub trait ContainerDriver: Send + Sync {
    /// Makes sure the emulator image is available locally.
    async fn ensure_image(&self) -> Result<()>;

    /// Reports whether enough CPU and memory remain for one more emulator.
    ///
    /// Capacity is checked, not reserved.
    async fn check_capacity(&self) -> Result<Capacity>;

    /// Creates and starts a new emulator container.
    async fn create_emulator(&self) -> Result<ContainerHandle>;

    /// Reloads the container's state.
    async fn inspect(&self, handle: &ContainerHandle) -> Result<ContainerStatus>;

    /// Kills the container and frees its resources.
    async fn kill(&self, handle: &ContainerHandle) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_requires_both_resources() {
        let full = Capacity {
            cpu_available: true,
            memory_available: true,
        };
        assert!(full.admits());
        assert!(
            !Capacity {
                memory_available: false,
                ..full
            }
            .admits()
        );
        assert!(
            !Capacity {
                cpu_available: false,
                ..full
            }
            .admits()
        );
    }

    #[test]
    fn test_short_id() {
        let handle = ContainerHandle::new("0123456789abcdef", "toynet-1");
        assert_eq!(handle.short_id(), "0123456789ab");
        assert_eq!(ContainerHandle::new("abc", "x").short_id(), "abc");
    }
}
