//! Session application services.
//!
//! This module holds the process-wide container registry and the readiness
//! waiter used by the session orchestrator.

mod readiness;
mod registry;

pub use readiness::{ReadinessPolicy, ReadinessWaiter};
pub use registry::{ContainerRegistry, Released, SessionSlot};
