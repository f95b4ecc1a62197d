//! Application layer for ToyNet.
//!
//! This crate provides the session orchestrator and the request payloads it
//! accepts, coordinating the domain model with the store, the container
//! runtime and the emulator control API.

pub mod request;
pub mod session;
pub mod session_usecase;

pub use session::{ContainerRegistry, ReadinessPolicy, ReadinessWaiter};
pub use session_usecase::{Collaborators, SessionUseCase};
