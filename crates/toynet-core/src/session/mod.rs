//! Session domain module.
//!
//! This module contains the session record and the repository interfaces
//! of the external store.
//!
//! # Usage
//!
//! ```ignore
//! use toynet_core::session::{Session, SessionId, SessionRepository};
//! ```

mod model;
mod repository;

pub use model::{Session, SessionId, TopoId};
pub use repository::{SessionRepository, TemplateRepository, UserRepository};
