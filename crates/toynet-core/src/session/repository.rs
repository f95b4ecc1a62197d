//! Store repository traits.
//!
//! The durable store is an external collaborator. These traits define the
//! contract the orchestrator relies on, decoupling it from the concrete
//! storage mechanism (TOML file, database, remote API).

use super::model::{Session, SessionId, TopoId};
use crate::error::Result;
use async_trait::async_trait;

/// Read access to topology templates.
#[async_trait]
pub trait TemplateRepository: Send + Sync {
    /// Returns the template topology for `topo_id`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(xml))`: Template found
    /// - `Ok(None)`: No template with this id
    /// - `Err(_)`: Query failed
    async fn find_topology(&self, topo_id: TopoId) -> Result<Option<String>>;
}

/// Read access to registered users.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Returns true if `user_id` names a registered user.
    async fn exists(&self, user_id: &str) -> Result<bool>;
}

/// Persistence for session records.
///
/// Records are never deleted through this trait; terminating a session only
/// releases its container.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Finds a session by its ID.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Session))`: Session found
    /// - `Ok(None)`: Session not found
    /// - `Err(_)`: Error occurred during retrieval
    async fn find_by_id(&self, session_id: SessionId) -> Result<Option<Session>>;

    /// Inserts a new session and returns its store-assigned id.
    async fn create(&self, topo_id: TopoId, user_id: &str, topology: &str) -> Result<SessionId>;

    /// Replaces the stored topology of an existing session.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the session does not exist, or a data access
    /// error if the commit fails.
    async fn update_topology(&self, session_id: SessionId, topology: &str) -> Result<()>;
}
