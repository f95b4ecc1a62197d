//! On-disk records of the TOML store.
//!
//! These types are the persistence shape only; they convert to and from the
//! domain model at the repository boundary.

use serde::{Deserialize, Serialize};
use toynet_core::session::{Session, SessionId, TopoId};

/// Root of `store.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreFile {
    /// Last id handed out to a session; ids start at 1
    #[serde(default)]
    pub last_session_id: u64,
    #[serde(default)]
    pub templates: Vec<TemplateRecord>,
    #[serde(default)]
    pub users: Vec<UserRecord>,
    #[serde(default)]
    pub sessions: Vec<SessionRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateRecord {
    pub topo_id: TopoId,
    pub topology: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: u64,
    pub topo_id: TopoId,
    pub user_id: String,
    pub topology: String,
}

impl From<SessionRecord> for Session {
    fn from(record: SessionRecord) -> Self {
        Session {
            id: SessionId(record.session_id),
            topo_id: record.topo_id,
            user_id: record.user_id,
            topology: record.topology,
        }
    }
}

impl From<&Session> for SessionRecord {
    fn from(session: &Session) -> Self {
        SessionRecord {
            session_id: session.id.0,
            topo_id: session.topo_id,
            user_id: session.user_id.clone(),
            topology: session.topology.clone(),
        }
    }
}
