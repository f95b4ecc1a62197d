//! Session domain model.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ToynetError;

/// Store-assigned session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = ToynetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(SessionId)
            .map_err(|_| ToynetError::validation(format!("invalid session id: {}", s)))
    }
}

/// Identifier of a stored topology template.
pub type TopoId = u64;

/// A user's emulated network as persisted by the store.
///
/// `topo_id` and `user_id` never change after creation; only `topology`
/// is rewritten by edits. Whether the session is running is not part of
/// the record: it is derived from the container registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    /// Template the session was copied from
    pub topo_id: TopoId,
    /// Owner
    pub user_id: String,
    /// Current topology document (XML)
    pub topology: String,
}
