//! Modification command parser contract.

use crate::error::Result;
use crate::topology::Topology;

/// Turns a free-form modification command into a new topology document.
///
/// `ip` carries the optional address parameter some commands need (for
/// example the address of a new host).
pub trait CommandParser: Send + Sync {
    fn apply(&self, command: &str, topology: &Topology, ip: Option<&str>) -> Result<Topology>;
}
