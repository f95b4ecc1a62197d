//! Topology domain module.
//!
//! # Module Structure
//!
//! - `model`: the XML-backed document (`Topology`) and its device types
//! - `device`: device kinds (`DeviceKind`)
//! - `edit`: pure whole-document edit operations

mod device;
pub mod edit;
mod model;

pub use device::DeviceKind;
pub use model::{
    DefaultRouter, Host, HostList, Link, LinkEndpoint, LinkList, Router, RouterList, Switch,
    SwitchList, Topology,
};
