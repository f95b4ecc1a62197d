//! Request and response payloads of the session control plane.
//!
//! Requests arrive with every field optional and are checked with
//! `validate()` before any domain logic runs.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use toynet_core::error::{Result, ToynetError};
use toynet_core::session::{SessionId, TopoId};
use toynet_core::topology::DeviceKind;

fn required<'a>(value: &'a Option<String>, message: &str) -> Result<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ToynetError::validation(message)),
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(alias = "toynet_topo_id")]
    pub topo_id: Option<TopoId>,
    #[serde(alias = "toynet_user_id")]
    pub user_id: Option<String>,
}

impl CreateSessionRequest {
    pub fn new(topo_id: TopoId, user_id: impl Into<String>) -> Self {
        Self {
            topo_id: Some(topo_id),
            user_id: Some(user_id.into()),
        }
    }

    pub fn validate(&self) -> Result<(TopoId, &str)> {
        let topo_id = self
            .topo_id
            .ok_or_else(|| ToynetError::validation("Missing topo_id from req"))?;
        let user_id = required(&self.user_id, "Missing user_id from req")?;
        Ok((topo_id, user_id))
    }
}

/// Raw command edit of a session's topology.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModifyTopologyRequest {
    pub command: Option<String>,
    pub ip: Option<String>,
}

impl ModifyTopologyRequest {
    pub fn validate(&self) -> Result<(&str, Option<&str>)> {
        let command = required(&self.command, "missing [command] argument")?;
        let ip = self
            .ip
            .as_deref()
            .map(str::trim)
            .filter(|ip| !ip.is_empty());
        Ok((command, ip))
    }
}

/// Runtime command forwarded to the live emulator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunCommandRequest {
    #[serde(alias = "toynet_command")]
    pub command: Option<String>,
}

impl RunCommandRequest {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: Some(command.into()),
        }
    }

    /// Returns the command exactly as given; only blank input is rejected.
    pub fn validate(&self) -> Result<&str> {
        match self.command.as_deref() {
            Some(command) if !command.trim().is_empty() => Ok(command),
            _ => Err(ToynetError::validation("toynet_command not specified")),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateHostRequest {
    pub name: Option<String>,
    pub ip: Option<String>,
    pub def_gateway: Option<String>,
}

impl CreateHostRequest {
    pub fn new(
        name: impl Into<String>,
        ip: impl Into<String>,
        def_gateway: impl Into<String>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            ip: Some(ip.into()),
            def_gateway: Some(def_gateway.into()),
        }
    }

    /// Returns `(name, ip, def_gateway)`.
    pub fn validate(&self) -> Result<(&str, &str, &str)> {
        let ip = required(&self.ip, "Missing ip from req")?;
        let name = required(&self.name, "Missing name from req")?;
        let gateway = required(&self.def_gateway, "Missing def_gateway from req")?;
        Ok((name, ip, gateway))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateSwitchRequest {
    pub name: Option<String>,
}

impl CreateSwitchRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }

    pub fn validate(&self) -> Result<&str> {
        required(&self.name, "Missing name from req")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteDeviceRequest {
    pub device_type: Option<String>,
    pub name: Option<String>,
}

impl DeleteDeviceRequest {
    pub fn new(device_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            device_type: Some(device_type.into()),
            name: Some(name.into()),
        }
    }

    pub fn validate(&self) -> Result<(DeviceKind, &str)> {
        let name = required(&self.name, "No device name specified")?;
        let device_type = self.device_type.as_deref().unwrap_or_default();
        let kind = DeviceKind::from_str(device_type).map_err(|_| {
            ToynetError::validation(format!("Invalid device type: {}", device_type))
        })?;
        Ok((kind, name))
    }
}

/// Answer to a create-session request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedSession {
    pub session_id: SessionId,
    pub running: bool,
}

/// Answer to a get-session request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionView {
    pub topo_id: TopoId,
    pub user_id: String,
    pub topology: String,
    pub running: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    pub output: String,
}
