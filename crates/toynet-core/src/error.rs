//! Error types for the ToyNet orchestrator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the entire ToyNet service.
///
/// Variants follow the failure kinds a control-plane caller can observe:
/// boundary validation, missing entities, topology integrity violations,
/// failures reported by a live emulator and failures of the container
/// driver or the store.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ToynetError {
    /// Malformed or missing request fields
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// A topology document could not be parsed or serialized
    #[error("Malformed topology document: {0}")]
    MalformedDocument(String),

    /// No router interface carries the requested gateway address
    #[error("No router with IP: {gateway}")]
    GatewayNotFound { gateway: String },

    /// A device is still referenced by at least one link
    #[error("Device {name} is connected to another device")]
    DeviceInUse { name: String },

    /// The session has no registered emulator container
    #[error("Container for session {session_id} does not exist")]
    NoLiveContainer { session_id: String },

    /// Non-success answer from an emulator's control API
    #[error("Emulator returned {status}: {message}")]
    Remote { status: u16, message: String },

    /// The emulator's control API could not be reached at all
    #[error("Emulator unreachable: {0}")]
    Unreachable(String),

    /// Container driver failure (create, inspect, capacity query)
    #[error("Container driver error: {0}")]
    Container(String),

    /// The container backing a session could not be killed
    #[error("Failed to terminate session {session_id}")]
    TerminateFailed { session_id: String },

    /// Data access error (store query or commit)
    #[error("Data access error: {0}")]
    DataAccess(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", "XML"
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ToynetError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates a MalformedDocument error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedDocument(message.into())
    }

    /// Creates a Remote error, preserving the emulator's status and message
    pub fn remote(status: u16, message: impl Into<String>) -> Self {
        Self::Remote {
            status,
            message: message.into(),
        }
    }

    /// Creates a Container error
    pub fn container(message: impl Into<String>) -> Self {
        Self::Container(message.into())
    }

    /// Creates a DataAccess error
    pub fn data_access(message: impl Into<String>) -> Self {
        Self::DataAccess(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a Validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Check if this error names a missing entity (including gateways)
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::GatewayNotFound { .. })
    }

    /// Check if this is a referential-integrity violation
    pub fn is_device_in_use(&self) -> bool {
        matches!(self, Self::DeviceInUse { .. })
    }

    /// Check if this error was reported by a live emulator
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }

    /// Status code the control plane answers with for this error.
    ///
    /// Remote errors pass the emulator's status through unchanged.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_)
            | Self::NotFound { .. }
            | Self::GatewayNotFound { .. }
            | Self::DeviceInUse { .. }
            | Self::MalformedDocument(_) => 400,
            Self::Remote { status, .. } => *status,
            _ => 500,
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for ToynetError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for ToynetError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for ToynetError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for ToynetError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<quick_xml::DeError> for ToynetError {
    fn from(err: quick_xml::DeError) -> Self {
        Self::MalformedDocument(err.to_string())
    }
}

impl From<quick_xml::SeError> for ToynetError {
    fn from(err: quick_xml::SeError) -> Self {
        Self::Serialization {
            format: "XML".to_string(),
            message: err.to_string(),
        }
    }
}

/// Conversion from anyhow::Error (used by adapters that wrap foreign errors)
impl From<anyhow::Error> for ToynetError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, ToynetError>`.
pub type Result<T> = std::result::Result<T, ToynetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ToynetError::validation("missing name").status_code(), 400);
        assert_eq!(ToynetError::not_found("Session", "7").status_code(), 400);
        assert_eq!(
            ToynetError::DeviceInUse {
                name: "h1".to_string()
            }
            .status_code(),
            400
        );
        assert_eq!(ToynetError::remote(409, "busy").status_code(), 409);
        assert_eq!(ToynetError::data_access("commit failed").status_code(), 500);
    }

    #[test]
    fn test_remote_message_is_preserved() {
        let err = ToynetError::remote(422, "bad topology: h9");
        assert!(err.is_remote());
        assert_eq!(err.to_string(), "Emulator returned 422: bad topology: h9");
    }

    #[test]
    fn test_gateway_counts_as_not_found() {
        let err = ToynetError::GatewayNotFound {
            gateway: "10.9.9.9".to_string(),
        };
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "No router with IP: 10.9.9.9");
    }
}
