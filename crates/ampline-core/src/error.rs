//! Error types for ampline-core.

use crate::session::NegotiationStep;
use thiserror::Error;

/// Error type for ampline-core operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Device(#[from] DeviceError),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// The audio session rejected a negotiation step.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Session negotiation failed at {step}: {reason}")]
pub struct ConfigurationError {
    pub step: NegotiationStep,
    pub reason: String,
}

/// Duplex unit setup failed at a specific step.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeviceError {
    #[error("No duplex audio component available")]
    ComponentNotFound,

    #[error("Failed to instantiate duplex unit: {0}")]
    InstantiationFailed(String),

    #[error("Failed to set {property}: {reason}")]
    PropertySetFailed {
        property: &'static str,
        reason: String,
    },

    #[error("Failed to start duplex unit: {0}")]
    StartFailed(String),
}

impl DeviceError {
    pub fn property(property: &'static str, reason: impl ToString) -> Self {
        Self::PropertySetFailed {
            property,
            reason: reason.to_string(),
        }
    }
}

/// A host rejected a request. Carries the host's own description.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct HostError(pub String);

impl HostError {
    pub fn new(reason: impl ToString) -> Self {
        Self(reason.to_string())
    }
}
