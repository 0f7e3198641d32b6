//! Centralized error type for the ampline umbrella crate.
//!
//! Wraps the subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] ampline_core::Error),

    #[error("Model: {0}")]
    Model(#[from] ampline_model::ModelLoadError),
}

impl From<ampline_core::ConfigurationError> for Error {
    fn from(e: ampline_core::ConfigurationError) -> Self {
        Self::Core(e.into())
    }
}

impl From<ampline_core::DeviceError> for Error {
    fn from(e: ampline_core::DeviceError) -> Self {
        Self::Core(e.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
