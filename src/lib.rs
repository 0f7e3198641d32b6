//! # Ampline - Real-time Amp-Model Host
//!
//! Full-duplex audio engine that runs a neural amp model on live input and
//! lets the model be swapped without interrupting the stream.
//!
//! ## Architecture
//!
//! Ampline is an umbrella crate that coordinates:
//! - **ampline-model** - Inference unit contract, model registry and file loading
//! - **ampline-core** - Duplex engine, session negotiation, host abstraction,
//!   gain/bypass and the lock-free model hot-swap bridge
//!
//! ## Quick Start
//!
//! ```ignore
//! use ampline::prelude::*;
//!
//! let registry = ModelRegistry::new();
//! registry.register("WaveNet", |doc| WaveNetUnit::from_json(&doc.raw));
//!
//! let engine = AmplineEngine::builder()
//!     .buffer_frames(128)
//!     .registry(registry)
//!     .build()?;
//!
//! engine.start()?;
//! engine.load_model("models/plexi.nam")?;
//! engine.set_output_gain(-3.0);
//! ```
//!
//! ## Feature Flags
//!
//! - `cpal` (default) - Hardware duplex I/O through the default CPAL devices

/// Re-export of ampline-core for direct access
pub use ampline_core as core;

/// Re-export of ampline-model for direct access
pub use ampline_model as model;

pub use ampline_core::{
    AudioHost, ConfigurationError, DeviceError, DuplexEngine, EngineConfig, EngineState,
    EngineStats, GainStage, ModelBridge, NegotiationStep, OfflineDriver, OfflineHost,
    RenderStatus, SessionConfig,
};

#[cfg(feature = "cpal")]
pub use ampline_core::CpalHost;

pub use ampline_model::{
    InferenceUnit, ModelDocument, ModelFactory, ModelHeader, ModelLoadError, ModelRegistry,
    ModelRuntime, NativeSample, UnitRuntime,
};

mod error;
pub use error::{Error, Result};

mod builder;
mod engine;

pub use builder::AmplineEngineBuilder;
pub use engine::AmplineEngine;

/// Convenience prelude for common imports
pub mod prelude {
    pub use crate::{AmplineEngine, AmplineEngineBuilder};

    pub use crate::{EngineConfig, EngineStats, OfflineHost};

    pub use crate::{InferenceUnit, ModelDocument, ModelLoadError, ModelRegistry};
}
