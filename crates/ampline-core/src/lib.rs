//! Real-time duplex engine with a lock-free model hot-swap bridge.
//!
//! # Primary API
//!
//! - [`DuplexEngine`]: session negotiation, duplex unit setup, render callback
//! - [`ModelBridge`]: the active model, swapped from control threads while the
//!   audio thread keeps rendering
//! - [`GainStage`]: input/output gain and bypass
//! - [`host`]: hardware abstraction with [`OfflineHost`] and, with the `cpal`
//!   feature (default), [`CpalHost`]
//!
//! # Example
//!
//! ```ignore
//! use ampline_core::{DuplexEngine, EngineConfig, ModelBridge, OfflineHost, SessionConfig};
//! use ampline_model::ModelRegistry;
//! use std::sync::Arc;
//!
//! let registry = ModelRegistry::new();
//! let bridge = Arc::new(ModelBridge::new(Arc::new(registry), SessionConfig::default()));
//! let mut engine = DuplexEngine::new(Box::new(OfflineHost::new()), bridge.clone(), EngineConfig::default());
//!
//! engine.start()?;
//! bridge.load("models/plexi.nam")?;
//! ```

pub mod error;
pub use error::{ConfigurationError, DeviceError, Error, HostError, Result};

pub mod config;
pub use config::{EngineConfig, SessionConfig, MAX_BUFFER_FRAMES};

pub(crate) mod lockfree;
pub use lockfree::{AtomicFlag, AtomicFloat};

pub mod gain;
pub use gain::{db_to_linear, linear_to_db, GainStage};

mod reclaim;

mod bridge;
pub use bridge::ModelBridge;

pub mod session;
pub use session::NegotiationStep;

pub mod host;
pub use host::{AudioHost, AudioSession, DuplexUnit, OfflineDriver, OfflineHost, RenderStatus};

#[cfg(feature = "cpal")]
pub use host::CpalHost;

mod callback;
pub use callback::EngineStats;

mod engine;
pub use engine::{DuplexEngine, EngineState};
