//! Inference unit contract and model construction for Ampline.
//!
//! This crate knows nothing about audio devices. It defines:
//!
//! - [`InferenceUnit`]: the contract a model implementation fulfils
//!   (reset, allocation-free `process`, optional warm-up length)
//! - [`ModelRuntime`]: the object-safe wrapper the real-time bridge drives,
//!   implemented by [`UnitRuntime`] which owns the native-format scratch buffers
//! - [`ModelFactory`] / [`ModelRegistry`]: injected construction of runtimes from
//!   model files, dispatched on the file's `architecture` field
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ampline_model::{ModelRegistry, ModelFactory};
//!
//! let registry = ModelRegistry::new();
//! registry.register("WaveNet", |doc| MyWaveNet::from_json(&doc.raw));
//!
//! let runtime = registry.construct("models/plexi.nam".as_ref())?;
//! ```

mod error;
pub use error::{ModelLoadError, Result};

mod sample;
pub use sample::NativeSample;

mod unit;
pub use unit::{ConversionBuffers, InferenceUnit, ModelRuntime, UnitRuntime};

mod registry;
pub use registry::{ModelConstructor, ModelDocument, ModelFactory, ModelHeader, ModelRegistry};
