//! Builder for configuring and constructing an `AmplineEngine`.

use crate::{AmplineEngine, Result};
use ampline_core::{
    AudioHost, DuplexEngine, EngineConfig, GainStage, ModelBridge, SessionConfig,
};
use ampline_model::{ModelFactory, ModelRegistry};
use std::path::PathBuf;
use std::sync::Arc;

/// The requested sample rate and buffer size are preferences: the host may
/// grant something else. Query `engine.sample_rate()` / `engine.buffer_size()`
/// after `start()` for the real values.
///
/// Without an explicit host the default CPAL devices are used (feature
/// `cpal`, on by default).
///
/// # Example
///
/// ```ignore
/// use ampline::prelude::*;
///
/// let registry = ModelRegistry::new();
/// registry.register("WaveNet", |doc| WaveNetUnit::from_json(&doc.raw));
///
/// let engine = AmplineEngine::builder()
///     .sample_rate(48000.0)
///     .buffer_frames(128)
///     .registry(registry)
///     .model("models/plexi.nam")
///     .build()?;
///
/// engine.start()?;
/// ```
#[derive(Default)]
pub struct AmplineEngineBuilder {
    config: EngineConfig,
    buffer_frames: Option<usize>,
    host: Option<Box<dyn AudioHost>>,
    factory: Option<Arc<dyn ModelFactory>>,
    model: Option<PathBuf>,
}

impl AmplineEngineBuilder {
    /// Replace the whole configuration.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Default: 48000.0
    pub fn sample_rate(mut self, sample_rate: f64) -> Self {
        self.config.preferred_sample_rate = sample_rate;
        self
    }

    /// Preferred I/O buffer duration in seconds.
    pub fn buffer_duration(mut self, seconds: f64) -> Self {
        self.config.preferred_buffer_duration = seconds;
        self.buffer_frames = None;
        self
    }

    /// Preferred I/O buffer size in frames at the preferred sample rate.
    /// Default: 256
    pub fn buffer_frames(mut self, frames: usize) -> Self {
        self.buffer_frames = Some(frames);
        self
    }

    /// Longest period rendered without clipping. Default: 8192
    pub fn max_buffer_frames(mut self, frames: usize) -> Self {
        self.config.max_buffer_frames = frames;
        self
    }

    pub fn input_gain_db(mut self, db: f32) -> Self {
        self.config.input_gain_db = db;
        self
    }

    pub fn output_gain_db(mut self, db: f32) -> Self {
        self.config.output_gain_db = db;
        self
    }

    pub fn bypass(mut self, bypass: bool) -> Self {
        self.config.bypass = bypass;
        self
    }

    pub fn host(mut self, host: impl AudioHost + 'static) -> Self {
        self.host = Some(Box::new(host));
        self
    }

    pub fn registry(self, registry: ModelRegistry) -> Self {
        self.model_factory(Arc::new(registry))
    }

    pub fn model_factory(mut self, factory: Arc<dyn ModelFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Model to load while building. A load failure fails the build.
    pub fn model(mut self, path: impl Into<PathBuf>) -> Self {
        self.model = Some(path.into());
        self
    }

    pub fn build(self) -> Result<AmplineEngine> {
        let mut config = self.config;
        if let Some(frames) = self.buffer_frames {
            config.preferred_buffer_duration = frames as f64 / config.preferred_sample_rate;
        }
        config.validate()?;

        let host = match self.host {
            Some(host) => host,
            None => default_host()?,
        };
        let factory: Arc<dyn ModelFactory> = match self.factory {
            Some(factory) => factory,
            None => Arc::new(ModelRegistry::new()),
        };

        let session = SessionConfig::new(
            config.preferred_sample_rate,
            config.preferred_buffer_frames().min(config.max_buffer_frames),
        );
        let gain = GainStage::new(config.input_gain_db, config.output_gain_db, config.bypass);
        let bridge = Arc::new(ModelBridge::with_gain(factory, session, gain));

        if let Some(path) = &self.model {
            bridge.load(path)?;
        }

        tracing::debug!(
            "Built engine: preferred {} Hz / {} frames",
            session.sample_rate,
            session.buffer_frames
        );
        let engine = DuplexEngine::new(host, bridge.clone(), config);
        Ok(AmplineEngine::from_parts(engine, bridge))
    }
}

#[cfg(feature = "cpal")]
fn default_host() -> Result<Box<dyn AudioHost>> {
    Ok(Box::new(ampline_core::CpalHost::new()))
}

#[cfg(not(feature = "cpal"))]
fn default_host() -> Result<Box<dyn AudioHost>> {
    Err(ampline_core::Error::InvalidConfig(
        "no audio host configured (enable the `cpal` feature or call `.host()`)".into(),
    )
    .into())
}
