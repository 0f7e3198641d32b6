//! AmplineEngine: the controller-facing handle.

use crate::Result;
use ampline_core::{DuplexEngine, EngineState, EngineStats, ModelBridge};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

/// Duplex amp-model engine.
///
/// Every method takes `&self`, so the engine can be shared between a UI
/// thread and a loader thread. Model loads go straight to the bridge and do
/// not wait for start/stop.
///
/// # Example
///
/// ```ignore
/// use ampline::prelude::*;
///
/// let engine = AmplineEngine::builder().registry(registry).build()?;
/// engine.start()?;
///
/// engine.load_model("models/plexi.nam")?;
/// engine.set_input_gain(3.0);
/// println!("{} @ {} Hz", engine.model_name().unwrap_or_default(), engine.sample_rate());
/// ```
pub struct AmplineEngine {
    engine: Mutex<DuplexEngine>,
    bridge: Arc<ModelBridge>,
}

impl AmplineEngine {
    pub fn builder() -> crate::AmplineEngineBuilder {
        crate::AmplineEngineBuilder::default()
    }

    pub(crate) fn from_parts(engine: DuplexEngine, bridge: Arc<ModelBridge>) -> Self {
        Self {
            engine: Mutex::new(engine),
            bridge,
        }
    }

    /// Negotiate the audio session and start rendering. No-op when running.
    pub fn start(&self) -> Result<()> {
        Ok(self.engine.lock().start()?)
    }

    /// Idempotent. No render callback runs once this returns.
    pub fn stop(&self) {
        self.engine.lock().stop();
    }

    /// Load a model file and swap it in. Blocks the calling thread; audio
    /// keeps flowing through the previous model (or pass-through) meanwhile.
    pub fn load_model(&self, path: impl AsRef<Path>) -> Result<()> {
        Ok(self.bridge.load(path)?)
    }

    /// Back to pass-through.
    pub fn unload_model(&self) {
        self.bridge.unload();
    }

    /// Reconfigure the bridge for a new rate and block size. Intended for
    /// when the engine is stopped; `start()` does this on its own.
    pub fn reset(&self, sample_rate: f64, max_buffer_size: usize) {
        self.bridge.reset(sample_rate, max_buffer_size);
    }

    pub fn set_bypass(&self, bypass: bool) {
        self.bridge.set_bypass(bypass);
    }

    /// dB. The UI range is ±12 dB; values outside it are applied as-is.
    pub fn set_input_gain(&self, db: f32) {
        self.bridge.set_input_gain(db);
    }

    /// dB. The UI range is ±12 dB; values outside it are applied as-is.
    pub fn set_output_gain(&self, db: f32) {
        self.bridge.set_output_gain(db);
    }

    pub fn is_running(&self) -> bool {
        self.engine.lock().is_running()
    }

    pub fn state(&self) -> EngineState {
        self.engine.lock().state()
    }

    pub fn is_model_loaded(&self) -> bool {
        self.bridge.is_model_loaded()
    }

    /// File stem of the active model.
    pub fn model_name(&self) -> Option<String> {
        self.bridge.model_name()
    }

    /// Granted sample rate once started, otherwise the bridge's current one.
    pub fn sample_rate(&self) -> f64 {
        match self.engine.lock().session() {
            Some(session) => session.sample_rate,
            None => self.bridge.session().sample_rate,
        }
    }

    /// Granted buffer size in frames once started, otherwise the bridge's
    /// current one.
    pub fn buffer_size(&self) -> usize {
        match self.engine.lock().session() {
            Some(session) => session.buffer_frames,
            None => self.bridge.session().buffer_frames,
        }
    }

    pub fn stats(&self) -> EngineStats {
        self.engine.lock().stats()
    }

    pub fn input_gain_db(&self) -> f32 {
        self.bridge.gain().input_db()
    }

    pub fn output_gain_db(&self) -> f32 {
        self.bridge.gain().output_db()
    }

    pub fn is_bypassed(&self) -> bool {
        self.bridge.gain().is_bypassed()
    }

    /// Direct access to the bridge, e.g. for offline rendering.
    pub fn bridge(&self) -> &Arc<ModelBridge> {
        &self.bridge
    }
}
