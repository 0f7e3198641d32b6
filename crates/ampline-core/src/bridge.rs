//! Model hot-swap bridge.
//!
//! Owns the active model and lets control threads replace it while the
//! audio thread keeps rendering.
//!
//! ```text
//!  control thread                          audio thread
//!  ──────────────                          ────────────
//!  load(path)                              process(input, output)
//!    factory.construct(path)                 slot.get()       (acquire)
//!    runtime.reset(session)                  runtime.try_lock()
//!    runtime.prewarm()                       gain → unit → gain
//!    slot.replace(new)       (release)       reference dropped (queued, not freed)
//!    drop(old)               queued
//!    reclaimer.collect()     frees models no render call still holds
//! ```
//!
//! # RT Safety
//!
//! `process` only performs a `SharedCell` read, a `try_lock` and the unit's own
//! allocation-free processing. Releasing its reference never frees memory.
//! When anything is off (no model, bypass, lock held by `reset`, block over
//! capacity, non-finite output) it copies input to output instead.

use crate::config::SessionConfig;
use crate::gain::GainStage;
use crate::reclaim::Reclaimer;
use ampline_model::{ModelFactory, ModelLoadError, ModelRuntime};
use basedrop::{Shared, SharedCell};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

/// A published model. Never mutated from a control thread while published,
/// except under its runtime lock by `reset`.
struct ActiveModel {
    name: String,
    runtime: Mutex<Box<dyn ModelRuntime>>,
}

impl ActiveModel {
    fn new(path: &Path, runtime: Box<dyn ModelRuntime>) -> Self {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            name,
            runtime: Mutex::new(runtime),
        }
    }
}

/// Control-side state. Holding this lock serializes load/reset/unload.
struct BridgeControl {
    session: SessionConfig,
    capacity: usize,
    reclaimer: Reclaimer,
}

pub struct ModelBridge {
    // Declared before `control` so the slot's last value is queued before
    // the collector goes away.
    slot: SharedCell<Option<ActiveModel>>,
    gain: GainStage,
    factory: Arc<dyn ModelFactory>,
    control: Mutex<BridgeControl>,
}

impl ModelBridge {
    pub fn new(factory: Arc<dyn ModelFactory>, session: SessionConfig) -> Self {
        Self::with_gain(factory, session, GainStage::default())
    }

    pub fn with_gain(factory: Arc<dyn ModelFactory>, session: SessionConfig, gain: GainStage) -> Self {
        let reclaimer = Reclaimer::new();
        Self {
            slot: SharedCell::new(Shared::new(&reclaimer.handle(), None)),
            gain,
            factory,
            control: Mutex::new(BridgeControl {
                session,
                capacity: session.buffer_frames,
                reclaimer,
            }),
        }
    }

    /// Load a model and make it active. Blocks; never call from the audio thread.
    ///
    /// On failure the previously active model (if any) stays active.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<(), ModelLoadError> {
        let path = path.as_ref();
        let mut control = self.control.lock();

        let mut runtime = self.factory.construct(path).inspect_err(|e| {
            tracing::warn!("Failed to load model {}: {}", path.display(), e);
        })?;

        let session = control.session;
        if let Some(expected) = runtime.expected_sample_rate() {
            if (expected - session.sample_rate).abs() > f64::EPSILON {
                tracing::warn!(
                    "Model {} expects {} Hz, session runs at {} Hz",
                    path.display(),
                    expected,
                    session.sample_rate
                );
            }
        }

        runtime.reset(session.sample_rate, control.capacity);
        runtime.prewarm();

        let model = ActiveModel::new(path, runtime);
        tracing::info!(
            "Loaded model '{}' from {} ({} Hz, {} frames)",
            model.name,
            path.display(),
            session.sample_rate,
            control.capacity
        );

        let previous = self
            .slot
            .replace(Shared::new(&control.reclaimer.handle(), Some(model)));
        drop(previous);
        control.reclaimer.collect();
        Ok(())
    }

    /// Clear the active slot. Subsequent blocks pass through.
    pub fn unload(&self) {
        let mut control = self.control.lock();
        let previous = self.slot.replace(Shared::new(&control.reclaimer.handle(), None));
        if let Some(model) = &*previous {
            tracing::info!("Unloaded model '{}'", model.name);
        }
        drop(previous);
        control.reclaimer.collect();
    }

    /// Render one block. Audio thread.
    ///
    /// Only `min(input.len(), output.len())` samples are touched.
    #[inline]
    pub fn process(&self, input: &[f32], output: &mut [f32]) {
        let frames = input.len().min(output.len());
        let input = &input[..frames];
        let output = &mut output[..frames];

        let active = self.slot.get();
        let model = match &*active {
            Some(model) if !self.gain.is_bypassed() => model,
            _ => {
                output.copy_from_slice(input);
                return;
            }
        };

        let rendered = match model.runtime.try_lock() {
            Some(mut runtime) => runtime.render(
                input,
                output,
                self.gain.input_linear(),
                self.gain.output_linear(),
            ),
            None => false,
        };

        if !rendered {
            output.copy_from_slice(input);
        }
    }

    /// Reconfigure for a new sample rate and block ceiling. Capacity only grows.
    ///
    /// Meant for when the engine is stopped. If a render call does overlap,
    /// it passes input through for that block.
    pub fn reset(&self, sample_rate: f64, max_buffer_size: usize) {
        self.reset_inner(sample_rate, max_buffer_size, false);
    }

    /// Like [`reset`](Self::reset), but `max_buffer_size` becomes the new
    /// capacity even when smaller than the current one.
    pub fn reset_with_ceiling(&self, sample_rate: f64, max_buffer_size: usize) {
        self.reset_inner(sample_rate, max_buffer_size, true);
    }

    /// Put back a session and capacity read earlier from
    /// [`session`](Self::session) and [`capacity`](Self::capacity).
    pub(crate) fn restore(&self, session: SessionConfig, capacity: usize) {
        let mut control = self.control.lock();
        self.apply(&mut control, session, capacity);
    }

    fn reset_inner(&self, sample_rate: f64, max_buffer_size: usize, allow_shrink: bool) {
        let mut control = self.control.lock();
        let capacity = if allow_shrink {
            max_buffer_size
        } else {
            control.capacity.max(max_buffer_size)
        };
        self.apply(
            &mut control,
            SessionConfig::new(sample_rate, max_buffer_size),
            capacity,
        );
    }

    fn apply(&self, control: &mut BridgeControl, session: SessionConfig, capacity: usize) {
        control.capacity = capacity;
        control.session = session;

        let active = self.slot.get();
        if let Some(model) = &*active {
            let mut runtime = model.runtime.lock();
            runtime.reset(session.sample_rate, capacity);
            runtime.prewarm();
        }
        drop(active);

        tracing::debug!(
            "Bridge reset: {} Hz, capacity {} frames",
            session.sample_rate,
            capacity
        );
        control.reclaimer.collect();
    }

    pub fn set_bypass(&self, bypass: bool) {
        self.gain.set_bypass(bypass);
    }

    pub fn set_input_gain(&self, db: f32) {
        self.gain.set_input_gain(db);
    }

    pub fn set_output_gain(&self, db: f32) {
        self.gain.set_output_gain(db);
    }

    pub fn gain(&self) -> &GainStage {
        &self.gain
    }

    pub fn is_model_loaded(&self) -> bool {
        self.slot.get().is_some()
    }

    pub fn model_name(&self) -> Option<String> {
        (*self.slot.get()).as_ref().map(|m| m.name.clone())
    }

    /// Frames a block may have without falling back to pass-through.
    pub fn capacity(&self) -> usize {
        self.control.lock().capacity
    }

    pub fn session(&self) -> SessionConfig {
        self.control.lock().session
    }

    /// Free retired models no render call still references.
    pub fn collect_retired(&self) -> usize {
        self.control.lock().reclaimer.collect()
    }

    /// Retired models not yet freed, still referenced or only queued.
    pub fn retired_count(&self) -> usize {
        // The slot itself always holds one allocation.
        self.control.lock().reclaimer.live().saturating_sub(1)
    }
}
