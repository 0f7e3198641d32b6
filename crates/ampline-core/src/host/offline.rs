//! Deterministic host for tests and offline rendering.
//!
//! Nothing runs on its own: periods are rendered by calling
//! [`OfflineDriver::render_period`] with the "captured" input.

use super::{
    AudioHost, AudioSession, CategoryOptions, ComponentDescription, Direction, DuplexUnit,
    InputPull, RenderCallback, RenderStatus, Scope, SessionCategory, StreamFormat,
};
use crate::error::{DeviceError, HostError};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// A step the offline host can be told to reject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    Category,
    SampleRate,
    BufferDuration,
    Activate,
    FindComponent,
    Instantiate,
    EnableIo,
    StreamFormat,
    Initialize,
    Start,
}

#[derive(Default)]
struct DriverState {
    callback: Option<RenderCallback>,
    initialized: bool,
    running: bool,
    input_enabled: bool,
    output_enabled: bool,
    input_format: Option<StreamFormat>,
    output_format: Option<StreamFormat>,
    live_units: usize,
}

impl DriverState {
    fn release(&mut self) {
        self.running = false;
        self.initialized = false;
        self.callback = None;
    }
}

/// Session and unit factory backed by an [`OfflineDriver`].
pub struct OfflineHost {
    preferred_sample_rate: f64,
    preferred_duration: f64,
    granted: Option<(f64, usize)>,
    faults: HashSet<Fault>,
    state: Arc<Mutex<DriverState>>,
}

impl Default for OfflineHost {
    fn default() -> Self {
        Self::new()
    }
}

impl OfflineHost {
    /// A host that grants whatever is requested.
    pub fn new() -> Self {
        Self {
            preferred_sample_rate: crate::config::DEFAULT_SAMPLE_RATE,
            preferred_duration: crate::config::DEFAULT_BUFFER_FRAMES as f64
                / crate::config::DEFAULT_SAMPLE_RATE,
            granted: None,
            faults: HashSet::new(),
            state: Arc::new(Mutex::new(DriverState::default())),
        }
    }

    /// Grant these values regardless of the request.
    pub fn with_granted(mut self, sample_rate: f64, buffer_frames: usize) -> Self {
        self.granted = Some((sample_rate, buffer_frames));
        self
    }

    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.faults.insert(fault);
        self
    }

    pub fn clear_faults(&mut self) {
        self.faults.clear();
    }

    /// Handle for rendering periods. Stays valid after the host is moved
    /// into an engine.
    pub fn driver(&self) -> OfflineDriver {
        OfflineDriver {
            state: self.state.clone(),
        }
    }

    fn check(&self, fault: Fault) -> Result<(), HostError> {
        if self.faults.contains(&fault) {
            Err(HostError::new(format!("injected {fault:?} fault")))
        } else {
            Ok(())
        }
    }
}

impl AudioSession for OfflineHost {
    fn set_category(
        &mut self,
        _category: SessionCategory,
        _options: CategoryOptions,
    ) -> Result<(), HostError> {
        self.check(Fault::Category)
    }

    fn set_preferred_sample_rate(&mut self, sample_rate: f64) -> Result<(), HostError> {
        self.check(Fault::SampleRate)?;
        self.preferred_sample_rate = sample_rate;
        Ok(())
    }

    fn set_preferred_io_buffer_duration(&mut self, duration: f64) -> Result<(), HostError> {
        self.check(Fault::BufferDuration)?;
        self.preferred_duration = duration;
        Ok(())
    }

    fn activate(&mut self) -> Result<(), HostError> {
        self.check(Fault::Activate)
    }

    fn sample_rate(&self) -> f64 {
        match self.granted {
            Some((sample_rate, _)) => sample_rate,
            None => self.preferred_sample_rate,
        }
    }

    fn io_buffer_duration(&self) -> f64 {
        match self.granted {
            Some((sample_rate, frames)) => frames as f64 / sample_rate,
            None => self.preferred_duration,
        }
    }
}

impl AudioHost for OfflineHost {
    fn find_duplex_component(&mut self) -> Option<ComponentDescription> {
        if self.faults.contains(&Fault::FindComponent) {
            return None;
        }
        Some(ComponentDescription::new("Offline Duplex", "ampline"))
    }

    fn instantiate(
        &mut self,
        component: &ComponentDescription,
    ) -> Result<Box<dyn DuplexUnit>, DeviceError> {
        if self.faults.contains(&Fault::Instantiate) {
            return Err(DeviceError::InstantiationFailed(format!(
                "injected fault instantiating {}",
                component.name
            )));
        }
        self.state.lock().live_units += 1;
        Ok(Box::new(OfflineUnit {
            faults: self.faults.clone(),
            state: self.state.clone(),
        }))
    }
}

struct OfflineUnit {
    faults: HashSet<Fault>,
    state: Arc<Mutex<DriverState>>,
}

impl OfflineUnit {
    fn check(&self, fault: Fault, property: &'static str) -> Result<(), DeviceError> {
        if self.faults.contains(&fault) {
            Err(DeviceError::property(property, "injected fault"))
        } else {
            Ok(())
        }
    }
}

impl DuplexUnit for OfflineUnit {
    fn enable_io(&mut self, direction: Direction, enabled: bool) -> Result<(), DeviceError> {
        self.check(Fault::EnableIo, "EnableIO")?;
        let mut state = self.state.lock();
        match direction {
            Direction::Input => state.input_enabled = enabled,
            Direction::Output => state.output_enabled = enabled,
        }
        Ok(())
    }

    fn set_stream_format(&mut self, scope: Scope, format: StreamFormat) -> Result<(), DeviceError> {
        self.check(Fault::StreamFormat, "StreamFormat")?;
        let mut state = self.state.lock();
        match scope {
            Scope::Input => state.input_format = Some(format),
            Scope::Output => state.output_format = Some(format),
        }
        Ok(())
    }

    fn set_render_callback(&mut self, callback: RenderCallback) -> Result<(), DeviceError> {
        self.state.lock().callback = Some(callback);
        Ok(())
    }

    fn initialize(&mut self) -> Result<(), DeviceError> {
        if self.faults.contains(&Fault::Initialize) {
            return Err(DeviceError::StartFailed("injected initialize fault".into()));
        }
        self.state.lock().initialized = true;
        Ok(())
    }

    fn start(&mut self) -> Result<(), DeviceError> {
        if self.faults.contains(&Fault::Start) {
            return Err(DeviceError::StartFailed("injected start fault".into()));
        }
        let mut state = self.state.lock();
        if !state.initialized {
            return Err(DeviceError::StartFailed("unit not initialized".into()));
        }
        state.running = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.state.lock().running = false;
    }

    fn uninitialize(&mut self) {
        self.state.lock().release();
    }
}

impl Drop for OfflineUnit {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        state.release();
        state.live_units = state.live_units.saturating_sub(1);
    }
}

/// Slice-backed input for one period.
struct SliceInput<'a> {
    captured: &'a [f32],
}

impl InputPull for SliceInput<'_> {
    fn pull(&mut self, dest: &mut [f32]) -> Result<(), RenderStatus> {
        let source = self
            .captured
            .get(..dest.len())
            .ok_or(RenderStatus::InputUnderrun)?;
        dest.copy_from_slice(source);
        Ok(())
    }
}

/// Drives the offline unit's render callback.
#[derive(Clone)]
pub struct OfflineDriver {
    state: Arc<Mutex<DriverState>>,
}

impl OfflineDriver {
    /// Render one period of `output.len()` frames with `input` as the
    /// captured audio. Writes silence and returns `Invalidated` when no unit
    /// is running.
    pub fn render_period(&self, input: &[f32], output: &mut [f32]) -> RenderStatus {
        let mut state = self.state.lock();
        if !state.running {
            output.fill(0.0);
            return RenderStatus::Invalidated;
        }
        let Some(callback) = state.callback.as_mut() else {
            output.fill(0.0);
            return RenderStatus::Invalidated;
        };
        let mut pull = SliceInput { captured: input };
        callback(&mut pull, output)
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    /// Units instantiated and not yet dropped.
    pub fn live_units(&self) -> usize {
        self.state.lock().live_units
    }

    pub fn has_callback(&self) -> bool {
        self.state.lock().callback.is_some()
    }

    pub fn io_enabled(&self, direction: Direction) -> bool {
        let state = self.state.lock();
        match direction {
            Direction::Input => state.input_enabled,
            Direction::Output => state.output_enabled,
        }
    }

    pub fn stream_format(&self, scope: Scope) -> Option<StreamFormat> {
        let state = self.state.lock();
        match scope {
            Scope::Input => state.input_format,
            Scope::Output => state.output_format,
        }
    }
}
