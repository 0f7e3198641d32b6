//! Hardware audio subsystem abstraction.
//!
//! An [`AudioHost`] is both the process-wide audio session (rate, buffer
//! duration, category) and the factory for the duplex I/O unit that drives
//! the render callback.

mod offline;
pub use offline::{Fault, OfflineDriver, OfflineHost};

#[cfg(feature = "cpal")]
mod cpal;
#[cfg(feature = "cpal")]
pub use self::cpal::CpalHost;

use crate::error::{DeviceError, HostError};

/// Session category. Only simultaneous capture and playback is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionCategory {
    #[default]
    PlayAndRecord,
}

/// Routing options for the session category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CategoryOptions {
    pub default_to_speaker: bool,
    pub allow_bluetooth: bool,
}

/// The process-wide audio session.
pub trait AudioSession {
    fn set_category(
        &mut self,
        category: SessionCategory,
        options: CategoryOptions,
    ) -> Result<(), HostError>;

    fn set_preferred_sample_rate(&mut self, sample_rate: f64) -> Result<(), HostError>;

    /// Seconds.
    fn set_preferred_io_buffer_duration(&mut self, duration: f64) -> Result<(), HostError>;

    fn activate(&mut self) -> Result<(), HostError>;

    /// Granted rate. Only meaningful after `activate`.
    fn sample_rate(&self) -> f64;

    /// Granted buffer duration in seconds. Only meaningful after `activate`.
    fn io_buffer_duration(&self) -> f64;
}

/// Identifies a duplex I/O component the host can instantiate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentDescription {
    pub name: String,
    pub manufacturer: String,
}

impl ComponentDescription {
    pub fn new(name: impl Into<String>, manufacturer: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            manufacturer: manufacturer.into(),
        }
    }
}

pub trait AudioHost: AudioSession + Send {
    /// Lowest-latency component that can capture and play at once.
    fn find_duplex_component(&mut self) -> Option<ComponentDescription>;

    fn instantiate(
        &mut self,
        component: &ComponentDescription,
    ) -> Result<Box<dyn DuplexUnit>, DeviceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

/// Which side of the unit a stream format applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Format the unit delivers captured audio in.
    Input,
    /// Format the unit expects rendered audio in.
    Output,
}

/// Linear PCM stream format.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamFormat {
    pub sample_rate: f64,
    pub channels: u16,
    pub float: bool,
    pub interleaved: bool,
}

impl StreamFormat {
    /// 32-bit float, one channel, non-interleaved.
    pub fn mono_f32(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            channels: 1,
            float: true,
            interleaved: false,
        }
    }
}

/// Outcome of one render period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    Ok,
    /// Not enough captured frames were available.
    InputUnderrun,
    /// The host failed to deliver input for this period.
    InputFailed,
    /// The render context is gone; silence was written.
    Invalidated,
}

/// Pulls the captured frames for the current period.
pub trait InputPull {
    /// Fill `dest` entirely or fail without a partial guarantee.
    fn pull(&mut self, dest: &mut [f32]) -> Result<(), RenderStatus>;
}

/// Invoked once per period on the audio thread with the output block to fill.
pub type RenderCallback = Box<dyn FnMut(&mut dyn InputPull, &mut [f32]) -> RenderStatus + Send>;

/// A duplex I/O unit. Methods are called from the control thread.
pub trait DuplexUnit: Send {
    fn enable_io(&mut self, direction: Direction, enabled: bool) -> Result<(), DeviceError>;

    fn set_stream_format(&mut self, scope: Scope, format: StreamFormat) -> Result<(), DeviceError>;

    fn set_render_callback(&mut self, callback: RenderCallback) -> Result<(), DeviceError>;

    fn initialize(&mut self) -> Result<(), DeviceError>;

    fn start(&mut self) -> Result<(), DeviceError>;

    /// No callback runs once this returns.
    fn stop(&mut self);

    fn uninitialize(&mut self);
}
