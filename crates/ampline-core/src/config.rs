//! Engine and session configuration.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Largest block the engine will pre-allocate for (frames).
pub const MAX_BUFFER_FRAMES: usize = 8192;

pub const DEFAULT_SAMPLE_RATE: f64 = 48000.0;

pub const DEFAULT_BUFFER_FRAMES: usize = 256;

/// What the hardware actually granted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub sample_rate: f64,
    pub buffer_frames: usize,
}

impl SessionConfig {
    pub fn new(sample_rate: f64, buffer_frames: usize) -> Self {
        Self {
            sample_rate,
            buffer_frames,
        }
    }

    /// Callback period in seconds.
    pub fn period(&self) -> f64 {
        self.buffer_frames as f64 / self.sample_rate
    }

    pub fn latency_ms(&self) -> f64 {
        self.period() * 1000.0
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE, DEFAULT_BUFFER_FRAMES)
    }
}

/// What the controller asks for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub preferred_sample_rate: f64,
    /// Seconds.
    pub preferred_buffer_duration: f64,
    /// Blocks larger than this are clipped in the render callback.
    pub max_buffer_frames: usize,
    pub input_gain_db: f32,
    pub output_gain_db: f32,
    pub bypass: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            preferred_sample_rate: DEFAULT_SAMPLE_RATE,
            preferred_buffer_duration: DEFAULT_BUFFER_FRAMES as f64 / DEFAULT_SAMPLE_RATE,
            max_buffer_frames: MAX_BUFFER_FRAMES,
            input_gain_db: 0.0,
            output_gain_db: 0.0,
            bypass: false,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if !(8000.0..=384000.0).contains(&self.preferred_sample_rate) {
            return Err(Error::InvalidConfig(format!(
                "preferred_sample_rate {} out of range (8000-384000 Hz)",
                self.preferred_sample_rate
            )));
        }
        if !(self.preferred_buffer_duration > 0.0 && self.preferred_buffer_duration.is_finite()) {
            return Err(Error::InvalidConfig(format!(
                "preferred_buffer_duration {} must be a positive number of seconds",
                self.preferred_buffer_duration
            )));
        }
        if self.max_buffer_frames == 0 || self.max_buffer_frames > MAX_BUFFER_FRAMES {
            return Err(Error::InvalidConfig(format!(
                "max_buffer_frames {} out of range (1-{})",
                self.max_buffer_frames, MAX_BUFFER_FRAMES
            )));
        }
        if !self.input_gain_db.is_finite() || !self.output_gain_db.is_finite() {
            return Err(Error::InvalidConfig("gain must be finite".into()));
        }
        Ok(())
    }

    /// Preferred buffer size in frames at the preferred rate.
    pub fn preferred_buffer_frames(&self) -> usize {
        (self.preferred_buffer_duration * self.preferred_sample_rate)
            .round()
            .max(1.0) as usize
    }
}
