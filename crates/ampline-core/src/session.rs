//! Audio session negotiation.

use crate::config::SessionConfig;
use crate::error::{ConfigurationError, HostError};
use crate::host::{AudioSession, CategoryOptions, SessionCategory};
use std::fmt;

/// The negotiation step that was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationStep {
    Category,
    SampleRate,
    BufferDuration,
    Activate,
    ReadBack,
}

impl fmt::Display for NegotiationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Category => "category",
            Self::SampleRate => "sample rate",
            Self::BufferDuration => "I/O buffer duration",
            Self::Activate => "activation",
            Self::ReadBack => "read-back",
        };
        f.write_str(name)
    }
}

fn rejected(step: NegotiationStep) -> impl FnOnce(HostError) -> ConfigurationError {
    move |e| ConfigurationError {
        step,
        reason: e.0,
    }
}

/// Request a low-latency duplex session and report what was granted.
///
/// The granted values may differ from the preferred ones. Each call runs
/// every step again, so a failed negotiation can simply be retried.
pub fn configure(
    session: &mut dyn AudioSession,
    preferred_sample_rate: f64,
    preferred_buffer_duration: f64,
) -> Result<SessionConfig, ConfigurationError> {
    session
        .set_category(SessionCategory::PlayAndRecord, CategoryOptions::default())
        .map_err(rejected(NegotiationStep::Category))?;
    session
        .set_preferred_sample_rate(preferred_sample_rate)
        .map_err(rejected(NegotiationStep::SampleRate))?;
    session
        .set_preferred_io_buffer_duration(preferred_buffer_duration)
        .map_err(rejected(NegotiationStep::BufferDuration))?;
    session
        .activate()
        .map_err(rejected(NegotiationStep::Activate))?;

    let sample_rate = session.sample_rate();
    let duration = session.io_buffer_duration();
    if !(sample_rate > 0.0 && sample_rate.is_finite() && duration.is_finite() && duration >= 0.0) {
        return Err(ConfigurationError {
            step: NegotiationStep::ReadBack,
            reason: format!("host reported {sample_rate} Hz, {duration} s"),
        });
    }

    let buffer_frames = (duration * sample_rate).round().max(1.0) as usize;
    let granted = SessionConfig::new(sample_rate, buffer_frames);

    tracing::info!(
        "Audio session: {} Hz, {} frames ({:.2} ms), requested {} Hz / {:.2} ms",
        granted.sample_rate,
        granted.buffer_frames,
        granted.latency_ms(),
        preferred_sample_rate,
        preferred_buffer_duration * 1000.0
    );
    Ok(granted)
}
