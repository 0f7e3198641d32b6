//! Test helpers and fixtures for Ampline integration tests
//!
//! Everything here runs against the offline host: periods are rendered by
//! hand through an [`OfflineDriver`], so tests are deterministic and need no
//! audio hardware.
//!
//! ## Tolerance Levels
//!
//! Use the appropriate tolerance from [`tolerances`] module:
//! - `FLOAT_EPSILON` (1e-6): Exact operations (passthrough, unity gain)
//! - `DSP_EPSILON` (1e-4): Model processing
//! - `SILENCE_THRESHOLD` (0.0001): Silence detection (-80dB)

#![allow(dead_code)]


use ampline::prelude::*;
use ampline::{OfflineDriver, RenderStatus};
use std::path::{Path, PathBuf};

/// Default test sample rate (matches common hardware)
pub const TEST_SAMPLE_RATE: f64 = 48000.0;

/// Standard buffer size for deterministic testing
pub const TEST_BUFFER_SIZE: usize = 256;

// =============================================================================
// Test models
// =============================================================================

/// Stand-in for a WaveNet capture: one-pole lowpass into `tanh(drive * x)`,
/// computed in double precision.
pub struct WaveNetLite {
    drive: f64,
    coefficient: f64,
    state: f64,
}

impl WaveNetLite {
    pub fn new(drive: f64) -> Self {
        Self {
            drive,
            coefficient: 1.0,
            state: 0.0,
        }
    }
}

impl InferenceUnit for WaveNetLite {
    type Sample = f64;

    fn reset(&mut self, sample_rate: f64, _max_frames: usize) {
        // ~8 kHz corner regardless of rate
        self.coefficient = 1.0 - (-std::f64::consts::TAU * 8000.0 / sample_rate).exp();
        self.state = 0.0;
    }

    fn process(&mut self, input: &[f64], output: &mut [f64]) {
        for (o, &x) in output.iter_mut().zip(input) {
            self.state += self.coefficient * (x - self.state);
            *o = (self.drive * self.state).tanh();
        }
    }

    fn prewarm_samples(&self) -> usize {
        2048
    }
}

/// `y = gain * x`, single precision.
pub struct Linear {
    gain: f32,
}

impl InferenceUnit for Linear {
    type Sample = f32;

    fn reset(&mut self, _sample_rate: f64, _max_frames: usize) {}

    fn process(&mut self, input: &[f32], output: &mut [f32]) {
        for (o, i) in output.iter_mut().zip(input) {
            *o = i * self.gain;
        }
    }
}

fn config_value(doc: &ModelDocument, key: &str) -> Result<f64, ModelLoadError> {
    let value: serde_json::Value = serde_json::from_str(&doc.raw)
        .map_err(|e| ModelLoadError::parse_failed(&doc.path, e))?;
    value["config"][key]
        .as_f64()
        .ok_or_else(|| ModelLoadError::parse_failed(&doc.path, format!("missing config.{key}")))
}

/// Registry knowing the `WaveNet` and `Linear` test architectures.
pub fn test_registry() -> ModelRegistry {
    let registry = ModelRegistry::new();
    registry.register("WaveNet", |doc| {
        Ok(WaveNetLite::new(config_value(doc, "drive")?))
    });
    registry.register("Linear", |doc| {
        Ok(Linear {
            gain: config_value(doc, "gain")? as f32,
        })
    });
    registry
}

/// Write a `.nam` model file. `key` is `drive` for WaveNet, `gain` for Linear.
pub fn write_model(dir: &Path, name: &str, architecture: &str, key: &str, value: f64) -> PathBuf {
    let path = dir.join(format!("{name}.nam"));
    let mut config = serde_json::Map::new();
    config.insert(key.to_string(), value.into());
    let document = serde_json::json!({
        "version": "0.5.4",
        "architecture": architecture,
        "sample_rate": TEST_SAMPLE_RATE,
        "config": config,
        "weights": [],
    });
    std::fs::write(&path, document.to_string()).expect("Failed to write model file");
    path
}

pub fn write_wavenet(dir: &Path, name: &str, drive: f64) -> PathBuf {
    write_model(dir, name, "WaveNet", "drive", drive)
}

pub fn write_linear(dir: &Path, name: &str, gain: f64) -> PathBuf {
    write_model(dir, name, "Linear", "gain", gain)
}

// =============================================================================
// Engines
// =============================================================================

/// Route engine logs to the test output. Filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Engine on an offline host at the test rate and buffer size.
pub fn offline_engine() -> (AmplineEngine, OfflineDriver) {
    offline_engine_with(OfflineHost::new())
}

pub fn offline_engine_with(host: OfflineHost) -> (AmplineEngine, OfflineDriver) {
    init_tracing();
    let driver = host.driver();
    let engine = AmplineEngine::builder()
        .sample_rate(TEST_SAMPLE_RATE)
        .buffer_frames(TEST_BUFFER_SIZE)
        .host(host)
        .registry(test_registry())
        .build()
        .expect("Failed to create test engine");
    (engine, driver)
}

/// Render `input` period by period. Panics if any period fails.
pub fn render(driver: &OfflineDriver, input: &[f32], period: usize) -> Vec<f32> {
    let mut output = vec![0.0; input.len()];
    for (inp, out) in input.chunks(period).zip(output.chunks_mut(period)) {
        let status = driver.render_period(inp, out);
        assert_eq!(status, RenderStatus::Ok, "period failed");
    }
    output
}

// =============================================================================
// Signals
// =============================================================================

/// Generate a test signal: sine wave at given frequency for specified samples.
pub fn generate_sine(frequency: f64, sample_rate: f64, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|i| {
            let t = i as f64 / sample_rate;
            (2.0 * std::f64::consts::PI * frequency * t).sin() as f32
        })
        .collect()
}

/// Generate white noise (random samples in -1..1).
pub fn generate_noise(num_samples: usize, seed: u64) -> Vec<f32> {
    // Simple LCG for reproducible "random" noise
    let mut rng = seed;
    (0..num_samples)
        .map(|_| {
            rng = rng.wrapping_mul(6364136223846793005).wrapping_add(1);
            ((rng >> 33) as f32 / u32::MAX as f32) * 2.0 - 1.0
        })
        .collect()
}

/// Calculate RMS of a signal.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Calculate peak amplitude of a signal.
pub fn peak(samples: &[f32]) -> f32 {
    samples
        .iter()
        .map(|s| s.abs())
        .fold(0.0_f32, |a, b| a.max(b))
}

/// Check if two signals are approximately equal within tolerance.
pub fn signals_approx_equal(a: &[f32], b: &[f32], tolerance: f32) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() <= tolerance)
}

/// Assert that a signal is approximately silent (all values near zero).
pub fn assert_silence(samples: &[f32], tolerance: f32) {
    let max = peak(samples);
    assert!(
        max <= tolerance,
        "Expected silence, but peak amplitude was {}",
        max
    );
}

/// Assert that a signal has content (not silent).
pub fn assert_has_audio(samples: &[f32], min_rms: f32) {
    let r = rms(samples);
    assert!(
        r >= min_rms,
        "Expected audio content with RMS >= {}, but RMS was {}",
        min_rms,
        r
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_sine() {
        let samples = generate_sine(440.0, 48000.0, 48000);
        assert_eq!(samples.len(), 48000);
        assert!(rms(&samples) > 0.5);
        assert!(peak(&samples) <= 1.0);
    }

    #[test]
    fn test_rms_calculation() {
        // Full-scale sine wave has RMS of ~0.707
        let samples = generate_sine(440.0, 48000.0, 48000);
        let r = rms(&samples);
        assert!((r - 0.707).abs() < 0.01);
    }

    #[test]
    fn test_signals_approx_equal() {
        let a = vec![0.0, 0.5, 1.0];
        let b = vec![0.001, 0.501, 0.999];
        assert!(signals_approx_equal(&a, &b, 0.01));
        assert!(!signals_approx_equal(&a, &b, 0.0001));
    }
}
