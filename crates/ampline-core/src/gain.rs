//! Input/output gain and bypass.
//!
//! Gains are stored as linear multipliers so the audio thread never calls
//! `powf`. Changes land on the next processed block with no ramp.

use crate::lockfree::{AtomicFlag, AtomicFloat};

/// Convert dB value to linear amplitude.
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert linear amplitude to dB. Returns -inf for amplitude <= 0.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

/// Gain and bypass state shared between the control and audio threads.
///
/// Each field is independently atomic; a reader may observe a new input gain
/// together with an old output gain for one block.
#[derive(Debug)]
pub struct GainStage {
    input_linear: AtomicFloat,
    output_linear: AtomicFloat,
    input_db: AtomicFloat,
    output_db: AtomicFloat,
    bypass: AtomicFlag,
}

impl Default for GainStage {
    fn default() -> Self {
        Self::new(0.0, 0.0, false)
    }
}

impl GainStage {
    pub fn new(input_db: f32, output_db: f32, bypass: bool) -> Self {
        Self {
            input_linear: AtomicFloat::new(db_to_linear(input_db)),
            output_linear: AtomicFloat::new(db_to_linear(output_db)),
            input_db: AtomicFloat::new(input_db),
            output_db: AtomicFloat::new(output_db),
            bypass: AtomicFlag::new(bypass),
        }
    }

    /// Values outside ±12 dB are accepted as-is.
    pub fn set_input_gain(&self, db: f32) {
        self.input_db.set(db);
        self.input_linear.set(db_to_linear(db));
    }

    pub fn set_output_gain(&self, db: f32) {
        self.output_db.set(db);
        self.output_linear.set(db_to_linear(db));
    }

    pub fn set_bypass(&self, bypass: bool) {
        self.bypass.set(bypass);
    }

    #[inline]
    pub fn input_linear(&self) -> f32 {
        self.input_linear.get()
    }

    #[inline]
    pub fn output_linear(&self) -> f32 {
        self.output_linear.get()
    }

    #[inline]
    pub fn is_bypassed(&self) -> bool {
        self.bypass.get()
    }

    pub fn input_db(&self) -> f32 {
        self.input_db.get()
    }

    pub fn output_db(&self) -> f32 {
        self.output_db.get()
    }
}
