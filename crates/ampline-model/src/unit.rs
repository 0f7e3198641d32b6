//! Inference unit contract and its real-time runtime wrapper.

use crate::sample::NativeSample;

/// A model that turns a block of mono samples into another block.
///
/// # Real-time contract
///
/// After [`reset`](Self::reset) has been called with `max_frames`, every
/// [`process`](Self::process) call with at most `max_frames` samples must
/// complete without allocating, locking or blocking.
pub trait InferenceUnit: Send + 'static {
    type Sample: NativeSample;

    /// Reconfigure internal buffers for a new sample rate and block ceiling.
    /// Runs on a control thread.
    fn reset(&mut self, sample_rate: f64, max_frames: usize);

    /// `input` and `output` always have the same length.
    fn process(&mut self, input: &[Self::Sample], output: &mut [Self::Sample]);

    /// Samples of silence to run before first audible use so recurrent state
    /// settles. Zero still runs one block.
    fn prewarm_samples(&self) -> usize {
        0
    }

    /// Sample rate the model was trained at, if it declares one.
    fn expected_sample_rate(&self) -> Option<f64> {
        None
    }
}

/// Object-safe view of a loaded model, driven by the bridge.
pub trait ModelRuntime: Send {
    fn reset(&mut self, sample_rate: f64, max_frames: usize);

    fn prewarm(&mut self);

    /// Frames a single [`render`](Self::render) call can take without allocating.
    fn capacity(&self) -> usize;

    /// Apply `input_gain`, run the unit, apply `output_gain`.
    ///
    /// Returns `false` without touching `output` in any meaningful way when the
    /// block cannot be rendered (over capacity, non-finite result). The caller
    /// is expected to fall back to pass-through.
    fn render(&mut self, input: &[f32], output: &mut [f32], input_gain: f32, output_gain: f32)
        -> bool;

    fn expected_sample_rate(&self) -> Option<f64>;
}

/// Pre-sized native-format scratch storage for one unit.
#[derive(Debug, Clone)]
pub struct ConversionBuffers<S> {
    input: Vec<S>,
    output: Vec<S>,
}

impl<S: NativeSample> ConversionBuffers<S> {
    pub fn with_capacity(frames: usize) -> Self {
        Self {
            input: vec![S::default(); frames],
            output: vec![S::default(); frames],
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.input.len()
    }

    /// Not real-time safe.
    pub fn resize(&mut self, frames: usize) {
        self.input.resize(frames, S::default());
        self.output.resize(frames, S::default());
        self.input.shrink_to_fit();
        self.output.shrink_to_fit();
    }

    #[inline]
    fn split(&mut self, frames: usize) -> (&mut [S], &mut [S]) {
        (&mut self.input[..frames], &mut self.output[..frames])
    }
}

/// Adapts an [`InferenceUnit`] into a [`ModelRuntime`], owning its conversion buffers.
pub struct UnitRuntime<U: InferenceUnit> {
    unit: U,
    buffers: ConversionBuffers<U::Sample>,
}

impl<U: InferenceUnit> UnitRuntime<U> {
    pub fn new(unit: U) -> Self {
        Self {
            unit,
            buffers: ConversionBuffers::with_capacity(0),
        }
    }

    pub fn unit(&self) -> &U {
        &self.unit
    }
}

impl<U: InferenceUnit> ModelRuntime for UnitRuntime<U> {
    fn reset(&mut self, sample_rate: f64, max_frames: usize) {
        self.unit.reset(sample_rate, max_frames);
        self.buffers.resize(max_frames);
    }

    fn prewarm(&mut self) {
        let block = self.buffers.capacity();
        if block == 0 {
            return;
        }

        let (input, _) = self.buffers.split(block);
        input.fill(U::Sample::default());

        let mut remaining = self.unit.prewarm_samples().max(block);
        while remaining > 0 {
            let frames = remaining.min(block);
            let (input, output) = self.buffers.split(frames);
            self.unit.process(input, output);
            remaining -= frames;
        }
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.buffers.capacity()
    }

    #[inline]
    fn render(
        &mut self,
        input: &[f32],
        output: &mut [f32],
        input_gain: f32,
        output_gain: f32,
    ) -> bool {
        let frames = input.len();
        if frames != output.len() || frames > self.buffers.capacity() {
            return false;
        }

        let (native_in, native_out) = self.buffers.split(frames);
        for (dst, &src) in native_in.iter_mut().zip(input) {
            *dst = U::Sample::from_f32(src * input_gain);
        }

        self.unit.process(native_in, native_out);

        let mut finite = true;
        for (dst, &src) in output.iter_mut().zip(native_out.iter()) {
            let value = src.to_f32() * output_gain;
            finite &= value.is_finite();
            *dst = value;
        }
        finite
    }

    fn expected_sample_rate(&self) -> Option<f64> {
        self.unit.expected_sample_rate()
    }
}
