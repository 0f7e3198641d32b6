//! Native sample representations an inference unit may compute in.

/// Sample type used inside an [`InferenceUnit`](crate::InferenceUnit).
///
/// The device side always speaks `f32`; units that run in double precision
/// get their input converted on the way in and back on the way out.
pub trait NativeSample: Copy + Default + Send + Sync + 'static {
    fn from_f32(value: f32) -> Self;

    fn to_f32(self) -> f32;
}

impl NativeSample for f32 {
    #[inline]
    fn from_f32(value: f32) -> Self {
        value
    }

    #[inline]
    fn to_f32(self) -> f32 {
        self
    }
}

impl NativeSample for f64 {
    #[inline]
    fn from_f32(value: f32) -> Self {
        value as f64
    }

    #[inline]
    fn to_f32(self) -> f32 {
        self as f32
    }
}
