//! Signal processing integration tests
//!
//! Gain staging, bypass, and model output through the full callback path.

use crate::helpers::tolerances::*;
use crate::helpers::*;
use ampline::prelude::*;
use ampline::{ModelRuntime, UnitRuntime};
use approx::assert_relative_eq;
use proptest::prelude::*;

/// 440 Hz sine at 48 kHz, 256-frame periods, through a WaveNet model.
#[test]
fn test_wavenet_sine_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let model = write_wavenet(dir.path(), "plexi", 4.0);
    let (engine, driver) = offline_engine();
    engine.start().unwrap();
    engine.load_model(&model).unwrap();

    let input: Vec<f32> = generate_sine(440.0, TEST_SAMPLE_RATE, TEST_BUFFER_SIZE * 188)
        .iter()
        .map(|s| s * 0.5)
        .collect();
    let output = render(&driver, &input, TEST_BUFFER_SIZE);

    assert!(output.iter().all(|s| s.is_finite()));
    assert!(peak(&output) <= 1.0);
    assert_has_audio(&output, 0.1);
    assert!(!signals_approx_equal(&input, &output, 0.01));
    // Saturation raises RMS relative to the clean half-scale sine.
    assert!(rms(&output) > rms(&input));
}

#[test]
fn test_single_period_through_wavenet_file() {
    let dir = tempfile::tempdir().unwrap();
    let model = write_wavenet(dir.path(), "wavenet", 4.0);
    let (engine, driver) = offline_engine();
    engine.start().unwrap();
    engine.load_model(&model).unwrap();
    assert_eq!(engine.model_name().as_deref(), Some("wavenet"));

    let input: Vec<f32> = generate_sine(440.0, TEST_SAMPLE_RATE, TEST_BUFFER_SIZE)
        .iter()
        .map(|s| s * 0.5)
        .collect();
    let mut output = vec![0.0f32; TEST_BUFFER_SIZE];
    assert_eq!(
        driver.render_period(&input, &mut output),
        ampline::RenderStatus::Ok
    );

    assert!(output.iter().all(|s| s.is_finite()));
    assert!(output.iter().any(|s| s.abs() > 1e-10));
}

#[test]
fn test_zero_db_matches_model_directly() {
    let dir = tempfile::tempdir().unwrap();
    let model = write_wavenet(dir.path(), "plexi", 3.0);
    let (engine, driver) = offline_engine();
    engine.start().unwrap();
    engine.load_model(&model).unwrap();
    engine.set_input_gain(0.0);
    engine.set_output_gain(0.0);

    let mut reference = UnitRuntime::new(WaveNetLite::new(3.0));
    reference.reset(TEST_SAMPLE_RATE, TEST_BUFFER_SIZE);
    reference.prewarm();

    let input = generate_sine(440.0, TEST_SAMPLE_RATE, TEST_BUFFER_SIZE * 8);
    let output = render(&driver, &input, TEST_BUFFER_SIZE);

    let mut expected = vec![0.0f32; input.len()];
    for (inp, out) in input
        .chunks(TEST_BUFFER_SIZE)
        .zip(expected.chunks_mut(TEST_BUFFER_SIZE))
    {
        assert!(reference.render(inp, out, 1.0, 1.0));
    }
    assert!(signals_approx_equal(&output, &expected, FLOAT_EPSILON));
}

#[test]
fn test_bypass_ignores_gain_and_model() {
    let dir = tempfile::tempdir().unwrap();
    let model = write_wavenet(dir.path(), "plexi", 8.0);
    let (engine, driver) = offline_engine();
    engine.start().unwrap();
    engine.load_model(&model).unwrap();
    engine.set_input_gain(12.0);
    engine.set_output_gain(-12.0);
    engine.set_bypass(true);

    let input = generate_noise(TEST_BUFFER_SIZE * 4, 42);
    assert_eq!(render(&driver, &input, TEST_BUFFER_SIZE), input);

    engine.set_bypass(false);
    assert_ne!(render(&driver, &input, TEST_BUFFER_SIZE), input);
}

#[test]
fn test_output_gain_scales_linear_model() {
    let dir = tempfile::tempdir().unwrap();
    let model = write_linear(dir.path(), "clean", 1.0);
    let (engine, driver) = offline_engine();
    engine.start().unwrap();
    engine.load_model(&model).unwrap();
    engine.set_output_gain(-6.0);

    let input = generate_sine(1000.0, TEST_SAMPLE_RATE, TEST_BUFFER_SIZE);
    let output = render(&driver, &input, TEST_BUFFER_SIZE);
    let expected: Vec<f32> = input.iter().map(|s| s * 0.501_187_2).collect();
    assert!(signals_approx_equal(&output, &expected, DSP_EPSILON));
}

#[test]
fn test_input_gain_applies_before_model() {
    let dir = tempfile::tempdir().unwrap();
    let model = write_wavenet(dir.path(), "plexi", 1.0);
    let (engine, driver) = offline_engine();
    engine.start().unwrap();
    engine.load_model(&model).unwrap();

    let input = vec![0.1f32; TEST_BUFFER_SIZE * 40];
    let quiet = render(&driver, &input, TEST_BUFFER_SIZE);
    engine.set_input_gain(12.0);
    let loud = render(&driver, &input, TEST_BUFFER_SIZE);

    // Once the one-pole settles, output is tanh(gain * 0.1).
    let settled = input.len() - 1;
    assert_relative_eq!(quiet[settled], 0.1f32.tanh(), epsilon = DSP_EPSILON);
    assert_relative_eq!(loud[settled], (0.1f32 * 3.981_071_7).tanh(), epsilon = DSP_EPSILON);
}

#[test]
fn test_gain_queries() {
    let (engine, _driver) = offline_engine();
    engine.set_input_gain(3.5);
    engine.set_output_gain(-24.0);
    engine.set_bypass(true);

    assert_eq!(engine.input_gain_db(), 3.5);
    // Outside the UI range is accepted as-is.
    assert_eq!(engine.output_gain_db(), -24.0);
    assert!(engine.is_bypassed());
}

#[test]
fn test_non_finite_model_output_falls_back_to_input() {
    let dir = tempfile::tempdir().unwrap();
    let model = write_linear(dir.path(), "broken", 1e38);
    let (engine, driver) = offline_engine();
    engine.start().unwrap();
    engine.load_model(&model).unwrap();
    engine.set_input_gain(12.0);

    let input = vec![1.0f32; TEST_BUFFER_SIZE];
    assert_eq!(render(&driver, &input, TEST_BUFFER_SIZE), input);
}

#[test]
fn test_reset_stability() {
    let dir = tempfile::tempdir().unwrap();
    let model = write_wavenet(dir.path(), "plexi", 2.0);
    let (engine, _driver) = offline_engine();
    engine.load_model(&model).unwrap();

    engine.reset(44100.0, 128);
    engine.reset(96000.0, 512);
    assert!(engine.bridge().capacity() >= 512);

    let input = generate_sine(440.0, 96000.0, 512);
    let mut output = vec![0.0f32; 512];
    engine.bridge().process(&input, &mut output);
    assert!(output.iter().all(|s| s.is_finite()));
    assert!(!signals_approx_equal(&input, &output, PERCEPTUAL_EPSILON));
}

#[test]
fn test_start_grows_capacity_for_granted_buffer() {
    let dir = tempfile::tempdir().unwrap();
    let model = write_wavenet(dir.path(), "plexi", 2.0);
    let (engine, driver) = offline_engine_with(OfflineHost::new().with_granted(48000.0, 1024));
    engine.load_model(&model).unwrap();
    engine.start().unwrap();

    let input = generate_sine(440.0, TEST_SAMPLE_RATE, 1024 * 4);
    let output = render(&driver, &input, 1024);
    assert!(output.iter().all(|s| s.is_finite()));
    assert!(!signals_approx_equal(&input, &output, PERCEPTUAL_EPSILON));
    assert_eq!(engine.stats().clipped_periods, 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_output_is_finite_within_capacity(
        frames in 1usize..=TEST_BUFFER_SIZE,
        drive in 0.1f64..20.0,
        input_db in -12.0f32..12.0,
        output_db in -12.0f32..12.0,
        seed in any::<u64>(),
    ) {
        let dir = tempfile::tempdir().unwrap();
        let model = write_wavenet(dir.path(), "prop", drive);
        let (engine, driver) = offline_engine();
        engine.start().unwrap();
        engine.load_model(&model).unwrap();
        engine.set_input_gain(input_db);
        engine.set_output_gain(output_db);

        let input = generate_noise(frames, seed);
        let mut output = vec![f32::NAN; frames];
        prop_assert_eq!(driver.render_period(&input, &mut output), ampline::RenderStatus::Ok);
        prop_assert!(output.iter().all(|s| s.is_finite()));
    }
}
