//! Engine lifecycle integration tests
//!
//! Start/stop, negotiated values, and cleanup after failed starts.

use crate::helpers::tolerances::*;
use crate::helpers::*;
use ampline::core::host::Fault;
use ampline::prelude::*;
use ampline::{EngineState, Error, NegotiationStep, RenderStatus};

#[test]
fn test_engine_starts_on_offline_host() {
    let (engine, driver) = offline_engine();
    assert!(!engine.is_running());

    engine.start().unwrap();
    assert!(engine.is_running());
    assert_eq!(engine.state(), EngineState::Running);
    assert_eq!(engine.sample_rate(), TEST_SAMPLE_RATE);
    assert_eq!(engine.buffer_size(), TEST_BUFFER_SIZE);
    assert!(driver.is_running());
}

#[test]
fn test_host_granted_values_are_reported() {
    let (engine, _driver) = offline_engine_with(OfflineHost::new().with_granted(44100.0, 512));
    engine.start().unwrap();

    assert_eq!(engine.sample_rate(), 44100.0);
    assert_eq!(engine.buffer_size(), 512);
    assert!(engine.bridge().capacity() >= 512);
}

#[test]
fn test_stop_twice() {
    let (engine, _driver) = offline_engine();
    engine.start().unwrap();
    engine.stop();
    engine.stop();
    assert_eq!(engine.state(), EngineState::Stopped);
}

#[test]
fn test_stop_before_start() {
    let (engine, _driver) = offline_engine();
    engine.stop();
    assert!(!engine.is_running());
}

#[test]
fn test_no_callback_after_stop() {
    let (engine, driver) = offline_engine();
    engine.start().unwrap();
    engine.stop();

    let input = generate_sine(440.0, TEST_SAMPLE_RATE, TEST_BUFFER_SIZE);
    let mut output = vec![1.0f32; TEST_BUFFER_SIZE];
    assert_eq!(
        driver.render_period(&input, &mut output),
        RenderStatus::Invalidated
    );
    assert_silence(&output, SILENCE_THRESHOLD);
    assert_eq!(driver.live_units(), 0);
}

#[test]
fn test_restart_after_stop() {
    let (engine, driver) = offline_engine();
    engine.start().unwrap();
    engine.stop();
    engine.start().unwrap();

    let input = generate_sine(440.0, TEST_SAMPLE_RATE, TEST_BUFFER_SIZE * 4);
    let output = render(&driver, &input, TEST_BUFFER_SIZE);
    assert!(signals_approx_equal(&input, &output, FLOAT_EPSILON));
    assert_eq!(driver.live_units(), 1);
}

#[test]
fn test_negotiation_failure_names_step() {
    let (engine, driver) = offline_engine_with(OfflineHost::new().with_fault(Fault::Activate));

    match engine.start() {
        Err(Error::Core(ampline::core::Error::Configuration(e))) => {
            assert_eq!(e.step, NegotiationStep::Activate);
        }
        other => panic!("expected configuration error, got {other:?}"),
    }
    assert!(!engine.is_running());
    assert_eq!(driver.live_units(), 0);
}

#[test]
fn test_device_failure_leaves_engine_stopped() {
    let (engine, driver) = offline_engine_with(OfflineHost::new().with_fault(Fault::Start));

    assert!(matches!(
        engine.start(),
        Err(Error::Core(ampline::core::Error::Device(_)))
    ));
    assert_eq!(engine.state(), EngineState::Stopped);
    assert_eq!(driver.live_units(), 0);
    assert!(!driver.has_callback());
}

#[test]
fn test_failed_start_keeps_previous_rate_and_buffer() {
    let (engine, _driver) = offline_engine_with(
        OfflineHost::new()
            .with_granted(96000.0, 1024)
            .with_fault(Fault::Start),
    );

    assert!(engine.start().is_err());
    assert_eq!(engine.sample_rate(), TEST_SAMPLE_RATE);
    assert_eq!(engine.buffer_size(), TEST_BUFFER_SIZE);
    assert_eq!(engine.bridge().capacity(), TEST_BUFFER_SIZE);
}

#[test]
fn test_pass_through_without_model() {
    let (engine, driver) = offline_engine();
    engine.start().unwrap();

    let input = generate_noise(TEST_BUFFER_SIZE * 8, 7);
    let output = render(&driver, &input, TEST_BUFFER_SIZE);
    assert_eq!(input, output);
}

#[test]
fn test_stats_count_periods_and_underruns() {
    let (engine, driver) = offline_engine();
    engine.start().unwrap();

    let input = generate_sine(440.0, TEST_SAMPLE_RATE, TEST_BUFFER_SIZE * 10);
    render(&driver, &input, TEST_BUFFER_SIZE);

    let mut output = vec![0.0f32; TEST_BUFFER_SIZE];
    assert_eq!(
        driver.render_period(&input[..TEST_BUFFER_SIZE / 2], &mut output),
        RenderStatus::InputUnderrun
    );
    assert_silence(&output, SILENCE_THRESHOLD);

    let stats = engine.stats();
    assert_eq!(stats.periods, 10);
    assert_eq!(stats.pull_failures, 1);
    assert_eq!(stats.clipped_periods, 0);
}

#[test]
fn test_oversize_period_is_clipped() {
    let (engine, driver) = offline_engine();
    engine.start().unwrap();

    let frames = TEST_BUFFER_SIZE * 2;
    let input = vec![0.5f32; frames];
    let mut output = vec![1.0f32; frames];
    assert_eq!(driver.render_period(&input, &mut output), RenderStatus::Ok);

    assert_eq!(&output[..TEST_BUFFER_SIZE], &input[..TEST_BUFFER_SIZE]);
    assert_silence(&output[TEST_BUFFER_SIZE..], SILENCE_THRESHOLD);
    assert_eq!(engine.stats().clipped_periods, 1);
}

#[test]
fn test_builder_rejects_invalid_config() {
    let result = AmplineEngine::builder()
        .sample_rate(1000.0)
        .host(OfflineHost::new())
        .build();
    assert!(matches!(
        result,
        Err(Error::Core(ampline::core::Error::InvalidConfig(_)))
    ));
}

#[test]
fn test_builder_applies_initial_state() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_linear(dir.path(), "clean", 1.0);

    let engine = AmplineEngine::builder()
        .host(OfflineHost::new())
        .registry(test_registry())
        .input_gain_db(-3.0)
        .output_gain_db(6.0)
        .bypass(true)
        .model(&path)
        .build()
        .unwrap();

    assert_eq!(engine.input_gain_db(), -3.0);
    assert_eq!(engine.output_gain_db(), 6.0);
    assert!(engine.is_bypassed());
    assert_eq!(engine.model_name().as_deref(), Some("clean"));
}

#[test]
fn test_builder_fails_on_missing_model() {
    let result = AmplineEngine::builder()
        .host(OfflineHost::new())
        .registry(test_registry())
        .model("/no/such/model.nam")
        .build();
    assert!(matches!(
        result,
        Err(Error::Model(ModelLoadError::NotFound(_)))
    ));
}
