//! CPAL-backed duplex host.
//!
//! CPAL has no single duplex unit, so one is assembled from the default input
//! and output devices: the input stream pushes channel 0 into an SPSC ring and
//! the output stream runs the render callback, pulling a period's worth of
//! frames from that ring.

use super::{
    AudioHost, AudioSession, CategoryOptions, ComponentDescription, Direction, DuplexUnit,
    InputPull, RenderCallback, RenderStatus, Scope, SessionCategory, StreamFormat,
};
use crate::config::{DEFAULT_BUFFER_FRAMES, DEFAULT_SAMPLE_RATE, MAX_BUFFER_FRAMES};
use crate::error::{DeviceError, HostError};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::Sample as _;
use ringbuf::traits::{Consumer as _, Observer as _, Producer as _, Split as _};
use ringbuf::{HeapCons, HeapProd, HeapRb};

/// Periods of input the ring can hold before captured frames are dropped.
const RING_PERIODS: usize = 8;

/// Backlog, in periods, kept when a pull finds more captured input waiting.
/// Anything older is skipped so input-to-output latency cannot creep up.
const MAX_BACKLOG_PERIODS: usize = 2;

/// Wrapper to hold `cpal::Stream` in a `Send` context.
///
/// # Safety
/// `cpal::Stream` is `!Send` due to platform internals. This is safe because
/// the unit owning it is only driven from behind the engine's mutex.
struct StreamHandle(cpal::Stream);

unsafe impl Send for StreamHandle {}

#[derive(Debug, Clone, Copy)]
struct Granted {
    sample_rate: u32,
    buffer_frames: u32,
    /// Whether the device reported a buffer range we can request exactly.
    fixed: bool,
}

/// Default CPAL input and output devices as one duplex session.
pub struct CpalHost {
    preferred_sample_rate: f64,
    preferred_duration: f64,
    granted: Option<Granted>,
}

impl Default for CpalHost {
    fn default() -> Self {
        Self::new()
    }
}

impl CpalHost {
    pub fn new() -> Self {
        Self {
            preferred_sample_rate: DEFAULT_SAMPLE_RATE,
            preferred_duration: DEFAULT_BUFFER_FRAMES as f64 / DEFAULT_SAMPLE_RATE,
            granted: None,
        }
    }
}

fn default_devices() -> Result<(cpal::Device, cpal::Device), String> {
    let host = cpal::default_host();
    let input = host
        .default_input_device()
        .ok_or_else(|| "No input device available".to_string())?;
    let output = host
        .default_output_device()
        .ok_or_else(|| "No output device available".to_string())?;
    Ok((input, output))
}

fn input_supports_rate(device: &cpal::Device, rate: u32) -> bool {
    device
        .supported_input_configs()
        .map(|mut ranges| {
            ranges.any(|r| r.min_sample_rate().0 <= rate && rate <= r.max_sample_rate().0)
        })
        .unwrap_or(false)
}

fn output_supports_rate(device: &cpal::Device, rate: u32) -> bool {
    device
        .supported_output_configs()
        .map(|mut ranges| {
            ranges.any(|r| r.min_sample_rate().0 <= rate && rate <= r.max_sample_rate().0)
        })
        .unwrap_or(false)
}

impl AudioSession for CpalHost {
    fn set_category(
        &mut self,
        _category: SessionCategory,
        _options: CategoryOptions,
    ) -> Result<(), HostError> {
        // Duplex needs both directions; nothing else to configure.
        default_devices().map(|_| ()).map_err(HostError::new)
    }

    fn set_preferred_sample_rate(&mut self, sample_rate: f64) -> Result<(), HostError> {
        self.preferred_sample_rate = sample_rate;
        Ok(())
    }

    fn set_preferred_io_buffer_duration(&mut self, duration: f64) -> Result<(), HostError> {
        self.preferred_duration = duration;
        Ok(())
    }

    fn activate(&mut self) -> Result<(), HostError> {
        let (input, output) = default_devices().map_err(HostError::new)?;
        let output_default = output.default_output_config().map_err(HostError::new)?;

        let requested = self.preferred_sample_rate.round() as u32;
        let sample_rate =
            if input_supports_rate(&input, requested) && output_supports_rate(&output, requested) {
                requested
            } else {
                output_default.sample_rate().0
            };

        let preferred_frames = (self.preferred_duration * sample_rate as f64)
            .round()
            .clamp(1.0, MAX_BUFFER_FRAMES as f64) as u32;
        let (buffer_frames, fixed) = match output_default.buffer_size() {
            cpal::SupportedBufferSize::Range { min, max } => {
                (preferred_frames.max(*min).min(*max), true)
            }
            cpal::SupportedBufferSize::Unknown => (preferred_frames, false),
        };

        self.granted = Some(Granted {
            sample_rate,
            buffer_frames,
            fixed,
        });
        Ok(())
    }

    fn sample_rate(&self) -> f64 {
        self.granted
            .map(|g| g.sample_rate as f64)
            .unwrap_or(self.preferred_sample_rate)
    }

    fn io_buffer_duration(&self) -> f64 {
        self.granted
            .map(|g| g.buffer_frames as f64 / g.sample_rate as f64)
            .unwrap_or(self.preferred_duration)
    }
}

impl AudioHost for CpalHost {
    fn find_duplex_component(&mut self) -> Option<ComponentDescription> {
        let (_, output) = default_devices().ok()?;
        let name = output.name().ok()?;
        Some(ComponentDescription::new(
            name,
            cpal::default_host().id().name(),
        ))
    }

    fn instantiate(
        &mut self,
        component: &ComponentDescription,
    ) -> Result<Box<dyn DuplexUnit>, DeviceError> {
        let granted = self.granted.ok_or_else(|| {
            DeviceError::InstantiationFailed(format!(
                "{}: audio session is not active",
                component.name
            ))
        })?;
        tracing::debug!("Instantiating CPAL duplex unit on {}", component.name);
        Ok(Box::new(CpalDuplexUnit {
            granted,
            input_enabled: false,
            output_enabled: false,
            callback: None,
            streams: None,
        }))
    }
}

struct CpalDuplexUnit {
    granted: Granted,
    input_enabled: bool,
    output_enabled: bool,
    callback: Option<RenderCallback>,
    /// Input first so it stops feeding the ring before the output stops.
    streams: Option<(StreamHandle, StreamHandle)>,
}

impl CpalDuplexUnit {
    fn stream_config(&self, channels: u16) -> cpal::StreamConfig {
        cpal::StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(self.granted.sample_rate),
            buffer_size: if self.granted.fixed {
                cpal::BufferSize::Fixed(self.granted.buffer_frames)
            } else {
                cpal::BufferSize::Default
            },
        }
    }
}

impl DuplexUnit for CpalDuplexUnit {
    fn enable_io(&mut self, direction: Direction, enabled: bool) -> Result<(), DeviceError> {
        match direction {
            Direction::Input => self.input_enabled = enabled,
            Direction::Output => self.output_enabled = enabled,
        }
        Ok(())
    }

    fn set_stream_format(&mut self, scope: Scope, format: StreamFormat) -> Result<(), DeviceError> {
        if format.channels != 1 || !format.float || format.interleaved {
            return Err(DeviceError::property(
                "StreamFormat",
                format!("{scope:?} scope only supports mono non-interleaved f32"),
            ));
        }
        if format.sample_rate.round() as u32 != self.granted.sample_rate {
            return Err(DeviceError::property(
                "StreamFormat",
                format!(
                    "{} Hz does not match session rate {} Hz",
                    format.sample_rate, self.granted.sample_rate
                ),
            ));
        }
        Ok(())
    }

    fn set_render_callback(&mut self, callback: RenderCallback) -> Result<(), DeviceError> {
        self.callback = Some(callback);
        Ok(())
    }

    fn initialize(&mut self) -> Result<(), DeviceError> {
        if !(self.input_enabled && self.output_enabled) {
            return Err(DeviceError::StartFailed(
                "duplex unit needs input and output enabled".into(),
            ));
        }
        let callback = self
            .callback
            .take()
            .ok_or_else(|| DeviceError::StartFailed("no render callback registered".into()))?;

        let (input, output) = default_devices().map_err(DeviceError::StartFailed)?;
        let input_config = input
            .default_input_config()
            .map_err(|e| DeviceError::StartFailed(e.to_string()))?;
        let output_config = output
            .default_output_config()
            .map_err(|e| DeviceError::StartFailed(e.to_string()))?;

        let period = self.granted.buffer_frames as usize;
        let ring = HeapRb::<f32>::new((period * RING_PERIODS).max(MAX_BUFFER_FRAMES));
        let (producer, consumer) = ring.split();

        let in_cfg = self.stream_config(input_config.channels());
        let input_stream = match input_config.sample_format() {
            cpal::SampleFormat::F32 => build_input::<f32>(&input, &in_cfg, producer)?,
            cpal::SampleFormat::I16 => build_input::<i16>(&input, &in_cfg, producer)?,
            cpal::SampleFormat::U16 => build_input::<u16>(&input, &in_cfg, producer)?,
            format => {
                return Err(DeviceError::StartFailed(format!(
                    "Unsupported input sample format: {format:?}"
                )));
            }
        };

        let out_cfg = self.stream_config(output_config.channels());
        let output_stream = match output_config.sample_format() {
            cpal::SampleFormat::F32 => {
                build_output::<f32>(&output, &out_cfg, period, consumer, callback)?
            }
            cpal::SampleFormat::I16 => {
                build_output::<i16>(&output, &out_cfg, period, consumer, callback)?
            }
            cpal::SampleFormat::U16 => {
                build_output::<u16>(&output, &out_cfg, period, consumer, callback)?
            }
            format => {
                return Err(DeviceError::StartFailed(format!(
                    "Unsupported output sample format: {format:?}"
                )));
            }
        };

        self.streams = Some((StreamHandle(input_stream), StreamHandle(output_stream)));
        Ok(())
    }

    fn start(&mut self) -> Result<(), DeviceError> {
        let (input, output) = self
            .streams
            .as_ref()
            .ok_or_else(|| DeviceError::StartFailed("unit not initialized".into()))?;
        input
            .0
            .play()
            .map_err(|e| DeviceError::StartFailed(e.to_string()))?;
        output
            .0
            .play()
            .map_err(|e| DeviceError::StartFailed(e.to_string()))?;
        Ok(())
    }

    fn stop(&mut self) {
        // Dropping the streams joins their callbacks.
        self.streams = None;
    }

    fn uninitialize(&mut self) {
        self.streams = None;
        self.callback = None;
    }
}

fn build_input<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut producer: HeapProd<f32>,
) -> Result<cpal::Stream, DeviceError>
where
    T: cpal::SizedSample,
    f32: cpal::FromSample<T>,
{
    let channels = (config.channels as usize).max(1);
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                for frame in data.chunks_exact(channels) {
                    if producer.try_push(frame[0].to_sample::<f32>()).is_err() {
                        break;
                    }
                }
            },
            |_err| {},
            None,
        )
        .map_err(|e| DeviceError::StartFailed(e.to_string()))
}

/// Input side of one period, backed by the capture ring.
struct RingInput<'a> {
    consumer: &'a mut HeapCons<f32>,
}

impl InputPull for RingInput<'_> {
    fn pull(&mut self, dest: &mut [f32]) -> Result<(), RenderStatus> {
        let backlog = self.consumer.occupied_len();
        if backlog < dest.len() {
            return Err(RenderStatus::InputUnderrun);
        }
        let stale = backlog.saturating_sub(dest.len() * MAX_BACKLOG_PERIODS);
        if stale > 0 {
            self.consumer.skip(stale);
        }
        self.consumer.pop_slice(dest);
        Ok(())
    }
}

fn build_output<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    period: usize,
    mut consumer: HeapCons<f32>,
    mut callback: RenderCallback,
) -> Result<cpal::Stream, DeviceError>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let channels = (config.channels as usize).max(1);
    let mut mono = vec![0.0f32; period.clamp(1, MAX_BUFFER_FRAMES)];

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    for chunk in data.chunks_mut(mono.len() * channels) {
                        let frames = chunk.len() / channels;
                        let block = &mut mono[..frames];
                        let mut input = RingInput {
                            consumer: &mut consumer,
                        };
                        if callback(&mut input, block) != RenderStatus::Ok {
                            block.fill(0.0);
                        }
                        write_output(chunk, channels, block);
                    }
                }));

                if result.is_err() {
                    output_silence(data);
                }
            },
            |_err| {},
            None,
        )
        .map_err(|e| DeviceError::StartFailed(e.to_string()))
}

/// Fan the mono block out to every device channel.
#[inline]
fn write_output<T: cpal::SizedSample + cpal::FromSample<f32>>(
    data: &mut [T],
    channels: usize,
    mono: &[f32],
) {
    for (frame, &value) in data.chunks_mut(channels).zip(mono) {
        frame.fill(value.to_sample::<T>());
    }
}

/// Output silence (panic recovery).
#[inline]
fn output_silence<T: cpal::SizedSample + cpal::FromSample<f32>>(data: &mut [T]) {
    data.fill(T::EQUILIBRIUM);
}
