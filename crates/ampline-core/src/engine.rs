//! Duplex callback engine.
//!
//! Negotiates the session, sets up the host's duplex unit and installs the
//! render callback that feeds each period through the [`ModelBridge`].

use crate::bridge::ModelBridge;
use crate::callback::{render_callback, CallbackToken, EngineStats, RenderContext, StatsCounters};
use crate::config::{EngineConfig, SessionConfig};
use crate::error::DeviceError;
use crate::host::{AudioHost, Direction, DuplexUnit, Scope, StreamFormat};
use crate::session;
use crate::Result;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

pub struct DuplexEngine {
    host: Box<dyn AudioHost>,
    bridge: Arc<ModelBridge>,
    config: EngineConfig,
    state: EngineState,
    session: Option<SessionConfig>,
    unit: Option<Box<dyn DuplexUnit>>,
    context: Option<Arc<RenderContext>>,
    stats: Arc<StatsCounters>,
}

impl DuplexEngine {
    pub fn new(host: Box<dyn AudioHost>, bridge: Arc<ModelBridge>, config: EngineConfig) -> Self {
        Self {
            host,
            bridge,
            config,
            state: EngineState::Stopped,
            session: None,
            unit: None,
            context: None,
            stats: Arc::new(StatsCounters::default()),
        }
    }

    /// Negotiate the session and start rendering. No-op when running.
    ///
    /// On failure the engine is back in `Stopped` with no unit held.
    pub fn start(&mut self) -> Result<()> {
        if self.state == EngineState::Running {
            return Ok(());
        }

        self.state = EngineState::Starting;
        match self.bring_up() {
            Ok((unit, context, granted)) => {
                self.unit = Some(unit);
                self.context = Some(context);
                self.session = Some(granted);
                self.state = EngineState::Running;
                tracing::info!(
                    "Duplex engine running: {} Hz, {} frames",
                    granted.sample_rate,
                    granted.buffer_frames
                );
                Ok(())
            }
            Err(e) => {
                self.state = EngineState::Stopped;
                tracing::warn!("Duplex engine failed to start: {}", e);
                Err(e)
            }
        }
    }

    fn bring_up(&mut self) -> Result<(Box<dyn DuplexUnit>, Arc<RenderContext>, SessionConfig)> {
        let negotiated = session::configure(
            self.host.as_mut(),
            self.config.preferred_sample_rate,
            self.config.preferred_buffer_duration,
        )?;

        let frames = negotiated.buffer_frames.min(self.config.max_buffer_frames);
        if frames < negotiated.buffer_frames {
            tracing::warn!(
                "Granted buffer of {} frames exceeds max_buffer_frames {}, longer periods are clipped",
                negotiated.buffer_frames,
                self.config.max_buffer_frames
            );
        }
        let granted = SessionConfig::new(negotiated.sample_rate, frames);

        let component = self
            .host
            .find_duplex_component()
            .ok_or(DeviceError::ComponentNotFound)?;
        tracing::debug!("Using duplex component {} ({})", component.name, component.manufacturer);
        let mut unit = self.host.instantiate(&component)?;

        let context = Arc::new(RenderContext::new(self.bridge.clone(), self.stats.clone()));
        if let Err(e) = configure_unit(unit.as_mut(), &context, granted) {
            dispose(unit);
            return Err(e.into());
        }

        // The bridge follows the granted session only once the unit is set
        // up, and goes back to where it was if the unit then fails to start.
        let previous = (self.bridge.session(), self.bridge.capacity());
        self.bridge.reset(granted.sample_rate, granted.buffer_frames);
        if let Err(e) = unit.start() {
            self.bridge.restore(previous.0, previous.1);
            dispose(unit);
            return Err(e.into());
        }

        Ok((unit, context, granted))
    }

    /// Stop rendering and release the unit. Idempotent.
    ///
    /// No callback runs once this returns.
    pub fn stop(&mut self) {
        if self.state == EngineState::Stopped && self.unit.is_none() {
            return;
        }

        self.state = EngineState::Stopping;
        if let Some(unit) = self.unit.take() {
            dispose(unit);
        }
        self.context = None;
        self.state = EngineState::Stopped;
        tracing::info!("Duplex engine stopped");
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == EngineState::Running
    }

    /// Session granted by the last successful start.
    pub fn session(&self) -> Option<SessionConfig> {
        self.session
    }

    pub fn stats(&self) -> EngineStats {
        self.stats.snapshot()
    }

    pub fn bridge(&self) -> &Arc<ModelBridge> {
        &self.bridge
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl Drop for DuplexEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

fn configure_unit(
    unit: &mut dyn DuplexUnit,
    context: &Arc<RenderContext>,
    session: SessionConfig,
) -> std::result::Result<(), DeviceError> {
    unit.enable_io(Direction::Input, true)?;
    unit.enable_io(Direction::Output, true)?;

    let format = StreamFormat::mono_f32(session.sample_rate);
    unit.set_stream_format(Scope::Input, format)?;
    unit.set_stream_format(Scope::Output, format)?;

    unit.set_render_callback(render_callback(
        CallbackToken::new(context),
        session.buffer_frames,
    ))?;
    unit.initialize()
}

fn dispose(mut unit: Box<dyn DuplexUnit>) {
    unit.stop();
    unit.uninitialize();
}
