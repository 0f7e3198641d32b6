//! Render callback installed on the duplex unit.
//!
//! The unit only ever sees a [`CallbackToken`], a non-owning handle to the
//! engine's [`RenderContext`]. The engine holds the only strong reference and
//! drops it after the unit is disposed, so a stray late callback finds the
//! context gone and renders silence.

use crate::bridge::ModelBridge;
use crate::host::{InputPull, RenderCallback, RenderStatus};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Counters for display. Relaxed; values may lag by a period.
#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    periods: AtomicU64,
    pull_failures: AtomicU64,
    clipped_periods: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn snapshot(&self) -> EngineStats {
        EngineStats {
            periods: self.periods.load(Ordering::Relaxed),
            pull_failures: self.pull_failures.load(Ordering::Relaxed),
            clipped_periods: self.clipped_periods.load(Ordering::Relaxed),
        }
    }
}

/// Render statistics since the engine was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Periods the bridge processed.
    pub periods: u64,
    /// Periods skipped because input could not be pulled.
    pub pull_failures: u64,
    /// Periods longer than the pre-sized capacity.
    pub clipped_periods: u64,
}

pub(crate) struct RenderContext {
    bridge: Arc<ModelBridge>,
    stats: Arc<StatsCounters>,
}

impl RenderContext {
    pub(crate) fn new(bridge: Arc<ModelBridge>, stats: Arc<StatsCounters>) -> Self {
        Self { bridge, stats }
    }
}

/// Non-owning handle the audio thread renders through.
#[derive(Clone)]
pub(crate) struct CallbackToken(Weak<RenderContext>);

impl CallbackToken {
    pub(crate) fn new(context: &Arc<RenderContext>) -> Self {
        Self(Arc::downgrade(context))
    }
}

/// Build the per-period callback. `capacity` frames of input storage are
/// allocated here; the callback itself never allocates.
pub(crate) fn render_callback(token: CallbackToken, capacity: usize) -> RenderCallback {
    let mut input = vec![0.0f32; capacity.max(1)];

    Box::new(move |pull: &mut dyn InputPull, output: &mut [f32]| {
        let Some(context) = token.0.upgrade() else {
            output.fill(0.0);
            return RenderStatus::Invalidated;
        };

        let frames = output.len().min(input.len());
        if frames < output.len() {
            output[frames..].fill(0.0);
            context.stats.clipped_periods.fetch_add(1, Ordering::Relaxed);
        }
        let input = &mut input[..frames];
        let output = &mut output[..frames];

        if let Err(status) = pull.pull(input) {
            output.fill(0.0);
            context.stats.pull_failures.fetch_add(1, Ordering::Relaxed);
            return status;
        }

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            context.bridge.process(input, output);
        }));
        if result.is_err() {
            output.copy_from_slice(input);
        }

        context.stats.periods.fetch_add(1, Ordering::Relaxed);
        RenderStatus::Ok
    })
}
