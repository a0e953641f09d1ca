//! `ElasticKernel`: session-level handle and configuration.
//!
//! ## Lifecycle
//!
//! ```text
//! ElasticKernel::with_config(cfg)   → ring allocated, rate = 1.0
//!     ├─► push / render / set_playback_rate / health   (single-threaded host)
//!     └─► split()                    → IngestPort   (producer thread)
//!                                      RenderEngine (render clock)
//!                                      HealthMonitor (anyone)
//! ```
//!
//! Ending a session is dropping the handles. Neither `push` nor `render`
//! suspends, so there is nothing to drain.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    buffering::{IngestPort, SampleRing},
    error::{KernelError, Result},
    health::{HealthMonitor, HealthReport},
    render::{PlaybackRate, RateControl, RenderEngine},
    stats::{KernelStats, StatsSnapshot},
};

/// Configuration for an `ElasticKernel` session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct KernelConfig {
    /// Ring size in samples. Fixed for the session. Default: 5 s at 44.1 kHz.
    pub capacity: usize,
    /// Samples produced per render call. Default: 128.
    pub quantum_size: usize,
    /// Nominal sample rate (Hz), used for latency reporting. Default: 44100.
    pub sample_rate: u32,
    /// Slowest accepted playback rate. Default: 0.25.
    pub min_rate: f64,
    /// Fastest accepted playback rate. Default: 4.0.
    pub max_rate: f64,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::for_duration(44_100, 5.0)
    }
}

impl KernelConfig {
    /// Size the ring to hold `seconds` of audio at `sample_rate`.
    pub fn for_duration(sample_rate: u32, seconds: f64) -> Self {
        let capacity = (sample_rate as f64 * seconds.max(0.0)).round() as usize;
        Self {
            capacity,
            quantum_size: 128,
            sample_rate,
            min_rate: 0.25,
            max_rate: 4.0,
        }
    }

    /// # Errors
    /// `KernelError::Construction` describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(KernelError::Construction(
                "capacity must be at least one sample".into(),
            ));
        }
        if self.quantum_size == 0 {
            return Err(KernelError::Construction(
                "quantum size must be at least one sample".into(),
            ));
        }
        if self.sample_rate == 0 {
            return Err(KernelError::Construction("sample rate must be non-zero".into()));
        }
        if self.min_rate.is_nan() || self.min_rate <= 0.0 {
            return Err(KernelError::Construction(format!(
                "min rate {} must be positive",
                self.min_rate
            )));
        }
        if self.min_rate > 1.0 || !self.max_rate.is_finite() || self.max_rate < 1.0 {
            return Err(KernelError::Construction(format!(
                "rate bounds [{}, {}] must be finite and include 1.0",
                self.min_rate, self.max_rate
            )));
        }
        Ok(())
    }
}

/// State shared by every handle of one session.
pub(crate) struct KernelShared {
    pub(crate) ring: SampleRing,
    pub(crate) rate: PlaybackRate,
    pub(crate) stats: KernelStats,
    pub(crate) sample_rate: u32,
}

/// The top-level kernel handle.
///
/// Exposes the whole call contract on one value for hosts that drive both
/// sides from a single context (e.g. a worklet). Threaded hosts call
/// [`split`](Self::split) and move each part to its own thread.
pub struct ElasticKernel {
    ingest: IngestPort,
    render: RenderEngine,
    monitor: HealthMonitor,
    rate: RateControl,
}

impl ElasticKernel {
    /// Create a kernel with `capacity` samples and default settings otherwise.
    ///
    /// # Errors
    /// `KernelError::Construction` when `capacity == 0`.
    pub fn new(capacity: usize) -> Result<Self> {
        Self::with_config(KernelConfig {
            capacity,
            ..KernelConfig::default()
        })
    }

    /// # Errors
    /// `KernelError::Construction` if `config` fails validation. No partial
    /// kernel is produced.
    pub fn with_config(config: KernelConfig) -> Result<Self> {
        config.validate()?;

        let shared = Arc::new(KernelShared {
            ring: SampleRing::new(config.capacity)?,
            rate: PlaybackRate::new(config.min_rate, config.max_rate),
            stats: KernelStats::default(),
            sample_rate: config.sample_rate,
        });

        info!(
            capacity = config.capacity,
            quantum_size = config.quantum_size,
            sample_rate = config.sample_rate,
            min_rate = config.min_rate,
            max_rate = config.max_rate,
            "elastic kernel created"
        );

        Ok(Self {
            ingest: IngestPort::new(Arc::clone(&shared)),
            render: RenderEngine::new(Arc::clone(&shared), config.quantum_size),
            monitor: HealthMonitor::new(Arc::clone(&shared)),
            rate: RateControl::new(shared),
        })
    }

    /// Ingest a chunk. Never fails; overflow is counted.
    pub fn push(&mut self, samples: &[f32]) {
        self.ingest.push(samples);
    }

    /// Fill `out` with one quantum. Never fails; underrun yields silence.
    pub fn render(&mut self, out: &mut [f32]) {
        self.render.render(out);
    }

    /// # Errors
    /// `KernelError::InvalidRate` when `rate` is outside the configured bounds.
    pub fn set_playback_rate(&self, rate: f64) -> Result<()> {
        self.rate.set_playback_rate(rate)
    }

    pub fn playback_rate(&self) -> f64 {
        self.rate.playback_rate()
    }

    /// Normalized fill level in `[0.0, 1.0]`.
    pub fn health(&self) -> f64 {
        self.monitor.health()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.monitor.stats()
    }

    pub fn report(&self) -> HealthReport {
        self.monitor.report()
    }

    pub fn reset_stats(&self) {
        self.monitor.reset_stats();
    }

    pub fn monitor(&self) -> HealthMonitor {
        self.monitor.clone()
    }

    pub fn rate_control(&self) -> RateControl {
        self.rate.clone()
    }

    /// Break the kernel into its producer, consumer and diagnostic parts.
    pub fn split(self) -> (IngestPort, RenderEngine, HealthMonitor) {
        (self.ingest, self.render, self.monitor)
    }

    #[cfg(test)]
    pub(crate) fn shared(&self) -> &KernelShared {
        &self.rate.shared
    }
}
