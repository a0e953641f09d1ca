//! Fill-level diagnostics, readable from any thread.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::engine::KernelShared;
use crate::stats::StatsSnapshot;

/// Cloneable, read-only view of the kernel's occupancy.
///
/// Every read is a handful of atomic loads. Values are best-effort: they may
/// be stale by the time the caller looks at them, and two consecutive calls
/// carry no consistency guarantee.
#[derive(Clone)]
pub struct HealthMonitor {
    shared: Arc<KernelShared>,
}

/// Point-in-time diagnostic bundle for display or logging.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    /// `occupied / capacity`, in `[0.0, 1.0]`.
    pub health: f64,
    pub occupied: usize,
    pub capacity: usize,
    /// Buffered audio at the configured sample rate.
    pub buffered_ms: f64,
    pub playback_rate: f64,
    pub stats: StatsSnapshot,
}

impl HealthMonitor {
    pub(crate) fn new(shared: Arc<KernelShared>) -> Self {
        Self { shared }
    }

    /// Normalized fill level in `[0.0, 1.0]`.
    pub fn health(&self) -> f64 {
        let ring = &self.shared.ring;
        ring.occupancy() as f64 / ring.capacity() as f64
    }

    pub fn occupancy(&self) -> usize {
        self.shared.ring.occupancy()
    }

    pub fn capacity(&self) -> usize {
        self.shared.ring.capacity()
    }

    /// Occupancy expressed as milliseconds of audio at nominal rate.
    pub fn buffered_ms(&self) -> f64 {
        self.occupancy() as f64 * 1000.0 / self.shared.sample_rate as f64
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Zero every counter. Occupancy and the rate are untouched.
    pub fn reset_stats(&self) {
        self.shared.stats.reset();
    }

    /// Raw `(read, write)` cursor positions since the session began,
    /// unclamped.
    ///
    /// The write index is loaded first, so `write - read <= capacity` holds
    /// even while both sides are running. `read <= write` is only guaranteed
    /// when the producer is quiescent or this is called from the render
    /// thread.
    pub fn cursor_positions(&self) -> (u64, u64) {
        let ring = &self.shared.ring;
        let write = ring.write_index();
        let read = ring.read_index();
        (read, write)
    }

    pub fn report(&self) -> HealthReport {
        let occupied = self.occupancy();
        let capacity = self.capacity();
        HealthReport {
            health: occupied as f64 / capacity as f64,
            occupied,
            capacity,
            buffered_ms: occupied as f64 * 1000.0 / self.shared.sample_rate as f64,
            playback_rate: self.shared.rate.get(),
            stats: self.stats(),
        }
    }
}
