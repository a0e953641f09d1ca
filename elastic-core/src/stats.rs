//! Lock-free counters for the overflow and underrun conditions.
//!
//! Both sides bump these with `Relaxed` `fetch_add`, which is wait-free and
//! safe on the render thread.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

#[derive(Debug, Default)]
pub struct KernelStats {
    pub pushed_samples: AtomicU64,
    pub dropped_samples: AtomicU64,
    pub overflow_events: AtomicU64,
    pub truncated_chunks: AtomicU64,
    pub rendered_quanta: AtomicU64,
    pub underrun_quanta: AtomicU64,
    pub silent_samples: AtomicU64,
    pub render_collisions: AtomicU64,
    pub stale_samples: AtomicU64,
}

impl KernelStats {
    pub fn reset(&self) {
        self.pushed_samples.store(0, Ordering::Relaxed);
        self.dropped_samples.store(0, Ordering::Relaxed);
        self.overflow_events.store(0, Ordering::Relaxed);
        self.truncated_chunks.store(0, Ordering::Relaxed);
        self.rendered_quanta.store(0, Ordering::Relaxed);
        self.underrun_quanta.store(0, Ordering::Relaxed);
        self.silent_samples.store(0, Ordering::Relaxed);
        self.render_collisions.store(0, Ordering::Relaxed);
        self.stale_samples.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            pushed_samples: self.pushed_samples.load(Ordering::Relaxed),
            dropped_samples: self.dropped_samples.load(Ordering::Relaxed),
            overflow_events: self.overflow_events.load(Ordering::Relaxed),
            truncated_chunks: self.truncated_chunks.load(Ordering::Relaxed),
            rendered_quanta: self.rendered_quanta.load(Ordering::Relaxed),
            underrun_quanta: self.underrun_quanta.load(Ordering::Relaxed),
            silent_samples: self.silent_samples.load(Ordering::Relaxed),
            render_collisions: self.render_collisions.load(Ordering::Relaxed),
            stale_samples: self.stale_samples.load(Ordering::Relaxed),
        }
    }

    #[inline]
    pub(crate) fn bump(counter: &AtomicU64, by: u64) {
        if by > 0 {
            counter.fetch_add(by, Ordering::Relaxed);
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    /// Samples offered to `push`, including any that were truncated.
    pub pushed_samples: u64,
    /// Samples lost to overflow: truncated chunk heads plus unread samples
    /// the producer overwrote.
    pub dropped_samples: u64,
    /// `push` calls that dropped at least one sample.
    pub overflow_events: u64,
    /// `push` calls whose chunk exceeded the ring capacity.
    pub truncated_chunks: u64,
    pub rendered_quanta: u64,
    /// Quanta that ended in silence because data ran out.
    pub underrun_quanta: u64,
    /// Total zero samples inserted by underruns.
    pub silent_samples: u64,
    /// Renders whose read window was overtaken by a concurrent overflow.
    pub render_collisions: u64,
    /// Rendered samples zeroed because an overflow overwrote their source
    /// slots mid-render.
    pub stale_samples: u64,
}
