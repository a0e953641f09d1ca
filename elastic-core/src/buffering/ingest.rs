//! Producer-side entry point.

use std::sync::atomic::{fence, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::engine::KernelShared;
use crate::stats::KernelStats;

/// Writes chunks of PCM into the ring from a non-real-time context.
///
/// Not `Clone`, and `push` takes `&mut self`: exactly one producer can
/// advance the write cursor.
pub struct IngestPort {
    shared: Arc<KernelShared>,
}

impl IngestPort {
    pub(crate) fn new(shared: Arc<KernelShared>) -> Self {
        Self { shared }
    }

    /// Append `chunk` to the ring.
    ///
    /// Never fails and never waits on the consumer. When the chunk does not
    /// fit, the oldest unread samples are dropped by advancing the read
    /// cursor; a chunk longer than the capacity keeps only its most recent
    /// `capacity` samples. Both cases are counted in the kernel stats.
    pub fn push(&mut self, chunk: &[f32]) {
        let ring = &self.shared.ring;
        let stats = &self.shared.stats;
        let capacity = ring.capacity();

        KernelStats::bump(&stats.pushed_samples, chunk.len() as u64);
        if chunk.is_empty() {
            return;
        }

        let truncated = chunk.len().saturating_sub(capacity);
        let chunk = &chunk[truncated..];

        let start = ring.write_index();
        let end = start + chunk.len() as u64;

        // Free the slots we are about to overwrite before touching them.
        let floor = end.saturating_sub(capacity as u64);
        let previous_read = ring.advance_read(floor);
        let overwritten = floor.saturating_sub(previous_read);
        // A render that observes any of the stores below must also observe
        // the floor when it commits.
        fence(Ordering::Release);

        for (offset, &sample) in (start..end).zip(chunk) {
            ring.write(offset, sample);
        }
        ring.publish_write(end);

        let dropped = truncated as u64 + overwritten;
        if dropped > 0 {
            KernelStats::bump(&stats.dropped_samples, dropped);
            KernelStats::bump(&stats.overflow_events, 1);
            if truncated > 0 {
                KernelStats::bump(&stats.truncated_chunks, 1);
            }
            debug!(
                truncated,
                overwritten, capacity, "ingest overflow: dropped oldest samples"
            );
        }
    }

    pub fn capacity(&self) -> usize {
        self.shared.ring.capacity()
    }

    /// Free slots remaining before the next push starts dropping.
    pub fn free_space(&self) -> usize {
        self.capacity() - self.shared.ring.occupancy()
    }
}
