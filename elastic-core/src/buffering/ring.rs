//! Fixed-capacity sample storage with atomic cursors.
//!
//! Both cursors are monotonic `u64` logical indices; the physical slot is
//! `index % capacity`. A `u64` at 192 kHz takes millions of years to wrap, so
//! the indices never alias.
//!
//! Samples are kept as `f32` bit patterns in `AtomicU32` slots. A slot being
//! overwritten by the producer while the consumer reads it (the overflow
//! path) is therefore a stale read, never a data race.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use crate::error::{KernelError, Result};

pub struct SampleRing {
    slots: Box<[AtomicU32]>,
    capacity: usize,
    /// Next logical index the producer will write. Producer-only.
    write_index: AtomicU64,
    /// Integer part of the consumer cursor. Advanced with `fetch_max` by the
    /// consumer and, on overflow, by the producer.
    read_index: AtomicU64,
}

impl SampleRing {
    /// Allocate a zero-filled ring of `capacity` samples.
    ///
    /// # Errors
    /// `KernelError::Construction` when `capacity == 0`.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(KernelError::Construction(
                "ring capacity must be at least one sample".into(),
            ));
        }

        let slots = (0..capacity)
            .map(|_| AtomicU32::new(0f32.to_bits()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Ok(Self {
            slots,
            capacity,
            write_index: AtomicU64::new(0),
            read_index: AtomicU64::new(0),
        })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    fn slot(&self, offset: u64) -> &AtomicU32 {
        &self.slots[(offset % self.capacity as u64) as usize]
    }

    /// Store one sample at logical `offset`. Never blocks, never allocates.
    ///
    /// Not visible to the consumer until [`publish_write`](Self::publish_write)
    /// moves the write index past `offset`.
    #[inline]
    pub fn write(&self, offset: u64, value: f32) {
        self.slot(offset).store(value.to_bits(), Ordering::Relaxed);
    }

    /// Load the sample at logical `offset`.
    #[inline]
    pub fn read(&self, offset: u64) -> f32 {
        f32::from_bits(self.slot(offset).load(Ordering::Relaxed))
    }

    #[inline]
    pub fn write_index(&self) -> u64 {
        self.write_index.load(Ordering::Acquire)
    }

    #[inline]
    pub fn read_index(&self) -> u64 {
        self.read_index.load(Ordering::Acquire)
    }

    /// Make every slot below `end` visible to the consumer. Producer only.
    #[inline]
    pub fn publish_write(&self, end: u64) {
        self.write_index.store(end, Ordering::Release);
    }

    /// Move the read index forward to at least `target`, returning the index
    /// it held before. Never moves it backwards.
    #[inline]
    pub fn advance_read(&self, target: u64) -> u64 {
        self.read_index.fetch_max(target, Ordering::AcqRel)
    }

    /// Readable samples starting at `read`, clamped to `[0, capacity]`.
    ///
    /// `read` may be stale; the clamp keeps the result inside the capacity
    /// invariant even when the producer lapped it.
    #[inline]
    pub fn available_from(&self, read: u64) -> usize {
        let write = self.write_index();
        (write.saturating_sub(read) as usize).min(self.capacity)
    }

    /// Count of valid unread samples. Lock-free; may be stale on return.
    #[inline]
    pub fn occupancy(&self) -> usize {
        self.available_from(self.read_index())
    }
}

impl std::fmt::Debug for SampleRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleRing")
            .field("capacity", &self.capacity)
            .field("write_index", &self.write_index())
            .field("read_index", &self.read_index())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(
            SampleRing::new(0),
            Err(KernelError::Construction(_))
        ));
    }

    #[test]
    fn new_ring_is_empty() {
        let ring = SampleRing::new(16).unwrap();
        assert_eq!(ring.capacity(), 16);
        assert_eq!(ring.occupancy(), 0);
        assert_eq!(ring.write_index(), 0);
        assert_eq!(ring.read_index(), 0);
    }

    #[test]
    fn write_wraps_modulo_capacity() {
        let ring = SampleRing::new(4).unwrap();
        ring.write(1, 0.5);
        ring.write(5, -0.25);
        // 5 % 4 == 1, so the second write replaced the first.
        assert_eq!(ring.read(1), -0.25);
        assert_eq!(ring.read(9), -0.25);
    }

    #[test]
    fn out_of_range_values_pass_through() {
        let ring = SampleRing::new(2).unwrap();
        ring.write(0, 3.5);
        ring.write(1, -7.0);
        assert_eq!(ring.read(0), 3.5);
        assert_eq!(ring.read(1), -7.0);
    }

    #[test]
    fn occupancy_tracks_cursor_delta() {
        let ring = SampleRing::new(8).unwrap();
        ring.publish_write(5);
        assert_eq!(ring.occupancy(), 5);
        ring.advance_read(3);
        assert_eq!(ring.occupancy(), 2);
    }

    #[test]
    fn advance_read_never_moves_backwards() {
        let ring = SampleRing::new(8).unwrap();
        ring.publish_write(8);
        assert_eq!(ring.advance_read(6), 0);
        assert_eq!(ring.advance_read(2), 6);
        assert_eq!(ring.read_index(), 6);
    }

    #[test]
    fn stale_read_index_is_clamped_to_capacity() {
        let ring = SampleRing::new(4).unwrap();
        ring.publish_write(10);
        assert_eq!(ring.available_from(0), 4);
        assert_eq!(ring.available_from(12), 0);
    }
}
