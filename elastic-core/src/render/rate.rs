//! Shared playback-rate scalar.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::engine::KernelShared;
use crate::error::{KernelError, Result};

/// Consumption speed as a multiple of nominal, stored as `f64` bits.
///
/// Written by a control thread, loaded once per `render` by the consumer.
#[derive(Debug)]
pub struct PlaybackRate {
    bits: AtomicU64,
    min: f64,
    max: f64,
}

impl PlaybackRate {
    /// Bounds must already be validated (`0 < min <= 1 <= max`).
    pub(crate) fn new(min: f64, max: f64) -> Self {
        Self {
            bits: AtomicU64::new(1.0f64.to_bits()),
            min,
            max,
        }
    }

    #[inline]
    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }

    /// Replace the rate. Values outside `[min, max]`, non-positive values
    /// and NaN are rejected and the previous rate stays in effect.
    pub fn set(&self, rate: f64) -> Result<()> {
        // NaN fails both comparisons and lands in the error branch.
        if !(rate > 0.0 && rate >= self.min && rate <= self.max) {
            return Err(KernelError::InvalidRate {
                rate,
                min: self.min,
                max: self.max,
            });
        }
        self.bits.store(rate.to_bits(), Ordering::Release);
        Ok(())
    }

    pub fn bounds(&self) -> (f64, f64) {
        (self.min, self.max)
    }
}

/// Cloneable control-side handle to the kernel's playback rate.
///
/// Lets a UI or control thread steer the rate after the `RenderEngine` has
/// moved onto the render thread.
#[derive(Clone)]
pub struct RateControl {
    pub(crate) shared: Arc<KernelShared>,
}

impl RateControl {
    pub(crate) fn new(shared: Arc<KernelShared>) -> Self {
        Self { shared }
    }

    /// # Errors
    /// `KernelError::InvalidRate` when `rate` is outside the configured bounds.
    pub fn set_playback_rate(&self, rate: f64) -> Result<()> {
        self.shared.rate.set(rate)
    }

    pub fn playback_rate(&self) -> f64 {
        self.shared.rate.get()
    }

    pub fn bounds(&self) -> (f64, f64) {
        self.shared.rate.bounds()
    }
}
