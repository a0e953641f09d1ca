//! Consumer-side rendering with a fractional, variable-rate read cursor.
//!
//! # Real-time contract
//!
//! `RenderEngine::render` runs on the host's audio clock. It must not
//! allocate, lock, log or block, and its cost is bounded by the length of the
//! output slice. Every shared access here is a single atomic load, store,
//! fence or `fetch_max`.
//!
//! # Overflow during a render
//!
//! The producer may advance the read index and overwrite slots while a render
//! is reading them. The render commits with `fetch_max`, which returns the
//! producer's floor; outputs that came from below it are zeroed rather than
//! emitted out of order, and counted in `stale_samples`.
//!
//! # Cursor model
//!
//! The shared ring holds the integer part of the read cursor. The engine
//! keeps the fractional remainder in `frac`, relative to that index.
//! Each output sample at position `p` is
//! `s[floor(p)] * (1 - f) + s[floor(p) + 1] * f`; when `f == 0` only
//! `s[floor(p)]` is needed, so integer-aligned reads are exact.

pub mod rate;

use std::sync::atomic::{fence, Ordering};
use std::sync::Arc;

use crate::engine::KernelShared;
use crate::error::Result;
use crate::stats::KernelStats;

pub use rate::{PlaybackRate, RateControl};

/// Shared state sampled once at the top of a render.
struct Window {
    read: u64,
    available: u64,
    frac: f64,
    rate: f64,
}

struct Gathered {
    filled: usize,
    /// Cursor position after the last output, relative to `Window::read`.
    end: f64,
}

/// Pulls one quantum of resampled audio per call.
///
/// Not `Clone`: exactly one consumer advances the read cursor.
pub struct RenderEngine {
    shared: Arc<KernelShared>,
    /// Fractional offset past the shared read index, in `[0, 1)`.
    frac: f64,
    quantum_size: usize,
}

impl RenderEngine {
    pub(crate) fn new(shared: Arc<KernelShared>, quantum_size: usize) -> Self {
        Self {
            shared,
            frac: 0.0,
            quantum_size,
        }
    }

    /// Fill every slot of `out`.
    ///
    /// The playback rate is sampled once at entry, so a concurrent rate change
    /// lands on the next call. When the ring runs dry the remaining slots are
    /// zeroed and the cursor stops at the last position real data allows.
    pub fn render(&mut self, out: &mut [f32]) {
        let window = self.open_window();
        let gathered = self.gather(out, &window);
        self.commit(out, &window, gathered);
    }

    fn open_window(&self) -> Window {
        let ring = &self.shared.ring;
        let read = ring.read_index();
        Window {
            read,
            available: ring.available_from(read) as u64,
            frac: self.frac,
            rate: self.shared.rate.get(),
        }
    }

    /// Interpolate from the slots inside `window` into `out`.
    ///
    /// Pure reads: nothing shared changes until [`commit`](Self::commit).
    fn gather(&self, out: &mut [f32], window: &Window) -> Gathered {
        let ring = &self.shared.ring;
        let read = window.read;
        let available = window.available;

        let mut pos = window.frac;
        let mut filled = out.len();

        for (i, slot) in out.iter_mut().enumerate() {
            let whole = pos.floor();
            let base = whole as u64;
            let f = pos - whole;

            if f == 0.0 {
                if base >= available {
                    filled = i;
                    break;
                }
                *slot = ring.read(read + base);
            } else {
                if base + 1 >= available {
                    filled = i;
                    break;
                }
                let a = ring.read(read + base);
                let b = ring.read(read + base + 1);
                let f = f as f32;
                *slot = a * (1.0 - f) + b * f;
            }
            pos += window.rate;
        }

        Gathered { filled, end: pos }
    }

    /// Publish the consumed samples and discard anything an overflow
    /// overwrote while `gather` was reading.
    fn commit(&mut self, out: &mut [f32], window: &Window, gathered: Gathered) {
        let ring = &self.shared.ring;
        let stats = &self.shared.stats;
        let Gathered { filled, end } = gathered;
        let read = window.read;
        let available = window.available;

        let silent = out.len() - filled;
        out[filled..].fill(0.0);

        // A fast rate can step past the end of the data on the final sample;
        // the cursor may not pass the write index, so park it there.
        let whole = end.floor();
        let (consumed, frac) = if whole as u64 > available {
            (available, 0.0)
        } else {
            (whole as u64, end - whole)
        };

        // Pairs with the release fence in `IngestPort::push`: if any slot load
        // above saw an overwrite, `previous` covers that push's floor.
        fence(Ordering::Acquire);
        let target = read + consumed;
        let previous = ring.advance_read(target);
        self.frac = frac;

        if previous != read {
            // The producer dropped samples under us; resume at its index.
            KernelStats::bump(&stats.render_collisions, 1);
            let stale = discard_overwritten(&mut out[..filled], window, previous);
            KernelStats::bump(&stats.stale_samples, stale as u64);
            if previous > target {
                self.frac = 0.0;
            }
        }

        KernelStats::bump(&stats.rendered_quanta, 1);
        if silent > 0 {
            KernelStats::bump(&stats.underrun_quanta, 1);
            KernelStats::bump(&stats.silent_samples, silent as u64);
        }
    }

    /// # Errors
    /// `KernelError::InvalidRate` when `rate` is non-positive or outside the
    /// configured bounds. The previous rate stays in effect.
    pub fn set_playback_rate(&self, rate: f64) -> Result<()> {
        self.shared.rate.set(rate)
    }

    pub fn playback_rate(&self) -> f64 {
        self.shared.rate.get()
    }

    /// Quantum length the session was configured with.
    pub fn quantum_size(&self) -> usize {
        self.quantum_size
    }

    /// Current read position in samples since the session began, including
    /// the fractional offset.
    pub fn cursor(&self) -> f64 {
        self.shared.ring.read_index() as f64 + self.frac
    }
}

/// Zero the leading outputs whose left neighbour sits below `floor`.
///
/// Those slots may already hold samples from a later lap, and emitting them
/// would put newer audio ahead of older. Output positions are replayed with
/// the same accumulation as `gather`, so the split point is exact. Returns
/// how many outputs were zeroed.
fn discard_overwritten(out: &mut [f32], window: &Window, floor: u64) -> usize {
    let mut pos = window.frac;
    let mut stale = 0;
    for slot in out.iter_mut() {
        if window.read + pos.floor() as u64 >= floor {
            break;
        }
        *slot = 0.0;
        stale += 1;
        pos += window.rate;
    }
    stale
}
