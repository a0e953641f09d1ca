//! Synthetic PCM source standing in for a decoder or network stream.

use std::f32::consts::TAU;

use rand::Rng;

use crate::settings::SignalKind;

pub struct SignalGenerator {
    kind: SignalKind,
    amplitude: f32,
    /// Phase advance per sample, in cycles.
    step: f32,
    phase: f32,
}

impl SignalGenerator {
    pub fn new(kind: SignalKind, tone_hz: f32, amplitude: f32, sample_rate: u32) -> Self {
        Self {
            kind,
            amplitude,
            step: tone_hz / sample_rate as f32,
            phase: 0.0,
        }
    }

    /// Produce the next `len` samples.
    pub fn next_chunk<R: Rng>(&mut self, len: usize, rng: &mut R) -> Vec<f32> {
        let mut out = Vec::with_capacity(len);
        for _ in 0..len {
            let value = match self.kind {
                SignalKind::Sine => (self.phase * TAU).sin(),
                // Sawtooth in [-1, 1).
                SignalKind::Ramp => self.phase * 2.0 - 1.0,
                SignalKind::Noise => rng.gen_range(-1.0f32..1.0),
            };
            out.push(value * self.amplitude);
            self.phase = (self.phase + self.step) % 1.0;
        }
        out
    }
}
