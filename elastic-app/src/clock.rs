//! Render clock: stands in for the host audio callback.
//!
//! A dedicated thread wakes once per quantum period and pulls one quantum
//! through a [`QuantumAdapter`] into a preallocated buffer. Nothing inside the
//! loop allocates or locks.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use elastic_core::RenderEngine;

use crate::capture::CaptureTap;

/// Wall-clock duration of one quantum at `sample_rate`.
pub fn quantum_period(quantum_size: usize, sample_rate: u32) -> Duration {
    Duration::from_secs_f64(quantum_size as f64 / sample_rate as f64)
}

/// Counters the clock thread returns when it stops.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClockSummary {
    pub quanta: u64,
    /// Wakeups that arrived after their deadline.
    pub late_wakeups: u64,
    /// Times the clock fell so far behind that it re-anchored instead of
    /// bursting to catch up.
    pub resyncs: u64,
    pub capture_dropped: u64,
}

/// Adapts arbitrary host buffer sizes to whole render quanta.
///
/// Device callbacks rarely ask for exactly one quantum; this keeps the
/// kernel's fixed-quantum contract by rendering into a holding buffer and
/// handing it out frame by frame.
pub struct QuantumAdapter {
    engine: RenderEngine,
    quantum: Vec<f32>,
    cursor: usize,
    tap: Option<CaptureTap>,
    quanta: u64,
}

impl QuantumAdapter {
    pub fn new(engine: RenderEngine, tap: Option<CaptureTap>) -> Self {
        let size = engine.quantum_size();
        Self {
            engine,
            quantum: vec![0.0; size],
            // Start exhausted so the first frame triggers a render.
            cursor: size,
            tap,
            quanta: 0,
        }
    }

    #[inline]
    fn next_sample(&mut self) -> f32 {
        if self.cursor == self.quantum.len() {
            self.engine.render(&mut self.quantum);
            if let Some(tap) = self.tap.as_mut() {
                tap.offer(&self.quantum);
            }
            self.quanta += 1;
            self.cursor = 0;
        }
        let sample = self.quantum[self.cursor];
        self.cursor += 1;
        sample
    }

    /// Fill an interleaved buffer, copying the mono signal to every channel.
    pub fn fill_interleaved(&mut self, out: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        for frame in out.chunks_mut(channels) {
            let sample = self.next_sample();
            frame.fill(sample);
        }
    }

    pub fn quanta(&self) -> u64 {
        self.quanta
    }

    pub fn capture_dropped(&self) -> u64 {
        self.tap.as_ref().map_or(0, CaptureTap::dropped)
    }
}

/// Spawn the timer-driven render clock.
///
/// Each wakeup asks the adapter for one quantum of mono frames, the way a
/// device callback with a quantum-sized buffer would.
pub fn spawn_render_clock(
    engine: RenderEngine,
    tap: Option<CaptureTap>,
    sample_rate: u32,
    running: Arc<AtomicBool>,
) -> std::io::Result<JoinHandle<ClockSummary>> {
    let period = quantum_period(engine.quantum_size(), sample_rate);
    let mut buffer = vec![0.0f32; engine.quantum_size()];
    let mut adapter = QuantumAdapter::new(engine, tap);

    thread::Builder::new()
        .name("elastic-render-clock".into())
        .spawn(move || {
            let mut summary = ClockSummary::default();
            let mut deadline = Instant::now();

            while running.load(Ordering::Relaxed) {
                adapter.fill_interleaved(&mut buffer, 1);

                deadline += period;
                let now = Instant::now();
                if deadline > now {
                    thread::sleep(deadline - now);
                } else {
                    summary.late_wakeups += 1;
                    if now - deadline > period * 8 {
                        deadline = now;
                        summary.resyncs += 1;
                    }
                }
            }

            summary.quanta = adapter.quanta();
            summary.capture_dropped = adapter.capture_dropped();
            summary
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use elastic_core::{ElasticKernel, KernelConfig};

    fn kernel(quantum_size: usize) -> ElasticKernel {
        ElasticKernel::with_config(KernelConfig {
            capacity: 4_096,
            quantum_size,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn period_matches_quantum_duration() {
        let period = quantum_period(128, 44_100);
        assert_abs_diff_eq!(period.as_secs_f64(), 128.0 / 44_100.0, epsilon = 1e-9);
        assert_eq!(quantum_period(480, 48_000), Duration::from_millis(10));
    }

    #[test]
    fn adapter_spans_quanta_across_odd_buffer_sizes() {
        let (mut ingest, render, _monitor) = kernel(4).split();
        let ramp: Vec<f32> = (1..=12).map(|v| v as f32).collect();
        ingest.push(&ramp);

        let mut adapter = QuantumAdapter::new(render, None);
        let mut out = [0.0f32; 6];
        adapter.fill_interleaved(&mut out, 2);
        assert_eq!(out, [1.0, 1.0, 2.0, 2.0, 3.0, 3.0]);
        assert_eq!(adapter.quanta(), 1);

        let mut out = [0.0f32; 5];
        adapter.fill_interleaved(&mut out, 1);
        assert_eq!(out, [4.0, 5.0, 6.0, 7.0, 8.0]);
        assert_eq!(adapter.quanta(), 2);
    }

    #[test]
    fn adapter_renders_silence_when_starved() {
        let (_ingest, render, monitor) = kernel(8).split();
        let mut adapter = QuantumAdapter::new(render, None);
        let mut out = [1.0f32; 16];
        adapter.fill_interleaved(&mut out, 1);
        assert!(out.iter().all(|&s| s == 0.0));
        assert_eq!(monitor.stats().underrun_quanta, 2);
        assert_eq!(adapter.capture_dropped(), 0);
    }

    #[test]
    fn clock_thread_renders_until_stopped() {
        let (mut ingest, render, monitor) = kernel(64).split();
        ingest.push(&vec![0.5; 2_048]);

        let running = Arc::new(AtomicBool::new(true));
        let handle = spawn_render_clock(render, None, 48_000, Arc::clone(&running)).unwrap();
        thread::sleep(Duration::from_millis(30));
        running.store(false, Ordering::Relaxed);
        let summary = handle.join().unwrap();

        assert!(summary.quanta > 0);
        assert_eq!(monitor.stats().rendered_quanta, summary.quanta);
    }

    #[test]
    fn clock_thread_feeds_capture_tap() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clock.wav");
        let (tap, recorder) = crate::capture::capture_pair(&path, 48_000, 1 << 16).unwrap();

        let (mut ingest, render, _monitor) = kernel(64).split();
        ingest.push(&vec![0.25; 640]);

        let running = Arc::new(AtomicBool::new(true));
        let handle = spawn_render_clock(render, Some(tap), 48_000, Arc::clone(&running)).unwrap();
        thread::sleep(Duration::from_millis(20));
        running.store(false, Ordering::Relaxed);
        let summary = handle.join().unwrap();

        assert_eq!(summary.capture_dropped, 0);
        let written = recorder.finish().unwrap();
        assert_eq!(written, summary.quanta * 64);
    }
}
