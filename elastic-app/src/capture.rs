//! Optional WAV capture of rendered output.
//!
//! The render side only ever calls `push_slice` on an SPSC ring, which is
//! wait-free and allocation-free. File I/O happens on the recorder thread.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};
use ringbuf::{
    traits::{Consumer, Observer, Producer, Split},
    HeapCons, HeapProd, HeapRb,
};
use tracing::{info, warn};

/// Render-side half: accepts rendered quanta without blocking.
pub struct CaptureTap {
    producer: HeapProd<f32>,
    dropped: u64,
}

impl CaptureTap {
    /// Offer one rendered quantum. Samples that do not fit are discarded and
    /// counted; the render thread never waits on the recorder.
    #[inline]
    pub fn offer(&mut self, quantum: &[f32]) {
        let written = self.producer.push_slice(quantum);
        self.dropped += (quantum.len() - written) as u64;
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

/// Recorder-side half: drains the tap into a 32-bit float mono WAV file.
pub struct WavRecorder {
    consumer: HeapCons<f32>,
    writer: hound::WavWriter<BufWriter<File>>,
    scratch: Vec<f32>,
    written: u64,
}

/// Create a tap/recorder pair writing to `path`. `buffer_samples` bounds how
/// far the recorder may fall behind before the tap starts discarding.
pub fn capture_pair(
    path: &Path,
    sample_rate: u32,
    buffer_samples: usize,
) -> Result<(CaptureTap, WavRecorder)> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("creating capture file {}", path.display()))?;

    let (producer, consumer) = HeapRb::<f32>::new(buffer_samples.max(1)).split();

    Ok((
        CaptureTap {
            producer,
            dropped: 0,
        },
        WavRecorder {
            consumer,
            writer,
            scratch: vec![0.0; 4_096],
            written: 0,
        },
    ))
}

impl WavRecorder {
    /// Write everything currently buffered. Returns the sample count written.
    pub fn drain(&mut self) -> Result<usize> {
        let mut total = 0;
        loop {
            let n = self.consumer.pop_slice(&mut self.scratch);
            if n == 0 {
                break;
            }
            for &sample in &self.scratch[..n] {
                self.writer
                    .write_sample(sample)
                    .context("writing capture sample")?;
            }
            total += n;
        }
        self.written += total as u64;
        Ok(total)
    }

    pub fn pending(&self) -> usize {
        self.consumer.occupied_len()
    }

    /// Drain the remainder and finalize the WAV header.
    pub fn finish(mut self) -> Result<u64> {
        self.drain()?;
        self.writer.finalize().context("finalizing capture file")?;
        Ok(self.written)
    }

    /// Run the recorder on its own thread until `running` clears, then finish.
    pub fn spawn(mut self, running: Arc<AtomicBool>) -> std::io::Result<JoinHandle<Result<u64>>> {
        thread::Builder::new()
            .name("elastic-recorder".into())
            .spawn(move || {
                while running.load(Ordering::Acquire) {
                    if let Err(e) = self.drain() {
                        warn!("capture stopped early: {e:#}");
                        return Err(e);
                    }
                    if self.pending() == 0 {
                        thread::sleep(Duration::from_millis(20));
                    }
                }
                let written = self.finish()?;
                info!(samples = written, "capture file finalized");
                Ok(written)
            })
    }
}
