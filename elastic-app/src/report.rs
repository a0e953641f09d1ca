//! Periodic health output, human-readable or JSON lines.

use anyhow::Result;
use elastic_core::{HealthReport, StatsSnapshot};
use tracing::{info, warn};

pub struct Reporter {
    json: bool,
    last: StatsSnapshot,
}

impl Reporter {
    pub fn new(json: bool) -> Self {
        Self {
            json,
            last: StatsSnapshot::default(),
        }
    }

    /// Forget the previous snapshot after the kernel counters were zeroed.
    pub fn rebase(&mut self) {
        self.last = StatsSnapshot::default();
    }

    pub fn emit(&mut self, report: &HealthReport) -> Result<()> {
        let new_underruns = report
            .stats
            .underrun_quanta
            .saturating_sub(self.last.underrun_quanta);
        let new_drops = report
            .stats
            .dropped_samples
            .saturating_sub(self.last.dropped_samples);
        self.last = report.stats;

        if self.json {
            println!("{}", serde_json::to_string(report)?);
            return Ok(());
        }

        info!(
            health = round_to(report.health, 3),
            buffered_ms = round_to(report.buffered_ms, 1),
            rate = report.playback_rate,
            occupied = report.occupied,
            "{}",
            meter(report.health, 20)
        );
        if new_underruns > 0 {
            warn!(quanta = new_underruns, "underrun: rendered silence");
        }
        if new_drops > 0 {
            warn!(samples = new_drops, "overflow: dropped oldest samples");
        }
        Ok(())
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

/// Text fill meter, e.g. `[#####.....]`.
pub fn meter(health: f64, width: usize) -> String {
    let filled = ((health.clamp(0.0, 1.0) * width as f64).round() as usize).min(width);
    format!("[{}{}]", "#".repeat(filled), ".".repeat(width - filled))
}
