//! Persistent host settings (JSON file in the app data directory).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use elastic_core::KernelConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    Sine,
    Ramp,
    Noise,
}

impl SignalKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "sine" | "tone" => Some(Self::Sine),
            "ramp" | "saw" => Some(Self::Ramp),
            "noise" | "white" => Some(Self::Noise),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct AppSettings {
    pub kernel: KernelConfig,
    pub signal: SignalKind,
    pub tone_hz: f32,
    pub amplitude: f32,
    /// Smallest chunk the producer pushes, in samples.
    pub chunk_min: usize,
    /// Largest chunk the producer pushes, in samples.
    pub chunk_max: usize,
    pub push_interval_ms: u64,
    /// Random extra delay added to each push, emulating network/decoder jitter.
    pub push_jitter_ms: u64,
    pub initial_rate: f64,
    pub report_interval_ms: u64,
    pub record_path: Option<PathBuf>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            kernel: KernelConfig::default(),
            signal: SignalKind::Sine,
            tone_hz: 440.0,
            amplitude: 0.2,
            chunk_min: 512,
            chunk_max: 4_096,
            push_interval_ms: 40,
            push_jitter_ms: 25,
            initial_rate: 1.0,
            report_interval_ms: 1_000,
            record_path: None,
        }
    }
}

impl AppSettings {
    pub fn normalize(&mut self) {
        let defaults = KernelConfig::default();
        let kernel = &mut self.kernel;
        kernel.sample_rate = kernel.sample_rate.clamp(8_000, 192_000);
        // 50 ms .. 60 s of audio.
        let rate = kernel.sample_rate as usize;
        kernel.capacity = kernel.capacity.clamp(rate / 20, rate * 60);
        kernel.quantum_size = kernel.quantum_size.clamp(16, 4_096);
        if !kernel.min_rate.is_finite() || kernel.min_rate <= 0.0 || kernel.min_rate > 1.0 {
            kernel.min_rate = defaults.min_rate;
        }
        if !kernel.max_rate.is_finite() || kernel.max_rate < 1.0 {
            kernel.max_rate = defaults.max_rate;
        }
        kernel.max_rate = kernel.max_rate.min(16.0);

        let nyquist = kernel.sample_rate as f32 / 2.0;
        self.tone_hz = if self.tone_hz.is_finite() {
            self.tone_hz.clamp(1.0, nyquist)
        } else {
            440.0
        };
        self.amplitude = if self.amplitude.is_finite() {
            self.amplitude.clamp(0.0, 1.0)
        } else {
            0.2
        };
        self.chunk_min = self.chunk_min.clamp(1, kernel.capacity);
        self.chunk_max = self.chunk_max.clamp(self.chunk_min, kernel.capacity.max(self.chunk_min));
        self.push_interval_ms = self.push_interval_ms.clamp(1, 10_000);
        self.push_jitter_ms = self.push_jitter_ms.min(10_000);
        self.initial_rate = if self.initial_rate.is_finite() {
            self.initial_rate.clamp(kernel.min_rate, kernel.max_rate)
        } else {
            1.0
        };
        self.report_interval_ms = self.report_interval_ms.clamp(50, 60_000);
        self.record_path = self
            .record_path
            .take()
            .filter(|p| !p.as_os_str().is_empty());
    }
}

/// Environment overrides, applied after the file and before the CLI.
pub fn apply_env_overrides(settings: &mut AppSettings) {
    if let Ok(raw) = std::env::var("ELASTIC_RATE") {
        match raw.trim().parse::<f64>() {
            Ok(rate) => settings.initial_rate = rate,
            Err(_) => warn!("ignoring unparsable ELASTIC_RATE={raw:?}"),
        }
    }
    if let Ok(raw) = std::env::var("ELASTIC_SIGNAL") {
        match SignalKind::parse(&raw) {
            Some(kind) => settings.signal = kind,
            None => warn!("ignoring unknown ELASTIC_SIGNAL={raw:?}"),
        }
    }
}

const SETTINGS_FILE: &str = "settings.json";

/// Per-user data directory: `%APPDATA%\Lattice Labs\Elastic` on Windows,
/// `$XDG_DATA_HOME/elastic` (or `~/.local/share/elastic`) elsewhere.
fn data_dir() -> PathBuf {
    let var = |name: &str| std::env::var_os(name).filter(|v| !v.is_empty()).map(PathBuf::from);

    if cfg!(target_os = "windows") {
        var("APPDATA")
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Lattice Labs")
            .join("Elastic")
    } else {
        var("XDG_DATA_HOME")
            .or_else(|| var("HOME").map(|home| home.join(".local").join("share")))
            .unwrap_or_else(std::env::temp_dir)
            .join("elastic")
    }
}

pub fn default_settings_path() -> PathBuf {
    data_dir().join(SETTINGS_FILE)
}

/// A missing file yields defaults silently; an unreadable or malformed one
/// yields defaults with a warning. The result is always normalized.
pub fn load_settings(path: &Path) -> AppSettings {
    let parsed = match fs::read_to_string(path) {
        Ok(raw) => serde_json::from_str::<AppSettings>(&raw).map_err(|e| e.to_string()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppSettings::default()),
        Err(e) => Err(e.to_string()),
    };

    let mut settings = parsed.unwrap_or_else(|reason| {
        warn!(path = %path.display(), %reason, "settings unusable, using defaults");
        AppSettings::default()
    });
    settings.normalize();
    settings
}

/// Write `settings` as pretty JSON, creating parent directories. The file is
/// replaced by rename so a crash never leaves it half-written.
pub fn save_settings(path: &Path, settings: &AppSettings) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(settings)?;
    let staging = path.with_extension("json.tmp");
    fs::write(&staging, json).with_context(|| format!("writing {}", staging.display()))?;
    fs::rename(&staging, path).with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}
