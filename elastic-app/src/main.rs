//! `elastic`: headless host for the elastic playback kernel.
//!
//! Plays the part of the wrapper layer: a synthetic producer pushes chunks at
//! jittered intervals, a render clock pulls one quantum per period, and the
//! buffer health is reported until the session ends.

mod capture;
mod clock;
mod commands;
#[cfg(feature = "device-output")]
mod device;
mod report;
mod settings;
mod signal;

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use elastic_core::{ElasticKernel, IngestPort, RenderEngine};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tokio::sync::mpsc;
use tracing::{info, warn};

use capture::CaptureTap;
use clock::ClockSummary;
use commands::ControlCommand;
use report::Reporter;
use settings::{apply_env_overrides, default_settings_path, load_settings, save_settings, AppSettings};
use signal::SignalGenerator;

#[derive(Debug, Default)]
struct Args {
    settings_path: Option<PathBuf>,
    duration: Option<Duration>,
    rate: Option<f64>,
    record: Option<PathBuf>,
    json: bool,
    write_settings: bool,
    device: bool,
}

const USAGE: &str = "Usage: elastic [--settings <file.json>] [--duration <secs>] [--rate <x>]
               [--record <file.wav>] [--json] [--write-settings] [--device]

stdin commands: rate <x> | stats | reset | quit";

fn parse_args() -> Result<Args> {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--settings" => {
                let v = it.next().ok_or_else(|| anyhow!("missing value for --settings"))?;
                args.settings_path = Some(PathBuf::from(v));
            }
            "--duration" => {
                let v = it.next().ok_or_else(|| anyhow!("missing value for --duration"))?;
                let secs = v
                    .parse::<f64>()
                    .ok()
                    .filter(|s| s.is_finite() && *s > 0.0)
                    .ok_or_else(|| anyhow!("invalid value for --duration: {v}"))?;
                args.duration = Some(Duration::from_secs_f64(secs));
            }
            "--rate" => {
                let v = it.next().ok_or_else(|| anyhow!("missing value for --rate"))?;
                let rate = v
                    .parse::<f64>()
                    .map_err(|_| anyhow!("invalid value for --rate: {v}"))?;
                args.rate = Some(rate);
            }
            "--record" => {
                let v = it.next().ok_or_else(|| anyhow!("missing value for --record"))?;
                args.record = Some(PathBuf::from(v));
            }
            "--json" => args.json = true,
            "--write-settings" => args.write_settings = true,
            "--device" => args.device = true,
            "--help" | "-h" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            other => return Err(anyhow!("unknown argument: {other}\n\n{USAGE}")),
        }
    }
    Ok(args)
}

#[tokio::main]
async fn main() {
    // ── Tracing ───────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("elastic=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        tracing::error!("{e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let args = parse_args()?;

    // ── Settings: file → env → CLI ───────────────────────────────────────
    let settings_path = args.settings_path.clone().unwrap_or_else(default_settings_path);
    let mut settings = load_settings(&settings_path);
    apply_env_overrides(&mut settings);
    if let Some(rate) = args.rate {
        settings.initial_rate = rate;
    }
    if let Some(record) = args.record.clone() {
        settings.record_path = Some(record);
    }
    settings.normalize();

    if args.write_settings {
        save_settings(&settings_path, &settings)
            .with_context(|| format!("writing {}", settings_path.display()))?;
        info!(path = %settings_path.display(), "settings written");
        return Ok(());
    }

    info!(
        settings_path = %settings_path.display(),
        signal = ?settings.signal,
        capacity = settings.kernel.capacity,
        sample_rate = settings.kernel.sample_rate,
        initial_rate = settings.initial_rate,
        "settings loaded"
    );

    // ── Kernel ────────────────────────────────────────────────────────────
    let kernel = ElasticKernel::with_config(settings.kernel.clone())?;
    let rate = kernel.rate_control();
    rate.set_playback_rate(settings.initial_rate)?;
    let (ingest, render, monitor) = kernel.split();

    let running = Arc::new(AtomicBool::new(true));

    // ── Optional capture ──────────────────────────────────────────────────
    let (tap, recorder) = match settings.record_path.as_deref() {
        Some(path) => {
            let (tap, recorder) = capture::capture_pair(
                path,
                settings.kernel.sample_rate,
                settings.kernel.sample_rate as usize * 2,
            )?;
            info!(path = %path.display(), "recording rendered output");
            let handle = recorder
                .spawn(Arc::clone(&running))
                .context("spawning recorder thread")?;
            (Some(tap), Some(handle))
        }
        None => (None, None),
    };

    // ── Render clock ──────────────────────────────────────────────────────
    let driver = start_render_driver(
        args.device,
        render,
        tap,
        settings.kernel.sample_rate,
        Arc::clone(&running),
    )?;

    // ── Producer ──────────────────────────────────────────────────────────
    let producer = tokio::spawn(run_producer(ingest, settings.clone(), Arc::clone(&running)));

    // ── Control loop ──────────────────────────────────────────────────────
    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel();
    commands::spawn_stdin_reader(cmd_tx).context("spawning stdin reader")?;
    let mut stdin_open = true;

    let mut reporter = Reporter::new(args.json);
    let mut tick = tokio::time::interval(Duration::from_millis(settings.report_interval_ms));

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let session_end = async {
        match args.duration {
            Some(d) => tokio::time::sleep(d).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(session_end);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("interrupt received, stopping");
                break;
            }
            _ = &mut session_end => {
                info!("session duration elapsed, stopping");
                break;
            }
            _ = tick.tick() => {
                reporter.emit(&monitor.report())?;
            }
            cmd = cmd_rx.recv(), if stdin_open => match cmd {
                Some(ControlCommand::SetRate(value)) => match rate.set_playback_rate(value) {
                    Ok(()) => info!(rate = value, "playback rate changed"),
                    Err(e) => warn!("{e}"),
                },
                Some(ControlCommand::Stats) => reporter.emit(&monitor.report())?,
                Some(ControlCommand::ResetStats) => {
                    monitor.reset_stats();
                    reporter.rebase();
                    info!("kernel stats reset");
                }
                Some(ControlCommand::Quit) => break,
                None => stdin_open = false,
            },
        }
    }

    // ── Shutdown ──────────────────────────────────────────────────────────
    running.store(false, Ordering::Release);
    if let Err(e) = producer.await {
        warn!("producer task ended abnormally: {e}");
    }
    driver.stop()?;
    if let Some(handle) = recorder {
        handle
            .join()
            .map_err(|_| anyhow!("recorder thread panicked"))??;
    }

    let final_report = monitor.report();
    if args.json {
        println!("{}", serde_json::to_string(&final_report)?);
    } else {
        info!(
            pushed = final_report.stats.pushed_samples,
            dropped = final_report.stats.dropped_samples,
            rendered_quanta = final_report.stats.rendered_quanta,
            underrun_quanta = final_report.stats.underrun_quanta,
            silent_samples = final_report.stats.silent_samples,
            "session finished"
        );
    }
    Ok(())
}

/// Whatever is pulling quanta out of the kernel.
enum RenderDriver {
    Thread(std::thread::JoinHandle<ClockSummary>),
    #[cfg(feature = "device-output")]
    Device(device::DeviceOutput),
}

fn start_render_driver(
    use_device: bool,
    render: RenderEngine,
    tap: Option<CaptureTap>,
    sample_rate: u32,
    running: Arc<AtomicBool>,
) -> Result<RenderDriver> {
    if use_device {
        #[cfg(feature = "device-output")]
        return Ok(RenderDriver::Device(device::DeviceOutput::open_default(
            render,
            tap,
            sample_rate,
        )?));
        #[cfg(not(feature = "device-output"))]
        return Err(anyhow!("--device requires the 'device-output' feature"));
    }

    let handle = clock::spawn_render_clock(render, tap, sample_rate, running)
        .context("spawning render clock")?;
    Ok(RenderDriver::Thread(handle))
}

impl RenderDriver {
    /// `running` must already be cleared so the clock thread can exit.
    fn stop(self) -> Result<()> {
        match self {
            RenderDriver::Thread(handle) => {
                let summary = handle
                    .join()
                    .map_err(|_| anyhow!("render clock thread panicked"))?;
                info!(
                    quanta = summary.quanta,
                    late_wakeups = summary.late_wakeups,
                    resyncs = summary.resyncs,
                    capture_dropped = summary.capture_dropped,
                    "render clock stopped"
                );
            }
            #[cfg(feature = "device-output")]
            RenderDriver::Device(output) => {
                info!(
                    sample_rate = output.sample_rate,
                    channels = output.channels,
                    "closing output device"
                );
                drop(output);
            }
        }
        Ok(())
    }
}

/// Push synthetic chunks of random size at a jittered cadence until
/// `running` clears.
async fn run_producer(mut ingest: IngestPort, settings: AppSettings, running: Arc<AtomicBool>) {
    let mut rng = StdRng::from_entropy();
    let mut generator = SignalGenerator::new(
        settings.signal,
        settings.tone_hz,
        settings.amplitude,
        settings.kernel.sample_rate,
    );

    while running.load(Ordering::Acquire) {
        let len = rng.gen_range(settings.chunk_min..=settings.chunk_max);
        let chunk = generator.next_chunk(len, &mut rng);
        ingest.push(&chunk);

        let jitter = if settings.push_jitter_ms > 0 {
            rng.gen_range(0..=settings.push_jitter_ms)
        } else {
            0
        };
        tokio::time::sleep(Duration::from_millis(settings.push_interval_ms + jitter)).await;
    }
}
