//! Real output device as the render clock (feature `device-output`).
//!
//! # Threading note
//!
//! `cpal::Stream` is `!Send` on most platforms. `DeviceOutput` must be
//! created and dropped on the same thread; the host keeps it on the main
//! task and never moves it across an `.await` boundary into a spawned task.

use anyhow::{anyhow, Context, Result};
use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    SampleFormat, Stream, StreamConfig,
};
use elastic_core::RenderEngine;
use tracing::{error, info, warn};

use crate::capture::CaptureTap;
use crate::clock::QuantumAdapter;

/// Keeps the output stream alive; dropping it stops rendering.
pub struct DeviceOutput {
    _stream: Stream,
    pub sample_rate: u32,
    pub channels: u16,
}

impl DeviceOutput {
    /// Open the default output device and start pulling quanta from `engine`.
    ///
    /// Only `f32` output formats are supported. A device rate different from
    /// `kernel_rate` is allowed but shifts speed and pitch by the ratio.
    pub fn open_default(
        engine: RenderEngine,
        tap: Option<CaptureTap>,
        kernel_rate: u32,
    ) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow!("no default output device found"))?;

        info!(
            device = device.name().unwrap_or_default().as_str(),
            "opening output device"
        );

        let supported = device
            .default_output_config()
            .context("querying default output config")?;
        if supported.sample_format() != SampleFormat::F32 {
            return Err(anyhow!(
                "unsupported output sample format {:?}; only f32 is supported",
                supported.sample_format()
            ));
        }

        let sample_rate = supported.sample_rate().0;
        let channels = supported.channels();
        if sample_rate != kernel_rate {
            warn!(
                device_rate = sample_rate,
                kernel_rate, "device rate differs from kernel rate; pitch will shift"
            );
        }

        let config: StreamConfig = supported.config();
        let mut adapter = QuantumAdapter::new(engine, tap);
        let ch = channels as usize;

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                    adapter.fill_interleaved(data, ch);
                },
                |err| error!("output stream error: {err}"),
                None,
            )
            .context("building output stream")?;
        stream.play().context("starting output stream")?;

        info!(sample_rate, channels, "device output running");
        Ok(Self {
            _stream: stream,
            sample_rate,
            channels,
        })
    }
}
