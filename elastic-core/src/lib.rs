//! # elastic-core
//!
//! Elastic real-time playback kernel.
//!
//! ## Architecture
//!
//! ```text
//! decoder / network ─► IngestPort::push ─► SampleRing ─► RenderEngine::render ─► audio clock
//!                          (producer)        (atomics)      (fractional cursor,
//!                                                 │          linear interpolation)
//!                                                 └──► HealthMonitor::health
//! ```
//!
//! Overflow drops the oldest unread samples; underrun renders silence. Neither
//! is an error. The render path is zero-alloc and lock-free.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod buffering;
pub mod engine;
pub mod error;
pub mod health;
pub mod render;
pub mod stats;

// Convenience re-exports for downstream crates
pub use buffering::{IngestPort, SampleRing};
pub use engine::{ElasticKernel, KernelConfig};
pub use error::{KernelError, Result};
pub use health::{HealthMonitor, HealthReport};
pub use render::{PlaybackRate, RateControl, RenderEngine};
pub use stats::{KernelStats, StatsSnapshot};
