use thiserror::Error;

/// All errors produced by elastic-core.
///
/// Overflow and underrun are deliberately absent: they are counted in
/// [`crate::stats::StatsSnapshot`], never returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KernelError {
    #[error("playback rate {rate} is outside the accepted range [{min}, {max}]")]
    InvalidRate { rate: f64, min: f64, max: f64 },

    #[error("cannot construct kernel: {0}")]
    Construction(String),
}

pub type Result<T> = std::result::Result<T, KernelError>;
