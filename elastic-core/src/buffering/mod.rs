//! Lock-free SPSC sample storage and its producer side.
//!
//! `SampleRing` performs no bounds checks visible to callers: `IngestPort`
//! and `RenderEngine` consult occupancy before writing or reading, so the
//! ring itself stays branch-minimal.

pub mod ingest;
pub mod ring;

pub use ingest::IngestPort;
pub use ring::SampleRing;
