//! Streaming ingestion and scrolling waveform buffers for multi-device telemetry.
//!
//! Receivers call [`IngestionGateway::ingest`] with decoded messages; a render
//! loop calls [`IngestionGateway::tick`] on its own cadence and draws the
//! segments in the returned [`TickReport`].
pub mod config;
pub mod stream;
pub mod types;

pub use config::{OverflowPolicy, ScopeConfig};
pub use stream::{
    IngestionGateway, Layout, Registry, Sample, ScopeError, TickReport, WaveformSegment,
};
pub use types::{Bounds, Point, TelemetryMessage};
