// src/stream/mod.rs
// 引擎的各个组件：序号跟踪、通道缓冲、窗口切分、滚动、速率统计、网关
pub mod buffer;
pub mod error;
pub mod gateway;
pub mod rate;
pub mod registry;
pub mod scroll;
pub mod segment;
pub mod sequence;
pub mod source;
// 公开导出这些模块里的结构体，方便外部调用
pub use buffer::{ChannelBuffer, Sample};
pub use error::ScopeError;
pub use gateway::{GatewayState, IngestionGateway};
pub use rate::{RateStats, RateTracker};
pub use registry::{
    Channel, ChannelReport, Device, DeviceReport, IngestOutcome, Layout, Registry, TickReport,
};
pub use scroll::ScrollManager;
pub use segment::{trim, PathOp, Polyline, WaveformSegment, WindowEmitter};
pub use sequence::SequenceTracker;
pub use source::{pump, ManualSource, PumpStats, SimulatedDevice, TelemetrySource};
