// src/types.rs

// 传输层解码后交给引擎的一条遥测消息
#[derive(Clone, Debug, PartialEq)]
pub struct TelemetryMessage {
    pub device_id: String,
    /// Cyclic counter in `[0, cycleLength)`.
    pub sample_index: u32,
    /// One entry per channel; `None` is an absent reading, not zero.
    pub samples: Vec<Option<f64>>,
}

impl TelemetryMessage {
    pub fn new(device_id: impl Into<String>, sample_index: u32, samples: Vec<Option<f64>>) -> Self {
        Self {
            device_id: device_id.into(),
            sample_index,
            samples,
        }
    }

    /// Build from a per-device route such as `/e4f7`.
    pub fn from_address(address: &str, sample_index: u32, samples: Vec<Option<f64>>) -> Self {
        Self::new(address.trim_start_matches('/'), sample_index, samples)
    }
}

// 通道绘图区域 (由外部布局引擎提供)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}
