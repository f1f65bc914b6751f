use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::stream::ScopeError;

/// Largest counter cycle accepted; one gap may queue up to this many markers per channel.
pub const MAX_CYCLE_LENGTH: u32 = 65_536;

/// What happens when a bounded intake queue cannot take a whole message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OverflowPolicy {
    /// Discard the oldest queued samples of every channel of the device.
    #[default]
    DropOldest,
    /// Refuse the message and leave the queues as they are.
    Reject,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ScopeConfig {
    pub device_ids: Vec<String>,
    pub channel_count: usize,
    pub window_size: usize,
    pub cycle_length: u32,
    pub time_scale: f64,
    pub value_scale: f64,
    pub rate_history_size: usize,
    /// Unbounded when `None`; sample rates are low relative to the tick cadence.
    pub intake_capacity: Option<usize>,
    pub overflow_policy: OverflowPolicy,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        // Two boards with four channels each, a 200-sample counter cycle,
        // and one window per second of data.
        Self {
            device_ids: vec!["e4f7".to_owned(), "cec8".to_owned()],
            channel_count: 4,
            window_size: 201,
            cycle_length: 200,
            time_scale: 0.5,
            value_scale: -300.0,
            rate_history_size: 10,
            intake_capacity: None,
            overflow_policy: OverflowPolicy::DropOldest,
        }
    }
}

impl ScopeConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ScopeError> {
        let config: ScopeConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ScopeError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn with_devices<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.device_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(&self) -> Result<(), ScopeError> {
        let fail = |reason: String| Err(ScopeError::Configuration(reason));
        if self.window_size <= 1 {
            return fail(format!("windowSize must be > 1, got {}", self.window_size));
        }
        if self.channel_count == 0 {
            return fail("channelCount must be > 0".to_owned());
        }
        if self.cycle_length == 0 || self.cycle_length > MAX_CYCLE_LENGTH {
            return fail(format!(
                "cycleLength must be in 1..={MAX_CYCLE_LENGTH}, got {}",
                self.cycle_length
            ));
        }
        if self.rate_history_size == 0 {
            return fail("rateHistorySize must be > 0".to_owned());
        }
        if !self.time_scale.is_finite() || self.time_scale <= 0.0 {
            return fail(format!("timeScale must be positive, got {}", self.time_scale));
        }
        if !self.value_scale.is_finite() {
            return fail(format!("valueScale must be finite, got {}", self.value_scale));
        }
        if self.device_ids.is_empty() {
            return fail("at least one device id is required".to_owned());
        }
        let mut seen = HashSet::new();
        for id in &self.device_ids {
            if !seen.insert(id.as_str()) {
                return fail(format!("duplicate device id {id}"));
            }
        }
        if let Some(capacity) = self.intake_capacity {
            if capacity < self.window_size {
                return fail(format!(
                    "intakeCapacity {capacity} cannot hold a full window of {}",
                    self.window_size
                ));
            }
        }
        Ok(())
    }

    /// Horizontal extent of one emitted window.
    pub fn window_span(&self) -> f64 {
        self.window_size as f64 * self.time_scale
    }
}
