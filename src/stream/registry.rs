use std::collections::HashMap;
use std::time::Duration;

use crate::config::{OverflowPolicy, ScopeConfig};
use crate::stream::buffer::ChannelBuffer;
use crate::stream::error::ScopeError;
use crate::stream::rate::{RateStats, RateTracker};
use crate::stream::scroll::ScrollManager;
use crate::stream::segment::{WaveformSegment, WindowEmitter};
use crate::stream::sequence::SequenceTracker;
use crate::types::{Bounds, TelemetryMessage};

/// Geometry supplied by the external layout engine.
pub trait Layout {
    fn channel_bounds(
        &self,
        device: usize,
        device_count: usize,
        channel: usize,
        channel_count: usize,
    ) -> Bounds;
}

/// Every channel gets the same rectangle.
impl Layout for Bounds {
    fn channel_bounds(&self, _: usize, _: usize, _: usize, _: usize) -> Bounds {
        *self
    }
}

#[derive(Debug)]
pub struct Channel {
    index: usize,
    label: String,
    buffer: ChannelBuffer,
    live: ScrollManager,
    bounds: Bounds,
    window_span: f64,
}

impl Channel {
    fn new(index: usize, bounds: Bounds, config: &ScopeConfig) -> Self {
        let capacity = live_capacity(bounds.width, config.window_span());
        Self {
            index,
            label: format!("Channel {}", index + 1),
            buffer: ChannelBuffer::new(),
            live: ScrollManager::with_capacity(config.time_scale, capacity),
            bounds,
            window_span: config.window_span(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn buffer(&self) -> &ChannelBuffer {
        &self.buffer
    }

    pub fn live(&self) -> &ScrollManager {
        &self.live
    }

    /// How many windows fit across the channel: `width / W / timeScale`, rounded up.
    pub fn max_live_segments(&self) -> usize {
        live_capacity(self.bounds.width, self.window_span)
    }

    pub fn remaining_space(&self) -> f64 {
        self.live.remaining_space(self.bounds.width)
    }

    fn resize(&mut self, bounds: Bounds) -> usize {
        self.bounds = bounds;
        self.live.clear()
    }

    fn tick(&mut self, emitter: &WindowEmitter, delta: Duration) -> ChannelReport {
        let emitted = emitter.drain(&mut self.buffer, &mut self.live, self.bounds);
        let evicted = self.live.advance(delta);
        ChannelReport {
            index: self.index,
            emitted: emitted.len(),
            evicted: evicted.len(),
            segments: self.live.iter().cloned().collect(),
            remaining_space: self.remaining_space(),
        }
    }
}

fn live_capacity(width: f64, window_span: f64) -> usize {
    if window_span <= 0.0 || !width.is_finite() {
        return 0;
    }
    (width.max(0.0) / window_span).ceil() as usize
}

#[derive(Debug)]
pub struct Device {
    id: String,
    label: String,
    channels: Vec<Channel>,
    sequence: SequenceTracker,
    pending: u64,
    overflowed: u64,
    rate: RateTracker,
}

impl Device {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Samples (received plus dropped) counted since the last tick.
    pub fn pending_samples(&self) -> u64 {
        self.pending
    }

    pub fn previous_index(&self) -> u32 {
        self.sequence.previous()
    }

    pub fn rate(&self) -> RateStats {
        self.rate.current_stats()
    }

    fn intake_len(&self) -> usize {
        self.channels.first().map_or(0, |c| c.buffer.len())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IngestOutcome {
    pub dropped: usize,
    /// Samples discarded per channel by the drop-oldest overflow policy.
    pub overflowed: usize,
}

#[derive(Debug, Clone)]
pub struct ChannelReport {
    pub index: usize,
    pub emitted: usize,
    pub evicted: usize,
    /// The whole live sequence after this tick, oldest first.
    pub segments: Vec<WaveformSegment>,
    pub remaining_space: f64,
}

#[derive(Debug, Clone)]
pub struct DeviceReport {
    pub id: String,
    pub samples: u64,
    pub rate: RateStats,
    pub overflowed: u64,
    pub channels: Vec<ChannelReport>,
}

#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub elapsed: Duration,
    pub devices: Vec<DeviceReport>,
}

impl TickReport {
    pub fn device(&self, id: &str) -> Option<&DeviceReport> {
        self.devices.iter().find(|d| d.id == id)
    }
}

/// Owns every device of a session.
#[derive(Debug)]
pub struct Registry {
    config: ScopeConfig,
    emitter: WindowEmitter,
    devices: Vec<Device>,
    by_id: HashMap<String, usize>,
}

impl Registry {
    pub fn new(config: ScopeConfig, layout: &dyn Layout) -> Result<Self, ScopeError> {
        config.validate()?;
        let device_count = config.device_ids.len();
        let devices: Vec<Device> = config
            .device_ids
            .iter()
            .enumerate()
            .map(|(d, id)| Device {
                id: id.clone(),
                label: format!("Device {id}"),
                channels: (0..config.channel_count)
                    .map(|c| {
                        let bounds =
                            layout.channel_bounds(d, device_count, c, config.channel_count);
                        Channel::new(c, bounds, &config)
                    })
                    .collect(),
                sequence: SequenceTracker::new(config.cycle_length),
                pending: 0,
                overflowed: 0,
                rate: RateTracker::new(config.rate_history_size),
            })
            .collect();
        let by_id = devices
            .iter()
            .enumerate()
            .map(|(i, d)| (d.id.clone(), i))
            .collect();
        Ok(Self {
            emitter: WindowEmitter::from_config(&config),
            config,
            devices,
            by_id,
        })
    }

    pub fn config(&self) -> &ScopeConfig {
        &self.config
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn device(&self, id: &str) -> Option<&Device> {
        self.by_id.get(id).map(|&i| &self.devices[i])
    }

    /// Apply one decoded message. Any error leaves every device untouched.
    pub fn ingest(&mut self, msg: &TelemetryMessage) -> Result<IngestOutcome, ScopeError> {
        let expected = self.config.channel_count;
        let capacity = self.config.intake_capacity;
        let policy = self.config.overflow_policy;
        let device = self
            .by_id
            .get(&msg.device_id)
            .and_then(|&i| self.devices.get_mut(i))
            .ok_or_else(|| ScopeError::UnknownDevice(msg.device_id.clone()))?;
        if msg.samples.len() != expected {
            return Err(ScopeError::MalformedMessage {
                device: msg.device_id.clone(),
                expected,
                actual: msg.samples.len(),
            });
        }

        let dropped = device.sequence.drops_for(msg.sample_index);
        let incoming = dropped + 1;
        let mut overflowed = 0;
        if let Some(capacity) = capacity {
            let projected = device.intake_len() + incoming;
            if projected > capacity {
                match policy {
                    OverflowPolicy::Reject => {
                        return Err(ScopeError::IntakeFull {
                            device: msg.device_id.clone(),
                            capacity,
                        });
                    }
                    OverflowPolicy::DropOldest => overflowed = projected - capacity,
                }
            }
        }

        device.sequence.observe(msg.sample_index);
        device.pending += incoming as u64;
        for (channel, sample) in device.channels.iter_mut().zip(&msg.samples) {
            channel.buffer.push_missing(dropped);
            channel.buffer.push(*sample);
            if overflowed > 0 {
                channel.buffer.discard_front(overflowed);
            }
        }
        device.overflowed += overflowed as u64;
        Ok(IngestOutcome {
            dropped,
            overflowed,
        })
    }

    /// Harvest counters, then drain and scroll every channel.
    pub fn tick(&mut self, delta: Duration) -> TickReport {
        let emitter = self.emitter;
        let devices = self
            .devices
            .iter_mut()
            .map(|device| {
                let samples = std::mem::take(&mut device.pending);
                let overflowed = std::mem::take(&mut device.overflowed);
                device.rate.record_tick(samples);
                DeviceReport {
                    id: device.id.clone(),
                    samples,
                    rate: device.rate.current_stats(),
                    overflowed,
                    channels: device
                        .channels
                        .iter_mut()
                        .map(|channel| channel.tick(&emitter, delta))
                        .collect(),
                }
            })
            .collect();
        TickReport {
            elapsed: delta,
            devices,
        }
    }

    /// Re-lay every channel out and drop its live segments. Queued samples stay.
    pub fn apply_layout(&mut self, layout: &dyn Layout) -> usize {
        let device_count = self.devices.len();
        let channel_count = self.config.channel_count;
        let mut cleared = 0;
        for (d, device) in self.devices.iter_mut().enumerate() {
            for channel in &mut device.channels {
                let bounds = layout.channel_bounds(d, device_count, channel.index, channel_count);
                cleared += channel.resize(bounds);
            }
        }
        cleared
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDS: Bounds = Bounds {
        width: 400.0,
        height: 100.0,
    };

    fn registry(config: ScopeConfig) -> Registry {
        Registry::new(config, &BOUNDS).unwrap()
    }

    fn msg(id: &str, index: u32, value: f64) -> TelemetryMessage {
        TelemetryMessage::new(id, index, vec![Some(value); 4])
    }

    #[test]
    fn builds_labelled_devices_and_channels() {
        let reg = registry(ScopeConfig::default());
        assert_eq!(reg.devices().len(), 2);
        let device = reg.device("cec8").unwrap();
        assert_eq!(device.label(), "Device cec8");
        assert_eq!(device.channels().len(), 4);
        assert_eq!(device.channels()[3].label(), "Channel 4");
        assert_eq!(device.channels()[0].max_live_segments(), 4);
    }

    #[test]
    fn rejects_invalid_config() {
        let config = ScopeConfig {
            window_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            Registry::new(config, &BOUNDS),
            Err(ScopeError::Configuration(_))
        ));
    }

    #[test]
    fn drops_become_missing_markers_on_every_channel() {
        let mut reg = registry(ScopeConfig::default());
        reg.ingest(&msg("e4f7", 1, 0.1)).unwrap();
        let outcome = reg.ingest(&msg("e4f7", 4, 0.2)).unwrap();
        assert_eq!(outcome.dropped, 2);
        let device = reg.device("e4f7").unwrap();
        assert_eq!(device.pending_samples(), 4);
        assert_eq!(device.previous_index(), 4);
        for channel in device.channels() {
            let missing = channel.buffer().iter().filter(|s| s.is_missing()).count();
            assert_eq!(channel.buffer().len(), 4);
            assert_eq!(missing, 2);
        }
        assert_eq!(reg.device("cec8").unwrap().pending_samples(), 0);
    }

    #[test]
    fn malformed_message_changes_nothing() {
        let mut reg = registry(ScopeConfig::default());
        reg.ingest(&msg("e4f7", 1, 0.1)).unwrap();
        let bad = TelemetryMessage::new("e4f7", 9, vec![Some(1.0); 3]);
        let err = reg.ingest(&bad).unwrap_err();
        assert!(matches!(
            err,
            ScopeError::MalformedMessage {
                expected: 4,
                actual: 3,
                ..
            }
        ));
        let device = reg.device("e4f7").unwrap();
        assert_eq!(device.pending_samples(), 1);
        assert_eq!(device.previous_index(), 1);
        assert!(device.channels().iter().all(|c| c.buffer().len() == 1));
    }

    #[test]
    fn unknown_device_is_rejected() {
        let mut reg = registry(ScopeConfig::default());
        let err = reg.ingest(&msg("ffff", 1, 0.0)).unwrap_err();
        assert!(matches!(err, ScopeError::UnknownDevice(id) if id == "ffff"));
    }

    #[test]
    fn tick_harvests_counters_and_emits() {
        let mut reg = registry(ScopeConfig::default());
        for i in 1..=201u32 {
            reg.ingest(&msg("e4f7", i % 200, 0.01)).unwrap();
        }
        let report = reg.tick(Duration::from_secs(1));
        let device = report.device("e4f7").unwrap();
        assert_eq!(device.samples, 201);
        assert_eq!(device.rate.instant, 201.0);
        for channel in &device.channels {
            assert_eq!(channel.emitted, 1);
            assert_eq!(channel.segments.len(), 1);
            assert_eq!(channel.segments[0].x(), 400.0 + 100.5 - 0.5);
            assert_eq!(channel.remaining_space, 400.0 - 500.0);
        }
        assert_eq!(reg.device("e4f7").unwrap().pending_samples(), 0);
        let idle = report.device("cec8").unwrap();
        assert_eq!(idle.samples, 0);
        assert!(idle.channels.iter().all(|c| c.segments.is_empty()));
    }

    #[test]
    fn reject_policy_refuses_whole_message() {
        let config = ScopeConfig {
            intake_capacity: Some(201),
            overflow_policy: OverflowPolicy::Reject,
            ..Default::default()
        };
        let mut reg = registry(config);
        reg.ingest(&msg("e4f7", 1, 0.0)).unwrap();
        reg.ingest(&msg("e4f7", 199, 0.0)).unwrap();
        // 4 missing + 1 real would overflow 199 queued samples.
        let err = reg.ingest(&msg("e4f7", 3, 0.0)).unwrap_err();
        assert!(matches!(err, ScopeError::IntakeFull { capacity: 201, .. }));
        let device = reg.device("e4f7").unwrap();
        assert_eq!(device.previous_index(), 199);
        assert_eq!(device.pending_samples(), 199);
        assert_eq!(device.channels()[0].buffer().len(), 199);
    }

    #[test]
    fn drop_oldest_policy_trims_front() {
        let config = ScopeConfig {
            intake_capacity: Some(201),
            ..Default::default()
        };
        let mut reg = registry(config);
        reg.ingest(&msg("e4f7", 1, 0.0)).unwrap();
        // 197 missing + 1 real on top of 1 queued.
        let outcome = reg.ingest(&msg("e4f7", 199, 0.0)).unwrap();
        assert_eq!(outcome.dropped, 197);
        assert_eq!(outcome.overflowed, 0);
        let outcome = reg.ingest(&msg("e4f7", 3, 0.0)).unwrap();
        assert_eq!(outcome.dropped, 4);
        assert_eq!(outcome.overflowed, 3);
        let device = reg.device("e4f7").unwrap();
        assert!(device.channels().iter().all(|c| c.buffer().len() == 201));
        let report = reg.tick(Duration::from_secs(1));
        assert_eq!(report.device("e4f7").unwrap().overflowed, 3);
    }

    #[test]
    fn relayout_clears_live_segments_only() {
        let mut reg = registry(ScopeConfig::default());
        for i in 1..=250u32 {
            reg.ingest(&msg("e4f7", i % 200, 0.0)).unwrap();
        }
        reg.tick(Duration::from_secs(1));
        assert_eq!(reg.apply_layout(&Bounds::new(800.0, 50.0)), 4);
        let channel = &reg.device("e4f7").unwrap().channels()[0];
        assert!(channel.live().is_empty());
        assert_eq!(channel.bounds(), Bounds::new(800.0, 50.0));
        assert_eq!(channel.max_live_segments(), 8);
        assert_eq!(channel.buffer().len(), 50);
    }
}
