use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::stream::error::ScopeError;
use crate::stream::gateway::IngestionGateway;
use crate::types::TelemetryMessage;

/// Anything that yields decoded telemetry messages on demand.
pub trait TelemetrySource {
    fn next_message(&mut self) -> Result<Option<TelemetryMessage>, ScopeError>;
}

/// In-memory source useful for tests and deterministic playback.
pub struct ManualSource {
    queue: VecDeque<TelemetryMessage>,
}

impl ManualSource {
    pub fn new(messages: impl IntoIterator<Item = TelemetryMessage>) -> Self {
        Self {
            queue: messages.into_iter().collect(),
        }
    }
}

impl TelemetrySource for ManualSource {
    fn next_message(&mut self) -> Result<Option<TelemetryMessage>, ScopeError> {
        Ok(self.queue.pop_front())
    }
}

/// A board streaming sine waves over a lossy link.
///
/// Each call yields the next delivered message; lost messages are skipped
/// along with their counter values, and single channels go absent at random.
pub struct SimulatedDevice {
    id: String,
    channel_count: usize,
    cycle_length: u32,
    index: u32,
    phase: f64,
    loss: f64,
    absent: f64,
    rng: StdRng,
}

impl SimulatedDevice {
    pub fn new(id: impl Into<String>, channel_count: usize, cycle_length: u32, seed: u64) -> Self {
        Self {
            id: id.into(),
            channel_count,
            cycle_length: cycle_length.max(1),
            index: 0,
            phase: 0.0,
            loss: 0.0,
            absent: 0.0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Probability that a message never arrives.
    pub fn with_loss(mut self, probability: f64) -> Self {
        self.loss = probability.clamp(0.0, 0.95);
        self
    }

    /// Probability that one channel of a delivered message is absent.
    pub fn with_absent(mut self, probability: f64) -> Self {
        self.absent = probability.clamp(0.0, 1.0);
        self
    }

    fn step(&mut self) {
        self.index = (self.index + 1) % self.cycle_length;
        self.phase += 0.1;
    }
}

impl TelemetrySource for SimulatedDevice {
    fn next_message(&mut self) -> Result<Option<TelemetryMessage>, ScopeError> {
        self.step();
        let mut lost = 0;
        while lost + 1 < self.cycle_length && self.rng.gen_bool(self.loss) {
            self.step();
            lost += 1;
        }
        let samples = (0..self.channel_count)
            .map(|ch| {
                if self.rng.gen_bool(self.absent) {
                    None
                } else {
                    Some((self.phase * (ch as f64 * 0.1 + 1.0)).sin() * 1e-3)
                }
            })
            .collect();
        Ok(Some(TelemetryMessage::new(
            self.id.clone(),
            self.index,
            samples,
        )))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PumpStats {
    pub delivered: usize,
    pub discarded: usize,
    pub dropped: usize,
}

/// Feed up to `limit` messages from `source` into `gateway`.
///
/// Per-message errors are counted and skipped; anything else (a stopped
/// gateway, a failing source) ends the pump.
pub fn pump<S: TelemetrySource + ?Sized>(
    source: &mut S,
    gateway: &IngestionGateway,
    limit: usize,
) -> Result<PumpStats, ScopeError> {
    let mut stats = PumpStats::default();
    for _ in 0..limit {
        let Some(msg) = source.next_message()? else {
            break;
        };
        match gateway.ingest(&msg) {
            Ok(outcome) => {
                stats.delivered += 1;
                stats.dropped += outcome.dropped;
            }
            Err(e) if e.is_message_error() => stats.discarded += 1,
            Err(e) => return Err(e),
        }
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScopeConfig;
    use crate::stream::registry::Registry;
    use crate::types::Bounds;

    fn running_gateway() -> IngestionGateway {
        let config = ScopeConfig::default().with_devices(["sim"]);
        let registry = Registry::new(config, &Bounds::new(400.0, 100.0)).unwrap();
        let gateway = IngestionGateway::new(registry);
        gateway.start().unwrap();
        gateway
    }

    #[test]
    fn manual_source_drains_in_order() {
        let mut source = ManualSource::new(vec![
            TelemetryMessage::new("a", 1, vec![]),
            TelemetryMessage::new("a", 2, vec![]),
        ]);
        assert_eq!(source.next_message().unwrap().map(|m| m.sample_index), Some(1));
        assert_eq!(source.next_message().unwrap().map(|m| m.sample_index), Some(2));
        assert!(source.next_message().unwrap().is_none());
    }

    #[test]
    fn lossless_simulation_counts_up() {
        let mut device = SimulatedDevice::new("sim", 4, 200, 7);
        let indices: Vec<u32> = (0..250)
            .map(|_| device.next_message().unwrap().unwrap().sample_index)
            .collect();
        assert_eq!(indices[0], 1);
        assert_eq!(indices[198], 199);
        assert_eq!(indices[199], 0);
        assert!(indices.iter().all(|&i| i < 200));
    }

    #[test]
    fn pump_counts_discards_and_drops() {
        let gateway = running_gateway();
        let mut source = ManualSource::new(vec![
            TelemetryMessage::new("sim", 1, vec![Some(0.0); 4]),
            TelemetryMessage::new("sim", 2, vec![Some(0.0); 2]),
            TelemetryMessage::new("nope", 2, vec![Some(0.0); 4]),
            TelemetryMessage::new("sim", 6, vec![None; 4]),
        ]);
        let stats = pump(&mut source, &gateway, 10).unwrap();
        assert_eq!(
            stats,
            PumpStats {
                delivered: 2,
                discarded: 2,
                dropped: 4,
            }
        );
    }

    #[test]
    fn lossy_simulation_accounts_for_every_slot() {
        let gateway = running_gateway();
        let mut device = SimulatedDevice::new("sim", 4, 200, 42)
            .with_loss(0.2)
            .with_absent(0.1);
        let stats = pump(&mut device, &gateway, 150).unwrap();
        assert_eq!(stats.delivered, 150);
        let (pending, queued) = gateway.with_registry(|r| {
            let d = r.device("sim").unwrap();
            (d.pending_samples(), d.channels()[0].buffer().len())
        });
        assert_eq!(pending as usize, stats.delivered + stats.dropped);
        assert_eq!(queued, pending as usize);
    }

    #[test]
    fn pump_stops_on_stopped_gateway() {
        let gateway = running_gateway();
        gateway.stop().unwrap();
        let mut device = SimulatedDevice::new("sim", 4, 200, 1);
        assert!(matches!(
            pump(&mut device, &gateway, 5),
            Err(ScopeError::NotRunning { .. })
        ));
    }
}
