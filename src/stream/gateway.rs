use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::stream::error::ScopeError;
use crate::stream::registry::{IngestOutcome, Layout, Registry, TickReport};
use crate::types::TelemetryMessage;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GatewayState {
    Idle,
    Running,
    Stopped,
}

struct Shared {
    state: GatewayState,
    registry: Registry,
}

/// The one synchronization point between receivers and the render tick.
///
/// Every clone shares the same registry behind a single coarse lock. The
/// lock covers per-device counters, sequence indices, intake queues and
/// live segments; nothing inside it logs or waits on the renderer.
#[derive(Clone)]
pub struct IngestionGateway {
    shared: Arc<Mutex<Shared>>,
}

impl IngestionGateway {
    pub fn new(registry: Registry) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                state: GatewayState::Idle,
                registry,
            })),
        }
    }

    pub fn state(&self) -> GatewayState {
        self.shared.lock().state
    }

    pub fn start(&self) -> Result<(), ScopeError> {
        self.transition(GatewayState::Running, |from| from == GatewayState::Idle)
    }

    /// Later `ingest`/`tick` calls fail with `NotRunning`. Stopped is final.
    pub fn stop(&self) -> Result<(), ScopeError> {
        self.transition(GatewayState::Stopped, |from| from != GatewayState::Stopped)
    }

    fn transition(
        &self,
        to: GatewayState,
        allowed: impl FnOnce(GatewayState) -> bool,
    ) -> Result<(), ScopeError> {
        let from = {
            let mut shared = self.shared.lock();
            let from = shared.state;
            if !allowed(from) {
                return Err(ScopeError::InvalidTransition { from, to });
            }
            shared.state = to;
            from
        };
        info!("gateway {from:?} -> {to:?}");
        Ok(())
    }

    pub fn ingest(&self, msg: &TelemetryMessage) -> Result<IngestOutcome, ScopeError> {
        let result = {
            let mut shared = self.shared.lock();
            match shared.state {
                GatewayState::Running => shared.registry.ingest(msg),
                state => Err(ScopeError::NotRunning { state }),
            }
        };
        match &result {
            Ok(outcome) => {
                if outcome.dropped > 0 {
                    debug!(
                        "device {}: {} samples lost before index {}",
                        msg.device_id, outcome.dropped, msg.sample_index
                    );
                }
                if outcome.overflowed > 0 {
                    warn!(
                        "device {}: intake full, discarded {} oldest samples",
                        msg.device_id, outcome.overflowed
                    );
                }
            }
            Err(e) if e.is_message_error() => warn!("discarding message: {e}"),
            Err(_) => {}
        }
        result
    }

    /// Harvest rates, emit full windows and scroll every channel by `elapsed`.
    pub fn tick(&self, elapsed: Duration) -> Result<TickReport, ScopeError> {
        let report = {
            let mut shared = self.shared.lock();
            match shared.state {
                GatewayState::Running => shared.registry.tick(elapsed),
                state => return Err(ScopeError::NotRunning { state }),
            }
        };
        for device in &report.devices {
            let emitted: usize = device.channels.iter().map(|c| c.emitted).sum();
            let evicted: usize = device.channels.iter().map(|c| c.evicted).sum();
            debug!(
                "device {}: {} | {emitted} segments emitted, {evicted} evicted",
                device.id, device.rate
            );
        }
        Ok(report)
    }

    /// Re-lay the channels out; live segments are discarded, queued samples kept.
    pub fn resize(&self, layout: &dyn Layout) -> usize {
        let cleared = self.shared.lock().registry.apply_layout(layout);
        debug!("layout changed, cleared {cleared} live segments");
        cleared
    }

    /// Read access to the registry under the lock.
    pub fn with_registry<R>(&self, f: impl FnOnce(&Registry) -> R) -> R {
        f(&self.shared.lock().registry)
    }
}
