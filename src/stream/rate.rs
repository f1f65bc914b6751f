use std::collections::VecDeque;
use std::fmt;

/// Throughput of one device as shown on its status line.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RateStats {
    /// Samples counted during the last tick.
    pub instant: f64,
    /// Mean of the retained history.
    pub average: f64,
    pub history_len: usize,
}

impl fmt::Display for RateStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.0}Hz {:.0}Hz({}s)",
            self.instant, self.average, self.history_len
        )
    }
}

/// Rolling per-tick sample counts, oldest evicted first.
#[derive(Clone, Debug)]
pub struct RateTracker {
    history: VecDeque<u64>,
    capacity: usize,
}

impl RateTracker {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            history: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn record_tick(&mut self, count: u64) {
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(count);
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn current_stats(&self) -> RateStats {
        let instant = self.history.back().copied().unwrap_or(0) as f64;
        let average = if self.history.is_empty() {
            0.0
        } else {
            self.history.iter().sum::<u64>() as f64 / self.history.len() as f64
        };
        RateStats {
            instant,
            average,
            history_len: self.history.len(),
        }
    }
}
