use std::collections::VecDeque;
use std::time::Duration;

use crate::stream::segment::WaveformSegment;

/// Live segments of one channel, oldest (leftmost) first.
#[derive(Debug, Default)]
pub struct ScrollManager {
    time_scale: f64,
    segments: VecDeque<WaveformSegment>,
}

impl ScrollManager {
    pub fn new(time_scale: f64) -> Self {
        Self {
            time_scale,
            segments: VecDeque::new(),
        }
    }

    pub fn with_capacity(time_scale: f64, capacity: usize) -> Self {
        Self {
            time_scale,
            segments: VecDeque::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn last(&self) -> Option<&WaveformSegment> {
        self.segments.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WaveformSegment> {
        self.segments.iter()
    }

    pub fn push(&mut self, segment: WaveformSegment) {
        self.segments.push_back(segment);
    }

    /// Scroll every segment left by `delta * timeScale` and evict the ones
    /// whose right edge is now below 0. Returns the evicted segments.
    pub fn advance(&mut self, delta: Duration) -> Vec<WaveformSegment> {
        let dx = delta.as_secs_f64() * self.time_scale;
        for segment in &mut self.segments {
            segment.shift(dx);
        }
        let mut evicted = Vec::new();
        while self.segments.front().is_some_and(|s| s.x() < 0.0) {
            if let Some(segment) = self.segments.pop_front() {
                evicted.push(segment);
            }
        }
        evicted
    }

    /// Distance from the newest segment's right edge to the channel's right edge.
    pub fn remaining_space(&self, width: f64) -> f64 {
        self.segments.back().map_or(0.0, |s| width - s.x())
    }

    pub fn clear(&mut self) -> usize {
        let dropped = self.segments.len();
        self.segments.clear();
        dropped
    }
}
