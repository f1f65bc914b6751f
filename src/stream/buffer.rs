use std::collections::VecDeque;

/// One slot on a channel's timeline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Sample {
    Value(f64),
    /// Never received; drawn as a gap, never as zero.
    Missing,
}

impl Sample {
    pub fn value(self) -> Option<f64> {
        match self {
            Sample::Value(v) => Some(v),
            Sample::Missing => None,
        }
    }

    pub fn is_missing(self) -> bool {
        matches!(self, Sample::Missing)
    }
}

impl From<Option<f64>> for Sample {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Sample::Missing, Sample::Value)
    }
}

impl From<f64> for Sample {
    fn from(value: f64) -> Self {
        Sample::Value(value)
    }
}

/// Append-only intake queue of one channel, drained in windows on tick.
#[derive(Debug, Default)]
pub struct ChannelBuffer {
    queue: VecDeque<Sample>,
}

impl ChannelBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sample: impl Into<Sample>) {
        self.queue.push_back(sample.into());
    }

    pub fn push_missing(&mut self, count: usize) {
        self.queue.extend(std::iter::repeat(Sample::Missing).take(count));
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.queue.iter()
    }

    /// Copy of the first `len` samples, or `None` if fewer are queued.
    pub fn peek_window(&self, len: usize) -> Option<Vec<Sample>> {
        if self.queue.len() < len {
            return None;
        }
        Some(self.queue.iter().take(len).copied().collect())
    }

    /// Remove up to `count` samples from the front; returns how many went.
    pub fn discard_front(&mut self, count: usize) -> usize {
        let count = count.min(self.queue.len());
        self.queue.drain(..count);
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_is_not_zero() {
        let mut buffer = ChannelBuffer::new();
        buffer.push(0.0);
        buffer.push_missing(2);
        buffer.push(None);
        let samples: Vec<Sample> = buffer.iter().copied().collect();
        assert_eq!(
            samples,
            vec![
                Sample::Value(0.0),
                Sample::Missing,
                Sample::Missing,
                Sample::Missing
            ]
        );
        assert_eq!(samples[0].value(), Some(0.0));
        assert!(samples[1].is_missing());
    }

    #[test]
    fn peek_needs_a_full_window() {
        let mut buffer = ChannelBuffer::new();
        for i in 0..4 {
            buffer.push(i as f64);
        }
        assert!(buffer.peek_window(5).is_none());
        let window = buffer.peek_window(3).unwrap();
        assert_eq!(window.len(), 3);
        assert_eq!(buffer.len(), 4);
    }

    #[test]
    fn discard_front_is_bounded() {
        let mut buffer = ChannelBuffer::new();
        buffer.push_missing(3);
        assert_eq!(buffer.discard_front(2), 2);
        assert_eq!(buffer.discard_front(5), 1);
        assert!(buffer.is_empty());
    }
}
