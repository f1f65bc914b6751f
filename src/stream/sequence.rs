/// Turns a device's cyclic sample counter into a count of lost samples.
///
/// The producer emits `0, 1, ..., cycle - 1, 0, ...`. A counter that jumps
/// back to exactly 0 is taken as a fresh cycle, never as a loss, even when
/// the previous index was far from `cycle - 1`.
#[derive(Clone, Debug)]
pub struct SequenceTracker {
    cycle_length: u32,
    prev: u32,
}

impl SequenceTracker {
    pub fn new(cycle_length: u32) -> Self {
        Self {
            cycle_length: cycle_length.max(1),
            prev: 0,
        }
    }

    pub fn previous(&self) -> u32 {
        self.prev
    }

    pub fn cycle_length(&self) -> u32 {
        self.cycle_length
    }

    /// Record `sample_index` and return how many samples went missing before it.
    pub fn observe(&mut self, sample_index: u32) -> usize {
        let drops = self.drops_for(sample_index);
        self.prev = sample_index % self.cycle_length;
        drops
    }

    /// What `observe` would return, without recording anything.
    pub fn drops_for(&self, sample_index: u32) -> usize {
        let index = sample_index % self.cycle_length;
        let prev = self.prev;
        if index == prev + 1 || index == 0 {
            0
        } else if index < prev {
            // Wrapped past the end of the cycle.
            (u64::from(index) + u64::from(self.cycle_length) - u64::from(prev)) as usize
        } else {
            // A repeated index gives 0 rather than going negative.
            index.saturating_sub(prev + 1) as usize
        }
    }
}
