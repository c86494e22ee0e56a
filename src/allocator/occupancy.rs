use super::header::Class;
use crate::config::Config;

/// Occupancy band of a pool, derived from its allocation count.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Occupancy {
    Empty,
    Low,
    High,
    QuasiFull,
}

/// Checkpoint granularity and band boundaries, in checkpoints.
#[derive(Copy, Clone, Debug)]
pub struct Thresholds {
    checkpoint_log_size: u32,
    low: usize,
    high: usize,
}

impl Thresholds {
    pub fn new(config: &Config) -> Self {
        Self {
            checkpoint_log_size: config.checkpoint_log_size,
            low: config.low_threshold,
            high: config.high_threshold,
        }
    }

    fn checkpoint_size(&self) -> usize {
        1 << self.checkpoint_log_size
    }

    /// Deallocations only look at the occupancy when this holds.
    pub fn is_checkpoint(&self, alloc_count: usize) -> bool {
        alloc_count & (self.checkpoint_size() - 1) == 0
    }

    /// Number of checkpoints needed to hold `alloc_count` slots.
    fn checkpoint(&self, alloc_count: usize) -> usize {
        alloc_count.div_ceil(self.checkpoint_size())
    }

    /// Band used when a young pool is promoted at the end of a minor scan.
    pub fn promotion(&self, alloc_count: usize) -> Occupancy {
        let checkpoint = self.checkpoint(alloc_count);

        if checkpoint == 0 {
            Occupancy::Empty
        } else if checkpoint <= self.low {
            Occupancy::Low
        } else if checkpoint <= self.high {
            Occupancy::High
        } else {
            Occupancy::QuasiFull
        }
    }

    /// Band a pool moves to when a deallocation lands on a checkpoint, or
    /// `None` if it stays where it is. Young pools are not moved to the low
    /// band here; the next minor scan takes care of them.
    pub fn demotion(&self, alloc_count: usize, class: Class) -> Option<Occupancy> {
        debug_assert!(self.is_checkpoint(alloc_count));

        let checkpoint = self.checkpoint(alloc_count);

        if checkpoint == 0 {
            Some(Occupancy::Empty)
        } else if checkpoint == self.low && class == Class::Old {
            Some(Occupancy::Low)
        } else if checkpoint == self.high {
            Some(Occupancy::High)
        } else {
            None
        }
    }
}
