use crate::allocator::AllocError;
use thiserror::Error;

/// Errors surfaced by root operations.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum RootError {
    #[error("root arena is not set up")]
    NotSetup,
    /// No reusable pool was available and a new one could not be obtained.
    #[error("out of memory: no pool available for a new root")]
    OutOfMemory,
}

impl From<AllocError> for RootError {
    fn from(_: AllocError) -> Self {
        RootError::OutOfMemory
    }
}

/// A [`crate::Config`] that violates the pool geometry constraints.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("pool log size {0} is below the minimum of {1}")]
    PoolTooSmall(u32, u32),
    #[error("pool log size {0} is above the maximum of {1}")]
    PoolTooLarge(u32, u32),
    #[error("checkpoint log size {0} leaves no checkpoint inside a pool")]
    CheckpointTooLarge(u32),
    #[error("low occupancy threshold must be positive")]
    LowThreshold,
    #[error("thresholds must satisfy low < high < {count} (got low {low}, high {high})")]
    ThresholdOrder {
        low: usize,
        high: usize,
        count: usize,
    },
    #[error("high threshold {high} leaves no free slot in a pool of {capacity} slots")]
    HighThresholdTooHigh { high: usize, capacity: usize },
}
