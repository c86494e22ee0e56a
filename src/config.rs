use crate::allocator::constants::{
    DEFAULT_CHECKPOINT_LOG_SIZE, DEFAULT_POOL_LOG_SIZE, HEADER_SIZE, MAX_POOL_LOG_SIZE,
    MIN_POOL_LOG_SIZE, SLOT_SIZE,
};
use crate::error::ConfigError;

/// Tuning parameters of a [`crate::RootArena`].
///
/// The thresholds are expressed in checkpoints: a pool of `pool_size` bytes
/// is divided into `checkpoint_count()` parts of `checkpoint_size()` slots,
/// and its occupancy band is only re-evaluated when its allocation count
/// crosses one of these boundaries.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Log2 of the pool size in bytes. Pools are aligned to their size.
    pub pool_log_size: u32,
    /// Log2 of the number of slots between two occupancy checkpoints.
    pub checkpoint_log_size: u32,
    /// Old pools at or below this many checkpoints become candidates for
    /// reuse as young pools.
    pub low_threshold: usize,
    /// Pools at or below this many checkpoints are available for allocation,
    /// above it they are considered full.
    pub high_threshold: usize,
    /// Maximum number of pools alive at once. Allocation past this limit
    /// fails as if the system allocator had refused the request.
    pub pool_limit: Option<usize>,
    /// Check every ring and pool before and after each scan.
    pub debug_checks: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            pool_log_size: DEFAULT_POOL_LOG_SIZE,
            checkpoint_log_size: DEFAULT_CHECKPOINT_LOG_SIZE,
            low_threshold: 0,
            high_threshold: 0,
            pool_limit: None,
            debug_checks: cfg!(debug_assertions),
        }
        .with_default_thresholds()
    }
}

impl Config {
    /// Changes the pool size and recomputes the default thresholds for it.
    pub fn with_pool_log_size(mut self, pool_log_size: u32) -> Self {
        self.pool_log_size = pool_log_size;
        self.with_default_thresholds()
    }

    pub fn with_pool_limit(mut self, limit: usize) -> Self {
        self.pool_limit = Some(limit);
        self
    }

    fn with_default_thresholds(mut self) -> Self {
        let count = self.checkpoint_count();

        self.low_threshold = count / 2;
        self.high_threshold = count.saturating_sub(1);
        self
    }

    /// Pool size in bytes, or 0 if `pool_log_size` does not fit a `usize`.
    pub fn pool_size(&self) -> usize {
        1usize.checked_shl(self.pool_log_size).unwrap_or(0)
    }

    pub fn checkpoint_size(&self) -> usize {
        1usize.checked_shl(self.checkpoint_log_size).unwrap_or(0)
    }

    /// Zero when the geometry is out of range, which `validate` reports.
    pub fn checkpoint_count(&self) -> usize {
        if self.pool_log_size > MAX_POOL_LOG_SIZE
            || self.checkpoint_log_size >= self.pool_log_size
        {
            return 0;
        }

        self.pool_size() / (self.checkpoint_size() * SLOT_SIZE)
    }

    /// Number of slots in one pool.
    pub fn pool_capacity(&self) -> usize {
        self.pool_size().saturating_sub(HEADER_SIZE) / SLOT_SIZE
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pool_log_size < MIN_POOL_LOG_SIZE {
            return Err(ConfigError::PoolTooSmall(self.pool_log_size, MIN_POOL_LOG_SIZE));
        }

        if self.pool_log_size > MAX_POOL_LOG_SIZE {
            return Err(ConfigError::PoolTooLarge(self.pool_log_size, MAX_POOL_LOG_SIZE));
        }

        let count = self.checkpoint_count();
        if count == 0 {
            return Err(ConfigError::CheckpointTooLarge(self.checkpoint_log_size));
        }

        if self.low_threshold == 0 {
            return Err(ConfigError::LowThreshold);
        }

        if self.low_threshold >= self.high_threshold || self.high_threshold >= count {
            return Err(ConfigError::ThresholdOrder {
                low: self.low_threshold,
                high: self.high_threshold,
                count,
            });
        }

        // A pool in the HIGH band must still have room for one allocation.
        let capacity = self.pool_capacity();
        if 1 + self.high_threshold * self.checkpoint_size() >= capacity {
            return Err(ConfigError::HighThresholdTooHigh {
                high: self.high_threshold,
                capacity,
            });
        }

        Ok(())
    }
}
