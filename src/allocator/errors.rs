use thiserror::Error;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum AllocError {
    /// The system allocator refused to hand out a pool.
    #[error("system allocator out of memory")]
    OOM,
    /// The configured pool limit has been reached.
    #[error("pool limit reached")]
    PoolLimit,
}
