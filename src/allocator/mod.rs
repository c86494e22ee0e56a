mod allocator;
mod block;
pub(crate) mod constants;
mod errors;
mod header;
mod occupancy;
mod pool;
mod pool_store;
mod ring;


pub use allocator::Allocator;
pub use errors::AllocError;
pub use header::Class;
pub use occupancy::Occupancy;
pub use pool::Geometry;
pub use pool_store::PoolCounters;
pub use ring::RingId;
