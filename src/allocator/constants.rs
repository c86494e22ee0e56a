use super::header::PoolHeader;
use crate::value::Value;
use std::mem::size_of;

// 16 KiB pools, with the occupancy re-evaluated every 16 allocations.
pub const DEFAULT_POOL_LOG_SIZE: u32 = 14;
pub const DEFAULT_CHECKPOINT_LOG_SIZE: u32 = 4;

pub const MIN_POOL_LOG_SIZE: u32 = 9;
pub const MAX_POOL_LOG_SIZE: u32 = 30;

pub const SLOT_SIZE: usize = size_of::<Value>();
pub const HEADER_SIZE: usize = size_of::<PoolHeader>();
