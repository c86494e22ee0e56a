use std::ptr::NonNull;

/// Generation class of a pool.
#[repr(u8)]
#[derive(PartialEq, Eq, Copy, Clone, Debug)]
pub enum Class {
    /// May hold pointers into the youngest generation. Scanned on every
    /// minor and major collection.
    Young,
    /// Holds no youngest-generation pointer. Scanned on major collections.
    Old,
    /// Holds no root at all. Never scanned.
    Untracked,
}

/// The header at the start of every pool.
///
/// `free_list` is an encoded word: the address of the first free slot, or
/// the address of the pool itself once the free list is exhausted. Offset 0
/// of a pool is the header, so it can never name a slot.
#[repr(C)]
pub struct PoolHeader {
    pub prev: NonNull<PoolHeader>,
    pub next: NonNull<PoolHeader>,
    pub free_list: usize,
    pub alloc_count: usize,
    pub class: Class,
}
