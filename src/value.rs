use crate::sync::ThreadSafety;

/// A machine-word handle to an object managed by the host collector.
///
/// The allocator never interprets a value beyond asking the [`Heap`] whether
/// it is a young heap pointer. The only thing a value must never be is an
/// even word pointing inside one of the allocator's own pools: such words
/// encode free slots.
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Value(usize);

impl Value {
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> usize {
        self.0
    }
}

impl From<usize> for Value {
    fn from(raw: usize) -> Self {
        Self(raw)
    }
}

/// The host collector's view of a [`Value`].
///
/// Both predicates must be O(1) and free of side effects. They are called on
/// the hot path of root creation and modification.
pub trait Heap: ThreadSafety + 'static {
    /// Returns true if the value points into the collected heap.
    fn is_block(&self, value: Value) -> bool;

    /// Returns true if the heap pointer lives in the youngest generation.
    /// Only called on values for which `is_block` holds.
    fn is_young(&self, value: Value) -> bool;

    fn is_young_block(&self, value: Value) -> bool {
        self.is_block(value) && self.is_young(value)
    }
}
