use crate::arena::Shared;
use crate::value::{Heap, Value};
use std::fmt;
use std::ptr::NonNull;

/// A registered root: one slot of the arena holding a [`Value`] the host
/// collector must treat as live.
///
/// The collector may rewrite the value during any collection, so always read
/// it back with [`Root::get`] rather than caching it. Dropping the root
/// unregisters it.
pub struct Root<'a, H: Heap> {
    slot: NonNull<Value>,
    shared: &'a Shared<H>,
}

// Every access to the slot other than `get` goes through the arena's
// critical section.
#[cfg(feature = "multi_threaded")]
unsafe impl<H: Heap> Send for Root<'_, H> {}

impl<'a, H: Heap> Root<'a, H> {
    pub(crate) fn new(slot: NonNull<Value>, shared: &'a Shared<H>) -> Self {
        Self { slot, shared }
    }

    pub(crate) fn slot(&self) -> NonNull<Value> {
        self.slot
    }

    pub fn get(&self) -> Value {
        unsafe { self.slot.as_ptr().read() }
    }

    /// Replaces the value of the root. Storing a young value in a root held
    /// by an old pool moves the root to another slot.
    pub fn modify(&mut self, value: Value) {
        self.shared.modify(&mut self.slot, value);
    }

    /// Unregisters the root. Same as dropping it.
    pub fn delete(self) {
        drop(self)
    }

    /// Address of the slot currently holding the root.
    pub fn slot_addr(&self) -> usize {
        self.slot.as_ptr() as usize
    }

    pub fn as_ptr(&self) -> *const Value {
        self.slot.as_ptr()
    }
}

impl<H: Heap> Drop for Root<'_, H> {
    fn drop(&mut self) {
        self.shared.delete(self.slot);
    }
}

impl<H: Heap> fmt::Debug for Root<'_, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Root")
            .field("slot", &format_args!("{:#x}", self.slot_addr()))
            .field("value", &format_args!("{:#x}", self.get().raw()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::{Config, Heap, Hooks, RootArena, Value};
    use std::sync::Arc;

    struct EvenIsYoung;

    impl Heap for EvenIsYoung {
        fn is_block(&self, value: Value) -> bool {
            value.raw() & 1 == 0
        }

        fn is_young(&self, _: Value) -> bool {
            true
        }
    }

    #[test]
    fn get_returns_last_value() {
        let arena =
            RootArena::new(EvenIsYoung, Arc::new(Hooks::new()), Config::default()).unwrap();

        arena.setup();

        let mut root = arena.create(Value::from_raw(11)).unwrap();

        assert_eq!(root.get(), Value::from_raw(11));

        root.modify(Value::from_raw(13));

        assert_eq!(root.get(), Value::from_raw(13));
        assert_eq!(unsafe { *root.as_ptr() }, Value::from_raw(13));
    }

    #[test]
    fn young_value_in_old_pool_relocates() {
        let arena =
            RootArena::new(EvenIsYoung, Arc::new(Hooks::new()), Config::default()).unwrap();

        arena.setup();

        let mut root = arena.create(Value::from_raw(11)).unwrap();
        let before = root.slot_addr();

        root.modify(Value::from_raw(0x1000));

        assert_ne!(root.slot_addr(), before);
        assert_eq!(root.get(), Value::from_raw(0x1000));

        // Already young: stays in place.
        let young_slot = root.slot_addr();

        root.modify(Value::from_raw(0x2000));

        assert_eq!(root.slot_addr(), young_slot);
        arena.check_integrity();
    }

    #[test]
    fn debug_shows_slot_and_value() {
        let arena =
            RootArena::new(EvenIsYoung, Arc::new(Hooks::new()), Config::default()).unwrap();

        arena.setup();

        let root = arena.create(Value::from_raw(0x2b)).unwrap();

        assert!(format!("{root:?}").contains("value: 0x2b"));
    }
}
