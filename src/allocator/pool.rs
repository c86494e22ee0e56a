use super::block::Block;
use super::constants::{HEADER_SIZE, SLOT_SIZE};
use super::errors::AllocError;
use super::header::{Class, PoolHeader};
use crate::value::Value;
use std::ptr::NonNull;

/// Size and slot capacity shared by every pool of an allocator.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Geometry {
    pub log_size: u32,
    pub capacity: usize,
}

impl Geometry {
    pub fn new(log_size: u32) -> Self {
        Self {
            log_size,
            capacity: ((1usize << log_size) - HEADER_SIZE) / SLOT_SIZE,
        }
    }

    pub fn size(&self) -> usize {
        1 << self.log_size
    }
}

/// A handle to a pool: a header followed by `capacity` slots, in a block
/// aligned to the pool size.
///
/// Free slots hold the address of the next free slot in the same pool, and
/// the last one holds the address of the pool itself. Because of the
/// alignment, a free slot word always has the pool's high bits and a clear
/// low bit, which is how a scan tells it apart from a live value.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Pool(NonNull<PoolHeader>);

impl Pool {
    /// Allocates an untracked pool with every slot free, linked to itself as
    /// a ring of one.
    pub fn new(geometry: &Geometry) -> Result<Pool, AllocError> {
        let block = Block::new(geometry.log_size)?;
        let header: NonNull<PoolHeader> = block.into_raw().cast();
        let pool = Pool(header);

        unsafe {
            header.as_ptr().write(PoolHeader {
                prev: header,
                next: header,
                free_list: pool.addr(),
                alloc_count: 0,
                class: Class::Untracked,
            });
        }

        pool.reset_free_list(geometry);

        Ok(pool)
    }

    /// Returns the memory of the pool to the system allocator.
    ///
    /// # Safety
    /// The pool must not be reachable from any ring, and no slot of it may
    /// be used afterwards.
    pub unsafe fn release(self, geometry: &Geometry) {
        drop(Block::from_raw(self.0.cast(), geometry.log_size));
    }

    /// Recovers the pool owning `slot` by masking the low bits of its
    /// address. Only correct for slots handed out by a pool of `geometry`.
    pub fn from_slot(slot: NonNull<Value>, geometry: &Geometry) -> Pool {
        let offset = (slot.as_ptr() as usize) & (geometry.size() - 1);

        debug_assert!(offset >= HEADER_SIZE);

        unsafe {
            let base = slot.as_ptr().cast::<u8>().sub(offset);

            Pool(NonNull::new_unchecked(base.cast()))
        }
    }

    pub fn addr(&self) -> usize {
        self.0.as_ptr() as usize
    }

    fn header(&self) -> *mut PoolHeader {
        self.0.as_ptr()
    }

    fn slots(&self) -> *mut Value {
        unsafe { self.0.as_ptr().cast::<u8>().add(HEADER_SIZE).cast() }
    }

    fn slot_addr(&self, index: usize) -> usize {
        self.addr() + HEADER_SIZE + index * SLOT_SIZE
    }

    fn slot_at_addr(&self, addr: usize) -> *mut Value {
        unsafe { self.0.as_ptr().cast::<u8>().add(addr - self.addr()).cast() }
    }

    fn reset_free_list(&self, geometry: &Geometry) {
        let slots = self.slots();
        let last = geometry.capacity - 1;

        unsafe {
            for index in 0..last {
                slots
                    .add(index)
                    .write(Value::from_raw(self.slot_addr(index + 1)));
            }

            slots.add(last).write(Value::from_raw(self.addr()));
            (*self.header()).free_list = self.slot_addr(0);
            (*self.header()).alloc_count = 0;
        }
    }

    pub fn class(&self) -> Class {
        unsafe { (*self.header()).class }
    }

    pub fn set_class(&self, class: Class) {
        unsafe { (*self.header()).class = class }
    }

    pub fn alloc_count(&self) -> usize {
        unsafe { (*self.header()).alloc_count }
    }

    pub fn next(&self) -> Pool {
        Pool(unsafe { (*self.header()).next })
    }

    pub fn prev(&self) -> Pool {
        Pool(unsafe { (*self.header()).prev })
    }

    pub fn set_next(&self, next: Pool) {
        unsafe { (*self.header()).next = next.0 }
    }

    pub fn set_prev(&self, prev: Pool) {
        unsafe { (*self.header()).prev = prev.0 }
    }

    pub fn is_singleton(&self) -> bool {
        self.next() == *self
    }

    /// True when the free list is exhausted.
    pub fn is_full(&self) -> bool {
        unsafe { (*self.header()).free_list == self.addr() }
    }

    /// True if `word` is a free-list link of this pool rather than a value.
    pub fn is_free_link(&self, word: usize, geometry: &Geometry) -> bool {
        word & !(geometry.size() - 2) == self.addr()
    }

    pub fn pop_free(&self) -> Option<NonNull<Value>> {
        let header = self.header();

        unsafe {
            let head = (*header).free_list;

            if head == self.addr() {
                return None;
            }

            let slot = self.slot_at_addr(head);

            (*header).free_list = slot.read().raw();
            (*header).alloc_count += 1;

            Some(NonNull::new_unchecked(slot))
        }
    }

    /// Pushes `slot` back on the free list and returns the new allocation
    /// count.
    pub fn push_free(&self, slot: NonNull<Value>) -> usize {
        let header = self.header();

        debug_assert!(self.alloc_count() > 0);

        unsafe {
            slot.as_ptr().write(Value::from_raw((*header).free_list));
            (*header).free_list = slot.as_ptr() as usize;
            (*header).alloc_count -= 1;
            (*header).alloc_count
        }
    }

    /// Applies `action` to every occupied slot, left to right, and stops as
    /// soon as `alloc_count` of them have been seen. Returns the number of
    /// slots visited.
    pub fn scan(&self, geometry: &Geometry, action: &mut dyn FnMut(&mut Value)) -> usize {
        let slots = self.slots();
        let mut remaining = self.alloc_count();
        let mut current = 0;

        while remaining > 0 {
            debug_assert!(current < geometry.capacity);

            let slot = unsafe { &mut *slots.add(current) };

            if !self.is_free_link(slot.raw(), geometry) {
                remaining -= 1;
                action(slot);
            }

            current += 1;
        }

        current
    }

    /// Walks the free list. Panics if it leaves the pool or loops.
    pub fn free_list_len(&self, geometry: &Geometry) -> usize {
        let first = self.slot_addr(0);
        let end = self.slot_addr(geometry.capacity);
        let mut current = unsafe { (*self.header()).free_list };
        let mut len = 0;

        while current != self.addr() {
            assert!(len < geometry.capacity, "free list of pool {:#x} loops", self.addr());
            assert!(
                current >= first && current < end,
                "free list of pool {:#x} leaves the pool",
                self.addr()
            );

            current = unsafe { self.slot_at_addr(current).read().raw() };
            len += 1;
        }

        len
    }

    /// Every value currently held by the pool.
    pub fn occupied(&self, geometry: &Geometry) -> impl Iterator<Item = Value> + '_ {
        let slots = self.slots();
        let geometry = *geometry;

        (0..geometry.capacity)
            .map(move |index| unsafe { slots.add(index).read() })
            .filter(move |value| !self.is_free_link(value.raw(), &geometry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GEOMETRY_LOG: u32 = 10;

    fn with_pool(f: impl FnOnce(Pool, &Geometry)) {
        let geometry = Geometry::new(GEOMETRY_LOG);
        let pool = Pool::new(&geometry).unwrap();

        f(pool, &geometry);

        unsafe { pool.release(&geometry) };
    }

    #[test]
    fn new_pool_is_empty_singleton() {
        with_pool(|pool, geometry| {
            assert_eq!(pool.alloc_count(), 0);
            assert_eq!(pool.class(), Class::Untracked);
            assert!(pool.is_singleton());
            assert_eq!(pool.prev(), pool);
            assert!(!pool.is_full());
            assert_eq!(pool.free_list_len(geometry), geometry.capacity);
            assert_eq!(pool.addr() % geometry.size(), 0);
        });
    }

    #[test]
    fn pop_until_full_then_refill() {
        with_pool(|pool, geometry| {
            let mut slots = vec![];

            while let Some(slot) = pool.pop_free() {
                slots.push(slot);
            }

            assert_eq!(slots.len(), geometry.capacity);
            assert!(pool.is_full());
            assert_eq!(pool.free_list_len(geometry), 0);

            for (i, slot) in slots.iter().enumerate() {
                unsafe { slot.as_ptr().write(Value::from_raw(2 * i + 1)) };
            }

            for slot in slots.drain(..) {
                let count = pool.push_free(slot);

                assert_eq!(
                    count + pool.free_list_len(geometry),
                    geometry.capacity
                );
            }

            assert_eq!(pool.alloc_count(), 0);
        });
    }

    #[test]
    fn slots_mask_back_to_their_pool() {
        with_pool(|pool, geometry| {
            let first = pool.pop_free().unwrap();
            let mut last = first;

            while let Some(slot) = pool.pop_free() {
                last = slot;
            }

            assert_eq!(Pool::from_slot(first, geometry), pool);
            assert_eq!(Pool::from_slot(last, geometry), pool);
        });
    }

    #[test]
    fn scan_skips_free_slots_and_stops_early() {
        with_pool(|pool, geometry| {
            let a = pool.pop_free().unwrap();
            let b = pool.pop_free().unwrap();
            let c = pool.pop_free().unwrap();

            unsafe {
                a.as_ptr().write(Value::from_raw(11));
                b.as_ptr().write(Value::from_raw(13));
                c.as_ptr().write(Value::from_raw(15));
            }

            pool.push_free(b);

            let mut seen = vec![];
            let work = pool.scan(geometry, &mut |value| seen.push(value.raw()));

            assert_eq!(seen, vec![11, 15]);
            assert_eq!(work, 3);
        });
    }

    #[test]
    fn scan_can_update_values() {
        with_pool(|pool, geometry| {
            let slot = pool.pop_free().unwrap();

            unsafe { slot.as_ptr().write(Value::from_raw(7)) };

            pool.scan(geometry, &mut |value| *value = Value::from_raw(9));

            assert_eq!(unsafe { slot.as_ptr().read() }, Value::from_raw(9));
            assert_eq!(pool.occupied(geometry).collect::<Vec<_>>(), vec![Value::from_raw(9)]);
        });
    }

    #[test]
    fn odd_words_are_never_free_links() {
        with_pool(|pool, geometry| {
            assert!(pool.is_free_link(pool.addr(), geometry));
            assert!(pool.is_free_link(pool.addr() + 64, geometry));
            assert!(!pool.is_free_link(pool.addr() + 1, geometry));
            assert!(!pool.is_free_link(pool.addr() + geometry.size(), geometry));
        });
    }
}
