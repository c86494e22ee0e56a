#![allow(dead_code)]

use rootpool::{Config, Heap, Hooks, RootArena, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const NURSERY_CELLS: usize = 1 << 14;
const MAJOR_CELLS: usize = 1 << 16;

/// A two-generation heap of one-word objects. An object is the address of
/// its cell, so heap values are even; odd values are immediates.
///
/// A minor collection copies every reachable young object to the major
/// heap and empties the nursery, like a real copying collector would.
pub struct TestHeap {
    nursery: Box<[AtomicUsize]>,
    forwards: Box<[AtomicUsize]>,
    major: Box<[AtomicUsize]>,
    nursery_top: AtomicUsize,
    major_top: AtomicUsize,
}

fn cells(len: usize) -> Box<[AtomicUsize]> {
    (0..len).map(|_| AtomicUsize::new(0)).collect()
}

fn base(cells: &[AtomicUsize]) -> usize {
    cells.as_ptr() as usize
}

fn index_in(cells: &[AtomicUsize], value: Value) -> Option<usize> {
    let offset = value.raw().checked_sub(base(cells))?;
    let index = offset / std::mem::size_of::<AtomicUsize>();

    (index < cells.len()).then_some(index)
}

impl TestHeap {
    pub fn new() -> Self {
        Self {
            nursery: cells(NURSERY_CELLS),
            forwards: cells(NURSERY_CELLS),
            major: cells(MAJOR_CELLS),
            nursery_top: AtomicUsize::new(0),
            major_top: AtomicUsize::new(0),
        }
    }

    fn bump(cells: &[AtomicUsize], top: &AtomicUsize, payload: usize) -> Value {
        let index = top.fetch_add(1, Ordering::Relaxed);

        assert!(index < cells.len(), "test heap exhausted");
        cells[index].store(payload, Ordering::Relaxed);

        Value::from_raw(base(cells) + index * std::mem::size_of::<AtomicUsize>())
    }

    pub fn alloc_young(&self, payload: usize) -> Value {
        Self::bump(&self.nursery, &self.nursery_top, payload)
    }

    pub fn alloc_old(&self, payload: usize) -> Value {
        Self::bump(&self.major, &self.major_top, payload)
    }

    /// The payload of a heap object, or the integer of an immediate.
    pub fn payload(&self, value: Value) -> usize {
        if !self.is_block(value) {
            return value.raw() >> 1;
        }

        if let Some(index) = index_in(&self.nursery, value) {
            return self.nursery[index].load(Ordering::Relaxed);
        }

        match index_in(&self.major, value) {
            Some(index) => self.major[index].load(Ordering::Relaxed),
            None => panic!("{:#x} is not an object of this heap", value.raw()),
        }
    }

    /// Moves a young object to the major heap, once.
    pub fn promote(&self, value: Value) -> Value {
        if !self.is_block(value) {
            return value;
        }

        let Some(index) = index_in(&self.nursery, value) else {
            return value;
        };

        let forward = self.forwards[index].load(Ordering::Relaxed);

        if forward != 0 {
            return Value::from_raw(forward);
        }

        let moved = self.alloc_old(self.nursery[index].load(Ordering::Relaxed));

        self.forwards[index].store(moved.raw(), Ordering::Relaxed);

        moved
    }

    fn reset_nursery(&self) {
        let top = self.nursery_top.swap(0, Ordering::Relaxed);

        for index in 0..top.min(NURSERY_CELLS) {
            self.nursery[index].store(0, Ordering::Relaxed);
            self.forwards[index].store(0, Ordering::Relaxed);
        }
    }
}

impl Heap for TestHeap {
    fn is_block(&self, value: Value) -> bool {
        value.raw() & 1 == 0
    }

    fn is_young(&self, value: Value) -> bool {
        index_in(&self.nursery, value).is_some()
    }
}

pub fn immediate(n: usize) -> Value {
    Value::from_raw(2 * n + 1)
}

/// 1 KiB pools: 123 roots each, 8 checkpoints of 16.
pub fn small_config() -> Config {
    Config::default().with_pool_log_size(10)
}

pub fn arena(config: Config) -> RootArena<TestHeap> {
    let arena = RootArena::new(TestHeap::new(), Arc::new(Hooks::new()), config).unwrap();

    assert!(arena.setup());

    arena
}

/// Promotes every young object reachable from the hooks, then empties the
/// nursery.
pub fn minor_collection(arena: &RootArena<TestHeap>) {
    let heap = arena.heap();

    arena
        .hooks()
        .minor_collection(&mut |value| *value = heap.promote(*value));
    heap.reset_nursery();
}

pub fn major_collection(arena: &RootArena<TestHeap>) {
    arena.hooks().major_collection(&mut |_| {});
}
