use super::errors::AllocError;
use super::header::Class;
use super::occupancy::{Occupancy, Thresholds};
use super::pool::{Geometry, Pool};
use super::pool_store::{PoolCounters, PoolStore};
use super::ring::RingId;
use crate::config::Config;
use crate::value::Value;
use std::ptr::NonNull;

/// The slot allocator: hands out single slots from the head pool of the
/// young or old available ring, and moves pools between rings as their
/// occupancy changes.
pub struct Allocator {
    store: PoolStore,
    thresholds: Thresholds,
}

impl Allocator {
    pub fn new(config: &Config) -> Self {
        Self {
            store: PoolStore::new(Geometry::new(config.pool_log_size), config.pool_limit),
            thresholds: Thresholds::new(config),
        }
    }

    pub fn geometry(&self) -> &Geometry {
        self.store.geometry()
    }

    pub fn store(&self) -> &PoolStore {
        &self.store
    }

    pub fn counters(&self) -> PoolCounters {
        self.store.counters()
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn pool_of(&self, slot: NonNull<Value>) -> Pool {
        Pool::from_slot(slot, self.geometry())
    }

    fn available_ring(for_young: bool) -> RingId {
        if for_young {
            RingId::YoungAvailable
        } else {
            RingId::OldAvailable
        }
    }

    pub fn alloc_slot(&mut self, for_young: bool) -> Result<NonNull<Value>, AllocError> {
        let target = Self::available_ring(for_young);

        if let Some(pool) = self.store.ring(target).head() {
            if let Some(slot) = pool.pop_free() {
                return Ok(slot);
            }
        }

        self.alloc_slot_slow(for_young)
    }

    fn alloc_slot_slow(&mut self, for_young: bool) -> Result<NonNull<Value>, AllocError> {
        let pool = self.find_available_pool(for_young)?;

        debug_assert_eq!(for_young, pool.class() == Class::Young);

        pool.pop_free().ok_or(AllocError::OOM)
    }

    /// Puts a pool with at least one free slot at the head of the available
    /// ring for the requested generation and returns it.
    fn find_available_pool(&mut self, for_young: bool) -> Result<Pool, AllocError> {
        let target = Self::available_ring(for_young);

        // Only the head is ever allocated from, but a pool rescued by the
        // modify fail-safe may also be full, hence the loop.
        while let Some(head) = self.store.ring(target).head() {
            if !head.is_full() {
                return Ok(head);
            }

            let full = self.store.ring_mut(target).pop_front();

            if let Some(full) = full {
                debug_assert_eq!(
                    self.thresholds.promotion(full.alloc_count()),
                    Occupancy::QuasiFull
                );
                self.reclassify(full, Occupancy::QuasiFull);
            }
        }

        // Young allocations prefer a mostly empty old pool, which keeps the
        // proportion of young values high in young pools. Old allocations
        // would rather leave those for young use but take them all the same.
        let pool = if let Some(pool) = self.store.ring_mut(RingId::OldLow).pop_front() {
            pool
        } else if let Some(pool) = self.store.ring_mut(RingId::Free).pop_front() {
            pool
        } else {
            self.store.new_pool()?
        };

        pool.set_class(if for_young { Class::Young } else { Class::Old });
        self.store.ring_mut(target).push_back(pool);

        Ok(pool)
    }

    /// Returns `slot` to its pool.
    ///
    /// The slot must have been handed out by this allocator and not freed
    /// since.
    pub fn free_slot(&mut self, slot: NonNull<Value>) {
        let pool = self.pool_of(slot);
        let alloc_count = pool.push_free(slot);

        if self.thresholds.is_checkpoint(alloc_count) {
            self.try_demote(pool);
        }
    }

    fn try_demote(&mut self, pool: Pool) {
        let Some(occupancy) = self.thresholds.demotion(pool.alloc_count(), pool.class()) else {
            return;
        };

        // The pools currently allocated from stay put unless empty.
        if occupancy != Occupancy::Empty && self.is_allocation_target(pool) {
            return;
        }

        self.store.remove(pool);

        if occupancy == Occupancy::Empty {
            pool.set_class(Class::Untracked);
        }

        self.reclassify(pool, occupancy);
    }

    fn is_allocation_target(&self, pool: Pool) -> bool {
        self.store.ring(RingId::YoungAvailable).head() == Some(pool)
            || self.store.ring(RingId::OldAvailable).head() == Some(pool)
    }

    /// Pushes the unlinked `pool` to the back of the ring matching its class
    /// and `occupancy`. Pools that have waited longer stay in front.
    fn reclassify(&mut self, pool: Pool, occupancy: Occupancy) {
        debug_assert!(pool.is_singleton());
        debug_assert_eq!(
            pool.class() == Class::Untracked,
            occupancy == Occupancy::Empty
        );

        let young = pool.class() == Class::Young;
        let target = match occupancy {
            Occupancy::Empty => {
                debug_assert_eq!(pool.alloc_count(), 0);
                RingId::Free
            }
            Occupancy::Low if young => RingId::YoungAvailable,
            Occupancy::Low => RingId::OldLow,
            Occupancy::High if young => RingId::YoungAvailable,
            Occupancy::High => RingId::OldAvailable,
            Occupancy::QuasiFull if young => RingId::YoungFull,
            Occupancy::QuasiFull => RingId::OldFull,
        };

        self.store.ring_mut(target).push_back(pool);
    }

    /// Moves `pool` into the young available ring so that it may keep a
    /// young value. Used when a relocation could not get a young slot.
    pub fn force_young(&mut self, pool: Pool) {
        self.store.remove(pool);
        pool.set_class(Class::Young);
        self.store.ring_mut(RingId::YoungAvailable).push_back(pool);
    }

    /// Once a minor collection has promoted every young value, young pools
    /// hold only old values and are reclassified as old (or untracked when
    /// empty).
    pub fn promote_young_pools(&mut self) {
        let mut young_full = std::mem::take(self.store.ring_mut(RingId::YoungFull));

        for pool in young_full.iter() {
            pool.set_class(Class::Old);
        }

        self.store.ring_mut(RingId::OldFull).append(&mut young_full);

        let head_young = self.store.ring(RingId::YoungAvailable).head();

        while let Some(pool) = self.store.ring_mut(RingId::YoungAvailable).pop_front() {
            let occupancy = self.thresholds.promotion(pool.alloc_count());

            pool.set_class(if occupancy == Occupancy::Empty {
                Class::Untracked
            } else {
                Class::Old
            });
            self.reclassify(pool, occupancy);
        }

        // The young pool allocated from last is the best candidate for the
        // next young allocation.
        if let Some(head) = head_young {
            if self.thresholds.promotion(head.alloc_count()) == Occupancy::Low {
                self.store.ring_mut(RingId::OldLow).rotate_to(head);
            }
        }
    }

    /// True if some tracked ring holds a root.
    pub fn is_used(&self) -> bool {
        RingId::ALL
            .into_iter()
            .filter(|id| id.class() != Class::Untracked)
            .filter_map(|id| self.store.ring(id).head())
            .any(|pool| pool.alloc_count() != 0 || !pool.is_singleton())
    }

    /// Applies `action` to every root that the collection must see and
    /// returns the number of slots visited. A minor scan only looks at young
    /// pools and promotes them afterwards; a major scan looks at every
    /// tracked pool and releases the free ring.
    pub fn scan(&mut self, action: &mut dyn FnMut(&mut Value), minor: bool) -> usize {
        let geometry = *self.geometry();
        let mut work = 0;

        for id in RingId::ALL {
            let class = id.class();

            if class == Class::Untracked || (minor && class == Class::Old) {
                continue;
            }

            for pool in self.store.ring(id).iter() {
                work += pool.scan(&geometry, action);
            }
        }

        if minor {
            self.promote_young_pools();
        } else {
            self.store.release_free();
        }

        work
    }

    /// Returns the pools of the free ring to the system allocator.
    pub fn release_free(&mut self) -> usize {
        self.store.release_free()
    }

    /// Releases every pool, leaving the allocator empty.
    pub fn release_all(&mut self) {
        self.store.release_all();
    }

    /// Checks the structure of every ring and pool. `is_young` tells which
    /// values may only live in young pools. Panics on the first violation.
    pub fn check_integrity(&self, is_young: &dyn Fn(Value) -> bool) {
        let geometry = self.geometry();

        for id in RingId::ALL {
            let ring = self.store.ring(id);
            let len = ring.len();

            for pool in ring.iter() {
                assert_eq!(pool.class(), id.class(), "pool {:#x} in ring {:?}", pool.addr(), id);
                assert_eq!(pool.next().prev(), pool, "broken next link in {:?}", id);
                assert_eq!(pool.prev().next(), pool, "broken prev link in {:?}", id);
                assert!(pool.alloc_count() <= geometry.capacity);
                assert_eq!(
                    pool.alloc_count() + pool.free_list_len(geometry),
                    geometry.capacity,
                    "free list of pool {:#x} does not match its allocation count",
                    pool.addr()
                );

                let mut occupied = 0;

                for value in pool.occupied(geometry) {
                    occupied += 1;

                    if pool.class() != Class::Young {
                        assert!(
                            !is_young(value),
                            "young value {:#x} in {:?} pool",
                            value.raw(),
                            pool.class()
                        );
                    }
                }

                assert_eq!(occupied, pool.alloc_count());
            }

            if let Some(head) = ring.head() {
                let mut pool = head;

                for _ in 0..len {
                    pool = pool.next();
                }

                assert_eq!(pool, head, "ring {:?} does not close", id);
            }
        }
    }
}
