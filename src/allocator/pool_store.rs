use super::errors::AllocError;
use super::pool::{Geometry, Pool};
use super::ring::{Ring, RingId};
use log::debug;

/// Lifetime counters of the pools owned by a store.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PoolCounters {
    pub total_alloced: u64,
    pub total_freed: u64,
    pub live: u64,
    pub peak: u64,
}

/// Owns every pool of an allocator, each one linked into exactly one of the
/// six rings.
pub struct PoolStore {
    geometry: Geometry,
    rings: [Ring; 6],
    pool_limit: Option<usize>,
    counters: PoolCounters,
}

unsafe impl Send for PoolStore {}

impl PoolStore {
    pub fn new(geometry: Geometry, pool_limit: Option<usize>) -> Self {
        Self {
            geometry,
            rings: Default::default(),
            pool_limit,
            counters: PoolCounters::default(),
        }
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn ring(&self, id: RingId) -> &Ring {
        &self.rings[id.index()]
    }

    pub fn ring_mut(&mut self, id: RingId) -> &mut Ring {
        &mut self.rings[id.index()]
    }

    pub fn counters(&self) -> PoolCounters {
        self.counters
    }

    /// Gets a fresh pool from the system allocator. The pool is untracked
    /// and not linked into any ring.
    pub fn new_pool(&mut self) -> Result<Pool, AllocError> {
        if let Some(limit) = self.pool_limit {
            if self.counters.live as usize >= limit {
                return Err(AllocError::PoolLimit);
            }
        }

        let pool = Pool::new(&self.geometry)?;

        self.counters.total_alloced += 1;
        self.counters.live += 1;
        self.counters.peak = self.counters.peak.max(self.counters.live);

        debug!(
            "allocated pool {:#x} ({} live)",
            pool.addr(),
            self.counters.live
        );

        Ok(pool)
    }

    /// Unlinks `pool` from whichever ring holds it, fixing up the head of
    /// that ring if `pool` was the head.
    pub fn remove(&mut self, pool: Pool) {
        let mut local = Ring::from_head(pool);

        local.pop_front();

        let successor = local.head();

        for ring in self.rings.iter_mut() {
            if ring.head() == Some(pool) {
                ring.set_head(successor);
            }
        }
    }

    /// The ring holding `pool`, if any.
    pub fn locate(&self, pool: Pool) -> Option<RingId> {
        RingId::ALL
            .into_iter()
            .find(|id| self.ring(*id).iter().any(|p| p == pool))
    }

    fn release_ring(&mut self, id: RingId) -> usize {
        let mut released = 0;

        while let Some(pool) = self.ring_mut(id).pop_front() {
            unsafe { pool.release(&self.geometry) };
            released += 1;
        }

        self.counters.total_freed += released as u64;
        self.counters.live -= released as u64;

        released
    }

    /// Returns every pool of the free ring to the system allocator.
    pub fn release_free(&mut self) -> usize {
        let released = self.release_ring(RingId::Free);

        if released > 0 {
            debug!(
                "released {} empty pools ({} live)",
                released, self.counters.live
            );
        }

        released
    }

    pub fn release_all(&mut self) {
        for id in RingId::ALL {
            self.release_ring(id);
        }
    }
}

impl Drop for PoolStore {
    fn drop(&mut self) {
        self.release_all();
    }
}
