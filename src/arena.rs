use crate::allocator::{Allocator, Class, Occupancy, RingId};
use crate::config::Config;
use crate::error::{ConfigError, RootError};
use crate::hooks::{HookId, Hooks, ScanHook};
use crate::metrics::{Metrics, Stats};
use crate::root::Root;
use crate::sync::CriticalSection;
use crate::value::{Heap, Value};

use log::{debug, error, trace, warn};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// An allocator of roots for the collector behind `H`.
///
/// Roots can only be created between [`RootArena::setup`] and
/// [`RootArena::teardown`]. While set up, the arena is installed in the
/// collector's [`Hooks`] and keeps every root it handed out up to date
/// across collections.
///
/// # Examples
///
/// ```
/// use rootpool::{Config, Heap, Hooks, RootArena, Value};
/// use std::sync::Arc;
///
/// struct Immediates;
///
/// impl Heap for Immediates {
///     fn is_block(&self, value: Value) -> bool {
///         value.raw() & 1 == 0
///     }
///
///     fn is_young(&self, _: Value) -> bool {
///         false
///     }
/// }
///
/// let hooks = Arc::new(Hooks::new());
/// let arena = RootArena::new(Immediates, hooks.clone(), Config::default()).unwrap();
///
/// assert!(arena.setup());
///
/// let root = arena.create(Value::from_raw(85)).unwrap();
///
/// hooks.major_collection(&mut |_| {});
///
/// assert_eq!(root.get(), Value::from_raw(85));
/// ```
pub struct RootArena<H: Heap> {
    shared: Arc<Shared<H>>,
    hooks: Arc<Hooks>,
}

/// The part of an arena that is shared with the collector's hook table.
pub(crate) struct Shared<H: Heap> {
    heap: H,
    config: Config,
    in_minor: AtomicBool,
    state: CriticalSection<State>,
}

struct State {
    allocator: Allocator,
    stats: Stats,
    setup: bool,
    hook: Option<HookId>,
}

/// Where a root currently lives, as reported by [`RootArena::locate`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PoolSnapshot {
    pub ring: RingId,
    pub class: Class,
    pub alloc_count: usize,
    pub capacity: usize,
    /// The band the pool would be promoted to at the end of a minor
    /// collection.
    pub occupancy: Occupancy,
    pub addr: usize,
}

impl<H: Heap> RootArena<H> {
    pub fn new(heap: H, hooks: Arc<Hooks>, config: Config) -> Result<Self, ConfigError> {
        config.validate()?;

        let shared = Shared {
            heap,
            config,
            in_minor: AtomicBool::new(false),
            state: CriticalSection::new(State {
                allocator: Allocator::new(&config),
                stats: Stats::default(),
                setup: false,
                hook: None,
            }),
        };

        Ok(Self {
            shared: Arc::new(shared),
            hooks,
        })
    }

    /// Resets the arena and installs it in the hook table. Returns false,
    /// and changes nothing, if the arena is already set up.
    pub fn setup(&self) -> bool {
        let mut state = self.shared.state.enter();

        if state.setup {
            return false;
        }

        state.allocator = Allocator::new(&self.shared.config);
        state.stats = Stats::default();
        state.setup = true;
        drop(state);

        let id = self.hooks.install(self.shared.clone());

        self.shared.state.enter().hook = Some(id);
        self.shared.in_minor.store(false, Ordering::Release);

        debug!(
            "root arena set up ({} byte pools, {} roots per pool)",
            self.shared.config.pool_size(),
            self.shared.config.pool_capacity()
        );

        true
    }

    /// Uninstalls the arena from the hook table and returns every pool to
    /// the system allocator. Roots borrow the arena, so none can be alive.
    pub fn teardown(&mut self) {
        let mut state = self.shared.state.enter();

        if !state.setup {
            return;
        }

        let hook = state.hook.take();

        state.setup = false;
        state.allocator.release_all();

        let counters = state.allocator.counters();

        drop(state);

        if let Some(id) = hook {
            self.hooks.uninstall(id);
        }

        debug!(
            "root arena torn down ({} pools allocated, peak {})",
            counters.total_alloced, counters.peak
        );
    }

    pub fn is_setup(&self) -> bool {
        self.shared.state.enter().setup
    }

    /// Registers `value` as a root.
    ///
    /// The value must not be an even word pointing inside one of the
    /// arena's pools.
    pub fn create(&self, value: Value) -> Result<Root<'_, H>, RootError> {
        let slot = self.shared.create(value)?;

        Ok(Root::new(slot, &self.shared))
    }

    pub fn heap(&self) -> &H {
        &self.shared.heap
    }

    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    pub fn hooks(&self) -> &Arc<Hooks> {
        &self.hooks
    }

    pub fn metrics(&self) -> Metrics {
        let state = self.shared.state.enter();

        Metrics::new(
            &state.stats,
            state.allocator.counters(),
            state.allocator.geometry(),
        )
    }

    /// True if at least one root is alive.
    pub fn is_used(&self) -> bool {
        self.shared.state.enter().allocator.is_used()
    }

    /// Walks every ring and pool checking the allocator's structural
    /// invariants.
    ///
    /// # Panics
    /// On the first violated invariant.
    pub fn check_integrity(&self) {
        self.shared.check_integrity(&self.shared.state.enter());
    }

    /// The pool holding `root` and the ring that pool is in. Returns `None`
    /// for a root of another arena.
    pub fn locate(&self, root: &Root<'_, H>) -> Option<PoolSnapshot> {
        let state = self.shared.state.enter();
        let allocator = &state.allocator;
        let pool = allocator.pool_of(root.slot());
        let ring = allocator.store().locate(pool)?;

        Some(PoolSnapshot {
            ring,
            class: pool.class(),
            alloc_count: pool.alloc_count(),
            capacity: allocator.geometry().capacity,
            occupancy: allocator.thresholds().promotion(pool.alloc_count()),
            addr: pool.addr(),
        })
    }

    /// Number of pools in each ring.
    pub fn ring_sizes(&self) -> Vec<(RingId, usize)> {
        let state = self.shared.state.enter();

        RingId::ALL
            .into_iter()
            .map(|id| (id, state.allocator.store().ring(id).len()))
            .collect()
    }
}

impl<H: Heap> Drop for RootArena<H> {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl<H: Heap> Shared<H> {
    fn create(&self, value: Value) -> Result<NonNull<Value>, RootError> {
        let young = self.heap.is_young_block(value);
        let mut state = self.state.enter();

        if !state.setup {
            error!("root created before the arena was set up");
            return Err(RootError::NotSetup);
        }

        let slot = state.allocator.alloc_slot(young)?;

        unsafe { slot.as_ptr().write(value) };
        state.stats.total_create += 1;

        Ok(slot)
    }

    pub(crate) fn delete(&self, slot: NonNull<Value>) {
        let mut state = self.state.enter();

        state.allocator.free_slot(slot);
        state.stats.total_delete += 1;
    }

    /// Stores `value` in the root at `*slot`, moving the root to a young
    /// pool if `value` is young and its pool is not.
    pub(crate) fn modify(&self, slot: &mut NonNull<Value>, value: Value) {
        let young = self.heap.is_young_block(value);
        let mut state = self.state.enter();
        let pool = state.allocator.pool_of(*slot);

        state.stats.total_modify += 1;

        if !young || pool.class() == Class::Young {
            unsafe { slot.as_ptr().write(value) };
            return;
        }

        match state.allocator.alloc_slot(true) {
            Ok(fresh) => {
                unsafe { fresh.as_ptr().write(value) };
                state.allocator.free_slot(*slot);
                *slot = fresh;
            }
            Err(err) => {
                warn!(
                    "no young slot for modified root ({err}), pool {:#x} becomes young",
                    pool.addr()
                );
                state.allocator.force_young(pool);
                unsafe { slot.as_ptr().write(value) };
            }
        }
    }

    fn check_integrity(&self, state: &State) {
        state
            .allocator
            .check_integrity(&|value| self.heap.is_young_block(value));
    }
}

impl<H: Heap> ScanHook for Shared<H> {
    fn scan_roots(&self, action: &mut dyn FnMut(&mut Value)) {
        let minor = self.in_minor.load(Ordering::Acquire);
        let mut state = self.state.enter();

        if !state.setup {
            return;
        }

        state.stats.record_collection(minor);

        if !state.allocator.is_used() {
            if !minor {
                state.allocator.release_free();
            }

            return;
        }

        if self.config.debug_checks {
            self.check_integrity(&state);
        }

        let start = Instant::now();
        let work = state.allocator.scan(action, minor);
        let elapsed = u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX);

        state.stats.record_scan(minor, work as u64, elapsed);

        if self.config.debug_checks {
            self.check_integrity(&state);
        }

        trace!(
            "{} root scan: {} slots in {}ns",
            if minor { "minor" } else { "major" },
            work,
            elapsed
        );
    }

    fn minor_begin(&self) {
        self.in_minor.store(true, Ordering::Release);
    }

    fn minor_end(&self) {
        self.in_minor.store(false, Ordering::Release);
    }
}
