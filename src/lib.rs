//! Pool-allocated roots for a moving generational garbage collector.
//!
//! A root is a single machine word, owned by code outside the collected
//! heap, that the collector must treat as live and update whenever the
//! object it points to moves. Roots are allocated from pools: aligned blocks
//! of slots that are sorted into rings by generation and occupancy, so that
//! a minor collection only has to visit the pools holding young values.
//!
//! The host collector describes its heap through the [`Heap`] trait and
//! drives root scanning through a [`Hooks`] table. A [`RootArena`] installs
//! itself in that table on [`RootArena::setup`].
//!
//! ```rust
//! use rootpool::{Config, Heap, Hooks, RootArena, Value};
//! use std::sync::Arc;
//!
//! // Odd words are immediates, even words are heap pointers. Everything
//! // below 0x10000 is in the nursery.
//! struct Toy;
//!
//! impl Heap for Toy {
//!     fn is_block(&self, value: Value) -> bool {
//!         value.raw() & 1 == 0
//!     }
//!
//!     fn is_young(&self, value: Value) -> bool {
//!         value.raw() < 0x10000
//!     }
//! }
//!
//! let hooks = Arc::new(Hooks::new());
//! let arena = RootArena::new(Toy, hooks.clone(), Config::default()).unwrap();
//!
//! arena.setup();
//!
//! let root = arena.create(Value::from_raw(0x100)).unwrap();
//!
//! // The collector moves the object out of the nursery.
//! hooks.minor_collection(&mut |value| {
//!     if value.raw() < 0x10000 {
//!         *value = Value::from_raw(value.raw() + 0x10000);
//!     }
//! });
//!
//! assert_eq!(root.get(), Value::from_raw(0x10100));
//! assert_eq!(arena.metrics().total_scanning_work_minor, 1);
//! ```
//!
//! With the `multi_threaded` feature, all pool state sits behind a mutex
//! so arenas and hooks may be shared across threads and roots sent between
//! them.

mod allocator;
mod arena;
mod config;
mod error;
mod hooks;
mod metrics;
mod root;
mod sync;
mod value;

pub use allocator::{Class, Occupancy, RingId};
pub use arena::{PoolSnapshot, RootArena};
pub use config::Config;
pub use error::{ConfigError, RootError};
pub use hooks::{HookId, Hooks, ScanHook};
pub use metrics::Metrics;
pub use root::Root;
pub use value::{Heap, Value};
