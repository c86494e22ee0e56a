//! The critical section guarding all pool and ring state.
//!
//! With the `multi_threaded` feature this is a real mutex, otherwise it is a
//! `RefCell` and entering it costs a flag check.

#[cfg(feature = "multi_threaded")]
pub type Guard<'a, T> = parking_lot::MutexGuard<'a, T>;

#[cfg(not(feature = "multi_threaded"))]
pub type Guard<'a, T> = core::cell::RefMut<'a, T>;

/// Bounds shared with host callbacks: `Send + Sync` in multi-threaded
/// builds, nothing otherwise.
#[cfg(feature = "multi_threaded")]
pub trait ThreadSafety: Send + Sync {}

#[cfg(feature = "multi_threaded")]
impl<T: Send + Sync + ?Sized> ThreadSafety for T {}

#[cfg(not(feature = "multi_threaded"))]
pub trait ThreadSafety {}

#[cfg(not(feature = "multi_threaded"))]
impl<T: ?Sized> ThreadSafety for T {}

pub struct CriticalSection<T> {
    #[cfg(feature = "multi_threaded")]
    inner: parking_lot::Mutex<T>,
    #[cfg(not(feature = "multi_threaded"))]
    inner: core::cell::RefCell<T>,
}

impl<T> CriticalSection<T> {
    #[cfg(feature = "multi_threaded")]
    pub fn new(value: T) -> Self {
        Self {
            inner: parking_lot::Mutex::new(value),
        }
    }

    #[cfg(not(feature = "multi_threaded"))]
    pub fn new(value: T) -> Self {
        Self {
            inner: core::cell::RefCell::new(value),
        }
    }

    /// Enters the critical section. Re-entering from the same thread
    /// deadlocks in multi-threaded builds and panics otherwise.
    #[cfg(feature = "multi_threaded")]
    pub fn enter(&self) -> Guard<'_, T> {
        self.inner.lock()
    }

    #[cfg(not(feature = "multi_threaded"))]
    pub fn enter(&self) -> Guard<'_, T> {
        self.inner.borrow_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::CriticalSection;

    #[test]
    fn enter_and_mutate() {
        let section = CriticalSection::new(0usize);

        *section.enter() += 1;
        *section.enter() += 1;

        assert_eq!(*section.enter(), 2);
    }

    #[cfg(feature = "multi_threaded")]
    #[test]
    fn threads_are_serialized() {
        let section = CriticalSection::new(0usize);

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..1_000 {
                        *section.enter() += 1;
                    }
                });
            }
        });

        assert_eq!(*section.enter(), 4_000);
    }
}
