//! Presents the `parking_lot` primitives through the `std::sync` poisoning
//! API, so call sites look the same whichever backend is compiled in. Only
//! the methods this crate needs are wrapped.

use std::sync::LockResult;

use parking_lot as pl;

/// Adapter for `parking_lot::Mutex` to the `std::sync::Mutex` interface.
#[derive(Debug)]
pub(crate) struct Mutex<T: ?Sized>(pl::Mutex<T>);

impl<T> Mutex<T> {
    #[inline]
    pub(crate) fn new(t: T) -> Mutex<T> {
        Mutex(pl::Mutex::new(t))
    }

    #[inline]
    pub(crate) fn lock(&self) -> LockResult<pl::MutexGuard<'_, T>> {
        Ok(self.0.lock())
    }
}

/// Adapter for `parking_lot::Condvar` to the `std::sync::Condvar` interface.
#[derive(Debug)]
pub(crate) struct Condvar(pl::Condvar);

impl Condvar {
    #[inline]
    pub(crate) fn new() -> Condvar {
        Condvar(pl::Condvar::new())
    }

    #[inline]
    pub(crate) fn notify_one(&self) {
        self.0.notify_one();
    }

    #[inline]
    pub(crate) fn wait<'a, T>(
        &self,
        mut guard: pl::MutexGuard<'a, T>,
    ) -> LockResult<pl::MutexGuard<'a, T>> {
        self.0.wait(&mut guard);
        Ok(guard)
    }
}
