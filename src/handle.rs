//! Per-operation synchronization record and its completion side.
//!
//! A [`SyncHandle`] tracks how many completions an operation still needs and
//! carries the lock/condvar pair its owning thread parks on. [`Completer`]s
//! are handed to whoever discovers completions; they share the record through
//! an `Arc`, so a completer that is mid-signal keeps the primitives alive even
//! if the owner drops its handle the moment the wait returns.

use crate::error::ErrorCode;
use crate::loom::sync::atomic::{AtomicBool, AtomicI32};
use crate::loom::sync::{Arc, Condvar, Mutex};

use std::fmt;
use std::sync::atomic::Ordering::{AcqRel, Acquire, Relaxed};

/// Waitable record for one asynchronous operation.
///
/// A handle is created with the number of completions the operation needs,
/// handed to [`ProgressRing::block_until_complete`] by its owner, and driven
/// to completion by [`Completer`]s from other threads (or from the progress
/// callback itself). Handles are single-use: once the count reaches zero the
/// wait entry point returns immediately with the settled status.
///
/// [`ProgressRing::block_until_complete`]: crate::ProgressRing::block_until_complete
///
/// # Examples
///
/// ```
/// use progress_sync::{ProgressRing, SyncHandle};
///
/// let ring = ProgressRing::new(|| std::thread::yield_now());
/// let handle = SyncHandle::new(1);
/// let completer = handle.completer();
///
/// let th = std::thread::spawn(move || completer.complete(1));
/// assert!(ring.block_until_complete(&handle).is_ok());
/// th.join().unwrap();
/// ```
#[derive(Debug)]
pub struct SyncHandle {
    inner: Arc<Inner>,
}

/// Completion side of a [`SyncHandle`].
///
/// Cloneable and sendable; every clone holds a counted reference to the
/// handle's record, which is what makes completion safe against the owner
/// tearing the handle down concurrently.
#[derive(Clone, Debug)]
pub struct Completer {
    inner: Arc<Inner>,
}

pub(crate) struct Inner {
    /// Remaining completions. The wait terminates once this is <= 0.
    pub(crate) count: AtomicI32,

    /// First error recorded against the operation; 0 while successful.
    ///
    /// Published to the waiter by the release swap of `count` to 0 on the
    /// error path, and read after an acquire load of `count`.
    status: AtomicI32,

    /// Guards the park/wake race; never held across a progress call.
    pub(crate) lock: Mutex<()>,

    /// Parked owner, woken by the terminal update or by promotion.
    pub(crate) cond: Condvar,

    /// True while this handle is the ring head. Written under the ring lock;
    /// read by the waiter in its decision loop without it.
    pub(crate) elected: AtomicBool,

    /// True while linked into a ring. Guards against double-linking.
    pub(crate) linked: AtomicBool,
}

impl SyncHandle {
    /// Creates a handle expecting `expected` completions.
    ///
    /// A handle created with `0` is already complete and a wait on it returns
    /// immediately.
    ///
    /// # Panics
    ///
    /// Panics if `expected` exceeds `i32::MAX`.
    pub fn new(expected: u32) -> SyncHandle {
        assert!(
            expected <= i32::MAX as u32,
            "expected completion count exceeds i32::MAX"
        );

        SyncHandle {
            inner: Arc::new(Inner {
                count: AtomicI32::new(expected as i32),
                status: AtomicI32::new(0),
                lock: Mutex::new(()),
                cond: Condvar::new(),
                elected: AtomicBool::new(false),
                linked: AtomicBool::new(false),
            }),
        }
    }

    /// Returns a new completion side for this handle.
    pub fn completer(&self) -> Completer {
        Completer {
            inner: self.inner.clone(),
        }
    }

    /// Returns `true` once the operation needs no further completions.
    ///
    /// This says nothing about success; a forced error also completes the
    /// handle. The settled status is reported by the wait entry point.
    pub fn is_complete(&self) -> bool {
        self.inner.count.load(Acquire) <= 0
    }

    /// Returns the number of completions still outstanding.
    pub fn remaining(&self) -> u32 {
        self.inner.count.load(Acquire).max(0) as u32
    }

    pub(crate) fn inner(&self) -> &Arc<Inner> {
        &self.inner
    }
}

impl Completer {
    /// Applies a completion update to the handle.
    ///
    /// On `Ok(())`, subtracts `completions` from the remaining count; the
    /// parked owner is woken once the count lands at or below zero. On
    /// `Err(code)`, records the code (the first recorded error wins) and
    /// forces the count to zero so the wait terminates immediately, making
    /// any still-outstanding completions no-ops.
    ///
    /// The sum of all `completions` applied to one handle must not exceed the
    /// count it was created with.
    ///
    /// # Examples
    ///
    /// ```
    /// use progress_sync::{ProgressRing, SyncHandle};
    ///
    /// let ring = ProgressRing::new(|| {});
    /// let handle = SyncHandle::new(2);
    /// let completer = handle.completer();
    ///
    /// completer.update(1, Ok(()));
    /// assert_eq!(handle.remaining(), 1);
    ///
    /// completer.update(1, Ok(()));
    /// assert!(ring.block_until_complete(&handle).is_ok());
    /// ```
    pub fn update(&self, completions: u32, status: Result<(), ErrorCode>) {
        self.inner.update(completions, status);
    }

    /// Records `completions` successful completions.
    ///
    /// Shorthand for `update(completions, Ok(()))`.
    pub fn complete(&self, completions: u32) {
        self.inner.update(completions, Ok(()));
    }

    /// Fails the operation with `code`, waking the owner immediately.
    ///
    /// Shorthand for `update(0, Err(code))`.
    ///
    /// # Examples
    ///
    /// ```
    /// use progress_sync::{ErrorCode, ProgressRing, SyncHandle};
    ///
    /// let ring = ProgressRing::new(|| {});
    /// let handle = SyncHandle::new(2);
    /// let completer = handle.completer();
    ///
    /// let code = ErrorCode::new(-5).unwrap();
    /// completer.fail(code);
    /// assert_eq!(ring.block_until_complete(&handle), Err(code));
    /// ```
    pub fn fail(&self, code: ErrorCode) {
        self.inner.update(0, Err(code));
    }
}

impl Inner {
    pub(crate) fn update(&self, completions: u32, status: Result<(), ErrorCode>) {
        debug_assert!(completions <= i32::MAX as u32);

        match status {
            Ok(()) => {
                let prev = self.count.fetch_sub(completions as i32, AcqRel);
                if prev - (completions as i32) > 0 {
                    // Not terminal yet; the waiter keeps waiting.
                    return;
                }
            }
            Err(code) => {
                // First error wins; the release swap below publishes it
                // together with the forced-zero count.
                let recorded = self
                    .status
                    .compare_exchange(0, code.get(), AcqRel, Relaxed)
                    .is_ok();
                self.count.swap(0, AcqRel);

                if recorded {
                    trace!(status = code.get(), "completion error recorded");
                }
            }
        }

        // The lock bracket orders this wake against the owner's
        // check-then-park: the owner either sees the terminal count before
        // parking or is already parked and receives the notify.
        let _lock = self.lock.lock().unwrap();
        self.cond.notify_one();
    }

    /// Settled outcome; meaningful once `count <= 0` has been observed.
    pub(crate) fn result(&self) -> Result<(), ErrorCode> {
        match ErrorCode::new(self.status.load(Acquire)) {
            None => Ok(()),
            Some(code) => Err(code),
        }
    }
}

impl fmt::Debug for Inner {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("Inner")
            .field("count", &self.count)
            .field("status", &self.status)
            .field("elected", &self.elected)
            .field("linked", &self.linked)
            .finish()
    }
}
