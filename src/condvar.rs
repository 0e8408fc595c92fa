//! Hybrid progress-polling condition variable.

use crate::loom::sync::atomic::AtomicI32;
use crate::loom::sync::Arc;
use crate::ring::{ProgressRing, Shared};

use std::fmt;
use std::sync::atomic::Ordering::Relaxed;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// A condition variable that drives the progress callback while it waits.
///
/// Instead of parking the thread, [`wait`] releases the caller's mutex and
/// pumps the ring's progress callback in a loop, reacquiring the lock to
/// check for a pending signal after every cycle. Completion work therefore
/// keeps advancing even while every thread is "blocked" on a condition.
///
/// The signaling discipline is deliberately looser than a POSIX condition
/// variable, and all counter accesses assume the caller's mutex serializes
/// them:
///
/// * [`signal`] is dropped entirely when no thread is waiting.
/// * [`broadcast`] overwrites the pending-signal count with the current
///   waiter count. Unconsumed signals from earlier are absorbed, never
///   accumulated.
/// * [`wait_until`] gives no indication that the deadline passed. Callers
///   must re-check their predicate after every return.
///
/// Lock poisoning is swallowed on reacquisition: a panic in another thread
/// holding the mutex does not abort the wait.
///
/// [`wait`]: HybridCondvar::wait
/// [`signal`]: HybridCondvar::signal
/// [`broadcast`]: HybridCondvar::broadcast
/// [`wait_until`]: HybridCondvar::wait_until
///
/// # Examples
///
/// ```
/// use progress_sync::{HybridCondvar, ProgressRing};
/// use std::sync::{Arc, Mutex};
/// use std::thread;
///
/// let ring = ProgressRing::new(|| thread::yield_now());
/// let cond = Arc::new(HybridCondvar::new(&ring));
/// let ready = Arc::new(Mutex::new(false));
///
/// let th = {
///     let cond = cond.clone();
///     let ready = ready.clone();
///     thread::spawn(move || {
///         let mut ready = ready.lock().unwrap();
///         *ready = true;
///         cond.signal();
///     })
/// };
///
/// let mut guard = ready.lock().unwrap();
/// while !*guard {
///     guard = cond.wait(&ready, guard);
/// }
/// th.join().unwrap();
/// ```
pub struct HybridCondvar {
    /// Ring state shared with every waiter, pumped while waiting.
    shared: Arc<Shared>,

    /// Number of threads currently inside a wait.
    waiting: AtomicI32,

    /// Signals delivered but not yet consumed by a waiter.
    signaled: AtomicI32,
}

impl HybridCondvar {
    /// Creates a condition variable that pumps `ring`'s progress callback
    /// while waiting.
    pub fn new(ring: &ProgressRing) -> HybridCondvar {
        HybridCondvar {
            shared: ring.shared().clone(),
            waiting: AtomicI32::new(0),
            signaled: AtomicI32::new(0),
        }
    }

    /// Releases `guard` and pumps progress until a signal is consumed, then
    /// returns with the lock reacquired.
    ///
    /// `mutex` must be the mutex `guard` was taken from; the signaling
    /// threads must hold it while calling [`signal`] or [`broadcast`].
    ///
    /// A signal pending on entry is consumed immediately, but the lock is
    /// still released for one progress cycle so completion work cannot
    /// starve behind a stream of already-signaled waits.
    ///
    /// Spurious wakeups do not occur, but the usual predicate loop is still
    /// required: [`broadcast`] wakes every waiter even when only one of them
    /// can proceed.
    ///
    /// [`signal`]: HybridCondvar::signal
    /// [`broadcast`]: HybridCondvar::broadcast
    pub fn wait<'a, T>(
        &self,
        mutex: &'a Mutex<T>,
        mut guard: MutexGuard<'a, T>,
    ) -> MutexGuard<'a, T> {
        self.waiting.fetch_add(1, Relaxed);

        if self.signaled.load(Relaxed) > 0 {
            self.signaled.fetch_sub(1, Relaxed);
            self.waiting.fetch_sub(1, Relaxed);
            drop(guard);
            self.shared.progress();
            return lock(mutex);
        }

        loop {
            drop(guard);
            self.shared.progress();
            guard = lock(mutex);
            if self.signaled.load(Relaxed) > 0 {
                break;
            }
        }

        self.signaled.fetch_sub(1, Relaxed);
        self.waiting.fetch_sub(1, Relaxed);
        guard
    }

    /// Like [`wait`], but stops pumping once `deadline` has passed.
    ///
    /// Returns with the lock reacquired whether or not a signal arrived;
    /// there is no timeout error. Callers distinguish the two outcomes by
    /// re-checking the predicate the wait was for.
    ///
    /// [`wait`]: HybridCondvar::wait
    pub fn wait_until<'a, T>(
        &self,
        mutex: &'a Mutex<T>,
        mut guard: MutexGuard<'a, T>,
        deadline: Instant,
    ) -> MutexGuard<'a, T> {
        self.waiting.fetch_add(1, Relaxed);

        if self.signaled.load(Relaxed) == 0 {
            loop {
                drop(guard);
                self.shared.progress();
                guard = lock(mutex);
                if self.signaled.load(Relaxed) > 0 || Instant::now() >= deadline {
                    break;
                }
            }
        }

        // On a deadline hit there is no signal to consume.
        if self.signaled.load(Relaxed) > 0 {
            self.signaled.fetch_sub(1, Relaxed);
        }
        self.waiting.fetch_sub(1, Relaxed);
        guard
    }

    /// Wakes one waiting thread.
    ///
    /// Must be called with the waiters' mutex held. If no thread is waiting
    /// the signal is dropped, not stored; a waiter arriving later blocks
    /// until the next signal.
    pub fn signal(&self) {
        if self.waiting.load(Relaxed) > 0 {
            self.signaled.fetch_add(1, Relaxed);
        }
    }

    /// Wakes every thread currently waiting.
    ///
    /// Must be called with the waiters' mutex held. The pending-signal count
    /// is overwritten with the waiter count, so exactly the threads waiting
    /// now get through; earlier unconsumed signals are absorbed rather than
    /// added on top.
    pub fn broadcast(&self) {
        self.signaled.store(self.waiting.load(Relaxed), Relaxed);
    }
}

impl fmt::Debug for HybridCondvar {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("HybridCondvar")
            .field("waiting", &self.waiting)
            .field("signaled", &self.signaled)
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
