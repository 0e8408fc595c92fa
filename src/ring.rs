//! Pending-handle ring and the progress-manager election protocol.
//!
//! Every thread blocked on a [`SyncHandle`] links the handle into the ring.
//! The handle at the head is the elected progress manager: its thread drives
//! the injected progress callback while the others (beyond the configured
//! progressor bound) park on their own condition variables. When the head's
//! wait finishes it promotes the next handle in ring order, so progress duty
//! rotates FIFO through the waiters and the callback is never pumped by an
//! unbounded herd of threads.
//!
//! The ring is an arena of nodes with circular index links. One lock guards
//! the arena and is only ever held for O(1) link/unlink steps and the
//! promotion handoff, never across a progress call or a park.

use crate::builder::{Builder, Mode};
use crate::error::ErrorCode;
use crate::handle::{Inner, SyncHandle};
use crate::loom::sync::atomic::AtomicUsize;
use crate::loom::sync::{Arc, Mutex};
use crate::progress::Progress;

use slab::Slab;
use std::fmt;
use std::sync::atomic::Ordering::{AcqRel, Acquire, Release, SeqCst};

/// Progress-driven wait coordinator.
///
/// A ring owns the injected [`Progress`] callback, the threading mode, and
/// the set of handles currently being waited on. It is cheaply cloneable;
/// clones share the same state, so one ring is typically created at runtime
/// startup and handed to every thread that needs to block.
///
/// Created through a [`Builder`], or with [`ProgressRing::new`] for the
/// default multi-thread configuration.
///
/// # Examples
///
/// ```
/// use progress_sync::{ProgressRing, SyncHandle};
///
/// let ring = ProgressRing::new(|| std::thread::yield_now());
///
/// let handle = SyncHandle::new(1);
/// let completer = handle.completer();
/// let th = std::thread::spawn(move || completer.complete(1));
///
/// ring.block_until_complete(&handle).unwrap();
/// th.join().unwrap();
/// ```
#[derive(Clone)]
pub struct ProgressRing {
    shared: Arc<Shared>,
}

pub(crate) struct Shared {
    /// The injected progress callback.
    progress: Box<dyn Progress>,

    /// Threading capability, fixed at build time.
    mode: Mode,

    /// Bound on threads concurrently driving the progress callback. The ring
    /// head is exempt: it always drives, so the ring never stalls.
    max_progress_threads: usize,

    /// Threads currently inside the progress-driving loop. Advisory: checked
    /// before incrementing, so simultaneous deciders can transiently
    /// overshoot the bound by their own number.
    in_progress: AtomicUsize,

    ring: Mutex<RingState>,
}

struct RingState {
    nodes: Slab<Node>,
    head: Option<usize>,
}

/// Arena node; `next`/`prev` are arena keys forming a circular list.
struct Node {
    inner: Arc<Inner>,
    next: usize,
    prev: usize,
}

impl ProgressRing {
    /// Creates a multi-thread ring with default configuration.
    ///
    /// Equivalent to `Builder::new_multi_thread().build(progress)`.
    pub fn new(progress: impl Progress) -> ProgressRing {
        Builder::new_multi_thread().build(progress)
    }

    /// Blocks the calling thread until `handle` completes.
    ///
    /// While blocked, the thread either drives the progress callback (when
    /// elected, or when the progressor bound has spare capacity) or parks on
    /// the handle's condition variable until a completion update or a
    /// promotion wakes it.
    ///
    /// Returns the handle's settled status: `Ok(())` on success, or the
    /// first error recorded by a completion update.
    ///
    /// A handle must not be waited on from two threads at once, nor waited
    /// on while already linked into a ring; this is a contract violation
    /// checked by a debug assertion.
    pub fn block_until_complete(&self, handle: &SyncHandle) -> Result<(), ErrorCode> {
        let inner = handle.inner();
        match self.shared.mode {
            Mode::MultiThread => self.shared.wait_mt(inner),
            Mode::SingleThread => self.shared.wait_st(inner),
        }
    }

    /// Forces every pending wait on this ring to terminate with `status`.
    ///
    /// Applies `update(0, status)` to each linked handle in ring order.
    /// With an error status this aborts all pending waits, which is the
    /// intended use on fatal runtime failure; with `Ok(())` it is a no-op
    /// for handles that still need completions.
    ///
    /// # Examples
    ///
    /// ```
    /// use progress_sync::{ErrorCode, ProgressRing, SyncHandle};
    ///
    /// let ring = ProgressRing::new(|| {});
    /// let aborted = ErrorCode::new(-1).unwrap();
    ///
    /// // Nothing pending: a wake-all is harmless.
    /// ring.wake_all(Err(aborted));
    ///
    /// // A completed handle is unaffected.
    /// let handle = SyncHandle::new(0);
    /// assert!(ring.block_until_complete(&handle).is_ok());
    /// ```
    pub fn wake_all(&self, status: Result<(), ErrorCode>) {
        self.shared.wake_all(status);
    }

    /// Returns `true` when no handle is linked into the ring.
    ///
    /// Useful for teardown assertions: a runtime shutting down can verify no
    /// thread is still blocked through this ring.
    pub fn is_idle(&self) -> bool {
        self.shared.ring.lock().unwrap().head.is_none()
    }

    pub(crate) fn build(
        mode: Mode,
        max_progress_threads: usize,
        progress: Box<dyn Progress>,
    ) -> ProgressRing {
        ProgressRing {
            shared: Arc::new(Shared {
                progress,
                mode,
                max_progress_threads,
                in_progress: AtomicUsize::new(0),
                ring: Mutex::new(RingState {
                    nodes: Slab::new(),
                    head: None,
                }),
            }),
        }
    }

    pub(crate) fn shared(&self) -> &Arc<Shared> {
        &self.shared
    }
}

impl fmt::Debug for ProgressRing {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_struct("ProgressRing")
            .field("mode", &self.shared.mode)
            .field("max_progress_threads", &self.shared.max_progress_threads)
            .finish()
    }
}

impl Shared {
    /// Runs one step of the injected progress callback.
    pub(crate) fn progress(&self) {
        self.progress.progress();
    }

    fn wait_mt(&self, inner: &Arc<Inner>) -> Result<(), ErrorCode> {
        // Fast path: already terminal.
        if inner.count.load(Acquire) <= 0 {
            return inner.result();
        }

        let mut guard = inner.lock.lock().unwrap();

        // A completion may have landed between the fast path and taking the
        // lock; once we hold it, a terminal update cannot slip by unnoticed.
        if inner.count.load(Acquire) <= 0 {
            drop(guard);
            return inner.result();
        }

        // Link at the tail while still holding the handle lock. Handle lock
        // then ring lock is the sanctioned nesting for a not-yet-linked
        // handle; everywhere else the order is ring first.
        let key = {
            let mut ring = self.ring.lock().unwrap();
            ring.link_back(inner)
        };
        trace!(key, "handle linked");

        loop {
            if inner.elected.load(Acquire)
                || self.in_progress.load(SeqCst) < self.max_progress_threads
            {
                drop(guard);

                // Elected, or spare progressor capacity: drive the callback
                // until the handle is terminal. The head never parks here.
                self.in_progress.fetch_add(1, SeqCst);
                while inner.count.load(Acquire) > 0 {
                    self.progress();
                }
                self.in_progress.fetch_sub(1, SeqCst);
                break;
            }

            // Park until a terminal update or a promotion handoff. Every
            // wake re-evaluates the decision, spurious wakes included.
            guard = inner.cond.wait(guard).unwrap();
            if inner.count.load(Acquire) <= 0 {
                drop(guard);
                break;
            }
        }

        // Unlink, and hand progress duty onward if we were the head.
        {
            let mut ring = self.ring.lock().unwrap();
            let next = ring.unlink(key);
            trace!(key, "handle unlinked");
            if let Some(next) = next {
                trace!(key, "promoting next ring head");
                let _lock = next.lock.lock().unwrap();
                next.cond.notify_one();
            }
        }

        inner.result()
    }

    fn wait_st(&self, inner: &Arc<Inner>) -> Result<(), ErrorCode> {
        if inner.count.load(Acquire) <= 0 {
            return inner.result();
        }

        // Sole thread: the handle becomes the only (and head) entry, and the
        // wait degenerates to spinning the progress callback.
        let key = {
            let mut ring = self.ring.lock().unwrap();
            debug_assert!(
                ring.head.is_none(),
                "single-thread wait while another handle is pending"
            );
            ring.link_back(inner)
        };
        trace!(key, "handle linked");

        while inner.count.load(Acquire) > 0 {
            self.progress();
        }

        let _ = self.ring.lock().unwrap().unlink(key);
        trace!(key, "handle unlinked");

        inner.result()
    }

    pub(crate) fn wake_all(&self, status: Result<(), ErrorCode>) {
        let ring = self.ring.lock().unwrap();
        let head = match ring.head {
            Some(head) => head,
            None => return,
        };

        trace!("waking all pending handles");

        // Exactly one full cycle: the ring is circular, so stop when the
        // walk returns to the starting head.
        let mut key = head;
        loop {
            let node = &ring.nodes[key];
            node.inner.update(0, status);
            key = node.next;
            if key == head {
                break;
            }
        }
    }
}

impl RingState {
    /// Links `inner` at the tail, returning its arena key. The first entry
    /// becomes head and is elected on the spot.
    fn link_back(&mut self, inner: &Arc<Inner>) -> usize {
        let was_linked = inner.linked.swap(true, AcqRel);
        debug_assert!(!was_linked, "handle is already linked into a ring");

        match self.head {
            None => {
                let entry = self.nodes.vacant_entry();
                let key = entry.key();
                entry.insert(Node {
                    inner: inner.clone(),
                    next: key,
                    prev: key,
                });
                self.head = Some(key);
                inner.elected.store(true, Release);
                key
            }
            Some(head) => {
                let tail = self.nodes[head].prev;
                let entry = self.nodes.vacant_entry();
                let key = entry.key();
                entry.insert(Node {
                    inner: inner.clone(),
                    next: head,
                    prev: tail,
                });
                self.nodes[tail].next = key;
                self.nodes[head].prev = key;
                key
            }
        }
    }

    /// Unlinks `key`. If it was the head of a non-empty remainder, advances
    /// head to its successor, marks it elected, and returns it so the caller
    /// can wake it while still holding the ring lock.
    fn unlink(&mut self, key: usize) -> Option<Arc<Inner>> {
        let node = self.nodes.remove(key);
        node.inner.linked.store(false, Release);

        if node.next == key {
            debug_assert_eq!(self.head, Some(key));
            self.head = None;
            return None;
        }

        self.nodes[node.prev].next = node.next;
        self.nodes[node.next].prev = node.prev;

        if self.head == Some(key) {
            self.head = Some(node.next);
            let next = self.nodes[node.next].inner.clone();
            next.elected.store(true, Release);
            return Some(next);
        }

        None
    }
}

#[cfg(test)]
#[cfg(not(loom))]
mod tests {
    use super::*;

    fn inner() -> Arc<Inner> {
        SyncHandle::new(1).inner().clone()
    }

    fn state() -> RingState {
        RingState {
            nodes: Slab::new(),
            head: None,
        }
    }

    fn assert_single_head(state: &RingState) {
        use std::sync::atomic::Ordering::Relaxed;

        let heads = state
            .nodes
            .iter()
            .filter(|(key, node)| {
                assert_eq!(
                    state.nodes[node.next].prev, *key,
                    "broken link at {key}"
                );
                node.inner.elected.load(Relaxed)
            })
            .count();

        match state.head {
            Some(head) => {
                assert_eq!(heads, 1);
                assert!(state.nodes[head].inner.elected.load(Relaxed));
            }
            None => assert!(state.nodes.is_empty()),
        }
    }

    #[test]
    fn first_link_becomes_elected_head() {
        use std::sync::atomic::Ordering::Relaxed;

        let mut state = state();
        let a = inner();

        let key = state.link_back(&a);
        assert_eq!(state.head, Some(key));
        assert_eq!(state.nodes[key].next, key);
        assert_eq!(state.nodes[key].prev, key);
        assert!(a.elected.load(Relaxed));
        assert!(a.linked.load(Relaxed));
        assert_single_head(&state);
    }

    #[test]
    fn links_in_fifo_ring_order() {
        let mut state = state();
        let (a, b, c) = (inner(), inner(), inner());

        let ka = state.link_back(&a);
        let kb = state.link_back(&b);
        let kc = state.link_back(&c);

        assert_eq!(state.head, Some(ka));
        assert_eq!(state.nodes[ka].next, kb);
        assert_eq!(state.nodes[kb].next, kc);
        assert_eq!(state.nodes[kc].next, ka);
        assert_eq!(state.nodes[ka].prev, kc);
        assert_single_head(&state);
    }

    #[test]
    fn unlinking_head_promotes_successor() {
        use std::sync::atomic::Ordering::Relaxed;

        let mut state = state();
        let (a, b, c) = (inner(), inner(), inner());

        let ka = state.link_back(&a);
        let kb = state.link_back(&b);
        let kc = state.link_back(&c);

        let promoted = state.unlink(ka).expect("successor should be promoted");
        assert!(Arc::ptr_eq(&promoted, &b));
        assert_eq!(state.head, Some(kb));
        assert!(b.elected.load(Relaxed));
        assert!(!a.linked.load(Relaxed));
        assert_eq!(state.nodes[kc].next, kb);
        assert_single_head(&state);
    }

    #[test]
    fn unlinking_non_head_promotes_nobody() {
        let mut state = state();
        let (a, b, c) = (inner(), inner(), inner());

        let ka = state.link_back(&a);
        let kb = state.link_back(&b);
        let kc = state.link_back(&c);

        assert!(state.unlink(kb).is_none());
        assert_eq!(state.head, Some(ka));
        assert_eq!(state.nodes[ka].next, kc);
        assert_eq!(state.nodes[kc].prev, ka);
        assert_single_head(&state);
    }

    #[test]
    fn unlinking_last_empties_ring() {
        let mut state = state();
        let a = inner();

        let key = state.link_back(&a);
        assert!(state.unlink(key).is_none());
        assert_eq!(state.head, None);
        assert!(state.nodes.is_empty());
        assert_single_head(&state);
    }

    #[test]
    fn keys_are_stable_across_removals() {
        let mut state = state();
        let (a, b, c) = (inner(), inner(), inner());

        let ka = state.link_back(&a);
        let kb = state.link_back(&b);
        let _ = state.unlink(ka);

        // The freed slot may be reused, but b's key must survive untouched.
        let kc = state.link_back(&c);
        assert!(Arc::ptr_eq(&state.nodes[kb].inner, &b));
        assert_eq!(state.nodes[kb].next, kc);
        assert_single_head(&state);
    }

    #[test]
    fn head_is_unique_under_stress() {
        use std::sync::atomic::{AtomicBool, Ordering::Relaxed};
        use std::thread;

        let ring = ProgressRing::new(|| thread::yield_now());
        let shared = ring.shared().clone();

        let stop = Arc::new(AtomicBool::new(false));
        let checker = {
            let stop = stop.clone();
            thread::spawn(move || {
                while !stop.load(Relaxed) {
                    assert_single_head(&shared.ring.lock().unwrap());
                    thread::yield_now();
                }
            })
        };

        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let ring = ring.clone();
                thread::spawn(move || {
                    for _ in 0..50 {
                        let handle = SyncHandle::new(1);
                        let completer = handle.completer();
                        let updater = thread::spawn(move || completer.complete(1));
                        assert!(ring.block_until_complete(&handle).is_ok());
                        updater.join().unwrap();
                    }
                })
            })
            .collect();

        for waiter in waiters {
            waiter.join().unwrap();
        }
        stop.store(true, Relaxed);
        checker.join().unwrap();
    }
}
