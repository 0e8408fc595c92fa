#![warn(
    missing_debug_implementations,
    missing_docs,
    rust_2018_idioms,
    unreachable_pub
)]
#![cfg_attr(loom, allow(dead_code, unreachable_pub))]

//! Progress-driven synchronization for runtimes that complete work by
//! polling.
//!
//! Some runtimes have no background thread delivering completions: requests
//! finish only while somebody calls the runtime's *progress* function, which
//! polls the transport and fires completion callbacks. Blocking a thread on a
//! plain condition variable in such a runtime is a deadlock waiting to
//! happen, since the thread that went to sleep may be the only one who would
//! have driven the completion it sleeps on.
//!
//! This crate provides the pieces to wait safely in that world:
//!
//! * [`SyncHandle`] / [`Completer`]: a one-shot completion count. The waiter
//!   holds the handle; completion callbacks hold cloned completers and tick
//!   the count down (or force an error), with the last update waking the
//!   waiter.
//! * [`ProgressRing`]: decides, per waiting thread, between *pumping* the
//!   progress callback and *parking* on the handle's condition variable.
//!   Waiters form a ring; the head is elected to pump, the rest park up to a
//!   configurable bound, and unlinking the head promotes its successor.
//! * [`HybridCondvar`]: a general-purpose condition variable whose wait loop
//!   pumps the progress callback instead of parking, for predicates that are
//!   not completion counts.
//! * [`Builder`]: constructs a ring in multi-thread or single-thread mode
//!   around an injected [`Progress`] callback.
//!
//! # Example
//!
//! ```
//! use progress_sync::{ProgressRing, SyncHandle};
//! use std::thread;
//!
//! // Stand-in for a runtime's progress function.
//! let ring = ProgressRing::new(|| thread::yield_now());
//!
//! let handle = SyncHandle::new(2);
//! let completer = handle.completer();
//!
//! // Completion callbacks tick the count down from other threads.
//! let th = thread::spawn(move || {
//!     completer.complete(1);
//!     completer.complete(1);
//! });
//!
//! // Blocks, pumping progress or parking as the ring decides.
//! ring.block_until_complete(&handle).unwrap();
//! th.join().unwrap();
//! ```
//!
//! # Feature flags
//!
//! * `parking_lot`: use [parking_lot] internally for the per-handle mutex
//!   and condition variable.
//! * `tracing`: emit [tracing] events on completion errors and ring
//!   transitions, at trace level.
//!
//! [parking_lot]: https://docs.rs/parking_lot
//! [tracing]: https://docs.rs/tracing

#[macro_use]
mod macros;

mod loom;

mod builder;
pub use crate::builder::Builder;

mod condvar;
pub use crate::condvar::HybridCondvar;

mod error;
pub use crate::error::ErrorCode;

mod handle;
pub use crate::handle::{Completer, SyncHandle};

mod progress;
pub use crate::progress::Progress;

mod ring;
pub use crate::ring::ProgressRing;

/// Unit tests
#[cfg(test)]
mod tests;
