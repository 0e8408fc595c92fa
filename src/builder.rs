//! Ring configuration.

use crate::progress::Progress;
use crate::ring::ProgressRing;

/// Builds a [`ProgressRing`] with custom configuration values.
///
/// Methods can be chained in order to set the configuration values. The ring
/// is constructed by calling [`build`].
///
/// New instances of `Builder` are obtained via [`Builder::new_multi_thread`]
/// or [`Builder::new_single_thread`]; the threading capability is fixed by
/// that choice and carried by the built ring.
///
/// [`build`]: Builder::build
///
/// # Examples
///
/// ```
/// use progress_sync::Builder;
///
/// let ring = Builder::new_multi_thread()
///     .max_progress_threads(2)
///     .build(|| {
///         // advance the runtime's state machine
///     });
/// # drop(ring);
/// ```
#[derive(Debug)]
pub struct Builder {
    /// Threading capability of the ring being built.
    mode: Mode,

    /// Bound on threads concurrently driving the progress callback.
    max_progress_threads: usize,
}

/// Threading capability, fixed when the ring is built.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Mode {
    MultiThread,
    SingleThread,
}

impl Builder {
    /// Returns a new builder for a ring shared by multiple threads.
    ///
    /// This is the normal configuration: waiters beyond the progressor bound
    /// park on real condition variables and are woken by completion updates
    /// or promotion.
    pub fn new_multi_thread() -> Builder {
        Builder {
            mode: Mode::MultiThread,
            max_progress_threads: 1,
        }
    }

    /// Returns a new builder for a ring used by a single logical thread.
    ///
    /// Waits never park: the sole thread spins the progress callback until
    /// its handle completes. The single-thread guarantee is the caller's to
    /// uphold; overlapping waits through such a ring are a contract
    /// violation caught by a debug assertion.
    pub fn new_single_thread() -> Builder {
        Builder {
            mode: Mode::SingleThread,
            max_progress_threads: 1,
        }
    }

    /// Sets the bound on threads concurrently driving the progress callback.
    ///
    /// Defaults to 1: only the elected ring head pumps progress, and every
    /// other waiter parks. Raising the bound lets that many waiters pump
    /// concurrently before parking starts. The ring head is exempt from the
    /// bound, so a non-empty ring always has a progressing thread.
    ///
    /// # Panics
    ///
    /// Panics if `n` is 0.
    pub fn max_progress_threads(&mut self, n: usize) -> &mut Self {
        assert!(n > 0, "max progress threads cannot be 0");
        self.max_progress_threads = n;
        self
    }

    /// Builds the configured ring around the injected progress callback.
    pub fn build(&mut self, progress: impl Progress) -> ProgressRing {
        ProgressRing::build(self.mode, self.max_progress_threads, Box::new(progress))
    }
}
