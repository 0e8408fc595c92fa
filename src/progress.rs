//! The injected progress callback.

/// Advances the runtime's internal state machine by one step.
///
/// The progress callback is the only way pending operations complete: there
/// is no OS-level completion notification, so a blocked thread (or its
/// elected delegate) repeatedly invokes it until the completion it is
/// waiting on lands. Implementations must return without blocking; a call
/// may complete zero or more pending operations as a side effect, typically
/// by invoking [`Completer::update`] out-of-band.
///
/// The trait is blanket-implemented for closures, which is the common way to
/// supply one:
///
/// ```
/// use progress_sync::ProgressRing;
///
/// let ring = ProgressRing::new(|| {
///     // poll event sources, fire completers...
/// });
/// # drop(ring);
/// ```
///
/// [`Completer::update`]: crate::Completer::update
pub trait Progress: Send + Sync + 'static {
    /// Runs one progress step.
    fn progress(&self);
}

impl<F> Progress for F
where
    F: Fn() + Send + Sync + 'static,
{
    fn progress(&self) {
        self()
    }
}
