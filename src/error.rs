//! Completion status error type.

use std::error::Error;
use std::fmt;
use std::num::NonZeroI32;

/// Nonzero status code recorded by a failed completion update.
///
/// A waiter blocked in [`block_until_complete`] receives the first
/// `ErrorCode` recorded against its handle once the wait terminates. The
/// code's meaning belongs to the runtime layer that produced it; this crate
/// only transports it.
///
/// [`block_until_complete`]: crate::ProgressRing::block_until_complete
///
/// # Examples
///
/// ```
/// use progress_sync::ErrorCode;
///
/// let code = ErrorCode::new(-17).unwrap();
/// assert_eq!(code.get(), -17);
/// assert!(ErrorCode::new(0).is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode(NonZeroI32);

impl ErrorCode {
    /// Wraps a raw status code. Returns `None` for zero, which denotes
    /// success and is not an error.
    pub fn new(code: i32) -> Option<ErrorCode> {
        NonZeroI32::new(code).map(ErrorCode)
    }

    /// Returns the raw status code.
    pub fn get(self) -> i32 {
        self.0.get()
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "operation failed (status {})", self.0)
    }
}

impl Error for ErrorCode {}

#[cfg(test)]
mod tests {
    use super::ErrorCode;

    #[test]
    fn zero_is_success() {
        assert!(ErrorCode::new(0).is_none());
    }

    #[test]
    fn round_trips_raw_code() {
        let code = ErrorCode::new(-2).unwrap();
        assert_eq!(code.get(), -2);
        assert_eq!(ErrorCode::new(5).unwrap().get(), 5);
    }

    #[test]
    fn display_includes_code() {
        let code = ErrorCode::new(-2).unwrap();
        assert_eq!(code.to_string(), "operation failed (status -2)");
    }
}
