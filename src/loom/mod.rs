//! Switches the crate's synchronization primitives between `std::sync` (or
//! `parking_lot`) and the `loom` mocks used by the concurrency model tests.

#[cfg(not(all(test, loom)))]
mod std;
#[cfg(not(all(test, loom)))]
pub(crate) use self::std::*;

#[cfg(all(test, loom))]
mod mocked;
#[cfg(all(test, loom))]
pub(crate) use self::mocked::*;
