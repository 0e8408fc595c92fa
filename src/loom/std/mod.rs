#![cfg_attr(loom, allow(unused_imports, dead_code))]

pub(crate) mod sync {
    pub(crate) use std::sync::Arc;

    #[cfg(feature = "parking_lot")]
    mod pl_wrappers;

    #[cfg(feature = "parking_lot")]
    pub(crate) use crate::loom::std::sync::pl_wrappers::{Condvar, Mutex};

    #[cfg(not(feature = "parking_lot"))]
    pub(crate) use std::sync::{Condvar, Mutex};

    pub(crate) mod atomic {
        pub(crate) use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize};
    }
}
