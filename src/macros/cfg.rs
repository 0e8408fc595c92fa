#![allow(unused_macros)]

macro_rules! cfg_loom {
    ($($item:item)*) => {
        $( #[cfg(loom)] $item )*
    }
}

macro_rules! cfg_not_loom {
    ($($item:item)*) => {
        $( #[cfg(not(loom))] $item )*
    }
}

macro_rules! cfg_trace {
    ($($item:item)*) => {
        $( #[cfg(feature = "tracing")] $item )*
    }
}

macro_rules! cfg_not_trace {
    ($($item:item)*) => {
        $( #[cfg(not(feature = "tracing"))] $item )*
    }
}
