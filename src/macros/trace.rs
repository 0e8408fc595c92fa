cfg_trace! {
    macro_rules! trace {
        ($($arg:tt)+) => {
            tracing::trace!($($arg)+)
        }
    }
}

cfg_not_trace! {
    macro_rules! trace {
        ($($arg:tt)+) => {};
    }
}
