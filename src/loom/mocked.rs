pub(crate) use loom::*;
