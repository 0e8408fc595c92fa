#![cfg_attr(not(test), allow(unused_macros))]

#[macro_use]
mod cfg;

#[macro_use]
mod trace;
