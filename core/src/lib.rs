extern crate self as blockstream_core;

pub mod log;
pub mod panic;
pub mod task;
pub mod time;
