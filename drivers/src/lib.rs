#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_op_in_unsafe_fn)]

pub mod console;
#[cfg(target_arch = "x86_64")]
pub mod serial;
pub mod vga;

pub use console::{CONSOLE, Console};
