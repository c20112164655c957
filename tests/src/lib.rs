//! End-to-end harness: user-side syscalls looped straight into kernel trap
//! dispatch, without a processor privilege switch in between.
#![cfg_attr(not(test), no_std)]

pub mod loopback;

#[cfg(test)]
mod end_to_end;

pub use loopback::Loopback;
