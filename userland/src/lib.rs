//! User-side syscall library.
#![cfg_attr(not(test), no_std)]

pub mod gate;
pub mod syscall;

pub use gate::{SoftwareInterrupt, TrapGate};
pub use syscall::{IntoSyscallArg, SyscallReturn, Syscalls};
#[cfg(target_arch = "x86_64")]
pub use syscall::{SYS, errno};
