//! Halcyon Kernel-Userland ABI Types
//!
//! This crate provides the canonical definitions shared between the kernel
//! trap layer and the user-side syscall stubs. Having a single source of
//! truth keeps both sides of the privilege boundary on the same register
//! convention, the same operation numbering and the same error codes.
//!
//! All types in this crate are plain data; nothing here touches hardware.

#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_code)]

pub mod arch;
pub mod error;
pub mod signal;
pub mod syscall;

pub use arch::x86_64::{GateKind, PrivilegeLevel, SegmentSelector, TableRegister};
pub use arch::{ExceptionVector, SYSCALL_VECTOR};
pub use error::*;
pub use signal::*;
pub use syscall::*;
