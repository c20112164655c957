//! Trap-layer core: dispatch, exception handling and the syscall gate.
#![cfg_attr(not(test), no_std)]

pub mod exceptions;
pub mod services;
pub mod syscall;
pub mod task;
pub mod trap;

pub use task::{KERNEL_TASKS, PendingSignals, Task, TaskRegistry};
pub use trap::{TrapContext, TrapFrame, TrapOutcome, dispatch};
