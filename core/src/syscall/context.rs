//! Per-call view handed to kernel operations.
//!
//! Handlers never see the trap frame itself: they get the three argument
//! registers, the caller's address window and the task registry. All
//! unsafe access to caller memory is funnelled through the accessors here.

use halcyon_abi::Errno;

use crate::syscall::user::UserWindow;
use crate::task::{Task, TaskRegistry};

/// Arguments as captured from `rdi`, `rsi`, `rdx`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyscallArgs {
    pub arg0: u64,
    pub arg1: u64,
    pub arg2: u64,
}

impl From<[u64; 3]> for SyscallArgs {
    fn from(regs: [u64; 3]) -> Self {
        Self {
            arg0: regs[0],
            arg1: regs[1],
            arg2: regs[2],
        }
    }
}

pub struct SyscallContext<'a> {
    args: SyscallArgs,
    window: UserWindow,
    tasks: &'a TaskRegistry,
}

impl<'a> SyscallContext<'a> {
    pub fn new(args: SyscallArgs, window: UserWindow, tasks: &'a TaskRegistry) -> Self {
        Self {
            args,
            window,
            tasks,
        }
    }

    #[inline]
    pub fn args(&self) -> &SyscallArgs {
        &self.args
    }

    #[inline]
    pub fn window(&self) -> UserWindow {
        self.window
    }

    /// Argument register interpreted as a C `int` (low 32 bits).
    #[inline]
    pub fn arg_i32(&self, raw: u64) -> i32 {
        raw as u32 as i32
    }

    #[inline]
    pub fn current_task(&self) -> Option<&'static Task> {
        self.tasks.current()
    }

    pub fn require_task(&self) -> Result<&'static Task, Errno> {
        self.current_task().ok_or(Errno::ESRCH)
    }

    /// Validated read-only view of caller memory.
    pub fn user_bytes(&self, addr: u64, len: u64) -> Result<&'a [u8], Errno> {
        // SAFETY: the window only covers memory mapped for the caller, and
        // the caller is suspended in the trap for the lifetime of this call.
        unsafe { self.window.bytes(addr, len) }
    }

    /// Validated writable view of caller memory.
    pub fn user_bytes_mut(&mut self, addr: u64, len: u64) -> Result<&'a mut [u8], Errno> {
        // SAFETY: as for `user_bytes`; handlers hold at most one writable
        // view and drop it before returning.
        unsafe { self.window.bytes_mut(addr, len) }
    }

    pub fn user_c_str(&self, addr: u64) -> Result<&'a [u8], Errno> {
        // SAFETY: as for `user_bytes`.
        unsafe { self.window.c_str(addr) }
    }

    /// Store a 32-bit value at a caller-supplied address.
    pub fn put_user_i32(&mut self, addr: u64, value: i32) -> Result<(), Errno> {
        let slot = self.user_bytes_mut(addr, 4)?;
        slot.copy_from_slice(&value.to_ne_bytes());
        Ok(())
    }
}
