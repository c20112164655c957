//! Syscall numbering and the register-level result convention.
//!
//! Register usage for `int 0x80`:
//! - `rax`: operation selector on entry, result on return
//! - `rdi`, `rsi`, `rdx`: arguments 0..2
//!
//! A result is a signed 64-bit value. Non-negative values are success
//! results; a negative value `-e` reports error `e`.

use crate::error::{Errno, SysResult};

/// Number of selector slots in the kernel dispatch table.
pub const NR_SYSCALLS: usize = 72;

/// Number of argument registers carried by the trap.
pub const SYSCALL_MAX_ARGS: usize = 3;

/// Fixed return value reported to callers on failure.
pub const SYSCALL_FAILURE_SENTINEL: i64 = -1;

macro_rules! syscall_numbers {
    ($($variant:ident = $num:literal => $name:literal),* $(,)?) => {
        /// Operation selectors understood by the trap layer.
        #[repr(u64)]
        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        pub enum Syscall {
            $($variant = $num,)*
        }

        impl Syscall {
            pub const ALL: &'static [Syscall] = &[$(Self::$variant),*];

            pub const fn from_number(num: u64) -> Option<Self> {
                match num {
                    $($num => Some(Self::$variant),)*
                    _ => None,
                }
            }

            pub const fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)*
                }
            }
        }
    };
}

syscall_numbers! {
    Setup = 0 => "setup",
    Exit = 1 => "exit",
    Fork = 2 => "fork",
    Read = 3 => "read",
    Write = 4 => "write",
    Open = 5 => "open",
    Close = 6 => "close",
    Waitpid = 7 => "waitpid",
    Creat = 8 => "creat",
    Link = 9 => "link",
    Unlink = 10 => "unlink",
    Execve = 11 => "execve",
    Chdir = 12 => "chdir",
    Time = 13 => "time",
    Getpid = 20 => "getpid",
    Pause = 29 => "pause",
    Sync = 36 => "sync",
    Kill = 37 => "kill",
    Dup = 41 => "dup",
    Pipe = 42 => "pipe",
    Brk = 45 => "brk",
    Signal = 48 => "signal",
    Ioctl = 54 => "ioctl",
    Dup2 = 63 => "dup2",
    Getppid = 64 => "getppid",
    Setsid = 66 => "setsid",
}

impl Syscall {
    #[inline]
    pub const fn number(self) -> u64 {
        self as u64
    }
}

/// Encode a kernel result into the value written back to `rax`.
///
/// Success values that would read as negative cannot be represented and
/// are reported as `ERANGE`.
#[inline]
pub fn encode_result(result: SysResult) -> i64 {
    match result {
        Ok(value) if value <= i64::MAX as u64 => value as i64,
        Ok(_) => -(Errno::ERANGE.as_raw() as i64),
        Err(errno) => -(errno.as_raw() as i64),
    }
}

/// Split a raw trap result into success value or error magnitude.
#[inline]
pub fn decode_result(raw: i64) -> Result<u64, u64> {
    if raw < 0 {
        Err(raw.unsigned_abs())
    } else {
        Ok(raw as u64)
    }
}
