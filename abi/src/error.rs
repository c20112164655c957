//! Error codes reported across the syscall boundary.
//!
//! Values follow the classic Unix numbering so user code can compare the
//! last-error value against the usual constants.

use core::fmt;

/// Implement conversions for `#[repr(i32)]` errno enums.
///
/// Generates `as_raw()`, `from_raw()`, `name()` and `Display` so that every
/// errno has a single table of value/name pairs.
macro_rules! impl_errno {
    ($ty:ident { $($val:literal => $variant:ident : $desc:literal),* $(,)? }) => {
        impl $ty {
            pub const ALL: &'static [$ty] = &[$(Self::$variant),*];

            /// Positive errno magnitude.
            #[inline]
            pub const fn as_raw(self) -> i32 {
                self as i32
            }

            /// Map a positive magnitude back to a known errno.
            #[inline]
            pub const fn from_raw(val: i32) -> Option<Self> {
                match val {
                    $($val => Some(Self::$variant),)*
                    _ => None,
                }
            }

            pub const fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => stringify!($variant),)*
                }
            }

            pub const fn description(self) -> &'static str {
                match self {
                    $(Self::$variant => $desc,)*
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{} ({})", self.name(), self.description())
            }
        }
    };
}

/// Kernel error code. The discriminant is the positive errno magnitude.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Errno {
    EPERM = 1,
    ENOENT = 2,
    ESRCH = 3,
    EINTR = 4,
    EIO = 5,
    E2BIG = 7,
    ENOEXEC = 8,
    EBADF = 9,
    ECHILD = 10,
    EAGAIN = 11,
    ENOMEM = 12,
    EACCES = 13,
    EFAULT = 14,
    EBUSY = 16,
    EEXIST = 17,
    ENOTDIR = 20,
    EISDIR = 21,
    EINVAL = 22,
    EMFILE = 24,
    ENOSPC = 28,
    ESPIPE = 29,
    EPIPE = 32,
    ERANGE = 34,
    ENAMETOOLONG = 36,
    ENOSYS = 38,
}

impl_errno!(Errno {
    1 => EPERM: "operation not permitted",
    2 => ENOENT: "no such file or directory",
    3 => ESRCH: "no such process",
    4 => EINTR: "interrupted system call",
    5 => EIO: "i/o error",
    7 => E2BIG: "argument list too long",
    8 => ENOEXEC: "exec format error",
    9 => EBADF: "bad file descriptor",
    10 => ECHILD: "no child processes",
    11 => EAGAIN: "try again",
    12 => ENOMEM: "out of memory",
    13 => EACCES: "permission denied",
    14 => EFAULT: "bad address",
    16 => EBUSY: "device or resource busy",
    17 => EEXIST: "file exists",
    20 => ENOTDIR: "not a directory",
    21 => EISDIR: "is a directory",
    22 => EINVAL: "invalid argument",
    24 => EMFILE: "too many open files",
    28 => ENOSPC: "no space left on device",
    29 => ESPIPE: "illegal seek",
    32 => EPIPE: "broken pipe",
    34 => ERANGE: "result out of range",
    36 => ENAMETOOLONG: "file name too long",
    38 => ENOSYS: "function not implemented",
});

/// Result of a kernel operation before it is encoded into `rax`.
pub type SysResult = Result<u64, Errno>;
