//! Caller side of the syscall convention.
//!
//! A negative raw result `-e` is a failure: `e` is stored as the last error
//! and the facade returns `-1`. Anything else is returned unchanged and the
//! last error is left alone.

use core::ffi::{CStr, c_char};
use core::sync::atomic::{AtomicI32, Ordering};

use halcyon_abi::{Errno, SYSCALL_FAILURE_SENTINEL, SYSCALL_MAX_ARGS, Syscall};

#[cfg(target_arch = "x86_64")]
use crate::gate::SoftwareInterrupt;
use crate::gate::TrapGate;

/// Integer types a facade may return.
pub trait SyscallReturn: Copy {
    const FAILURE: Self;
    fn from_raw(raw: i64) -> Self;
}

macro_rules! impl_syscall_return {
    ($($ty:ty),*) => {
        $(
            impl SyscallReturn for $ty {
                const FAILURE: Self = SYSCALL_FAILURE_SENTINEL as $ty;

                #[inline]
                fn from_raw(raw: i64) -> Self {
                    raw as $ty
                }
            }
        )*
    };
}

impl_syscall_return!(i32, i64, isize);

/// Values that travel in an argument register.
pub trait IntoSyscallArg {
    fn into_arg(self) -> u64;
}

macro_rules! impl_into_arg {
    (signed: $($ty:ty),*) => {
        $(
            impl IntoSyscallArg for $ty {
                #[inline]
                fn into_arg(self) -> u64 {
                    self as i64 as u64
                }
            }
        )*
    };
    (unsigned: $($ty:ty),*) => {
        $(
            impl IntoSyscallArg for $ty {
                #[inline]
                fn into_arg(self) -> u64 {
                    self as u64
                }
            }
        )*
    };
}

impl_into_arg!(signed: i32, i64, isize);
impl_into_arg!(unsigned: u32, u64, usize);

impl<T> IntoSyscallArg for *const T {
    #[inline]
    fn into_arg(self) -> u64 {
        self as u64
    }
}

impl<T> IntoSyscallArg for *mut T {
    #[inline]
    fn into_arg(self) -> u64 {
        self as u64
    }
}

fn pack(args: &[u64]) -> [u64; SYSCALL_MAX_ARGS] {
    let mut regs = [0; SYSCALL_MAX_ARGS];
    regs[..args.len()].copy_from_slice(args);
    regs
}

/// Syscall entry points bound to one trap gate and one last-error slot.
pub struct Syscalls<G> {
    gate: G,
    last_error: AtomicI32,
}

impl<G: TrapGate> Syscalls<G> {
    pub const fn new(gate: G) -> Self {
        Self {
            gate,
            last_error: AtomicI32::new(0),
        }
    }

    /// Trap with `selector` and apply the failure convention.
    pub fn invoke<R: SyscallReturn>(&self, selector: u64, args: [u64; SYSCALL_MAX_ARGS]) -> R {
        let raw = self.gate.trap(selector, args);
        if raw < 0 {
            self.last_error
                .store(raw.unsigned_abs().min(i32::MAX as u64) as i32, Ordering::Relaxed);
            return R::FAILURE;
        }
        R::from_raw(raw)
    }

    /// Raw error number of the last failed call, or 0.
    #[inline]
    pub fn errno(&self) -> i32 {
        self.last_error.load(Ordering::Relaxed)
    }

    pub fn last_error(&self) -> Option<Errno> {
        Errno::from_raw(self.errno())
    }

    pub fn clear_errno(&self) {
        self.last_error.store(0, Ordering::Relaxed);
    }
}

macro_rules! syscall_facades {
    ($(
        $(#[$meta:meta])*
        fn $name:ident($($arg:ident : $ty:ty),*) -> $ret:ty = $sys:ident($($val:expr),*);
    )*) => {
        impl<G: TrapGate> Syscalls<G> {
            $(
                $(#[$meta])*
                #[inline]
                pub fn $name(&self, $($arg: $ty),*) -> $ret {
                    self.invoke::<$ret>(
                        Syscall::$sys.number(),
                        pack(&[$(IntoSyscallArg::into_arg($val)),*]),
                    )
                }
            )*
        }
    };
}

syscall_facades! {
    /// Number of bytes written.
    fn write(fd: i32, buf: &[u8]) -> isize = Write(fd, buf.as_ptr(), buf.len());
    /// Number of bytes read; 0 at end of file.
    fn read(fd: i32, buf: &mut [u8]) -> isize = Read(fd, buf.as_mut_ptr(), buf.len());
    fn open(path: &CStr, flags: i32, mode: u32) -> i32 = Open(path.as_ptr(), flags, mode);
    fn close(fd: i32) -> i32 = Close(fd);
    fn dup(fd: i32) -> i32 = Dup(fd);
    /// Pid of the reaped child; its status is stored through `status`.
    fn waitpid(pid: i32, status: Option<&mut i32>, options: i32) -> i32 = Waitpid(
        pid,
        status.map_or(core::ptr::null_mut(), |s| s as *mut i32),
        options
    );
    /// Only returns on failure.
    fn execve(path: &CStr, argv: *const *const c_char, envp: *const *const c_char) -> i32 =
        Execve(path.as_ptr(), argv, envp);
    fn getpid() -> i32 = Getpid();
}

impl<G: TrapGate> Syscalls<G> {
    /// Wait for any child.
    #[inline]
    pub fn wait(&self, status: Option<&mut i32>) -> i32 {
        self.waitpid(-1, status, 0)
    }

    /// Terminate the calling process.
    pub fn exit(&self, code: i32) -> ! {
        self.invoke::<i64>(Syscall::Exit.number(), pack(&[code.into_arg()]));
        loop {
            core::hint::spin_loop();
        }
    }
}

/// Syscalls of the running process.
#[cfg(target_arch = "x86_64")]
pub static SYS: Syscalls<SoftwareInterrupt> = Syscalls::new(SoftwareInterrupt);

/// Last error of the running process.
#[cfg(target_arch = "x86_64")]
#[inline]
pub fn errno() -> i32 {
    SYS.errno()
}
