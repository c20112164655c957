//! Syscall side of the trap layer.
//!
//! Reads the selector and arguments from the trap frame, runs the matching
//! kernel operation and writes the encoded result back into `rax`. No other
//! register of the frame is modified.

#[macro_use]
pub mod macros;
pub mod context;
pub mod handlers;
pub mod table;
pub mod user;

#[cfg(test)]
mod tests;

use halcyon_abi::{Errno, SysResult, encode_result};
use halcyon_lib::{klog_debug, klog_warn};

use crate::trap::{TrapContext, TrapFrame};
use context::{SyscallArgs, SyscallContext};

pub use table::{KERNEL_SYSCALLS, SyscallEntry, SyscallHandler, SyscallTable};
pub use user::UserWindow;

pub fn syscall_handle(frame: &mut TrapFrame, ctx: &TrapContext<'_>) {
    let selector = frame.selector();
    let result = run(selector, frame.syscall_args().into(), ctx);
    if let Err(errno) = result {
        klog_debug!("syscall: {} -> {}", selector, errno.name());
    }
    frame.set_result(encode_result(result));
}

fn run(selector: u64, args: SyscallArgs, ctx: &TrapContext<'_>) -> SysResult {
    if !ctx.accepting_syscalls() {
        klog_warn!("syscall: selector {} before boot reached Ready", selector);
        return Err(Errno::EAGAIN);
    }
    let Some((name, handler)) = ctx.syscalls().lookup(selector) else {
        klog_debug!("syscall: unknown selector {}", selector);
        return Err(Errno::ENOSYS);
    };
    klog_debug!("syscall: {}({:#x}, {:#x}, {:#x})", name, args.arg0, args.arg1, args.arg2);
    let mut call = SyscallContext::new(args, ctx.user_window(), ctx.tasks());
    handler(&mut call)
}
