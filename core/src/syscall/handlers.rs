//! Kernel operations reachable through the syscall gate.
//!
//! Each operation validates its pointer arguments, then either serves the
//! request directly or forwards it to the registered collaborator.

use halcyon_abi::Errno;
use halcyon_lib::klog_debug;

use crate::services::{console, fs, process};

pub const STDOUT_FILENO: i32 = 1;
pub const STDERR_FILENO: i32 = 2;

define_syscall!(sys_exit(ctx) {
    let code = ctx.arg_i32(ctx.args().arg0);
    klog_debug!("syscall: exit({})", code);
    process::exit(code)
});

define_syscall!(sys_read(ctx) {
    let args = *ctx.args();
    let fd = ctx.arg_i32(args.arg0);
    let buf = ctx.user_bytes_mut(args.arg1, args.arg2)?;
    if buf.is_empty() {
        return Ok(0);
    }
    fs::read(fd, buf)
});

define_syscall!(sys_write(ctx) {
    let args = *ctx.args();
    let fd = ctx.arg_i32(args.arg0);
    if fd < 0 {
        return Err(Errno::EBADF);
    }
    let bytes = ctx.user_bytes(args.arg1, args.arg2)?;
    if bytes.is_empty() {
        return Ok(0);
    }
    match fd {
        STDOUT_FILENO | STDERR_FILENO => console::write(bytes),
        _ => fs::write(fd, bytes),
    }
});

define_syscall!(sys_open(ctx) {
    let args = *ctx.args();
    let path = ctx.user_c_str(args.arg0)?;
    if path.is_empty() {
        return Err(Errno::ENOENT);
    }
    fs::open(path, args.arg1 as u32, args.arg2 as u32)
});

define_syscall!(sys_close(ctx) {
    let fd = ctx.arg_i32(ctx.args().arg0);
    if fd < 0 {
        return Err(Errno::EBADF);
    }
    fs::close(fd)
});

define_syscall!(sys_dup(ctx) {
    let fd = ctx.arg_i32(ctx.args().arg0);
    if fd < 0 {
        return Err(Errno::EBADF);
    }
    fs::dup(fd)
});

define_syscall!(sys_waitpid(ctx) {
    let args = *ctx.args();
    let pid = ctx.arg_i32(args.arg0);
    let status_addr = args.arg1;
    if status_addr != 0 {
        ctx.window().check(status_addr, 4)?;
    }
    let waited = process::waitpid(pid, args.arg2 as u32)?;
    if status_addr != 0 {
        ctx.put_user_i32(status_addr, waited.status)?;
    }
    Ok(waited.pid as u64)
});

define_syscall!(sys_execve(ctx) {
    let args = *ctx.args();
    let path = ctx.user_c_str(args.arg0)?;
    if path.is_empty() {
        return Err(Errno::ENOENT);
    }
    process::execve(path, args.arg1, args.arg2, ctx.window())
});

define_syscall!(sys_getpid(ctx) requires task(task) {
    Ok(task.id() as u64)
});
