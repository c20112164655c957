//! Declarative macro for kernel operation definitions.
//!
//! ```ignore
//! define_syscall!(sys_close(ctx) {
//!     let fd = ctx.arg_i32(ctx.args().arg0);
//!     fs::close(fd)
//! });
//!
//! define_syscall!(sys_getpid(ctx) requires task(task) {
//!     Ok(task.id() as u64)
//! });
//! ```
//!
//! The body evaluates to a `SysResult`; `?` propagates errno values.

#[macro_export]
macro_rules! define_syscall {
    ($name:ident($ctx:ident) $body:block) => {
        pub fn $name(
            $ctx: &mut $crate::syscall::context::SyscallContext<'_>,
        ) -> ::halcyon_abi::SysResult {
            $body
        }
    };

    ($name:ident($ctx:ident) requires task($task:ident) $body:block) => {
        pub fn $name(
            $ctx: &mut $crate::syscall::context::SyscallContext<'_>,
        ) -> ::halcyon_abi::SysResult {
            let $task = $ctx.require_task()?;
            $body
        }
    };
}
