use halcyon_abi::{Errno, SysResult};

use crate::syscall::user::UserWindow;

/// Outcome of a successful wait.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaitStatus {
    pub pid: u32,
    pub status: i32,
}

halcyon_lib::define_service! {
    /// Process lifecycle operations owned by the scheduler.
    process => ProcessServices (missing = Err(Errno::ENOSYS)) {
        exit(code: i32) -> SysResult;
        waitpid(pid: i32, options: u32) -> Result<WaitStatus, Errno>;
        /// `argv` and `envp` are user pointers; the loader walks them
        /// through `window`.
        execve(path: &[u8], argv: u64, envp: u64, window: UserWindow) -> SysResult;
    }
}
