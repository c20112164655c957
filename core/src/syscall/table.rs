use halcyon_abi::{NR_SYSCALLS, SysResult, Syscall};

use crate::syscall::context::SyscallContext;
use crate::syscall::handlers;

pub type SyscallHandler = fn(&mut SyscallContext<'_>) -> SysResult;

#[derive(Clone, Copy)]
pub struct SyscallEntry {
    pub handler: Option<SyscallHandler>,
    pub name: &'static str,
}

impl SyscallEntry {
    const VACANT: Self = Self {
        handler: None,
        name: "",
    };
}

/// Selector-indexed table of kernel operations.
pub struct SyscallTable {
    entries: [SyscallEntry; NR_SYSCALLS],
}

impl SyscallTable {
    pub const fn empty() -> Self {
        Self {
            entries: [SyscallEntry::VACANT; NR_SYSCALLS],
        }
    }

    /// Install `handler` under `syscall`'s selector.
    pub const fn with(mut self, syscall: Syscall, handler: SyscallHandler) -> Self {
        self.entries[syscall.number() as usize] = SyscallEntry {
            handler: Some(handler),
            name: syscall.name(),
        };
        self
    }

    /// Entry for `selector`, or `None` when out of range or not installed.
    pub fn lookup(&self, selector: u64) -> Option<(&'static str, SyscallHandler)> {
        let index = usize::try_from(selector).ok()?;
        let entry = self.entries.get(index)?;
        entry.handler.map(|handler| (entry.name, handler))
    }

    pub fn installed(&self) -> impl Iterator<Item = (u64, &'static str)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.handler.is_some())
            .map(|(index, entry)| (index as u64, entry.name))
    }
}

/// Operations served by the running kernel.
pub static KERNEL_SYSCALLS: SyscallTable = SyscallTable::empty()
    .with(Syscall::Exit, handlers::sys_exit)
    .with(Syscall::Read, handlers::sys_read)
    .with(Syscall::Write, handlers::sys_write)
    .with(Syscall::Open, handlers::sys_open)
    .with(Syscall::Close, handlers::sys_close)
    .with(Syscall::Waitpid, handlers::sys_waitpid)
    .with(Syscall::Execve, handlers::sys_execve)
    .with(Syscall::Getpid, handlers::sys_getpid)
    .with(Syscall::Dup, handlers::sys_dup);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_table_serves_the_classic_operations() {
        let installed: Vec<u64> = KERNEL_SYSCALLS.installed().map(|(n, _)| n).collect();
        assert_eq!(installed, vec![1, 3, 4, 5, 6, 7, 11, 20, 41]);
        assert_eq!(KERNEL_SYSCALLS.lookup(4).map(|(name, _)| name), Some("write"));
    }

    #[test]
    fn unknown_selectors_miss() {
        assert!(KERNEL_SYSCALLS.lookup(2).is_none());
        assert!(KERNEL_SYSCALLS.lookup(NR_SYSCALLS as u64).is_none());
        assert!(KERNEL_SYSCALLS.lookup(u64::MAX).is_none());
    }
}
