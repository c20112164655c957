//! Trap dispatch.
//!
//! Every installed vector funnels into [`dispatch`] with a frame that lives
//! on the interrupted stack. The vector picks the route: the syscall gate,
//! the exception table, or the spurious path.

mod frame;

use core::sync::atomic::{AtomicU32, Ordering};

use halcyon_abi::arch::EXCEPTION_VECTOR_COUNT;
use halcyon_abi::SYSCALL_VECTOR;
use halcyon_lib::{Hardware, InitFlag, klog_debug};

use crate::exceptions;
use crate::syscall::{self, SyscallTable, UserWindow};
use crate::task::TaskRegistry;

pub use frame::{FRAME_RAX_OFFSET, FRAME_SIZE, FRAME_VECTOR_OFFSET, TrapFrame};

/// Deepest nesting tolerated before the kernel gives up.
pub const MAX_TRAP_NESTING: u32 = 8;

/// What the entry stub does after dispatch returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrapOutcome {
    /// Restore the frame and `iretq`.
    Resume,
    /// Unrecoverable; the caller reports and halts.
    Fatal(&'static str),
}

/// Everything a trap handler may reach.
pub struct TrapContext<'a> {
    hw: &'a dyn Hardware,
    syscalls: &'a SyscallTable,
    tasks: &'a TaskRegistry,
    window: UserWindow,
    accepting: InitFlag,
    depth: AtomicU32,
}

impl<'a> TrapContext<'a> {
    pub const fn new(
        hw: &'a dyn Hardware,
        syscalls: &'a SyscallTable,
        tasks: &'a TaskRegistry,
        window: UserWindow,
    ) -> Self {
        Self {
            hw,
            syscalls,
            tasks,
            window,
            accepting: InitFlag::new(),
            depth: AtomicU32::new(0),
        }
    }

    #[inline]
    pub fn hw(&self) -> &'a dyn Hardware {
        self.hw
    }

    #[inline]
    pub fn syscalls(&self) -> &'a SyscallTable {
        self.syscalls
    }

    #[inline]
    pub fn tasks(&self) -> &'a TaskRegistry {
        self.tasks
    }

    #[inline]
    pub fn user_window(&self) -> UserWindow {
        self.window
    }

    /// Start serving syscalls. Called once, on the transition to Ready.
    pub fn open_syscalls(&self) {
        self.accepting.mark_set();
    }

    #[inline]
    pub fn accepting_syscalls(&self) -> bool {
        self.accepting.is_set()
    }

    /// Number of traps currently being handled.
    pub fn depth(&self) -> u32 {
        self.depth.load(Ordering::Acquire)
    }
}

struct NestingGuard<'a> {
    depth: &'a AtomicU32,
}

impl<'a> NestingGuard<'a> {
    fn enter(depth: &'a AtomicU32) -> (Self, u32) {
        let level = depth.fetch_add(1, Ordering::AcqRel) + 1;
        (Self { depth }, level)
    }
}

impl Drop for NestingGuard<'_> {
    fn drop(&mut self) {
        self.depth.fetch_sub(1, Ordering::AcqRel);
    }
}

pub fn dispatch(frame: &mut TrapFrame, ctx: &TrapContext<'_>) -> TrapOutcome {
    let (_guard, level) = NestingGuard::enter(&ctx.depth);
    if level > MAX_TRAP_NESTING {
        return TrapOutcome::Fatal("trap nesting too deep");
    }

    let vector = frame.vector();
    if vector == SYSCALL_VECTOR {
        syscall::syscall_handle(frame, ctx);
        return TrapOutcome::Resume;
    }
    if vector < EXCEPTION_VECTOR_COUNT {
        return exceptions::handle(vector, frame, ctx);
    }

    klog_debug!("trap: spurious vector {} at rip={:#x}", vector, frame.rip);
    TrapOutcome::Resume
}
