use halcyon_core::{TrapContext, TrapFrame, TrapOutcome, dispatch};
use halcyon_lib::klog_trace;
use halcyon_userland::TrapGate;

/// Trap gate that hands the call to [`dispatch`] in-process.
///
/// The frame is the one `int 0x80` would leave behind for a ring-3 caller.
pub struct Loopback<'a> {
    ctx: &'a TrapContext<'a>,
}

impl<'a> Loopback<'a> {
    pub const fn new(ctx: &'a TrapContext<'a>) -> Self {
        Self { ctx }
    }
}

impl TrapGate for Loopback<'_> {
    fn trap(&self, selector: u64, args: [u64; 3]) -> i64 {
        let mut frame = TrapFrame::user_syscall(selector, args);
        let outcome = dispatch(&mut frame, self.ctx);
        debug_assert_eq!(outcome, TrapOutcome::Resume);
        klog_trace!("loopback: selector {} -> {:#x}", selector, frame.rax);
        frame.rax as i64
    }
}
