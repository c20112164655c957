//! Processor exception handlers.
//!
//! Each handler clears whatever hardware condition must be cleared before
//! resuming, then records the fault against a task as a pending signal.
//! Delivery happens later, on the way back to the task; nothing here
//! unwinds or kills it. Faults taken in kernel mode are fatal.

use halcyon_abi::arch::EXCEPTION_VECTOR_COUNT;
use halcyon_abi::{ExceptionVector, Signal};
use halcyon_lib::{klog_debug, klog_enter_panic, klog_error, klog_info};

use crate::trap::{TrapContext, TrapFrame, TrapOutcome};

pub type ExceptionHandler = fn(&mut TrapFrame, &TrapContext<'_>) -> TrapOutcome;

static EXCEPTION_HANDLERS: [ExceptionHandler; EXCEPTION_VECTOR_COUNT as usize] = {
    use ExceptionVector as V;
    let mut table: [ExceptionHandler; EXCEPTION_VECTOR_COUNT as usize] =
        [reserved_vector; EXCEPTION_VECTOR_COUNT as usize];
    table[V::DivideError as usize] = divide_error;
    table[V::Debug as usize] = debug_trap;
    table[V::Nmi as usize] = fatal_always;
    table[V::Breakpoint as usize] = debug_trap;
    table[V::Overflow as usize] = segmentation_fault;
    table[V::BoundRange as usize] = segmentation_fault;
    table[V::InvalidOpcode as usize] = invalid_opcode;
    table[V::DeviceNotAvailable as usize] = device_not_available;
    table[V::DoubleFault as usize] = fatal_always;
    table[V::InvalidTss as usize] = segmentation_fault;
    table[V::SegmentNotPresent as usize] = segmentation_fault;
    table[V::StackFault as usize] = segmentation_fault;
    table[V::GeneralProtection as usize] = segmentation_fault;
    table[V::PageFault as usize] = segmentation_fault;
    table[V::CoprocessorError as usize] = coprocessor_error;
    table[V::AlignmentCheck as usize] = segmentation_fault;
    table[V::MachineCheck as usize] = fatal_always;
    table[V::SimdFloatingPoint as usize] = divide_error;
    table
};

pub fn exception_name(vector: u8) -> &'static str {
    ExceptionVector::from_vector(vector).map_or("Reserved", ExceptionVector::name)
}

pub fn handle(vector: u8, frame: &mut TrapFrame, ctx: &TrapContext<'_>) -> TrapOutcome {
    klog_debug!(
        "EXCEPTION: vec={} ({}) rip={:#x} err={:#x} cs={:#x}",
        vector,
        exception_name(vector),
        frame.rip,
        frame.error_code,
        frame.cs
    );
    match EXCEPTION_HANDLERS.get(vector as usize) {
        Some(handler) => handler(frame, ctx),
        None => reserved_vector(frame, ctx),
    }
}

/// Record `signal` against the current task if the fault came from user
/// mode; anything else cannot be resumed.
fn signal_current(frame: &TrapFrame, ctx: &TrapContext<'_>, signal: Signal) -> TrapOutcome {
    let name = exception_name(frame.vector());
    if !frame.from_user() {
        // The fault may have interrupted a console write.
        klog_enter_panic();
        klog_error!("EXCEPTION: {} in kernel mode at {:#x}", name, frame.rip);
        return TrapOutcome::Fatal(name);
    }
    match ctx.tasks().current() {
        Some(task) => {
            task.signals().raise(signal);
            klog_info!("EXCEPTION: {} in task {}, signal {} pending", name, task.id(), signal.number());
            TrapOutcome::Resume
        }
        None => TrapOutcome::Fatal("user-mode fault with no current task"),
    }
}

fn divide_error(frame: &mut TrapFrame, ctx: &TrapContext<'_>) -> TrapOutcome {
    signal_current(frame, ctx, Signal::Fpe)
}

fn invalid_opcode(frame: &mut TrapFrame, ctx: &TrapContext<'_>) -> TrapOutcome {
    signal_current(frame, ctx, Signal::Ill)
}

fn segmentation_fault(frame: &mut TrapFrame, ctx: &TrapContext<'_>) -> TrapOutcome {
    signal_current(frame, ctx, Signal::Segv)
}

fn debug_trap(frame: &mut TrapFrame, ctx: &TrapContext<'_>) -> TrapOutcome {
    if frame.from_user() {
        return signal_current(frame, ctx, Signal::Trap);
    }
    klog_info!("DEBUG: {} at {:#x}", exception_name(frame.vector()), frame.rip);
    TrapOutcome::Resume
}

/// The FPU was touched after a task switch: hand it to the current task.
fn device_not_available(_frame: &mut TrapFrame, ctx: &TrapContext<'_>) -> TrapOutcome {
    ctx.hw().clear_task_switched();
    ctx.tasks().set_math_owner(ctx.tasks().current());
    TrapOutcome::Resume
}

/// Pending x87 exception: clear the flags so the FPU is usable again and
/// flag SIGFPE on the task whose state is in the FPU.
fn coprocessor_error(_frame: &mut TrapFrame, ctx: &TrapContext<'_>) -> TrapOutcome {
    ctx.hw().clear_fpu_exceptions();
    if let Some(task) = ctx.tasks().math_owner() {
        task.signals().raise(Signal::Fpe);
    }
    TrapOutcome::Resume
}

fn fatal_always(frame: &mut TrapFrame, _ctx: &TrapContext<'_>) -> TrapOutcome {
    TrapOutcome::Fatal(exception_name(frame.vector()))
}

fn reserved_vector(frame: &mut TrapFrame, _ctx: &TrapContext<'_>) -> TrapOutcome {
    klog_enter_panic();
    klog_error!("EXCEPTION: reserved vector {}", frame.vector());
    TrapOutcome::Fatal("reserved exception vector")
}

#[cfg(test)]
mod tests {
    use halcyon_abi::{PrivilegeLevel, SignalSet};
    use halcyon_lib::hw::mock::{HwEvent, RecordingHardware};

    use super::*;
    use crate::syscall::{SyscallTable, UserWindow};
    use crate::task::{Task, TaskRegistry};

    fn raise(vector: ExceptionVector, level: PrivilegeLevel, ctx: &TrapContext<'_>) -> TrapOutcome {
        let mut frame = TrapFrame::exception(vector.vector(), level);
        crate::trap::dispatch(&mut frame, ctx)
    }

    #[test]
    fn coprocessor_error_flags_fpe_once() {
        static TASK: Task = Task::new(7);
        let hw = RecordingHardware::new();
        let tasks = TaskRegistry::new();
        tasks.set_math_owner(Some(&TASK));
        let table = SyscallTable::empty();
        let ctx = TrapContext::new(&hw, &table, &tasks, UserWindow::USER_SPACE);

        for _ in 0..2 {
            let outcome = raise(ExceptionVector::CoprocessorError, PrivilegeLevel::Ring3, &ctx);
            assert_eq!(outcome, TrapOutcome::Resume);
        }

        assert_eq!(TASK.signals().snapshot(), SignalSet::FPE);
        assert_eq!(hw.count(HwEvent::ClearFpuExceptions), 2);
    }

    #[test]
    fn coprocessor_error_without_owner_only_clears() {
        let hw = RecordingHardware::new();
        let tasks = TaskRegistry::new();
        let table = SyscallTable::empty();
        let ctx = TrapContext::new(&hw, &table, &tasks, UserWindow::USER_SPACE);
        let outcome = raise(ExceptionVector::CoprocessorError, PrivilegeLevel::Ring0, &ctx);
        assert_eq!(outcome, TrapOutcome::Resume);
        assert_eq!(hw.count(HwEvent::ClearFpuExceptions), 1);
    }

    #[test]
    fn user_faults_become_signals() {
        static TASK: Task = Task::new(3);
        let hw = RecordingHardware::new();
        let tasks = TaskRegistry::new();
        tasks.set_current(Some(&TASK));
        let table = SyscallTable::empty();
        let ctx = TrapContext::new(&hw, &table, &tasks, UserWindow::USER_SPACE);

        raise(ExceptionVector::GeneralProtection, PrivilegeLevel::Ring3, &ctx);
        raise(ExceptionVector::InvalidOpcode, PrivilegeLevel::Ring3, &ctx);
        raise(ExceptionVector::DivideError, PrivilegeLevel::Ring3, &ctx);

        assert_eq!(
            TASK.signals().snapshot(),
            SignalSet::SEGV | SignalSet::ILL | SignalSet::FPE
        );
    }

    #[test]
    fn kernel_faults_are_fatal() {
        let hw = RecordingHardware::new();
        let tasks = TaskRegistry::new();
        let table = SyscallTable::empty();
        let ctx = TrapContext::new(&hw, &table, &tasks, UserWindow::USER_SPACE);
        assert_eq!(
            raise(ExceptionVector::PageFault, PrivilegeLevel::Ring0, &ctx),
            TrapOutcome::Fatal("Page Fault")
        );
        assert!(matches!(
            raise(ExceptionVector::DoubleFault, PrivilegeLevel::Ring3, &ctx),
            TrapOutcome::Fatal(_)
        ));
        let mut reserved = TrapFrame::exception(15, PrivilegeLevel::Ring0);
        assert!(matches!(
            crate::trap::dispatch(&mut reserved, &ctx),
            TrapOutcome::Fatal(_)
        ));
    }

    #[test]
    fn device_not_available_claims_the_fpu() {
        static TASK: Task = Task::new(9);
        let hw = RecordingHardware::new();
        let tasks = TaskRegistry::new();
        tasks.set_current(Some(&TASK));
        let table = SyscallTable::empty();
        let ctx = TrapContext::new(&hw, &table, &tasks, UserWindow::USER_SPACE);
        raise(ExceptionVector::DeviceNotAvailable, PrivilegeLevel::Ring3, &ctx);
        assert_eq!(tasks.math_owner().map(Task::id), Some(9));
        assert_eq!(hw.count(HwEvent::ClearTaskSwitched), 1);
    }

    #[test]
    fn kernel_breakpoint_resumes() {
        let hw = RecordingHardware::new();
        let tasks = TaskRegistry::new();
        let table = SyscallTable::empty();
        let ctx = TrapContext::new(&hw, &table, &tasks, UserWindow::USER_SPACE);
        assert_eq!(
            raise(ExceptionVector::Breakpoint, PrivilegeLevel::Ring0, &ctx),
            TrapOutcome::Resume
        );
    }
}
