use std::sync::Once;

use halcyon_abi::{Errno, ExceptionVector, PrivilegeLevel, SignalSet, SysResult, Syscall};
use halcyon_boot::idt::{EntryPoint, GateSpec, KERNEL_GATES};
use halcyon_boot::{BootError, BootHooks, BootStage, HalSequencer, MachineInfo, MemoryLayout};
use halcyon_core::services::console::{ConsoleServices, register_console_services};
use halcyon_core::syscall::context::SyscallContext;
use halcyon_core::syscall::{KERNEL_SYSCALLS, SyscallTable, UserWindow};
use halcyon_core::{Task, TaskRegistry, TrapContext, TrapFrame, TrapOutcome, dispatch};
use halcyon_drivers::vga::{DEFAULT_ATTRIBUTE, TextConsole, VGA_BUFFER_BYTES};
use halcyon_lib::hw::mock::{HwEvent, RecordingHardware};
use halcyon_userland::Syscalls;
use spin::Mutex;

use crate::Loopback;

const MIB: u64 = 1024 * 1024;

static SCREEN: Mutex<TextConsole<[u8; VGA_BUFFER_BYTES]>> =
    Mutex::new(TextConsole::new([0; VGA_BUFFER_BYTES]));
static CONSOLE_ONCE: Once = Once::new();

fn screen_write(bytes: &[u8]) -> SysResult {
    SCREEN.lock().write_bytes(bytes);
    Ok(bytes.len() as u64)
}

static SCREEN_CONSOLE: ConsoleServices = ConsoleServices {
    write: screen_write,
};

fn install_screen() {
    CONSOLE_ONCE.call_once(|| {
        register_console_services(&SCREEN_CONSOLE);
    });
}

struct Machine;

impl BootHooks for Machine {
    fn platform(&mut self) -> Result<MachineInfo, BootError> {
        Ok(MachineInfo {
            memory_end: 64 * MIB,
            hhdm_offset: 0xFFFF_8000_0000_0000,
            usable_regions: 3,
            kernel_stack_top: 0xFFFF_8000_0008_0000,
            cmdline: "log=info",
        })
    }

    fn memory(&mut self, _machine: &MachineInfo, layout: &MemoryLayout) -> Result<(), BootError> {
        assert_eq!(layout.buffer_end, 4 * MIB);
        Ok(())
    }
}

fn leak<T>(value: T) -> &'static T {
    Box::leak(Box::new(value))
}

fn fake_gates() -> Vec<GateSpec> {
    KERNEL_GATES
        .iter()
        .enumerate()
        .filter_map(|(i, shape)| Some(shape.bind(EntryPoint::new(0x20_0000 + i as u64 * 16)?)))
        .collect()
}

struct Kernel {
    hw: &'static RecordingHardware,
    tasks: &'static TaskRegistry,
    ctx: &'static TrapContext<'static>,
    hal: &'static HalSequencer,
}

impl Kernel {
    /// A kernel that has not been booted yet.
    fn cold(table: &'static SyscallTable, window: UserWindow) -> Self {
        let hw = leak(RecordingHardware::new());
        let tasks = leak(TaskRegistry::new());
        let ctx = leak(TrapContext::new(hw, table, tasks, window));
        Self {
            hw,
            tasks,
            ctx,
            hal: leak(HalSequencer::new()),
        }
    }

    fn booted(table: &'static SyscallTable, window: UserWindow) -> Self {
        let kernel = Self::cold(table, window);
        kernel
            .hal
            .run(&mut Machine, kernel.ctx, &fake_gates())
            .expect("boot sequence");
        kernel
    }

    fn user(&self) -> Syscalls<Loopback<'static>> {
        Syscalls::new(Loopback::new(self.ctx))
    }

    fn raise(&self, vector: ExceptionVector, level: PrivilegeLevel) -> TrapOutcome {
        let mut frame = TrapFrame::exception(vector.vector(), level);
        dispatch(&mut frame, self.ctx)
    }
}

fn window_over(buf: &[u8]) -> UserWindow {
    let start = buf.as_ptr() as u64;
    UserWindow::new(start, start + buf.len() as u64)
}

#[test]
fn hello_reaches_the_screen() {
    install_screen();
    let message: &'static [u8; 5] = leak(*b"hello");
    let kernel = Kernel::booted(&KERNEL_SYSCALLS, window_over(message));
    let gate = kernel.hal.gate_table().expect("gate table").gate(0x80);
    assert!(gate.is_present());

    let sys = kernel.user();
    assert_eq!(sys.write(1, message), 5);
    assert_eq!(sys.errno(), 0);

    let screen = SCREEN.lock();
    let attr = DEFAULT_ATTRIBUTE;
    let expected = [b'h', attr, b'e', attr, b'l', attr, b'l', attr, b'o', attr];
    assert!(screen.memory().windows(expected.len()).any(|cells| cells == expected));
}

#[test]
fn unknown_selector_sets_enosys() {
    let kernel = Kernel::booted(&KERNEL_SYSCALLS, UserWindow::USER_SPACE);
    let sys = kernel.user();
    assert_eq!(sys.invoke::<i64>(999, [0; 3]), -1);
    assert_eq!(sys.errno(), 38);
    assert_eq!(sys.last_error(), Some(Errno::ENOSYS));
}

#[test]
fn coprocessor_error_twice_leaves_one_bit() {
    static TASK: Task = Task::new(5);
    let kernel = Kernel::booted(&KERNEL_SYSCALLS, UserWindow::USER_SPACE);
    kernel.tasks.set_math_owner(Some(&TASK));

    for _ in 0..2 {
        assert_eq!(
            kernel.raise(ExceptionVector::CoprocessorError, PrivilegeLevel::Ring3),
            TrapOutcome::Resume
        );
    }

    assert_eq!(TASK.signals().snapshot(), SignalSet::FPE);
    assert_eq!(TASK.signals().snapshot().bits().count_ones(), 1);
    assert_eq!(kernel.hw.count(HwEvent::ClearFpuExceptions), 2);
}

#[test]
fn kernel_error_becomes_errno() {
    fn deny(_ctx: &mut SyscallContext<'_>) -> SysResult {
        Err(Errno::EACCES)
    }
    static TABLE: SyscallTable = SyscallTable::empty().with(Syscall::Open, deny);

    let kernel = Kernel::booted(&TABLE, UserWindow::USER_SPACE);
    let sys = kernel.user();
    assert_eq!(sys.open(c"/etc/passwd", 0, 0), -1);
    assert_eq!(sys.errno(), 13);
}

#[test]
fn syscalls_before_ready_are_refused() {
    let kernel = Kernel::cold(&KERNEL_SYSCALLS, UserWindow::USER_SPACE);
    let sys = kernel.user();
    assert_eq!(sys.getpid(), -1);
    assert_eq!(sys.errno(), Errno::EAGAIN.as_raw());
    assert_eq!(kernel.hal.stage(), None);
}

#[test]
fn getpid_reports_the_current_task() {
    static TASK: Task = Task::new(17);
    let kernel = Kernel::booted(&KERNEL_SYSCALLS, UserWindow::USER_SPACE);
    kernel.tasks.set_current(Some(&TASK));
    assert_eq!(kernel.user().getpid(), 17);
}

#[test]
fn user_fault_is_recorded_and_calls_keep_working() {
    static TASK: Task = Task::new(23);
    let kernel = Kernel::booted(&KERNEL_SYSCALLS, UserWindow::USER_SPACE);
    kernel.tasks.set_current(Some(&TASK));

    assert_eq!(
        kernel.raise(ExceptionVector::PageFault, PrivilegeLevel::Ring3),
        TrapOutcome::Resume
    );
    assert!(TASK.signals().snapshot().contains(SignalSet::SEGV));
    assert_eq!(kernel.user().getpid(), 23);
}

#[test]
fn boot_runs_once() {
    let kernel = Kernel::booted(&KERNEL_SYSCALLS, UserWindow::USER_SPACE);
    let again = kernel.hal.run(&mut Machine, kernel.ctx, &fake_gates());
    assert_eq!(again, Err(BootError::AlreadyStarted));
    assert_eq!(kernel.hal.stage(), Some(BootStage::Ready));
    assert_eq!(kernel.hw.count(HwEvent::EnableInterrupts), 1);
}
