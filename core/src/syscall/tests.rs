use std::sync::{Mutex, Once};

use halcyon_abi::{Errno, Syscall, decode_result};
use halcyon_lib::hw::mock::RecordingHardware;

use super::*;
use crate::services::console::{ConsoleServices, register_console_services};
use crate::task::{Task, TaskRegistry};
use crate::trap::{TrapContext, TrapFrame, dispatch};

static CAPTURED: Mutex<Vec<u8>> = Mutex::new(Vec::new());
static CONSOLE_ONCE: Once = Once::new();

fn capture_write(bytes: &[u8]) -> SysResult {
    CAPTURED.lock().unwrap().extend_from_slice(bytes);
    Ok(bytes.len() as u64)
}

static CAPTURE_CONSOLE: ConsoleServices = ConsoleServices {
    write: capture_write,
};

fn install_console() {
    CONSOLE_ONCE.call_once(|| {
        assert!(register_console_services(&CAPTURE_CONSOLE));
    });
}

fn window_over(buf: &[u8]) -> UserWindow {
    let start = buf.as_ptr() as u64;
    UserWindow::new(start, start + buf.len() as u64)
}

fn call(ctx: &TrapContext<'_>, selector: u64, args: [u64; 3]) -> Result<u64, u64> {
    let mut frame = TrapFrame {
        rbx: 0xB0B0,
        rcx: 0xC0C0,
        r8: 0x8888,
        r15: 0xF0F0,
        rip: 0x0040_1000,
        rsp: 0x0070_0000,
        ..TrapFrame::user_syscall(selector, args)
    };
    let mut before = frame;
    dispatch(&mut frame, ctx);
    before.rax = frame.rax;
    assert_eq!(frame, before, "only rax may change across a syscall");
    decode_result(frame.rax as i64)
}

#[test]
fn write_to_stdout_reaches_console() {
    install_console();
    let hw = RecordingHardware::new();
    let tasks = TaskRegistry::new();
    let buf = *b"hello";
    let ctx = TrapContext::new(&hw, &KERNEL_SYSCALLS, &tasks, window_over(&buf));
    ctx.open_syscalls();

    let result = call(&ctx, Syscall::Write.number(), [1, buf.as_ptr() as u64, 5]);
    assert_eq!(result, Ok(5));
    let captured = CAPTURED.lock().unwrap();
    assert!(captured.windows(5).any(|w| w == b"hello"));
}

#[test]
fn write_rejects_pointers_outside_the_window() {
    let hw = RecordingHardware::new();
    let tasks = TaskRegistry::new();
    let buf = [0u8; 8];
    let ctx = TrapContext::new(&hw, &KERNEL_SYSCALLS, &tasks, window_over(&buf));
    ctx.open_syscalls();

    let efault = Errno::EFAULT.as_raw() as u64;
    assert_eq!(call(&ctx, 4, [1, 0, 4]), Err(efault));
    assert_eq!(call(&ctx, 4, [1, buf.as_ptr() as u64, 9]), Err(efault));
    assert_eq!(call(&ctx, 4, [1, u64::MAX - 1, 4]), Err(efault));
    assert_eq!(call(&ctx, 4, [1, buf.as_ptr() as u64, 0]), Ok(0));
    assert_eq!(call(&ctx, 4, [u32::MAX as u64, buf.as_ptr() as u64, 1]), Err(Errno::EBADF.as_raw() as u64));
}

#[test]
fn unregistered_fs_reports_enosys() {
    let hw = RecordingHardware::new();
    let tasks = TaskRegistry::new();
    let buf = [0u8; 4];
    let path = *b"/etc\0";
    let ctx = TrapContext::new(&hw, &KERNEL_SYSCALLS, &tasks, window_over(&buf));
    ctx.open_syscalls();

    let enosys = Errno::ENOSYS.as_raw() as u64;
    assert_eq!(call(&ctx, Syscall::Close.number(), [3, 0, 0]), Err(enosys));
    assert_eq!(call(&ctx, Syscall::Read.number(), [3, buf.as_ptr() as u64, 4]), Err(enosys));

    let path_ctx = TrapContext::new(&hw, &KERNEL_SYSCALLS, &tasks, window_over(&path));
    path_ctx.open_syscalls();
    assert_eq!(call(&path_ctx, Syscall::Open.number(), [path.as_ptr() as u64, 0, 0]), Err(enosys));
}

#[test]
fn open_rejects_empty_and_unterminated_paths() {
    let hw = RecordingHardware::new();
    let tasks = TaskRegistry::new();
    let empty = [0u8; 1];
    let ctx = TrapContext::new(&hw, &KERNEL_SYSCALLS, &tasks, window_over(&empty));
    ctx.open_syscalls();
    assert_eq!(call(&ctx, 5, [empty.as_ptr() as u64, 0, 0]), Err(Errno::ENOENT.as_raw() as u64));

    let unterminated = *b"abc";
    let ctx = TrapContext::new(&hw, &KERNEL_SYSCALLS, &tasks, window_over(&unterminated));
    ctx.open_syscalls();
    assert_eq!(
        call(&ctx, 5, [unterminated.as_ptr() as u64, 0, 0]),
        Err(Errno::EFAULT.as_raw() as u64)
    );
}

#[test]
fn getpid_needs_a_current_task() {
    static TASK: Task = Task::new(42);
    let hw = RecordingHardware::new();
    let tasks = TaskRegistry::new();
    let ctx = TrapContext::new(&hw, &KERNEL_SYSCALLS, &tasks, UserWindow::USER_SPACE);
    ctx.open_syscalls();

    assert_eq!(call(&ctx, 20, [0; 3]), Err(Errno::ESRCH.as_raw() as u64));
    tasks.set_current(Some(&TASK));
    assert_eq!(call(&ctx, 20, [0; 3]), Ok(42));
}

#[test]
fn unknown_selectors_report_enosys() {
    let hw = RecordingHardware::new();
    let tasks = TaskRegistry::new();
    let ctx = TrapContext::new(&hw, &KERNEL_SYSCALLS, &tasks, UserWindow::USER_SPACE);
    ctx.open_syscalls();

    let enosys = Errno::ENOSYS.as_raw() as u64;
    assert_eq!(call(&ctx, 2, [0; 3]), Err(enosys));
    assert_eq!(call(&ctx, 9999, [0; 3]), Err(enosys));
    assert_eq!(call(&ctx, u64::MAX, [0; 3]), Err(enosys));
}

#[test]
fn oversized_success_is_erange() {
    fn huge(_ctx: &mut SyscallContext<'_>) -> SysResult {
        Ok(u64::MAX)
    }
    static TABLE: SyscallTable = SyscallTable::empty().with(Syscall::Time, huge);
    let hw = RecordingHardware::new();
    let tasks = TaskRegistry::new();
    let ctx = TrapContext::new(&hw, &TABLE, &tasks, UserWindow::USER_SPACE);
    ctx.open_syscalls();
    assert_eq!(call(&ctx, 13, [0; 3]), Err(Errno::ERANGE.as_raw() as u64));
}
