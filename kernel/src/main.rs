#![cfg_attr(target_os = "none", no_std, no_main)]
#![forbid(unsafe_op_in_unsafe_fn)]

#[cfg(target_os = "none")]
mod platform;

#[cfg(target_os = "none")]
mod kernel {
    use core::panic::PanicInfo;

    use halcyon_boot::{init_hal, kernel_gate_layout};
    use halcyon_core::syscall::{KERNEL_SYSCALLS, UserWindow};
    use halcyon_core::{KERNEL_TASKS, Task, TrapContext};
    use halcyon_drivers::{serial, serial_println};
    use halcyon_lib::hw::X86Hardware;
    use halcyon_lib::{cpu, klog_error, klog_info};
    use halcyon_userland::SYS;

    use crate::platform::LiminePlatform;

    static HARDWARE: X86Hardware = X86Hardware;

    static TRAP_CONTEXT: TrapContext<'static> =
        TrapContext::new(&HARDWARE, &KERNEL_SYSCALLS, &KERNEL_TASKS, UserWindow::USER_SPACE);

    /// Task 0, current until a scheduler exists.
    static IDLE_TASK: Task = Task::new(0);

    #[panic_handler]
    fn panic(info: &PanicInfo) -> ! {
        cpu::disable_interrupts();
        serial::init();
        serial_println!("Kernel panic: {}", info);
        cpu::halt_loop();
    }

    #[unsafe(no_mangle)]
    pub extern "C" fn _start() -> ! {
        let ready = init_hal(&mut LiminePlatform, &TRAP_CONTEXT, &kernel_gate_layout());
        klog_info!(
            "halcyon: ready, {} usable regions, cmdline \"{}\"",
            ready.machine.usable_regions,
            ready.machine.cmdline
        );

        KERNEL_TASKS.set_current(Some(&IDLE_TASK));
        match SYS.getpid() {
            -1 => klog_error!("syscall gate: getpid failed, errno {}", SYS.errno()),
            pid => klog_info!("syscall gate: alive, pid {}", pid),
        }

        cpu::halt_loop();
    }
}

#[cfg(not(target_os = "none"))]
fn main() {}
