use core::fmt;

use halcyon_lib::{cpu, klog_enter_panic, klog_error};

/// Report `args` and halt this CPU for good.
pub fn kernel_panic_with(args: fmt::Arguments<'_>) -> ! {
    cpu::disable_interrupts();
    klog_enter_panic();
    klog_error!("Kernel panic: {}", args);
    cpu::halt_loop()
}

#[inline]
pub fn kernel_panic(message: &str) -> ! {
    kernel_panic_with(format_args!("{}", message))
}
