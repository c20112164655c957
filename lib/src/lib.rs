#![cfg_attr(not(test), no_std)]

#[cfg(target_arch = "x86_64")]
pub mod cpu {
    #[inline(always)]
    pub fn hlt() {
        x86_64::instructions::hlt();
    }

    #[inline(always)]
    pub fn disable_interrupts() {
        x86_64::instructions::interrupts::disable();
    }

    /// Mask interrupts and idle forever.
    #[inline(always)]
    pub fn halt_loop() -> ! {
        disable_interrupts();
        loop {
            hlt();
        }
    }
}

#[cfg(target_arch = "x86_64")]
pub mod io {
    use halcyon_abi::arch::x86_64::Port;
    use x86_64::instructions::port::Port as X86Port;

    /// # Safety
    /// Writing to an I/O port can have arbitrary device side effects.
    #[inline(always)]
    pub unsafe fn outb(port: Port, value: u8) {
        let mut port = X86Port::<u8>::new(port.number());
        unsafe { port.write(value) }
    }

    /// # Safety
    /// Reading from an I/O port can have arbitrary device side effects.
    #[inline(always)]
    pub unsafe fn inb(port: Port) -> u8 {
        let mut port = X86Port::<u8>::new(port.number());
        unsafe { port.read() }
    }

    #[inline(always)]
    pub fn io_wait() {
        unsafe { outb(Port::POST_DELAY, 0) }
    }
}

#[cfg(target_arch = "x86_64")]
pub mod tsc {
    use core::arch::asm;

    #[inline(always)]
    pub fn rdtsc() -> u64 {
        let lo: u32;
        let hi: u32;
        unsafe {
            asm!(
                "rdtsc",
                out("eax") lo,
                out("edx") hi,
                options(nomem, nostack, preserves_flags)
            );
        }
        ((hi as u64) << 32) | (lo as u64)
    }
}

pub mod delay;
pub mod hw;
pub mod init_flag;
pub mod klog;
pub mod service_cell;
pub mod service_macro;

pub use paste;

pub use hw::{Hardware, SegmentReload};
pub use init_flag::InitFlag;
pub use klog::{
    KlogLevel, LogSink, klog_attach, klog_enter_panic, klog_get_level, klog_init, klog_set_level,
};
pub use service_cell::ServiceCell;

#[inline(always)]
pub const fn align_up(value: u64, align: u64) -> u64 {
    (value + align - 1) & !(align - 1)
}

#[inline(always)]
pub const fn align_down(value: u64, align: u64) -> u64 {
    value & !(align - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alignment_helpers() {
        assert_eq!(align_down(0x1234, 0x1000), 0x1000);
        assert_eq!(align_up(0x1234, 0x1000), 0x2000);
        assert_eq!(align_up(0x2000, 0x1000), 0x2000);
    }
}
