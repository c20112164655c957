//! The trap instruction itself.

/// Issues a syscall trap: selector in `rax`, arguments in `rdi`, `rsi`,
/// `rdx`; the raw result comes back in `rax`.
pub trait TrapGate: Sync {
    fn trap(&self, selector: u64, args: [u64; 3]) -> i64;
}

impl<G: TrapGate + ?Sized> TrapGate for &G {
    #[inline]
    fn trap(&self, selector: u64, args: [u64; 3]) -> i64 {
        (**self).trap(selector, args)
    }
}

/// `int 0x80` into the running kernel.
#[derive(Clone, Copy, Debug, Default)]
pub struct SoftwareInterrupt;

#[cfg(target_arch = "x86_64")]
impl TrapGate for SoftwareInterrupt {
    #[inline(always)]
    fn trap(&self, selector: u64, args: [u64; 3]) -> i64 {
        let ret: i64;
        // SAFETY: the kernel's syscall gate only writes `rax`; every other
        // register is restored before `iretq`.
        unsafe {
            core::arch::asm!(
                "int 0x80",
                inlateout("rax") selector as i64 => ret,
                in("rdi") args[0],
                in("rsi") args[1],
                in("rdx") args[2],
                options(nostack),
            );
        }
        ret
    }
}
