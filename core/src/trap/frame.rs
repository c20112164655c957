use core::mem::{offset_of, size_of};

use halcyon_abi::{PrivilegeLevel, SYSCALL_VECTOR, SegmentSelector};

/// Register snapshot taken at a privilege-boundary crossing.
///
/// The entry stubs build this on the kernel stack: CPU-pushed words at the
/// top, then error code and vector, then the general registers pushed in
/// `rax`..`r15` order so `r15` ends up at the lowest address. Field order
/// here is therefore lowest address first.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TrapFrame {
    pub r15: u64,
    pub r14: u64,
    pub r13: u64,
    pub r12: u64,
    pub r11: u64,
    pub r10: u64,
    pub r9: u64,
    pub r8: u64,
    pub rbp: u64,
    pub rdi: u64,
    pub rsi: u64,
    pub rdx: u64,
    pub rcx: u64,
    pub rbx: u64,
    pub rax: u64,
    pub vector: u64,
    pub error_code: u64,
    pub rip: u64,
    pub cs: u64,
    pub rflags: u64,
    pub rsp: u64,
    pub ss: u64,
}

/// Byte offsets the entry stubs rely on.
pub const FRAME_RAX_OFFSET: usize = 14 * 8;
pub const FRAME_VECTOR_OFFSET: usize = 15 * 8;
pub const FRAME_RIP_OFFSET: usize = 17 * 8;
pub const FRAME_SIZE: usize = 22 * 8;

const _: () = {
    assert!(offset_of!(TrapFrame, r15) == 0);
    assert!(offset_of!(TrapFrame, rax) == FRAME_RAX_OFFSET);
    assert!(offset_of!(TrapFrame, vector) == FRAME_VECTOR_OFFSET);
    assert!(offset_of!(TrapFrame, rip) == FRAME_RIP_OFFSET);
    assert!(size_of::<TrapFrame>() == FRAME_SIZE);
};

const RFLAGS_IF: u64 = 1 << 9;
const RFLAGS_RESERVED: u64 = 1 << 1;

impl TrapFrame {
    /// Frame as the syscall stub would capture it for a ring-3 `int 0x80`.
    pub fn user_syscall(selector: u64, args: [u64; 3]) -> Self {
        Self {
            rax: selector,
            rdi: args[0],
            rsi: args[1],
            rdx: args[2],
            vector: SYSCALL_VECTOR as u64,
            cs: SegmentSelector::USER_CODE.bits() as u64,
            ss: SegmentSelector::USER_DATA.bits() as u64,
            rflags: RFLAGS_IF | RFLAGS_RESERVED,
            ..Self::default()
        }
    }

    /// Frame for a processor exception raised at the given privilege level.
    pub fn exception(vector: u8, level: PrivilegeLevel) -> Self {
        let (cs, ss) = match level {
            PrivilegeLevel::Ring3 => (SegmentSelector::USER_CODE, SegmentSelector::USER_DATA),
            _ => (SegmentSelector::KERNEL_CODE, SegmentSelector::KERNEL_DATA),
        };
        Self {
            vector: vector as u64,
            cs: cs.bits() as u64,
            ss: ss.bits() as u64,
            rflags: RFLAGS_RESERVED,
            ..Self::default()
        }
    }

    #[inline]
    pub fn vector(&self) -> u8 {
        (self.vector & 0xFF) as u8
    }

    /// Privilege level the interrupted code was running at.
    #[inline]
    pub fn privilege(&self) -> PrivilegeLevel {
        PrivilegeLevel::from_bits(self.cs as u8)
    }

    #[inline]
    pub fn from_user(&self) -> bool {
        self.privilege() == PrivilegeLevel::Ring3
    }

    #[inline]
    pub fn selector(&self) -> u64 {
        self.rax
    }

    #[inline]
    pub fn syscall_args(&self) -> [u64; 3] {
        [self.rdi, self.rsi, self.rdx]
    }

    #[inline]
    pub fn set_result(&mut self, value: i64) {
        self.rax = value as u64;
    }
}
