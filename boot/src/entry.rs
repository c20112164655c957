//! Trap entry stubs.
//!
//! Each stub leaves a uniform frame on the kernel stack: a zero error code
//! where the CPU pushes none, the vector number, then every general
//! register. The layout is [`TrapFrame`], lowest address first.

use core::arch::global_asm;

use halcyon_core::{TrapFrame, TrapOutcome, dispatch};
use halcyon_lib::{klog_enter_panic, klog_error};

use crate::hal::kernel_trap_context;
use crate::idt::{EntryPoint, GateSpec, KERNEL_GATES};
use crate::kernel_panic::{kernel_panic, kernel_panic_with};

macro_rules! trap_stub {
    ($name:ident, $vector:literal) => {
        global_asm!(concat!(
            ".global ", stringify!($name), "\n",
            ".p2align 4\n",
            stringify!($name), ":\n",
            "    push 0\n",
            "    push ", stringify!($vector), "\n",
            "    jmp halcyon_trap_common\n",
        ));
    };
    ($name:ident, $vector:literal, error_code) => {
        global_asm!(concat!(
            ".global ", stringify!($name), "\n",
            ".p2align 4\n",
            stringify!($name), ":\n",
            "    push ", stringify!($vector), "\n",
            "    jmp halcyon_trap_common\n",
        ));
    };
}

global_asm!(
    ".global halcyon_trap_common",
    ".p2align 4",
    "halcyon_trap_common:",
    "    push rax",
    "    push rbx",
    "    push rcx",
    "    push rdx",
    "    push rsi",
    "    push rdi",
    "    push rbp",
    "    push r8",
    "    push r9",
    "    push r10",
    "    push r11",
    "    push r12",
    "    push r13",
    "    push r14",
    "    push r15",
    "    cld",
    "    mov rdi, rsp",
    "    call common_trap_entry",
    "    pop r15",
    "    pop r14",
    "    pop r13",
    "    pop r12",
    "    pop r11",
    "    pop r10",
    "    pop r9",
    "    pop r8",
    "    pop rbp",
    "    pop rdi",
    "    pop rsi",
    "    pop rdx",
    "    pop rcx",
    "    pop rbx",
    "    pop rax",
    "    add rsp, 16",
    "    iretq",
);

trap_stub!(halcyon_trap_0, 0);
trap_stub!(halcyon_trap_1, 1);
trap_stub!(halcyon_trap_2, 2);
trap_stub!(halcyon_trap_3, 3);
trap_stub!(halcyon_trap_4, 4);
trap_stub!(halcyon_trap_5, 5);
trap_stub!(halcyon_trap_6, 6);
trap_stub!(halcyon_trap_7, 7);
trap_stub!(halcyon_trap_8, 8, error_code);
trap_stub!(halcyon_trap_10, 10, error_code);
trap_stub!(halcyon_trap_11, 11, error_code);
trap_stub!(halcyon_trap_12, 12, error_code);
trap_stub!(halcyon_trap_13, 13, error_code);
trap_stub!(halcyon_trap_14, 14, error_code);
trap_stub!(halcyon_trap_16, 16);
trap_stub!(halcyon_trap_17, 17, error_code);
trap_stub!(halcyon_trap_18, 18);
trap_stub!(halcyon_trap_19, 19);
trap_stub!(halcyon_trap_128, 128);

unsafe extern "C" {
    fn halcyon_trap_0();
    fn halcyon_trap_1();
    fn halcyon_trap_2();
    fn halcyon_trap_3();
    fn halcyon_trap_4();
    fn halcyon_trap_5();
    fn halcyon_trap_6();
    fn halcyon_trap_7();
    fn halcyon_trap_8();
    fn halcyon_trap_10();
    fn halcyon_trap_11();
    fn halcyon_trap_12();
    fn halcyon_trap_13();
    fn halcyon_trap_14();
    fn halcyon_trap_16();
    fn halcyon_trap_17();
    fn halcyon_trap_18();
    fn halcyon_trap_19();
    fn halcyon_trap_128();
}

/// Stubs in `KERNEL_GATES` order.
const STUBS: [unsafe extern "C" fn(); KERNEL_GATES.len()] = [
    halcyon_trap_0,
    halcyon_trap_1,
    halcyon_trap_2,
    halcyon_trap_3,
    halcyon_trap_4,
    halcyon_trap_5,
    halcyon_trap_6,
    halcyon_trap_7,
    halcyon_trap_8,
    halcyon_trap_10,
    halcyon_trap_11,
    halcyon_trap_12,
    halcyon_trap_13,
    halcyon_trap_14,
    halcyon_trap_16,
    halcyon_trap_17,
    halcyon_trap_18,
    halcyon_trap_19,
    halcyon_trap_128,
];

/// Gates of the running kernel, bound to their stubs.
pub fn kernel_gate_layout() -> [GateSpec; KERNEL_GATES.len()] {
    core::array::from_fn(|i| KERNEL_GATES[i].bind(EntryPoint::from_stub(STUBS[i])))
}

#[unsafe(no_mangle)]
extern "C" fn common_trap_entry(frame: *mut TrapFrame) {
    let Some(ctx) = kernel_trap_context() else {
        kernel_panic("trap taken before the interrupt stage");
    };
    // SAFETY: the stub passes its own stack frame, which stays valid and
    // unaliased until this function returns.
    let frame = unsafe { &mut *frame };
    if let TrapOutcome::Fatal(reason) = dispatch(frame, ctx) {
        klog_enter_panic();
        klog_error!(
            "trap: vector {} err={:#x} rip={:#x} cs={:#x} rsp={:#x}",
            frame.vector(),
            frame.error_code,
            frame.rip,
            frame.cs,
            frame.rsp
        );
        kernel_panic_with(format_args!("{}", reason));
    }
}
