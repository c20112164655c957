#![cfg_attr(not(test), no_std)]

pub mod config;
#[cfg(target_os = "none")]
pub mod entry;
pub mod error;
pub mod gdt;
pub mod hal;
pub mod idt;
pub mod kernel_panic;

pub use config::BootConfig;
#[cfg(target_os = "none")]
pub use entry::kernel_gate_layout;
pub use error::BootError;
pub use hal::{
    BootHooks, BootStage, HalReady, HalSequencer, MachineInfo, MemoryLayout, init_hal,
    kernel_trap_context,
};
pub use kernel_panic::{kernel_panic, kernel_panic_with};
