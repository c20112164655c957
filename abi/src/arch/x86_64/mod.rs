//! x86_64 architecture definitions.
//!
//! Raw integer constants are wrapped in newtypes to prevent misuse:
//! - `SegmentSelector(u16)` for GDT selectors
//! - `Port(u16)` for I/O port addresses
//! - `PrivilegeLevel` for descriptor privilege levels

pub mod gdt;
pub mod idt;
pub mod ports;

pub use gdt::{PrivilegeLevel, SegmentSelector};
pub use idt::{GateKind, TableRegister};
pub use ports::Port;
