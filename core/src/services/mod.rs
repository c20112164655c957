//! Service interfaces implemented outside this crate.
//!
//! The console is provided by the drivers crate; filesystem and process
//! management belong to collaborators that register at boot. Until they
//! do, the corresponding syscalls report `ENOSYS` (console: `EIO`).

pub mod console;
pub mod fs;
pub mod process;
