//! Kernel console: fan-out to the VGA text buffer and COM1.

use halcyon_lib::LogSink;
use spin::Mutex;

use crate::vga::{TextConsole, VgaMemory};

pub struct Console {
    vga: Mutex<Option<TextConsole<VgaMemory>>>,
    serial: bool,
}

pub static CONSOLE: Console = Console::new();

impl Console {
    pub const fn new() -> Self {
        Self {
            vga: Mutex::new(None),
            serial: cfg!(target_arch = "x86_64"),
        }
    }

    /// Attach the VGA text buffer mapped at `base` and clear it.
    ///
    /// # Safety
    /// See [`VgaMemory::new`].
    pub unsafe fn attach_vga(&self, base: *mut u8) {
        let mut console = TextConsole::new(unsafe { VgaMemory::new(base) });
        console.clear();
        *self.vga.lock() = Some(console);
    }

    pub fn write(&self, bytes: &[u8]) -> usize {
        if let Some(vga) = self.vga.lock().as_mut() {
            vga.write_bytes(bytes);
        }
        if self.serial {
            write_serial(bytes);
        }
        bytes.len()
    }

    /// Like [`Console::write`], but skips any device whose lock is held.
    pub fn write_panicking(&self, bytes: &[u8]) {
        if let Some(vga) = self.vga.try_lock().as_mut().and_then(|guard| guard.as_mut()) {
            vga.write_bytes(bytes);
        }
        if self.serial {
            try_write_serial(bytes);
        }
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink for Console {
    fn write_bytes(&self, bytes: &[u8]) {
        self.write(bytes);
    }

    fn write_bytes_panicking(&self, bytes: &[u8]) {
        self.write_panicking(bytes);
    }
}

#[cfg(target_arch = "x86_64")]
fn write_serial(bytes: &[u8]) {
    crate::serial::write_bytes(bytes);
}

#[cfg(target_arch = "x86_64")]
fn try_write_serial(bytes: &[u8]) {
    crate::serial::try_write_bytes(bytes);
}

#[cfg(not(target_arch = "x86_64"))]
fn write_serial(_bytes: &[u8]) {}

#[cfg(not(target_arch = "x86_64"))]
fn try_write_serial(_bytes: &[u8]) {}
