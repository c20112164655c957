use core::fmt::{self, Write};

use halcyon_abi::arch::x86_64::Port;
use halcyon_lib::delay;
use halcyon_lib::io;
use spin::Mutex;

// UART register offsets (8250/16450/16550 family)
const REG_DATA: u16 = 0; // RBR (read) / THR (write) / divisor low with DLAB
const REG_IER: u16 = 1; // Interrupt enable / divisor high with DLAB
const REG_FCR: u16 = 2; // FIFO control (write) / IIR (read)
const REG_LCR: u16 = 3;
const REG_MCR: u16 = 4;
const REG_LSR: u16 = 5;
const REG_SCR: u16 = 7;

const LCR_DLAB: u8 = 0x80;
const LCR_8N1: u8 = 0x03;

const IIR_FIFO_MASK: u8 = 0xC0;

const FCR_ENABLE_FIFO: u8 = 0x01;
const FCR_CLEAR_RX: u8 = 0x02;
const FCR_CLEAR_TX: u8 = 0x04;
const FCR_14_BYTE_THRESHOLD: u8 = 0xC0;

const LSR_TX_EMPTY: u8 = 0x20;

const MCR_DTR: u8 = 0x01;
const MCR_RTS: u8 = 0x02;
const MCR_AUX2: u8 = 0x08;

/// Divisor 1 = 115200 baud with the standard 1.8432 MHz clock.
const BAUD_DIVISOR: u16 = 1;

/// Longest time a single byte may wait for the transmitter.
const TX_TIMEOUT_US: u64 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UartType {
    Uart16450,
    Uart16550,
    Uart16550A,
    Absent,
}

static COM1: Mutex<SerialPort> = Mutex::new(SerialPort::new(Port::COM1));

pub fn init() -> UartType {
    let mut port = COM1.lock();
    // SAFETY: COM1 belongs to this driver; the lock serialises access.
    unsafe { port.init() }
}

/// Controller found by the last [`init`].
pub fn kind() -> UartType {
    COM1.lock().kind
}

/// Bytes given up on because the transmitter never drained.
pub fn dropped_bytes() -> u64 {
    COM1.lock().dropped
}

pub fn write_bytes(bytes: &[u8]) {
    let mut port = COM1.lock();
    for &byte in bytes {
        port.write_translated(byte);
    }
}

/// Drop `bytes` instead of waiting if the port is in use.
pub fn try_write_bytes(bytes: &[u8]) {
    if let Some(mut port) = COM1.try_lock() {
        for &byte in bytes {
            port.write_translated(byte);
        }
    }
}

pub fn write_line(s: &str) {
    let mut guard = COM1.lock();
    let _ = guard.write_str(s);
    let _ = guard.write_str("\n");
}

pub fn print_args(args: fmt::Arguments<'_>) {
    let _ = COM1.lock().write_fmt(args);
}

struct SerialPort {
    base: Port,
    kind: UartType,
    dropped: u64,
}

impl SerialPort {
    const fn new(base: Port) -> Self {
        Self {
            base,
            kind: UartType::Absent,
            dropped: 0,
        }
    }

    unsafe fn detect(&mut self) -> UartType {
        unsafe {
            io::outb(self.base.offset(REG_SCR), 0xA5);
            if io::inb(self.base.offset(REG_SCR)) != 0xA5 {
                return UartType::Absent;
            }

            io::outb(
                self.base.offset(REG_FCR),
                FCR_ENABLE_FIFO | FCR_CLEAR_RX | FCR_CLEAR_TX,
            );
            io::io_wait();
            let iir = io::inb(self.base.offset(REG_FCR));
            io::outb(self.base.offset(REG_FCR), 0);

            match iir & IIR_FIFO_MASK {
                IIR_FIFO_MASK => UartType::Uart16550A,
                0x80 => UartType::Uart16550,
                _ => UartType::Uart16450,
            }
        }
    }

    unsafe fn init(&mut self) -> UartType {
        unsafe {
            self.kind = self.detect();
            if self.kind == UartType::Absent {
                return self.kind;
            }

            io::outb(self.base.offset(REG_IER), 0x00);
            io::outb(self.base.offset(REG_LCR), LCR_DLAB);
            io::outb(self.base.offset(REG_DATA), BAUD_DIVISOR as u8);
            io::outb(self.base.offset(REG_IER), (BAUD_DIVISOR >> 8) as u8);
            io::outb(self.base.offset(REG_LCR), LCR_8N1);

            if self.kind == UartType::Uart16550A {
                io::outb(
                    self.base.offset(REG_FCR),
                    FCR_ENABLE_FIFO | FCR_CLEAR_RX | FCR_CLEAR_TX | FCR_14_BYTE_THRESHOLD,
                );
            }
            io::outb(self.base.offset(REG_MCR), MCR_DTR | MCR_RTS | MCR_AUX2);
        }
        self.kind
    }

    /// Transmit one byte, giving up (and counting the drop) if the
    /// transmitter stays busy past the timeout.
    fn write_byte(&mut self, byte: u8) {
        if self.kind == UartType::Absent {
            return;
        }
        let mut deadline = delay::deadline_us(TX_TIMEOUT_US);
        unsafe {
            while io::inb(self.base.offset(REG_LSR)) & LSR_TX_EMPTY == 0 {
                if deadline.expired() {
                    self.dropped += 1;
                    return;
                }
                core::hint::spin_loop();
            }
            io::outb(self.base.offset(REG_DATA), byte);
        }
    }

    fn write_translated(&mut self, byte: u8) {
        if byte == b'\n' {
            self.write_byte(b'\r');
        }
        self.write_byte(byte);
    }
}

impl Write for SerialPort {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            self.write_translated(byte);
        }
        Ok(())
    }
}

#[macro_export]
macro_rules! serial_print {
    ($($arg:tt)*) => {
        $crate::serial::print_args(format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! serial_println {
    () => {
        $crate::serial::write_line("")
    };
    ($($arg:tt)*) => {{
        $crate::serial::print_args(format_args!($($arg)*));
        $crate::serial::write_line("");
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uninitialised_port_swallows_output() {
        assert_eq!(kind(), UartType::Absent);
        write_bytes(b"lost\n");
        write_line("also lost");
        assert_eq!(dropped_bytes(), 0);
    }
}
