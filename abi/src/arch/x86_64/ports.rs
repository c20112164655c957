//! x86 I/O port addresses.

/// x86 I/O port address.
///
/// Ports are accessed via IN/OUT instructions. This newtype groups the
/// port addresses the console and timer code touch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Port(pub u16);

impl Port {
    // =========================================================================
    // Serial (8250/16550 UART)
    // =========================================================================

    /// COM1 serial port base address.
    pub const COM1: Self = Self(0x3F8);

    // =========================================================================
    // Programmable Interval Timer (8254 PIT)
    // =========================================================================

    /// PIT Channel 2 data port (gated by the speaker control port).
    pub const PIT_CHANNEL2: Self = Self(0x42);

    /// PIT Command/mode register port.
    pub const PIT_COMMAND: Self = Self(0x43);

    /// System control port B: PIT channel 2 gate (bit 0) and output (bit 5).
    pub const SYSTEM_CONTROL_B: Self = Self(0x61);

    /// Unused POST diagnostic port, written for short I/O delays.
    pub const POST_DELAY: Self = Self(0x80);

    #[inline]
    pub const fn number(self) -> u16 {
        self.0
    }

    /// Port at `offset` from this base (UART register addressing).
    #[inline]
    pub const fn offset(self, offset: u16) -> Self {
        Self(self.0 + offset)
    }
}
