//! Gate descriptor table definitions.

/// Number of gate slots the processor indexes by vector.
pub const IDT_ENTRIES: usize = 256;

/// Size in bytes of one long-mode gate descriptor.
pub const IDT_ENTRY_SIZE: usize = 16;

/// Present bit of the type/attribute byte.
pub const GATE_PRESENT: u8 = 1 << 7;

/// Shift of the DPL field inside the type/attribute byte.
pub const GATE_DPL_SHIFT: u8 = 5;

/// Gate type nibble of the type/attribute byte.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateKind {
    /// Clears IF on entry: 0x8E when present with DPL 0.
    Interrupt = 0xE,
    /// Leaves IF untouched: 0x8F when present with DPL 0.
    Trap = 0xF,
}

impl GateKind {
    #[inline]
    pub const fn bits(self) -> u8 {
        self as u8
    }

    pub const fn from_type_attr(type_attr: u8) -> Option<Self> {
        match type_attr & 0xF {
            0xE => Some(Self::Interrupt),
            0xF => Some(Self::Trap),
            _ => None,
        }
    }
}

/// Operand of `lgdt` / `lidt`: 16-bit limit followed by a 64-bit base.
#[repr(C, packed)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TableRegister {
    pub limit: u16,
    pub base: u64,
}

impl TableRegister {
    /// Register value describing `size` bytes starting at `base`.
    #[inline]
    pub const fn new(base: u64, size: usize) -> Self {
        Self {
            limit: (size - 1) as u16,
            base,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_register_is_ten_bytes() {
        assert_eq!(core::mem::size_of::<TableRegister>(), 10);
    }

    #[test]
    fn table_register_limit_is_inclusive() {
        let reg = TableRegister::new(0x1000, IDT_ENTRIES * IDT_ENTRY_SIZE);
        let limit = reg.limit;
        assert_eq!(limit, 0x0FFF);
    }

    #[test]
    fn gate_kind_from_attribute() {
        assert_eq!(GateKind::from_type_attr(0x8E), Some(GateKind::Interrupt));
        assert_eq!(GateKind::from_type_attr(0xEF), Some(GateKind::Trap));
        assert_eq!(GateKind::from_type_attr(0x00), None);
    }
}
