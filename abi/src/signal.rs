//! Signal numbers and the pending-signal mask layout.

use bitflags::bitflags;

/// Signal numbers. Signal `n` occupies bit `n - 1` of a mask.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signal {
    Hup = 1,
    Int = 2,
    Quit = 3,
    Ill = 4,
    Trap = 5,
    Abrt = 6,
    Unused = 7,
    Fpe = 8,
    Kill = 9,
    Usr1 = 10,
    Segv = 11,
    Usr2 = 12,
    Pipe = 13,
    Alrm = 14,
    Term = 15,
    StkFlt = 16,
    Chld = 17,
    Cont = 18,
    Stop = 19,
    Tstp = 20,
    Ttin = 21,
    Ttou = 22,
}

impl Signal {
    #[inline]
    pub const fn number(self) -> u8 {
        self as u8
    }

    /// Mask with only this signal's bit set.
    #[inline]
    pub const fn mask(self) -> SignalSet {
        SignalSet::from_bits_retain(1u32 << (self as u32 - 1))
    }
}

bitflags! {
    /// Per-task pending-signal mask.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct SignalSet: u32 {
        const HUP = 1 << 0;
        const INT = 1 << 1;
        const QUIT = 1 << 2;
        const ILL = 1 << 3;
        const TRAP = 1 << 4;
        const ABRT = 1 << 5;
        const UNUSED = 1 << 6;
        const FPE = 1 << 7;
        const KILL = 1 << 8;
        const USR1 = 1 << 9;
        const SEGV = 1 << 10;
        const USR2 = 1 << 11;
        const PIPE = 1 << 12;
        const ALRM = 1 << 13;
        const TERM = 1 << 14;
        const STKFLT = 1 << 15;
        const CHLD = 1 << 16;
        const CONT = 1 << 17;
        const STOP = 1 << 18;
        const TSTP = 1 << 19;
        const TTIN = 1 << 20;
        const TTOU = 1 << 21;
    }
}

impl From<Signal> for SignalSet {
    fn from(signal: Signal) -> Self {
        signal.mask()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fpe_is_bit_seven() {
        assert_eq!(Signal::Fpe.number(), 8);
        assert_eq!(Signal::Fpe.mask(), SignalSet::FPE);
        assert_eq!(SignalSet::FPE.bits(), 1 << 7);
    }

    #[test]
    fn masks_match_named_flags() {
        assert_eq!(SignalSet::from(Signal::Segv), SignalSet::SEGV);
        assert_eq!(SignalSet::from(Signal::Ill), SignalSet::ILL);
        assert_eq!(SignalSet::from(Signal::Trap), SignalSet::TRAP);
    }
}
