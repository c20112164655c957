//! Monotonic delays and bounded waits.
//!
//! Waiting is expressed against a [`MonotonicClock`], not by counting loop
//! iterations. The boot platform stage calibrates the TSC against PIT
//! channel 2 and installs it with [`install_clock`]; before that, a
//! [`Deadline`] degrades to a fixed poll budget.

use core::hint::spin_loop;

use spin::Once;

pub trait MonotonicClock: Sync {
    /// Current tick count; never decreases.
    fn now_ticks(&self) -> u64;
    /// Ticks per microsecond, at least 1.
    fn ticks_per_us(&self) -> u64;
}

/// Poll budget per microsecond when no clock has been installed.
pub const UNCALIBRATED_POLLS_PER_US: u64 = 4;

static CLOCK: Once<&'static dyn MonotonicClock> = Once::new();

pub fn install_clock(clock: &'static dyn MonotonicClock) {
    CLOCK.call_once(|| clock);
}

pub fn system_clock() -> Option<&'static dyn MonotonicClock> {
    CLOCK.get().copied()
}

/// Point in time after which a wait gives up.
pub struct Deadline<'a> {
    clock: Option<&'a dyn MonotonicClock>,
    expires: u64,
    polls_left: u64,
}

impl<'a> Deadline<'a> {
    pub fn after_us(clock: Option<&'a dyn MonotonicClock>, micros: u64) -> Self {
        match clock {
            Some(clock) => {
                let span = micros.saturating_mul(clock.ticks_per_us().max(1));
                Self {
                    clock: Some(clock),
                    expires: clock.now_ticks().saturating_add(span),
                    polls_left: 0,
                }
            }
            None => Self {
                clock: None,
                expires: 0,
                polls_left: micros.saturating_mul(UNCALIBRATED_POLLS_PER_US),
            },
        }
    }

    pub fn expired(&mut self) -> bool {
        match self.clock {
            Some(clock) => clock.now_ticks() >= self.expires,
            None => {
                if self.polls_left == 0 {
                    return true;
                }
                self.polls_left -= 1;
                false
            }
        }
    }
}

/// Deadline measured on the installed system clock.
pub fn deadline_us(micros: u64) -> Deadline<'static> {
    Deadline::after_us(system_clock(), micros)
}

/// Spin until `micros` have elapsed on `clock`.
pub fn delay_us(clock: &dyn MonotonicClock, micros: u64) {
    let mut deadline = Deadline::after_us(Some(clock), micros);
    while !deadline.expired() {
        spin_loop();
    }
}

#[cfg(target_arch = "x86_64")]
pub use tsc_clock::{FALLBACK_TICKS_PER_US, TscClock, calibrate_tsc};

#[cfg(target_arch = "x86_64")]
mod tsc_clock {
    use halcyon_abi::arch::x86_64::Port;

    use super::MonotonicClock;
    use crate::{io, tsc};

    const PIT_BASE_FREQUENCY_HZ: u64 = 1_193_182;
    const CALIBRATION_MS: u64 = 10;
    const PIT_CHANNEL2_ONESHOT: u8 = 0xB0;
    const GATE_BIT: u8 = 0x01;
    const SPEAKER_BIT: u8 = 0x02;
    const OUTPUT_BIT: u8 = 0x20;
    const MAX_CALIBRATION_POLLS: u32 = 50_000_000;

    /// Assumed rate if calibration cannot complete (1 GHz).
    pub const FALLBACK_TICKS_PER_US: u64 = 1_000;

    pub struct TscClock {
        ticks_per_us: u64,
    }

    impl TscClock {
        pub const fn with_rate(ticks_per_us: u64) -> Self {
            Self {
                ticks_per_us: if ticks_per_us == 0 { 1 } else { ticks_per_us },
            }
        }
    }

    impl MonotonicClock for TscClock {
        fn now_ticks(&self) -> u64 {
            tsc::rdtsc()
        }

        fn ticks_per_us(&self) -> u64 {
            self.ticks_per_us
        }
    }

    /// Measure the TSC rate over a PIT channel 2 one-shot.
    ///
    /// Returns `None` if the PIT output never rises.
    pub fn calibrate_tsc() -> Option<TscClock> {
        let count = (PIT_BASE_FREQUENCY_HZ * CALIBRATION_MS / 1000) as u16;
        // SAFETY: PIT channel 2 and port 0x61 are only used here and by no driver.
        unsafe {
            let control = io::inb(Port::SYSTEM_CONTROL_B);
            io::outb(Port::SYSTEM_CONTROL_B, (control & !SPEAKER_BIT) | GATE_BIT);
            io::outb(Port::PIT_COMMAND, PIT_CHANNEL2_ONESHOT);
            io::outb(Port::PIT_CHANNEL2, count as u8);
            io::outb(Port::PIT_CHANNEL2, (count >> 8) as u8);

            let start = tsc::rdtsc();
            let mut polls = 0u32;
            while io::inb(Port::SYSTEM_CONTROL_B) & OUTPUT_BIT == 0 {
                polls += 1;
                if polls >= MAX_CALIBRATION_POLLS {
                    io::outb(Port::SYSTEM_CONTROL_B, control);
                    return None;
                }
            }
            let end = tsc::rdtsc();
            io::outb(Port::SYSTEM_CONTROL_B, control);

            let per_us = end.wrapping_sub(start) / (CALIBRATION_MS * 1000);
            Some(TscClock::with_rate(per_us))
        }
    }
}
