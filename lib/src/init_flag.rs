//! Atomic one-shot flag: "has X been done?"
//!
//! Monotonic false -> true, resettable only for re-initialisable subsystems.
//! `init_once()` uses a `SeqCst` swap so exactly one caller wins;
//! `mark_set()` publishes with `Release`, `is_set()` observes with `Acquire`.

use core::sync::atomic::{AtomicBool, Ordering};

#[repr(transparent)]
pub struct InitFlag {
    flag: AtomicBool,
}

impl InitFlag {
    #[inline]
    pub const fn new() -> Self {
        Self {
            flag: AtomicBool::new(false),
        }
    }

    /// Returns `true` for exactly one caller: the one that flipped the flag.
    #[inline]
    pub fn init_once(&self) -> bool {
        !self.flag.swap(true, Ordering::SeqCst)
    }

    /// Same as [`InitFlag::init_once`], reads better for one-shot entry points.
    #[inline]
    pub fn claim(&self) -> bool {
        self.init_once()
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Relaxed read for logging guards and other fast paths.
    #[inline]
    pub fn is_set_relaxed(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn mark_set(&self) {
        self.flag.store(true, Ordering::Release);
    }

    #[inline]
    pub fn reset(&self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl Default for InitFlag {
    fn default() -> Self {
        Self::new()
    }
}
