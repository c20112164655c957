//! The slice of task state the trap layer touches.
//!
//! The scheduler owns tasks; this layer only needs an identity and the
//! pending-signal mask, plus two registry slots: the running task and the
//! task that last used the coprocessor.

use core::ptr;
use core::sync::atomic::{AtomicPtr, AtomicU32, Ordering};

use halcyon_abi::{Signal, SignalSet};

/// Pending-signal mask.
///
/// Exception handlers running on behalf of the owning task set bits; the
/// signal-delivery path takes them. Each update is a single atomic
/// read-modify-write, so setting one bit never disturbs another.
#[derive(Debug, Default)]
pub struct PendingSignals {
    bits: AtomicU32,
}

impl PendingSignals {
    pub const fn new() -> Self {
        Self {
            bits: AtomicU32::new(0),
        }
    }

    /// Mark `signal` pending. Returns `true` if it was not pending before.
    pub fn raise(&self, signal: Signal) -> bool {
        let bit = signal.mask().bits();
        self.bits.fetch_or(bit, Ordering::AcqRel) & bit == 0
    }

    /// Clear `signal`. Returns `true` if it was pending.
    pub fn take(&self, signal: Signal) -> bool {
        let bit = signal.mask().bits();
        self.bits.fetch_and(!bit, Ordering::AcqRel) & bit != 0
    }

    pub fn is_pending(&self, signal: Signal) -> bool {
        self.snapshot().contains(signal.mask())
    }

    pub fn snapshot(&self) -> SignalSet {
        SignalSet::from_bits_retain(self.bits.load(Ordering::Acquire))
    }
}

#[derive(Debug)]
pub struct Task {
    id: u32,
    signals: PendingSignals,
}

impl Task {
    pub const fn new(id: u32) -> Self {
        Self {
            id,
            signals: PendingSignals::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    pub fn signals(&self) -> &PendingSignals {
        &self.signals
    }
}

/// Registry slots filled by the scheduler, read by trap handlers.
pub struct TaskRegistry {
    current: AtomicPtr<Task>,
    math_owner: AtomicPtr<Task>,
}

fn load(slot: &AtomicPtr<Task>) -> Option<&'static Task> {
    let task = slot.load(Ordering::Acquire);
    // SAFETY: only `&'static Task` pointers are stored in registry slots.
    unsafe { task.as_ref() }
}

fn store(slot: &AtomicPtr<Task>, task: Option<&'static Task>) {
    let raw = task.map_or(ptr::null_mut(), |t| t as *const Task as *mut Task);
    slot.store(raw, Ordering::Release);
}

impl TaskRegistry {
    pub const fn new() -> Self {
        Self {
            current: AtomicPtr::new(ptr::null_mut()),
            math_owner: AtomicPtr::new(ptr::null_mut()),
        }
    }

    pub fn set_current(&self, task: Option<&'static Task>) {
        store(&self.current, task);
    }

    pub fn current(&self) -> Option<&'static Task> {
        load(&self.current)
    }

    pub fn set_math_owner(&self, task: Option<&'static Task>) {
        store(&self.math_owner, task);
    }

    /// Task whose state is live in the FPU, if any.
    pub fn math_owner(&self) -> Option<&'static Task> {
        load(&self.math_owner)
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry used by the running kernel.
pub static KERNEL_TASKS: TaskRegistry = TaskRegistry::new();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raising_twice_sets_one_bit() {
        let signals = PendingSignals::new();
        assert!(signals.raise(Signal::Fpe));
        assert!(!signals.raise(Signal::Fpe));
        assert_eq!(signals.snapshot(), SignalSet::FPE);
        assert_eq!(signals.snapshot().bits().count_ones(), 1);
    }

    #[test]
    fn raise_keeps_other_bits() {
        let signals = PendingSignals::new();
        signals.raise(Signal::Segv);
        signals.raise(Signal::Fpe);
        assert!(signals.is_pending(Signal::Segv));
        assert!(signals.take(Signal::Segv));
        assert!(!signals.take(Signal::Segv));
        assert_eq!(signals.snapshot(), SignalSet::FPE);
    }

    #[test]
    fn registry_slots_are_independent() {
        static A: Task = Task::new(1);
        static B: Task = Task::new(2);
        let registry = TaskRegistry::new();
        assert!(registry.current().is_none());
        registry.set_current(Some(&A));
        registry.set_math_owner(Some(&B));
        assert_eq!(registry.current().map(Task::id), Some(1));
        assert_eq!(registry.math_owner().map(Task::id), Some(2));
        registry.set_math_owner(None);
        assert!(registry.math_owner().is_none());
    }
}
