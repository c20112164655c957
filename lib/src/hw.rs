//! Hardware access capability.
//!
//! Every privileged instruction the boot and trap layers need goes through
//! [`Hardware`]. The real implementation lives in [`X86Hardware`]; host
//! tests substitute the recording double from `hw::mock`.

use halcyon_abi::{SegmentSelector, TableRegister};

/// Selectors reloaded after a new segment table is installed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SegmentReload {
    pub code: SegmentSelector,
    pub data: SegmentSelector,
    pub task: SegmentSelector,
}

impl SegmentReload {
    pub const KERNEL: Self = Self {
        code: SegmentSelector::KERNEL_CODE,
        data: SegmentSelector::KERNEL_DATA,
        task: SegmentSelector::TSS,
    };
}

pub trait Hardware: Sync {
    /// Install the segment descriptor table and reload CS, data segments and TR.
    ///
    /// # Safety
    /// `table` must describe a valid descriptor table that lives for the
    /// rest of the kernel's lifetime and contains the selectors in `reload`.
    unsafe fn load_segment_table(&self, table: TableRegister, reload: SegmentReload);

    /// Install the gate descriptor table.
    ///
    /// # Safety
    /// `table` must describe a valid gate table that lives for the rest of
    /// the kernel's lifetime.
    unsafe fn load_gate_table(&self, table: TableRegister);

    fn enable_interrupts(&self);
    fn disable_interrupts(&self);
    fn interrupts_enabled(&self) -> bool;

    /// Clear pending x87 exception flags (`fnclex`).
    fn clear_fpu_exceptions(&self);

    /// Clear CR0.TS so the next FPU instruction does not trap (`clts`).
    fn clear_task_switched(&self);
}

#[cfg(target_arch = "x86_64")]
mod x86 {
    use core::arch::asm;

    use halcyon_abi::TableRegister;
    use x86_64::instructions::segmentation::{CS, DS, ES, FS, GS, SS, Segment};
    use x86_64::instructions::tables::{lgdt, lidt, load_tss};
    use x86_64::instructions::interrupts;
    use x86_64::structures::DescriptorTablePointer;
    use x86_64::structures::gdt::SegmentSelector as X86Selector;
    use x86_64::VirtAddr;

    use super::{Hardware, SegmentReload};

    /// Bare-metal implementation of [`Hardware`].
    pub struct X86Hardware;

    fn pointer(table: TableRegister) -> DescriptorTablePointer {
        DescriptorTablePointer {
            limit: table.limit,
            base: VirtAddr::new_truncate(table.base),
        }
    }

    impl Hardware for X86Hardware {
        unsafe fn load_segment_table(&self, table: TableRegister, reload: SegmentReload) {
            let code = X86Selector(reload.code.bits());
            let data = X86Selector(reload.data.bits());
            unsafe {
                lgdt(&pointer(table));
                CS::set_reg(code);
                DS::set_reg(data);
                ES::set_reg(data);
                SS::set_reg(data);
                FS::set_reg(data);
                GS::set_reg(data);
                load_tss(X86Selector(reload.task.bits()));
            }
        }

        unsafe fn load_gate_table(&self, table: TableRegister) {
            unsafe { lidt(&pointer(table)) };
        }

        fn enable_interrupts(&self) {
            interrupts::enable();
        }

        fn disable_interrupts(&self) {
            interrupts::disable();
        }

        fn interrupts_enabled(&self) -> bool {
            interrupts::are_enabled()
        }

        fn clear_fpu_exceptions(&self) {
            unsafe { asm!("fnclex", options(nomem, nostack, preserves_flags)) };
        }

        fn clear_task_switched(&self) {
            unsafe { asm!("clts", options(nomem, nostack, preserves_flags)) };
        }
    }
}

#[cfg(target_arch = "x86_64")]
pub use x86::X86Hardware;

#[cfg(any(test, feature = "mock-hw"))]
pub mod mock {
    //! Recording [`Hardware`] double for host tests.

    use core::sync::atomic::{AtomicBool, Ordering};

    use halcyon_abi::TableRegister;
    use spin::Mutex;

    use super::{Hardware, SegmentReload};

    pub const EVENT_CAPACITY: usize = 64;

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum HwEvent {
        LoadSegmentTable { base: u64, limit: u16, reload: SegmentReload },
        LoadGateTable { base: u64, limit: u16 },
        EnableInterrupts,
        DisableInterrupts,
        ClearFpuExceptions,
        ClearTaskSwitched,
    }

    struct EventLog {
        events: [Option<HwEvent>; EVENT_CAPACITY],
        len: usize,
    }

    pub struct RecordingHardware {
        log: Mutex<EventLog>,
        interrupts: AtomicBool,
    }

    impl RecordingHardware {
        pub const fn new() -> Self {
            Self {
                log: Mutex::new(EventLog {
                    events: [None; EVENT_CAPACITY],
                    len: 0,
                }),
                interrupts: AtomicBool::new(false),
            }
        }

        fn record(&self, event: HwEvent) {
            let mut log = self.log.lock();
            let slot = log.len;
            if slot < EVENT_CAPACITY {
                log.events[slot] = Some(event);
                log.len += 1;
            }
        }

        /// Recorded events in order; the callback sees a stable snapshot.
        pub fn with_events<R>(&self, f: impl FnOnce(&[Option<HwEvent>]) -> R) -> R {
            let log = self.log.lock();
            f(&log.events[..log.len])
        }

        pub fn count(&self, wanted: HwEvent) -> usize {
            self.with_events(|events| events.iter().filter(|e| **e == Some(wanted)).count())
        }

        /// Index of the first event matching `pred`.
        pub fn position(&self, pred: impl Fn(&HwEvent) -> bool) -> Option<usize> {
            self.with_events(|events| events.iter().position(|e| e.as_ref().is_some_and(&pred)))
        }
    }

    impl Default for RecordingHardware {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Hardware for RecordingHardware {
        unsafe fn load_segment_table(&self, table: TableRegister, reload: SegmentReload) {
            self.record(HwEvent::LoadSegmentTable {
                base: table.base,
                limit: table.limit,
                reload,
            });
        }

        unsafe fn load_gate_table(&self, table: TableRegister) {
            self.record(HwEvent::LoadGateTable {
                base: table.base,
                limit: table.limit,
            });
        }

        fn enable_interrupts(&self) {
            self.interrupts.store(true, Ordering::SeqCst);
            self.record(HwEvent::EnableInterrupts);
        }

        fn disable_interrupts(&self) {
            self.interrupts.store(false, Ordering::SeqCst);
            self.record(HwEvent::DisableInterrupts);
        }

        fn interrupts_enabled(&self) -> bool {
            self.interrupts.load(Ordering::SeqCst)
        }

        fn clear_fpu_exceptions(&self) {
            self.record(HwEvent::ClearFpuExceptions);
        }

        fn clear_task_switched(&self) {
            self.record(HwEvent::ClearTaskSwitched);
        }
    }

}
