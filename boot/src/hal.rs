//! Hardware bring-up sequence.
//!
//! Four stages run exactly once, in order:
//!
//! 1. Platform: the boot protocol describes the machine.
//! 2. Memory: the memory layout is fixed and handed to the allocator.
//! 3. Interrupt: descriptor tables are built, loaded, and the trap context
//!    is installed.
//! 4. Ready: interrupts are unmasked and syscalls accepted.
//!
//! Interrupts stay masked from entry until Ready, and Ready is refused unless
//! every vector in [`KERNEL_GATES`] has its gate. Any failure is fatal; the
//! sequence is never retried.

use core::sync::atomic::{AtomicU8, Ordering};

use halcyon_core::TrapContext;
use halcyon_lib::{Hardware, InitFlag, SegmentReload, align_down, klog_debug, klog_info};
use spin::{Mutex, Once};

use crate::config::BootConfig;
use crate::error::BootError;
use crate::gdt::{SegmentTable, TaskStateSegment, build_segment_table};
use crate::idt::{GateSpec, GateTable, KERNEL_GATES};

const PAGE_SIZE: u64 = 4096;
const MIB: u64 = 1024 * 1024;

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum BootStage {
    Platform = 0,
    Memory = 1,
    Interrupt = 2,
    Ready = 3,
}

impl BootStage {
    pub const ALL: [BootStage; 4] = [
        BootStage::Platform,
        BootStage::Memory,
        BootStage::Interrupt,
        BootStage::Ready,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BootStage::Platform => "platform",
            BootStage::Memory => "memory",
            BootStage::Interrupt => "interrupt",
            BootStage::Ready => "ready",
        }
    }
}

/// What the platform stage learned about the machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MachineInfo {
    /// One past the highest usable physical address.
    pub memory_end: u64,
    /// Base of the higher-half direct map.
    pub hhdm_offset: u64,
    pub usable_regions: usize,
    /// Kernel stack loaded on entry from user mode.
    pub kernel_stack_top: u64,
    pub cmdline: &'static str,
}

impl MachineInfo {
    #[inline]
    pub fn phys_to_virt(&self, phys: u64) -> u64 {
        phys.wrapping_add(self.hhdm_offset)
    }

    #[inline]
    pub fn virt_to_phys(&self, virt: u64) -> u64 {
        virt.wrapping_sub(self.hhdm_offset)
    }
}

/// Physical memory split: buffer area below `buffer_end`, main memory from
/// `main_memory_start` to `memory_end`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryLayout {
    pub memory_end: u64,
    pub buffer_end: u64,
    pub main_memory_start: u64,
}

impl MemoryLayout {
    pub fn from_extent(memory_end: u64) -> Result<Self, BootError> {
        let memory_end = align_down(memory_end, PAGE_SIZE);
        let buffer_end = if memory_end > 12 * MIB {
            4 * MIB
        } else if memory_end > 6 * MIB {
            2 * MIB
        } else {
            MIB
        };
        if memory_end <= buffer_end {
            return Err(BootError::InsufficientMemory { memory_end });
        }
        Ok(Self {
            memory_end,
            buffer_end,
            main_memory_start: buffer_end,
        })
    }

    #[inline]
    pub fn main_memory_bytes(&self) -> u64 {
        self.memory_end - self.main_memory_start
    }
}

/// Platform-specific steps the sequencer calls out to.
pub trait BootHooks {
    fn platform(&mut self) -> Result<MachineInfo, BootError>;

    /// Hand the layout to the frame allocator and page-table builder.
    fn memory(&mut self, machine: &MachineInfo, layout: &MemoryLayout) -> Result<(), BootError>;
}

/// Proof that both descriptor tables are loaded.
pub struct TablesLoaded {
    _private: (),
}

/// Result of a completed boot sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HalReady {
    pub machine: MachineInfo,
    pub layout: MemoryLayout,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransitionLog {
    stages: [Option<BootStage>; 4],
    len: usize,
}

impl TransitionLog {
    const fn new() -> Self {
        Self {
            stages: [None; 4],
            len: 0,
        }
    }

    fn push(&mut self, stage: BootStage) {
        if let Some(slot) = self.stages.get_mut(self.len) {
            *slot = Some(stage);
            self.len += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = BootStage> + '_ {
        self.stages[..self.len].iter().flatten().copied()
    }
}

const NO_STAGE: u8 = u8::MAX;

pub struct HalSequencer {
    started: InitFlag,
    completed: AtomicU8,
    transitions: Mutex<TransitionLog>,
    tss: Once<TaskStateSegment>,
    segments: Once<SegmentTable>,
    gates: Once<GateTable>,
    trap: Once<&'static TrapContext<'static>>,
}

impl HalSequencer {
    pub const fn new() -> Self {
        Self {
            started: InitFlag::new(),
            completed: AtomicU8::new(NO_STAGE),
            transitions: Mutex::new(TransitionLog::new()),
            tss: Once::new(),
            segments: Once::new(),
            gates: Once::new(),
            trap: Once::new(),
        }
    }

    /// Last stage that completed.
    pub fn stage(&self) -> Option<BootStage> {
        let raw = self.completed.load(Ordering::Acquire);
        BootStage::ALL.get(raw as usize).copied()
    }

    pub fn is_ready(&self) -> bool {
        self.stage() == Some(BootStage::Ready)
    }

    pub fn transitions(&self) -> TransitionLog {
        *self.transitions.lock()
    }

    /// Trap context installed by the interrupt stage.
    pub fn trap_context(&self) -> Option<&'static TrapContext<'static>> {
        self.trap.get().copied()
    }

    pub fn segment_table(&self) -> Option<&SegmentTable> {
        self.segments.get()
    }

    pub fn gate_table(&self) -> Option<&GateTable> {
        self.gates.get()
    }

    fn complete(&self, stage: BootStage) {
        self.transitions.lock().push(stage);
        self.completed.store(stage as u8, Ordering::Release);
        klog_info!("HAL: {} stage complete", stage.name());
    }

    /// Run the whole sequence. Only the first call does anything.
    pub fn run(
        &'static self,
        hooks: &mut dyn BootHooks,
        trap: &'static TrapContext<'static>,
        gates: &[GateSpec],
    ) -> Result<HalReady, BootError> {
        if !self.started.claim() {
            return Err(BootError::AlreadyStarted);
        }
        let hw = trap.hw();
        hw.disable_interrupts();

        let machine = hooks.platform()?;
        BootConfig::parse(machine.cmdline).apply();
        klog_debug!(
            "HAL: memory end {:#x}, {} usable regions, hhdm {:#x}",
            machine.memory_end,
            machine.usable_regions,
            machine.hhdm_offset
        );
        self.complete(BootStage::Platform);

        let layout = MemoryLayout::from_extent(machine.memory_end)?;
        klog_debug!(
            "HAL: buffer area ends at {:#x}, {} bytes of main memory",
            layout.buffer_end,
            layout.main_memory_bytes()
        );
        hooks.memory(&machine, &layout)?;
        self.complete(BootStage::Memory);

        let loaded = self.load_tables(hw, machine.kernel_stack_top, gates)?;
        self.trap.call_once(|| trap);
        self.complete(BootStage::Interrupt);

        self.enter_ready(loaded, trap);
        Ok(HalReady { machine, layout })
    }

    fn load_tables(
        &'static self,
        hw: &dyn Hardware,
        kernel_stack_top: u64,
        gates: &[GateSpec],
    ) -> Result<TablesLoaded, BootError> {
        let built = GateTable::build(gates);
        if let Some(vector) = built.first_mismatch(&KERNEL_GATES) {
            return Err(BootError::IncompleteGateTable { vector });
        }
        let tss = self.tss.call_once(|| TaskStateSegment::new(kernel_stack_top));
        let segments = self.segments.call_once(|| build_segment_table(tss));
        let gate_table = self.gates.call_once(|| built);
        klog_debug!("HAL: {} gates installed", gate_table.present().count());

        // SAFETY: both tables live in `'static` storage that is never
        // written again, and the segment table holds every selector in
        // `SegmentReload::KERNEL`.
        unsafe {
            hw.load_segment_table(segments.register(), SegmentReload::KERNEL);
            hw.load_gate_table(gate_table.register());
        }
        Ok(TablesLoaded { _private: () })
    }

    fn enter_ready(&self, _loaded: TablesLoaded, trap: &TrapContext<'_>) {
        trap.open_syscalls();
        trap.hw().enable_interrupts();
        self.complete(BootStage::Ready);
    }
}

impl Default for HalSequencer {
    fn default() -> Self {
        Self::new()
    }
}

static HAL: HalSequencer = HalSequencer::new();

/// Boot entry point. Returns only once the system is Ready.
pub fn init_hal(
    hooks: &mut dyn BootHooks,
    trap: &'static TrapContext<'static>,
    gates: &[GateSpec],
) -> HalReady {
    match HAL.run(hooks, trap, gates) {
        Ok(ready) => ready,
        Err(err) => crate::kernel_panic::kernel_panic_with(format_args!("HAL: {}", err)),
    }
}

/// Trap context of the running kernel, once the interrupt stage has run.
pub fn kernel_trap_context() -> Option<&'static TrapContext<'static>> {
    HAL.trap_context()
}
