//! Gate descriptor table.
//!
//! The table is built from a list of [`GateSpec`]s into plain data and only
//! then handed to the processor. Every slot without a spec is the explicit
//! not-present descriptor.

use core::mem::size_of;
use core::num::NonZeroU64;

use halcyon_abi::arch::x86_64::idt::{GATE_DPL_SHIFT, GATE_PRESENT, IDT_ENTRIES, IDT_ENTRY_SIZE};
use halcyon_abi::arch::{ExceptionVector, SYSCALL_VECTOR};
use halcyon_abi::{GateKind, PrivilegeLevel, SegmentSelector, TableRegister};

/// Address of a trap entry stub. Never zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntryPoint(NonZeroU64);

impl EntryPoint {
    pub const fn new(addr: u64) -> Option<Self> {
        match NonZeroU64::new(addr) {
            Some(addr) => Some(Self(addr)),
            None => None,
        }
    }

    /// Entry point of an assembly stub.
    pub fn from_stub(stub: unsafe extern "C" fn()) -> Self {
        let addr = stub as usize as u64;
        // SAFETY: function pointers are never null.
        Self(unsafe { NonZeroU64::new_unchecked(addr) })
    }

    #[inline]
    pub const fn addr(self) -> u64 {
        self.0.get()
    }
}

/// One long-mode gate descriptor.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GateDescriptor {
    offset_low: u16,
    selector: u16,
    ist: u8,
    type_attr: u8,
    offset_mid: u16,
    offset_high: u32,
    zero: u32,
}

const _: () = assert!(size_of::<GateDescriptor>() == IDT_ENTRY_SIZE);

impl GateDescriptor {
    pub const MISSING: Self = Self {
        offset_low: 0,
        selector: 0,
        ist: 0,
        type_attr: 0,
        offset_mid: 0,
        offset_high: 0,
        zero: 0,
    };

    pub const fn new(
        entry: EntryPoint,
        selector: SegmentSelector,
        kind: GateKind,
        dpl: PrivilegeLevel,
    ) -> Self {
        let offset = entry.addr();
        Self {
            offset_low: offset as u16,
            selector: selector.bits(),
            ist: 0,
            type_attr: kind.bits() | GATE_PRESENT | (dpl.bits() << GATE_DPL_SHIFT),
            offset_mid: (offset >> 16) as u16,
            offset_high: (offset >> 32) as u32,
            zero: 0,
        }
    }

    #[inline]
    pub const fn type_attr(&self) -> u8 {
        self.type_attr
    }

    #[inline]
    pub const fn is_present(&self) -> bool {
        self.type_attr & GATE_PRESENT != 0
    }

    pub const fn offset(&self) -> u64 {
        self.offset_low as u64 | (self.offset_mid as u64) << 16 | (self.offset_high as u64) << 32
    }

    pub const fn dpl(&self) -> PrivilegeLevel {
        PrivilegeLevel::from_bits(self.type_attr >> GATE_DPL_SHIFT)
    }

    pub const fn kind(&self) -> Option<GateKind> {
        GateKind::from_type_attr(self.type_attr)
    }

    #[inline]
    pub const fn selector(&self) -> SegmentSelector {
        SegmentSelector(self.selector)
    }
}

/// Vector, gate type and caller privilege of an installed gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GateShape {
    pub vector: u8,
    pub kind: GateKind,
    pub dpl: PrivilegeLevel,
}

impl GateShape {
    const fn exception(vector: ExceptionVector) -> Self {
        Self {
            vector: vector.vector(),
            kind: GateKind::Interrupt,
            dpl: PrivilegeLevel::Ring0,
        }
    }

    /// Trap gate reachable from user mode.
    const fn user_trap(vector: u8) -> Self {
        Self {
            vector,
            kind: GateKind::Trap,
            dpl: PrivilegeLevel::Ring3,
        }
    }

    pub const fn bind(self, entry: EntryPoint) -> GateSpec {
        GateSpec {
            vector: self.vector,
            kind: self.kind,
            dpl: self.dpl,
            entry,
        }
    }
}

/// A gate to install: shape plus handler address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GateSpec {
    pub vector: u8,
    pub kind: GateKind,
    pub dpl: PrivilegeLevel,
    pub entry: EntryPoint,
}

/// Gates installed by the kernel, in stub order.
pub const KERNEL_GATES: [GateShape; 19] = [
    GateShape::exception(ExceptionVector::DivideError),
    GateShape::exception(ExceptionVector::Debug),
    GateShape::exception(ExceptionVector::Nmi),
    GateShape::user_trap(ExceptionVector::Breakpoint.vector()),
    GateShape::user_trap(ExceptionVector::Overflow.vector()),
    GateShape::exception(ExceptionVector::BoundRange),
    GateShape::exception(ExceptionVector::InvalidOpcode),
    GateShape::exception(ExceptionVector::DeviceNotAvailable),
    GateShape::exception(ExceptionVector::DoubleFault),
    GateShape::exception(ExceptionVector::InvalidTss),
    GateShape::exception(ExceptionVector::SegmentNotPresent),
    GateShape::exception(ExceptionVector::StackFault),
    GateShape::exception(ExceptionVector::GeneralProtection),
    GateShape::exception(ExceptionVector::PageFault),
    GateShape::exception(ExceptionVector::CoprocessorError),
    GateShape::exception(ExceptionVector::AlignmentCheck),
    GateShape::exception(ExceptionVector::MachineCheck),
    GateShape::exception(ExceptionVector::SimdFloatingPoint),
    GateShape::user_trap(SYSCALL_VECTOR),
];

/// `true` when no vector appears twice in `shapes`.
pub const fn vectors_unique(shapes: &[GateShape]) -> bool {
    let mut i = 0;
    while i < shapes.len() {
        let mut j = i + 1;
        while j < shapes.len() {
            if shapes[i].vector == shapes[j].vector {
                return false;
            }
            j += 1;
        }
        i += 1;
    }
    true
}

const _: () = assert!(vectors_unique(&KERNEL_GATES), "duplicate vector in KERNEL_GATES");

#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GateTable {
    gates: [GateDescriptor; IDT_ENTRIES],
}

const GATE_TABLE_BYTES: usize = IDT_ENTRIES * IDT_ENTRY_SIZE;

const _: () = assert!(size_of::<GateTable>() == GATE_TABLE_BYTES);

impl GateTable {
    pub const fn empty() -> Self {
        Self {
            gates: [GateDescriptor::MISSING; IDT_ENTRIES],
        }
    }

    /// Build the table for `specs`. All gates use the kernel code selector.
    ///
    /// # Panics
    /// If two specs name the same vector.
    pub fn build(specs: &[GateSpec]) -> Self {
        let mut table = Self::empty();
        for spec in specs {
            let slot = &mut table.gates[spec.vector as usize];
            assert!(
                !slot.is_present(),
                "gate table: vector {:#x} installed twice",
                spec.vector
            );
            *slot = GateDescriptor::new(spec.entry, SegmentSelector::KERNEL_CODE, spec.kind, spec.dpl);
        }
        table
    }

    #[inline]
    pub fn gate(&self, vector: u8) -> &GateDescriptor {
        &self.gates[vector as usize]
    }

    /// First vector in `shapes` whose slot is absent or has a different
    /// gate type or caller privilege.
    pub fn first_mismatch(&self, shapes: &[GateShape]) -> Option<u8> {
        shapes
            .iter()
            .find(|shape| {
                let gate = self.gate(shape.vector);
                !gate.is_present() || gate.kind() != Some(shape.kind) || gate.dpl() != shape.dpl
            })
            .map(|shape| shape.vector)
    }

    pub fn present(&self) -> impl Iterator<Item = (u8, &GateDescriptor)> + '_ {
        self.gates
            .iter()
            .enumerate()
            .filter(|(_, gate)| gate.is_present())
            .map(|(vector, gate)| (vector as u8, gate))
    }

    /// The table exactly as the processor reads it.
    pub fn as_bytes(&self) -> &[u8; GATE_TABLE_BYTES] {
        // SAFETY: `GateTable` is `repr(C)`, has no padding (size asserted
        // above) and every bit pattern of its fields is a valid byte.
        unsafe { &*(self as *const Self as *const [u8; GATE_TABLE_BYTES]) }
    }

    /// Pointer operand for `lidt`.
    pub fn register(&self) -> TableRegister {
        TableRegister::new(self as *const Self as u64, GATE_TABLE_BYTES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_layout() -> Vec<GateSpec> {
        KERNEL_GATES
            .iter()
            .enumerate()
            .filter_map(|(i, shape)| {
                let entry = EntryPoint::new(0xFFFF_FFFF_8010_0000 + (i as u64) * 0x20)?;
                Some(shape.bind(entry))
            })
            .collect()
    }

    #[test]
    fn zero_address_is_not_an_entry_point() {
        assert!(EntryPoint::new(0).is_none());
        assert_eq!(EntryPoint::new(0x1000).map(EntryPoint::addr), Some(0x1000));
    }

    #[test]
    fn build_is_deterministic() {
        let specs = fake_layout();
        let a = GateTable::build(&specs);
        let b = GateTable::build(&specs);
        assert_eq!(a.as_bytes()[..], b.as_bytes()[..]);
    }

    #[test]
    fn present_gates_are_well_formed() {
        let table = GateTable::build(&fake_layout());
        assert_eq!(table.present().count(), KERNEL_GATES.len());
        for (_, gate) in table.present() {
            assert_ne!(gate.offset(), 0);
            assert!(gate.dpl().bits() <= 3);
            assert_eq!(gate.selector(), SegmentSelector::KERNEL_CODE);
        }
        assert_eq!(table.gate(9), &GateDescriptor::MISSING);
        assert_eq!(table.gate(15), &GateDescriptor::MISSING);
        assert_eq!(table.gate(0xFF), &GateDescriptor::MISSING);
    }

    #[test]
    fn syscall_gate_is_a_user_trap_gate() {
        let table = GateTable::build(&fake_layout());
        let gate = table.gate(SYSCALL_VECTOR);
        assert_eq!(gate.kind(), Some(GateKind::Trap));
        assert_eq!(gate.dpl(), PrivilegeLevel::Ring3);
        assert_eq!(gate.type_attr(), 0xEF);
    }

    #[test]
    fn exception_gates_are_kernel_interrupt_gates() {
        let table = GateTable::build(&fake_layout());
        assert_eq!(table.gate(ExceptionVector::PageFault.vector()).type_attr(), 0x8E);
        assert_eq!(table.gate(ExceptionVector::CoprocessorError.vector()).type_attr(), 0x8E);
        assert_eq!(table.gate(ExceptionVector::Breakpoint.vector()).type_attr(), 0xEF);
        assert_eq!(table.gate(ExceptionVector::Overflow.vector()).type_attr(), 0xEF);
    }

    #[test]
    fn offset_round_trips_through_the_split_fields() {
        let entry = EntryPoint::new(0xFFFF_8123_4567_89AB).unwrap();
        let gate = GateDescriptor::new(
            entry,
            SegmentSelector::KERNEL_CODE,
            GateKind::Interrupt,
            PrivilegeLevel::Ring0,
        );
        assert_eq!(gate.offset(), entry.addr());
        assert_eq!(gate.type_attr(), 0x8E);
    }

    #[test]
    fn duplicates_are_detected() {
        let mut shapes = KERNEL_GATES;
        assert!(vectors_unique(&shapes));
        shapes[1].vector = shapes[0].vector;
        assert!(!vectors_unique(&shapes));
    }

    #[test]
    #[should_panic(expected = "installed twice")]
    fn build_rejects_duplicate_vectors() {
        let mut specs = fake_layout();
        specs.push(specs[0]);
        GateTable::build(&specs);
    }

    #[test]
    fn complete_layout_matches_every_kernel_gate() {
        let table = GateTable::build(&fake_layout());
        assert_eq!(table.first_mismatch(&KERNEL_GATES), None);
        assert_eq!(GateTable::empty().first_mismatch(&KERNEL_GATES), Some(0));
    }

    #[test]
    fn mismatch_names_the_missing_or_misshapen_vector() {
        let without_syscall: Vec<GateSpec> = fake_layout()
            .into_iter()
            .filter(|spec| spec.vector != SYSCALL_VECTOR)
            .collect();
        let table = GateTable::build(&without_syscall);
        assert_eq!(table.first_mismatch(&KERNEL_GATES), Some(SYSCALL_VECTOR));

        let mut kernel_only = fake_layout();
        for spec in &mut kernel_only {
            spec.dpl = PrivilegeLevel::Ring0;
        }
        let table = GateTable::build(&kernel_only);
        assert_eq!(
            table.first_mismatch(&KERNEL_GATES),
            Some(ExceptionVector::Breakpoint.vector())
        );
    }

    #[test]
    fn register_spans_the_whole_table() {
        let table = GateTable::empty();
        let limit = table.register().limit;
        assert_eq!(limit as usize, GATE_TABLE_BYTES - 1);
    }
}
