//! Segment descriptor table and task state segment.
//!
//! Long mode ignores base and limit for code and data segments, so the
//! table is the classic flat layout: kernel code and data, then user data
//! and user code (the order `sysret` expects), then the 16-byte TSS
//! descriptor.

use core::mem::size_of;

use halcyon_abi::arch::x86_64::gdt::{
    GDT_ACCESS_CODE_TYPE, GDT_ACCESS_DATA_TYPE, GDT_ACCESS_DPL_KERNEL, GDT_ACCESS_DPL_USER,
    GDT_ACCESS_PRESENT, GDT_ACCESS_SEGMENT, GDT_ACCESS_TSS_AVAILABLE, GDT_FLAGS_64BIT,
    GDT_FLAT_LIMIT,
};
use halcyon_abi::{SegmentSelector, TableRegister};

/// One 8-byte segment descriptor.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SegmentDescriptor(pub u64);

impl SegmentDescriptor {
    pub const NULL: Self = Self(0);

    pub const KERNEL_CODE: Self = Self::flat(
        GDT_ACCESS_PRESENT | GDT_ACCESS_DPL_KERNEL | GDT_ACCESS_SEGMENT | GDT_ACCESS_CODE_TYPE,
    );
    pub const KERNEL_DATA: Self = Self::flat(
        GDT_ACCESS_PRESENT | GDT_ACCESS_DPL_KERNEL | GDT_ACCESS_SEGMENT | GDT_ACCESS_DATA_TYPE,
    );
    pub const USER_CODE: Self = Self::flat(
        GDT_ACCESS_PRESENT | GDT_ACCESS_DPL_USER | GDT_ACCESS_SEGMENT | GDT_ACCESS_CODE_TYPE,
    );
    pub const USER_DATA: Self = Self::flat(
        GDT_ACCESS_PRESENT | GDT_ACCESS_DPL_USER | GDT_ACCESS_SEGMENT | GDT_ACCESS_DATA_TYPE,
    );

    /// Encode a descriptor: 20-bit limit, 32-bit base, access byte and the
    /// flags nibble.
    pub const fn new(base: u32, limit: u32, access: u8, flags: u8) -> Self {
        let base = base as u64;
        let limit = limit as u64;
        Self(
            (limit & 0xFFFF)
                | ((base & 0xFF_FFFF) << 16)
                | ((access as u64) << 40)
                | (((limit >> 16) & 0xF) << 48)
                | (((flags & 0xF) as u64) << 52)
                | (((base >> 24) & 0xFF) << 56),
        )
    }

    const fn flat(access: u8) -> Self {
        Self::new(0, GDT_FLAT_LIMIT, access, GDT_FLAGS_64BIT)
    }

    #[inline]
    pub const fn access(self) -> u8 {
        (self.0 >> 40) as u8
    }

    #[inline]
    pub const fn is_present(self) -> bool {
        self.access() & GDT_ACCESS_PRESENT != 0
    }
}

/// 64-bit task state segment.
#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct TaskStateSegment {
    reserved0: u32,
    /// Stack loaded on a transition from ring 3 to ring 0.
    pub rsp0: u64,
    pub rsp1: u64,
    pub rsp2: u64,
    reserved1: u64,
    pub ist: [u64; 7],
    reserved2: u64,
    reserved3: u16,
    pub iomap_base: u16,
}

pub const TSS_SIZE: usize = size_of::<TaskStateSegment>();

const _: () = assert!(TSS_SIZE == 104);

impl TaskStateSegment {
    /// TSS whose privilege stack is `rsp0` and which grants no I/O ports.
    pub const fn new(rsp0: u64) -> Self {
        Self {
            reserved0: 0,
            rsp0,
            rsp1: 0,
            rsp2: 0,
            reserved1: 0,
            ist: [0; 7],
            reserved2: 0,
            reserved3: 0,
            iomap_base: TSS_SIZE as u16,
        }
    }

    pub fn privilege_stack(&self) -> u64 {
        self.rsp0
    }
}

/// The two descriptor slots of an available 64-bit TSS.
pub const fn tss_descriptor(base: u64, limit: u32) -> [u64; 2] {
    let limit = limit as u64;
    let low = (limit & 0xFFFF)
        | ((base & 0xFF_FFFF) << 16)
        | (((GDT_ACCESS_PRESENT | GDT_ACCESS_TSS_AVAILABLE) as u64) << 40)
        | (((limit >> 16) & 0xF) << 48)
        | (((base >> 24) & 0xFF) << 56);
    [low, base >> 32]
}

pub const SEGMENT_TABLE_SLOTS: usize = 7;

/// `[null, kernel code, kernel data, user data, user code, TSS low, TSS high]`.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SegmentTable {
    entries: [u64; SEGMENT_TABLE_SLOTS],
}

const _: () = {
    assert!(SegmentSelector::KERNEL_CODE.bits() == 0x08);
    assert!(SegmentSelector::KERNEL_DATA.bits() == 0x10);
    assert!(SegmentSelector::USER_DATA.bits() == 0x1B);
    assert!(SegmentSelector::USER_CODE.bits() == 0x23);
    assert!(SegmentSelector::TSS.bits() == 0x28);
};

pub fn build_segment_table(tss: &TaskStateSegment) -> SegmentTable {
    let base = tss as *const TaskStateSegment as u64;
    let [tss_low, tss_high] = tss_descriptor(base, (TSS_SIZE - 1) as u32);
    SegmentTable {
        entries: [
            SegmentDescriptor::NULL.0,
            SegmentDescriptor::KERNEL_CODE.0,
            SegmentDescriptor::KERNEL_DATA.0,
            SegmentDescriptor::USER_DATA.0,
            SegmentDescriptor::USER_CODE.0,
            tss_low,
            tss_high,
        ],
    }
}

impl SegmentTable {
    #[inline]
    pub fn entries(&self) -> &[u64; SEGMENT_TABLE_SLOTS] {
        &self.entries
    }

    /// Descriptor named by `selector`, ignoring its RPL.
    pub fn entry(&self, selector: SegmentSelector) -> Option<u64> {
        self.entries.get(selector.index() as usize).copied()
    }

    /// Pointer operand for `lgdt`.
    pub fn register(&self) -> TableRegister {
        TableRegister::new(self as *const Self as u64, size_of::<[u64; SEGMENT_TABLE_SLOTS]>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_segments_match_known_encodings() {
        assert_eq!(SegmentDescriptor::KERNEL_CODE.0, 0x00AF_9A00_0000_FFFF);
        assert_eq!(SegmentDescriptor::KERNEL_DATA.0, 0x00AF_9200_0000_FFFF);
        assert_eq!(SegmentDescriptor::USER_CODE.0, 0x00AF_FA00_0000_FFFF);
        assert_eq!(SegmentDescriptor::USER_DATA.0, 0x00AF_F200_0000_FFFF);
    }

    #[test]
    fn encoder_splits_base_and_limit() {
        let desc = SegmentDescriptor::new(0x1234_5678, 0xA_BCDE, 0x92, 0xC);
        assert_eq!(desc.0 & 0xFFFF, 0xBCDE);
        assert_eq!((desc.0 >> 16) & 0xFF_FFFF, 0x34_5678);
        assert_eq!(desc.access(), 0x92);
        assert_eq!((desc.0 >> 48) & 0xF, 0xA);
        assert_eq!((desc.0 >> 52) & 0xF, 0xC);
        assert_eq!(desc.0 >> 56, 0x12);
        assert!(desc.is_present());
        assert!(!SegmentDescriptor::NULL.is_present());
    }

    #[test]
    fn table_layout_follows_selectors() {
        let tss = TaskStateSegment::new(0xFFFF_8000_0001_0000);
        let table = build_segment_table(&tss);
        assert_eq!(table.entry(SegmentSelector::NULL), Some(0));
        assert_eq!(
            table.entry(SegmentSelector::KERNEL_CODE),
            Some(0x00AF_9A00_0000_FFFF)
        );
        assert_eq!(
            table.entry(SegmentSelector::USER_CODE),
            Some(0x00AF_FA00_0000_FFFF)
        );
        let limit = table.register().limit;
        assert_eq!(limit, 55);
    }

    #[test]
    fn tss_descriptor_points_at_the_tss() {
        let tss = TaskStateSegment::new(0x9000);
        let table = build_segment_table(&tss);
        let base = &tss as *const TaskStateSegment as u64;
        let low = table.entries()[5];
        let high = table.entries()[6];

        assert_eq!((low >> 40) as u8, 0x89);
        assert_eq!(low & 0xFFFF, (TSS_SIZE - 1) as u64);
        let decoded = ((low >> 16) & 0xFF_FFFF) | (((low >> 56) & 0xFF) << 24) | (high << 32);
        assert_eq!(decoded, base);
        assert_eq!(tss.privilege_stack(), 0x9000);
        assert_eq!({ tss.iomap_base }, TSS_SIZE as u16);
    }
}
