//! Limine requests and the platform hooks fed into the HAL sequencer.

use halcyon_abi::SysResult;
use halcyon_boot::{BootError, BootHooks, MachineInfo, MemoryLayout};
use halcyon_core::services::console::{ConsoleServices, register_console_services};
use halcyon_drivers::vga::VGA_TEXT_PHYS;
use halcyon_drivers::{CONSOLE, serial};
use halcyon_lib::delay::{self, FALLBACK_TICKS_PER_US, TscClock};
use halcyon_lib::{klog_attach, klog_debug, klog_info, klog_init, klog_warn};
use limine::BaseRevision;
use limine::memory_map::EntryType;
use limine::request::{
    ExecutableCmdlineRequest, HhdmRequest, MemoryMapRequest, RequestsEndMarker,
    RequestsStartMarker,
};
use spin::Once;

#[used]
#[unsafe(link_section = ".requests")]
static BASE_REVISION: BaseRevision = BaseRevision::new();

#[used]
#[unsafe(link_section = ".requests")]
static HHDM_REQUEST: HhdmRequest = HhdmRequest::new();

#[used]
#[unsafe(link_section = ".requests")]
static MEMORY_MAP_REQUEST: MemoryMapRequest = MemoryMapRequest::new();

#[used]
#[unsafe(link_section = ".requests")]
static CMDLINE_REQUEST: ExecutableCmdlineRequest = ExecutableCmdlineRequest::new();

#[used]
#[unsafe(link_section = ".requests_start_marker")]
static _START_MARKER: RequestsStartMarker = RequestsStartMarker::new();

#[used]
#[unsafe(link_section = ".requests_end_marker")]
static _END_MARKER: RequestsEndMarker = RequestsEndMarker::new();

const PRIVILEGE_STACK_SIZE: usize = 16 * 1024;

#[repr(C, align(16))]
struct PrivilegeStack([u8; PRIVILEGE_STACK_SIZE]);

/// Stack the CPU switches to when user mode traps into the kernel.
static mut PRIVILEGE_STACK: PrivilegeStack = PrivilegeStack([0; PRIVILEGE_STACK_SIZE]);

static CLOCK: Once<TscClock> = Once::new();

fn console_write(bytes: &[u8]) -> SysResult {
    Ok(CONSOLE.write(bytes) as u64)
}

static KERNEL_CONSOLE: ConsoleServices = ConsoleServices {
    write: console_write,
};

/// Boot hooks backed by the Limine responses.
pub struct LiminePlatform;

impl LiminePlatform {
    fn install_clock() {
        let clock = CLOCK.call_once(|| {
            delay::calibrate_tsc().unwrap_or(TscClock::with_rate(FALLBACK_TICKS_PER_US))
        });
        delay::install_clock(clock);
    }

    fn attach_console(hhdm_offset: u64) {
        serial::init();
        // SAFETY: the HHDM maps the legacy text buffer and nothing else
        // writes to it once the console owns it.
        unsafe { CONSOLE.attach_vga((hhdm_offset + VGA_TEXT_PHYS) as *mut u8) };
        klog_init();
        klog_attach(&CONSOLE);
        register_console_services(&KERNEL_CONSOLE);
    }

    fn cmdline() -> &'static str {
        CMDLINE_REQUEST
            .get_response()
            .and_then(|response| response.cmdline().to_str().ok())
            .unwrap_or("")
    }
}

impl BootHooks for LiminePlatform {
    fn platform(&mut self) -> Result<MachineInfo, BootError> {
        if !BASE_REVISION.is_supported() {
            return Err(BootError::Platform("unsupported Limine base revision"));
        }
        let hhdm_offset = HHDM_REQUEST
            .get_response()
            .map(|response| response.offset())
            .ok_or(BootError::Platform("no HHDM response"))?;
        let memory_map = MEMORY_MAP_REQUEST
            .get_response()
            .ok_or(BootError::Platform("no memory map response"))?;

        Self::install_clock();
        Self::attach_console(hhdm_offset);

        let mut memory_end = 0;
        let mut usable_regions = 0;
        for entry in memory_map
            .entries()
            .iter()
            .filter(|entry| entry.entry_type == EntryType::USABLE)
        {
            usable_regions += 1;
            memory_end = memory_end.max(entry.base + entry.length);
            klog_debug!("usable: {:#x}..{:#x}", entry.base, entry.base + entry.length);
        }
        if usable_regions == 0 {
            return Err(BootError::Platform("no usable memory"));
        }

        let kernel_stack_top = (&raw const PRIVILEGE_STACK) as u64 + PRIVILEGE_STACK_SIZE as u64;
        Ok(MachineInfo {
            memory_end,
            hhdm_offset,
            usable_regions,
            kernel_stack_top,
            cmdline: Self::cmdline(),
        })
    }

    fn memory(&mut self, machine: &MachineInfo, layout: &MemoryLayout) -> Result<(), BootError> {
        match serial::kind() {
            serial::UartType::Absent => klog_warn!("serial: no UART on COM1"),
            kind => klog_debug!("serial: {:?}, {} bytes dropped", kind, serial::dropped_bytes()),
        }
        klog_info!(
            "memory: {} KiB total, buffers end at {:#x}, {} KiB main memory",
            machine.memory_end / 1024,
            layout.buffer_end,
            layout.main_memory_bytes() / 1024
        );
        Ok(())
    }
}
