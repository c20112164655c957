//! Kernel log: the single formatted-output call of the kernel.
//!
//! Callers format through the `klog_*!` macros; rendering happens here and
//! the bytes are handed to whatever [`LogSink`] the platform attached. Until
//! a sink is attached, output is dropped. After [`klog_enter_panic`] no call
//! on this path waits for a lock.

use core::fmt;
use core::sync::atomic::{AtomicU8, Ordering};

use spin::RwLock;

use crate::init_flag::InitFlag;

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum KlogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl KlogLevel {
    fn from_raw(raw: u8) -> Self {
        match raw {
            0 => KlogLevel::Error,
            1 => KlogLevel::Warn,
            2 => KlogLevel::Info,
            3 => KlogLevel::Debug,
            _ => KlogLevel::Trace,
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "error" => Some(KlogLevel::Error),
            "warn" => Some(KlogLevel::Warn),
            "info" => Some(KlogLevel::Info),
            "debug" => Some(KlogLevel::Debug),
            "trace" => Some(KlogLevel::Trace),
            _ => None,
        }
    }
}

/// Byte-oriented output device for rendered log lines.
pub trait LogSink: Sync {
    fn write_bytes(&self, bytes: &[u8]);

    /// Panic-time write. Must not wait on a lock the interrupted code may
    /// hold; dropping output is acceptable.
    fn write_bytes_panicking(&self, bytes: &[u8]) {
        self.write_bytes(bytes);
    }
}

static CURRENT_LEVEL: AtomicU8 = AtomicU8::new(KlogLevel::Info as u8);
static SINK_READY: InitFlag = InitFlag::new();
static PANICKING: InitFlag = InitFlag::new();
static SINK: RwLock<Option<&'static dyn LogSink>> = RwLock::new(None);

#[inline(always)]
fn is_enabled(level: KlogLevel) -> bool {
    level as u8 <= CURRENT_LEVEL.load(Ordering::Relaxed)
}

fn write_bytes(bytes: &[u8]) {
    if !SINK_READY.is_set_relaxed() {
        return;
    }
    if PANICKING.is_set_relaxed() {
        if let Some(sink) = SINK.try_read() {
            deliver(*sink, bytes, true);
        }
        return;
    }
    deliver(*SINK.read(), bytes, false);
}

fn deliver(sink: Option<&'static dyn LogSink>, bytes: &[u8], panicking: bool) {
    match sink {
        Some(sink) if panicking => sink.write_bytes_panicking(bytes),
        Some(sink) => sink.write_bytes(bytes),
        None => {}
    }
}

pub fn log_args(level: KlogLevel, args: fmt::Arguments<'_>) {
    if !is_enabled(level) {
        return;
    }
    struct KlogWriter;
    impl fmt::Write for KlogWriter {
        fn write_str(&mut self, s: &str) -> fmt::Result {
            write_bytes(s.as_bytes());
            Ok(())
        }
    }
    let _ = fmt::write(&mut KlogWriter, args);
    write_bytes(b"\n");
}

pub fn klog_init() {
    CURRENT_LEVEL.store(KlogLevel::Info as u8, Ordering::Relaxed);
}

/// Route all further output to `sink`, replacing any previous sink.
pub fn klog_attach(sink: &'static dyn LogSink) {
    *SINK.write() = Some(sink);
    SINK_READY.mark_set();
}

/// Switch every later write to the sink's lock-free panic path.
pub fn klog_enter_panic() {
    PANICKING.mark_set();
}

pub fn klog_set_level(level: KlogLevel) {
    CURRENT_LEVEL.store(level as u8, Ordering::Relaxed);
}

pub fn klog_get_level() -> KlogLevel {
    KlogLevel::from_raw(CURRENT_LEVEL.load(Ordering::Relaxed))
}

#[macro_export]
macro_rules! klog_error {
    ($($arg:tt)*) => {
        $crate::klog::log_args($crate::klog::KlogLevel::Error, ::core::format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! klog_warn {
    ($($arg:tt)*) => {
        $crate::klog::log_args($crate::klog::KlogLevel::Warn, ::core::format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! klog_info {
    ($($arg:tt)*) => {
        $crate::klog::log_args($crate::klog::KlogLevel::Info, ::core::format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! klog_debug {
    ($($arg:tt)*) => {
        $crate::klog::log_args($crate::klog::KlogLevel::Debug, ::core::format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! klog_trace {
    ($($arg:tt)*) => {
        $crate::klog::log_args($crate::klog::KlogLevel::Trace, ::core::format_args!($($arg)*))
    };
}
