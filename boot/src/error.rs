use core::fmt;

/// Fatal boot failures. None of them is retried.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootError {
    /// The sequencer was entered a second time.
    AlreadyStarted,
    /// The platform stage could not describe the machine.
    Platform(&'static str),
    /// Less memory than the buffer area needs.
    InsufficientMemory { memory_end: u64 },
    /// The external allocator rejected the layout.
    Memory(&'static str),
    /// A vector the kernel can raise has no gate of the expected shape.
    IncompleteGateTable { vector: u8 },
}

impl BootError {
    pub fn as_str(&self) -> &'static str {
        match self {
            BootError::AlreadyStarted => "boot sequence already started",
            BootError::Platform(reason) => reason,
            BootError::InsufficientMemory { .. } => "not enough memory for the buffer area",
            BootError::Memory(reason) => reason,
            BootError::IncompleteGateTable { .. } => "gate table is missing a required gate",
        }
    }
}

impl fmt::Display for BootError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootError::Platform(reason) => write!(f, "platform: {}", reason),
            BootError::InsufficientMemory { memory_end } => {
                write!(f, "{} (memory ends at {:#x})", self.as_str(), memory_end)
            }
            BootError::Memory(reason) => write!(f, "memory: {}", reason),
            BootError::IncompleteGateTable { vector } => {
                write!(f, "{} (vector {:#x})", self.as_str(), vector)
            }
            BootError::AlreadyStarted => f.write_str(self.as_str()),
        }
    }
}
