//! VGA text-mode console.
//!
//! The text buffer is an array of two-byte cells: the character byte at the
//! even offset, its colour attribute at the following odd offset. Writing a
//! character advances the cursor by one whole cell (two bytes).

/// Physical address of the colour text buffer.
pub const VGA_TEXT_PHYS: u64 = 0xB8000;
pub const VGA_WIDTH: usize = 80;
pub const VGA_HEIGHT: usize = 25;
pub const CELL_BYTES: usize = 2;
pub const VGA_BUFFER_BYTES: usize = VGA_WIDTH * VGA_HEIGHT * CELL_BYTES;

/// Light grey on black.
pub const DEFAULT_ATTRIBUTE: u8 = 0x07;

/// Byte-addressed backing store for the text buffer.
pub trait TextMemory {
    fn write_byte(&mut self, offset: usize, value: u8);
    fn read_byte(&self, offset: usize) -> u8;
}

/// Memory-mapped VGA text buffer.
pub struct VgaMemory {
    base: *mut u8,
}

// SAFETY: the buffer is only reached through the console mutex.
unsafe impl Send for VgaMemory {}

impl VgaMemory {
    /// # Safety
    /// `base` must map at least [`VGA_BUFFER_BYTES`] bytes of the text
    /// buffer and nothing else may write to it.
    pub const unsafe fn new(base: *mut u8) -> Self {
        Self { base }
    }
}

impl TextMemory for VgaMemory {
    fn write_byte(&mut self, offset: usize, value: u8) {
        if offset < VGA_BUFFER_BYTES {
            // SAFETY: bounds checked above; `new` guarantees the mapping.
            unsafe { self.base.add(offset).write_volatile(value) }
        }
    }

    fn read_byte(&self, offset: usize) -> u8 {
        if offset < VGA_BUFFER_BYTES {
            // SAFETY: bounds checked above; `new` guarantees the mapping.
            unsafe { self.base.add(offset).read_volatile() }
        } else {
            0
        }
    }
}

impl<const N: usize> TextMemory for [u8; N] {
    fn write_byte(&mut self, offset: usize, value: u8) {
        if let Some(slot) = self.get_mut(offset) {
            *slot = value;
        }
    }

    fn read_byte(&self, offset: usize) -> u8 {
        self.get(offset).copied().unwrap_or(0)
    }
}

pub struct TextConsole<M: TextMemory> {
    memory: M,
    /// Byte offset of the next cell to write.
    cursor: usize,
    attribute: u8,
}

impl<M: TextMemory> TextConsole<M> {
    pub const fn new(memory: M) -> Self {
        Self {
            memory,
            cursor: 0,
            attribute: DEFAULT_ATTRIBUTE,
        }
    }

    pub fn set_attribute(&mut self, attribute: u8) {
        self.attribute = attribute;
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn memory(&self) -> &M {
        &self.memory
    }

    pub fn clear(&mut self) {
        for cell in 0..VGA_WIDTH * VGA_HEIGHT {
            self.put_cell(cell * CELL_BYTES, b' ');
        }
        self.cursor = 0;
    }

    /// Write a string starting at a given cell, without moving the cursor.
    pub fn write_at(&mut self, column: usize, row: usize, text: &[u8]) {
        let mut offset = (row * VGA_WIDTH + column) * CELL_BYTES;
        for &byte in text {
            if offset >= VGA_BUFFER_BYTES {
                break;
            }
            self.put_cell(offset, byte);
            offset += CELL_BYTES;
        }
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.put_byte(byte);
        }
    }

    pub fn put_byte(&mut self, byte: u8) {
        match byte {
            b'\n' => {
                let row_bytes = VGA_WIDTH * CELL_BYTES;
                self.cursor = (self.cursor / row_bytes + 1) * row_bytes;
            }
            b'\r' => {
                let row_bytes = VGA_WIDTH * CELL_BYTES;
                self.cursor -= self.cursor % row_bytes;
            }
            _ => {
                self.put_cell(self.cursor, byte);
                self.cursor += CELL_BYTES;
            }
        }
        if self.cursor >= VGA_BUFFER_BYTES {
            self.scroll();
        }
    }

    fn put_cell(&mut self, offset: usize, byte: u8) {
        self.memory.write_byte(offset, byte);
        self.memory.write_byte(offset + 1, self.attribute);
    }

    fn scroll(&mut self) {
        let row_bytes = VGA_WIDTH * CELL_BYTES;
        for offset in row_bytes..VGA_BUFFER_BYTES {
            let value = self.memory.read_byte(offset);
            self.memory.write_byte(offset - row_bytes, value);
        }
        let last_row = VGA_BUFFER_BYTES - row_bytes;
        for cell in 0..VGA_WIDTH {
            self.put_cell(last_row + cell * CELL_BYTES, b' ');
        }
        self.cursor = last_row;
    }
}
