//! Validation of caller-supplied pointers.
//!
//! Every pointer/length pair that arrives in a syscall register is checked
//! against the caller's address window before the kernel touches it.

use halcyon_abi::Errno;

/// Longest path accepted from user memory, including the terminator.
pub const PATH_MAX: usize = 1024;

/// Half-open range `[start, end)` of addresses a caller may name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UserWindow {
    start: u64,
    end: u64,
}

impl UserWindow {
    /// Lower canonical half, minus the first 4 MiB kept unmapped as a null guard.
    pub const USER_SPACE: Self = Self::new(0x0000_0000_0040_0000, 0x0000_8000_0000_0000);

    pub const fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    #[inline]
    pub const fn start(&self) -> u64 {
        self.start
    }

    #[inline]
    pub const fn end(&self) -> u64 {
        self.end
    }

    /// Check that `[addr, addr + len)` lies inside the window.
    ///
    /// A zero-length range is accepted without looking at `addr`.
    pub fn check(&self, addr: u64, len: u64) -> Result<(), Errno> {
        if len == 0 {
            return Ok(());
        }
        if addr == 0 {
            return Err(Errno::EFAULT);
        }
        let end = addr.checked_add(len).ok_or(Errno::EFAULT)?;
        if addr < self.start || end > self.end {
            return Err(Errno::EFAULT);
        }
        Ok(())
    }

    /// Borrow `len` bytes of caller memory at `addr`.
    ///
    /// # Safety
    /// Every address inside the window must be mapped and readable, and the
    /// bytes must not be mutated while the slice is alive.
    pub unsafe fn bytes<'a>(&self, addr: u64, len: u64) -> Result<&'a [u8], Errno> {
        self.check(addr, len)?;
        if len == 0 {
            return Ok(&[]);
        }
        let len = usize::try_from(len).map_err(|_| Errno::EFAULT)?;
        // SAFETY: range validated above; mapping guaranteed by the caller.
        Ok(unsafe { core::slice::from_raw_parts(addr as *const u8, len) })
    }

    /// Mutable counterpart of [`UserWindow::bytes`].
    ///
    /// # Safety
    /// As for `bytes`, and nothing else may access the range while the
    /// slice is alive.
    pub unsafe fn bytes_mut<'a>(&self, addr: u64, len: u64) -> Result<&'a mut [u8], Errno> {
        self.check(addr, len)?;
        if len == 0 {
            return Ok(&mut []);
        }
        let len = usize::try_from(len).map_err(|_| Errno::EFAULT)?;
        // SAFETY: range validated above; exclusivity guaranteed by the caller.
        Ok(unsafe { core::slice::from_raw_parts_mut(addr as *mut u8, len) })
    }

    /// Borrow a NUL-terminated string at `addr`, without the terminator.
    ///
    /// Scanning stops at the window edge (`EFAULT`) or after [`PATH_MAX`]
    /// bytes (`ENAMETOOLONG`). The edge wins when both fall on the same byte.
    ///
    /// # Safety
    /// As for [`UserWindow::bytes`].
    pub unsafe fn c_str<'a>(&self, addr: u64) -> Result<&'a [u8], Errno> {
        self.check(addr, 1)?;
        let available = self.end - addr;
        let limit = available.min(PATH_MAX as u64) as usize;
        let base = addr as *const u8;
        for len in 0..limit {
            // SAFETY: `addr + len` is inside the window.
            if unsafe { base.add(len).read() } == 0 {
                // SAFETY: the same bytes were just read.
                return Ok(unsafe { core::slice::from_raw_parts(base, len) });
            }
        }
        if available > PATH_MAX as u64 {
            Err(Errno::ENAMETOOLONG)
        } else {
            Err(Errno::EFAULT)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window_over(buf: &[u8]) -> UserWindow {
        let start = buf.as_ptr() as u64;
        UserWindow::new(start, start + buf.len() as u64)
    }

    #[test]
    fn rejects_null_and_overflow() {
        let window = UserWindow::USER_SPACE;
        assert_eq!(window.check(0, 8), Err(Errno::EFAULT));
        assert_eq!(window.check(u64::MAX - 2, 8), Err(Errno::EFAULT));
        assert_eq!(window.check(0, 0), Ok(()));
    }

    #[test]
    fn rejects_kernel_addresses() {
        let window = UserWindow::USER_SPACE;
        assert_eq!(window.check(0xFFFF_8000_0000_0000, 16), Err(Errno::EFAULT));
        assert_eq!(window.check(0x1000, 16), Err(Errno::EFAULT));
        assert_eq!(window.check(0x0000_7FFF_FFFF_FFF0, 16), Ok(()));
        assert_eq!(window.check(0x0000_7FFF_FFFF_FFF8, 16), Err(Errno::EFAULT));
    }

    #[test]
    fn borrows_validated_bytes() {
        let buf = *b"hello";
        let window = window_over(&buf);
        let bytes = unsafe { window.bytes(buf.as_ptr() as u64, 5) };
        assert_eq!(bytes, Ok(&b"hello"[..]));
        let past = unsafe { window.bytes(buf.as_ptr() as u64 + 1, 5) };
        assert_eq!(past, Err(Errno::EFAULT));
    }

    #[test]
    fn c_str_stops_at_terminator_or_window() {
        let buf = *b"/dev/tty0\0junk";
        let window = window_over(&buf);
        let path = unsafe { window.c_str(buf.as_ptr() as u64) };
        assert_eq!(path, Ok(&b"/dev/tty0"[..]));

        let unterminated = *b"abc";
        let window = window_over(&unterminated);
        let path = unsafe { window.c_str(unterminated.as_ptr() as u64) };
        assert_eq!(path, Err(Errno::EFAULT));
    }

    #[test]
    fn c_str_rejects_overlong_paths() {
        let long = [b'a'; PATH_MAX + 8];
        let window = window_over(&long);
        let path = unsafe { window.c_str(long.as_ptr() as u64) };
        assert_eq!(path, Err(Errno::ENAMETOOLONG));
    }

    #[test]
    fn c_str_at_the_window_edge_is_a_fault() {
        let edge = [b'a'; PATH_MAX];
        let window = window_over(&edge);
        let path = unsafe { window.c_str(edge.as_ptr() as u64) };
        assert_eq!(path, Err(Errno::EFAULT));

        let mut longest = [b'a'; PATH_MAX];
        longest[PATH_MAX - 1] = 0;
        let window = window_over(&longest);
        let path = unsafe { window.c_str(longest.as_ptr() as u64) };
        assert_eq!(path.map(<[u8]>::len), Ok(PATH_MAX - 1));
    }
}
