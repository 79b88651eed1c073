use crate::error::{Error, Result};

/// Mapped window sizes are rounded up to a multiple of this many bytes.
pub const MAP_ALIGNMENT: u64 = 64;

/// Where an opened window landed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Placement {
    /// Byte offset of the window in the current block.
    pub offset: u64,
    /// Rounded window size in bytes.
    pub size: u64,
    /// `Some(block_size)` if the window did not fit and a new block of that
    /// size must be allocated (orphaning the old one) before writing.
    pub reallocate: Option<u64>,
}

/// Write-window bookkeeping for a streaming buffer.
///
/// Tracks the current block size, the write cursor, the open window and the
/// offset of the most recently sealed window. No device calls happen here.
#[derive(Debug, Clone)]
pub struct StreamCursor {
    block_size_factor: u64,
    block_size: u64,
    /// When a window is open: its offset. Otherwise: the next free offset.
    cursor: u64,
    /// Size of the open window, if any.
    open: Option<u64>,
    sealed_offset: Option<u64>,
}

impl StreamCursor {
    pub fn new(block_size_factor: u64) -> Self {
        Self {
            block_size_factor: block_size_factor.max(1),
            block_size: 0,
            cursor: 0,
            open: None,
            sealed_offset: None,
        }
    }

    /// Opens a window of at least `num_bytes`.
    ///
    /// Fails with [`Error::ConcurrentMap`] while another window is open, and
    /// with [`Error::WindowTooLarge`] when the window or its block would not
    /// fit in 64 bits.
    pub fn open(&mut self, num_bytes: u64) -> Result<Placement> {
        if self.open.is_some() {
            return Err(Error::ConcurrentMap);
        }

        let size = next_multiple(num_bytes, MAP_ALIGNMENT).ok_or(Error::WindowTooLarge(num_bytes))?;

        let mut reallocate = None;
        if self.cursor.checked_add(size).is_none_or(|end| end > self.block_size) {
            // Size the block so that we don't have to reallocate too often.
            let grown = self
                .block_size_factor
                .checked_mul(size)
                .ok_or(Error::WindowTooLarge(num_bytes))?;
            self.block_size = self.block_size.max(grown);
            self.cursor = 0;
            reallocate = Some(self.block_size);
        }

        self.open = Some(size);

        Ok(Placement {
            offset: self.cursor,
            size,
            reallocate,
        })
    }

    /// Closes the open window and returns its offset.
    ///
    /// Fails with [`Error::NotMapped`] when no window is open.
    pub fn seal(&mut self) -> Result<u64> {
        let size = self.open.take().ok_or(Error::NotMapped)?;
        let offset = self.cursor;
        self.sealed_offset = Some(offset);
        self.cursor += size;
        Ok(offset)
    }

    /// Forgets the current block; the next window starts a new one.
    pub fn reset(&mut self) {
        self.block_size = 0;
        self.cursor = 0;
        self.open = None;
        self.sealed_offset = None;
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    #[inline]
    pub fn block_size(&self) -> u64 {
        self.block_size
    }

    /// Offset of the next window (or of the open one).
    #[inline]
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    #[inline]
    pub fn sealed_offset(&self) -> Option<u64> {
        self.sealed_offset
    }
}

/// Smallest multiple of `b` that is `>= a`, treating a zero request as one
/// byte so every window has a non-zero size.
fn next_multiple(a: u64, b: u64) -> Option<u64> {
    a.max(1).div_ceil(b).checked_mul(b)
}
