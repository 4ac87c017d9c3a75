//! Bounds-checked memory-mapped register windows.
//!
//! A [`MmioRegion`] wraps the virtual address of a mapped PCIe BAR (or a
//! sub-block of one) together with its length. All register access in this
//! crate goes through it; there is no raw pointer arithmetic over BAR memory
//! anywhere else.

/// A window onto memory-mapped device registers.
///
/// Reads and writes are volatile and 32-bit; every access is checked against
/// the window length. An out-of-range offset is a driver bug, not a runtime
/// condition, so it panics rather than returning an error.
///
/// `MmioRegion` is `Copy`: register blocks hold their own handle onto the
/// same underlying BAR window. The hardware itself is the shared state.
#[derive(Debug, Clone, Copy)]
pub struct MmioRegion {
    base: *mut u8,
    len: usize,
}

impl MmioRegion {
    /// Create a region over `len` bytes of mapped device memory.
    ///
    /// # Safety
    ///
    /// `base` must point to a mapping of at least `len` bytes that stays
    /// valid for as long as any copy of this region (or a subregion carved
    /// from it) is used, and must be 4-byte aligned.
    #[must_use]
    pub const unsafe fn new(base: *mut u8, len: usize) -> Self {
        Self { base, len }
    }

    /// Length of the window in bytes.
    #[inline(always)]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the window is empty.
    #[inline(always)]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Base virtual address (for unmap bookkeeping).
    #[inline(always)]
    #[must_use]
    pub const fn base(&self) -> *mut u8 {
        self.base
    }

    /// Carve a sub-window, validating that it fits.
    ///
    /// Returns `None` when the requested block does not fit inside this
    /// window - callers treat that as a configuration error at open time.
    #[must_use]
    pub fn subregion(&self, offset: usize, len: usize) -> Option<MmioRegion> {
        let end = offset.checked_add(len)?;
        if end > self.len {
            return None;
        }
        Some(MmioRegion {
            // SAFETY: offset + len <= self.len, so the new window stays
            // inside the mapping guaranteed by the constructor.
            base: unsafe { self.base.add(offset) },
            len,
        })
    }

    #[inline(always)]
    fn checked(&self, offset: usize) -> *mut u32 {
        assert!(
            offset % 4 == 0 && offset + 4 <= self.len,
            "register offset out of bounds"
        );
        // SAFETY: bounds and alignment checked above; the mapping is valid
        // per the constructor contract.
        unsafe { self.base.add(offset).cast::<u32>() }
    }

    /// Volatile 32-bit read at `offset`.
    #[inline(always)]
    #[must_use]
    pub fn read32(&self, offset: usize) -> u32 {
        // SAFETY: `checked` validates the access.
        unsafe { core::ptr::read_volatile(self.checked(offset)) }
    }

    /// Volatile 32-bit write at `offset`.
    #[inline(always)]
    pub fn write32(&self, offset: usize, value: u32) {
        let target = self.checked(offset);
        // Host tests route writes through the simulated hardware so W1S/W1C
        // mirror registers behave like the real device.
        #[cfg(test)]
        if crate::testing::mmio_sim::intercept_write(target as usize, value) {
            return;
        }
        // SAFETY: `checked` validates the access.
        unsafe { core::ptr::write_volatile(target, value) }
    }

    /// Read-modify-write at `offset`.
    #[inline(always)]
    pub fn modify32<F: FnOnce(u32) -> u32>(&self, offset: usize, f: F) {
        self.write32(offset, f(self.read32(offset)));
    }
}

// SAFETY: the region is a plain (pointer, length) pair over device memory;
// the driver serializes access per the concurrency rules in the interrupt
// module. Volatile accesses themselves are safe from any context.
unsafe impl Send for MmioRegion {}
unsafe impl Sync for MmioRegion {}

// =============================================================================
// Tests
// =============================================================================
