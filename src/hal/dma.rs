//! DMA buffer allocation and scatter-list contracts.
//!
//! The platform pins host memory and describes it as bus-addressable
//! fragments; the driver consumes the fragment list directly when building
//! ring descriptors. Coherent buffers back the descriptor ring and the
//! hardware writeback area.

/// A coherent (uncached, bus-visible) buffer allocated by the platform.
#[derive(Debug, Clone, Copy)]
pub struct DmaBuffer {
    /// Kernel/host virtual address of the buffer.
    pub virt: *mut u8,
    /// Bus address the device uses to reach the buffer.
    pub bus: u64,
    /// Length in bytes.
    pub len: usize,
}

impl DmaBuffer {
    /// Volatile 32-bit read at a byte offset (hardware writes here).
    #[inline(always)]
    #[must_use]
    pub fn read32(&self, offset: usize) -> u32 {
        assert!(offset % 4 == 0 && offset + 4 <= self.len, "writeback offset out of bounds");
        // SAFETY: bounds checked above; the platform guarantees the mapping.
        unsafe { core::ptr::read_volatile(self.virt.add(offset).cast::<u32>()) }
    }

    /// Volatile 32-bit write at a byte offset.
    #[inline(always)]
    pub fn write32(&self, offset: usize, value: u32) {
        assert!(offset % 4 == 0 && offset + 4 <= self.len, "writeback offset out of bounds");
        // SAFETY: bounds checked above; the platform guarantees the mapping.
        unsafe { core::ptr::write_volatile(self.virt.add(offset).cast::<u32>(), value) }
    }
}

// SAFETY: plain (pointer, bus, length) descriptor of platform-owned memory;
// the ring serializes all access to the contents.
unsafe impl Send for DmaBuffer {}

/// Allocates and frees coherent DMA memory.
pub trait DmaAllocator {
    /// Allocate `len` bytes aligned to `align`. Returns `None` on
    /// exhaustion; the driver surfaces that as a resource error.
    fn alloc_coherent(&mut self, len: usize, align: usize) -> Option<DmaBuffer>;

    /// Release a buffer returned by [`DmaAllocator::alloc_coherent`].
    fn free_coherent(&mut self, buffer: DmaBuffer);
}

/// One bus-addressable fragment of a pinned host region.
///
/// Produced by the platform's scatter-gather mapping; one fragment becomes
/// one ring descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DmaFragment {
    /// Bus address of the fragment.
    pub bus_addr: u64,
    /// Fragment length in bytes.
    pub len: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_read_write_roundtrip() {
        let mut backing = [0u32; 8];
        let buf = DmaBuffer {
            virt: backing.as_mut_ptr().cast(),
            bus: 0x8000_0000,
            len: 32,
        };
        buf.write32(4, 0xCAFE_F00D);
        assert_eq!(buf.read32(4), 0xCAFE_F00D);
        assert_eq!(backing[1], 0xCAFE_F00D);
    }

    #[test]
    #[should_panic(expected = "writeback offset out of bounds")]
    fn buffer_access_past_end_panics() {
        let mut backing = [0u32; 2];
        let buf = DmaBuffer {
            virt: backing.as_mut_ptr().cast(),
            bus: 0,
            len: 8,
        };
        let _ = buf.read32(8);
    }
}
