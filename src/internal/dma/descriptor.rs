//! Transfer descriptors.
//!
//! Descriptors live in coherent host memory and are consumed by the fetch
//! engine, so every field is little-endian and every slot write goes through
//! volatile accesses on the shared buffer.

use crate::hal::DmaBuffer;
use crate::internal::constants::DESCRIPTOR_SIZE;

/// Descriptor control word bits.
pub mod bits {
    /// Stop fetching after this descriptor.
    pub const STOP: u32 = 1 << 0;
    /// Raise the completed status when this descriptor finishes.
    pub const COMPLETED: u32 = 1 << 1;
    /// End of packet (streaming engines only).
    pub const EOP: u32 = 1 << 4;
}

/// One 32-byte transfer descriptor, laid out exactly as the fetch engine
/// reads it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct Descriptor {
    /// Source bus address, low half.
    pub src_addr_lo: u32,
    /// Source bus address, high half.
    pub src_addr_hi: u32,
    /// Destination bus address, low half.
    pub dst_addr_lo: u32,
    /// Destination bus address, high half.
    pub dst_addr_hi: u32,
    /// Transfer length in bytes and control bits.
    pub control: u32,
    reserved: [u32; 3],
}

impl Descriptor {
    /// Build a descriptor for one contiguous block.
    #[must_use]
    pub fn new(src: u64, dst: u64, len: u32, control: u32) -> Self {
        Self {
            src_addr_lo: src as u32,
            src_addr_hi: (src >> 32) as u32,
            dst_addr_lo: dst as u32,
            dst_addr_hi: (dst >> 32) as u32,
            control: len | control,
            reserved: [0; 3],
        }
    }

    /// Source bus address.
    #[must_use]
    pub fn src_addr(&self) -> u64 {
        (u64::from(self.src_addr_hi) << 32) | u64::from(self.src_addr_lo)
    }

    /// Destination bus address.
    #[must_use]
    pub fn dst_addr(&self) -> u64 {
        (u64::from(self.dst_addr_hi) << 32) | u64::from(self.dst_addr_lo)
    }

    /// Write this descriptor into ring slot `slot` of a coherent buffer.
    pub(crate) fn store(&self, buffer: &DmaBuffer, slot: usize) {
        let base = slot * DESCRIPTOR_SIZE;
        buffer.write32(base, self.src_addr_lo);
        buffer.write32(base + 4, self.src_addr_hi);
        buffer.write32(base + 8, self.dst_addr_lo);
        buffer.write32(base + 12, self.dst_addr_hi);
        buffer.write32(base + 16, self.control);
        buffer.write32(base + 20, 0);
        buffer.write32(base + 24, 0);
        buffer.write32(base + 28, 0);
    }
}
