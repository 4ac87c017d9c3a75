//! Memory-mapped register overlays for the ADMA IP core.
//!
//! Each block is a typed overlay onto a sub-window of the config BAR,
//! carved (and length-validated) at device open. Overlays hold an
//! [`MmioRegion`](crate::hal::MmioRegion) handle and expose named accessors;
//! nothing outside this module knows register offsets.

pub mod config;
pub mod engine;
pub mod irq;

/// Block identification: bits 31:20 of every block identifier register.
pub const ADMA_ID_MASK: u32 = 0xFFF0_0000;
/// Expected value of the masked identifier for all ADMA blocks.
pub const ADMA_ID: u32 = 0x1FC0_0000;
/// Streaming (AXI-ST) engine flag in the engine identifier.
pub const ADMA_ID_ST_BIT: u32 = 1 << 15;

/// Config block offset within the config BAR.
pub const CONFIG_BLOCK_OFFSET: usize = 0x3000;
/// IRQ block offset within the config BAR.
pub const IRQ_BLOCK_OFFSET: usize = 0x2000;
/// H2C engine channel blocks base.
pub const H2C_CHANNEL_OFFSET: usize = 0x0000;
/// C2H engine channel blocks base.
pub const C2H_CHANNEL_OFFSET: usize = 0x1000;
/// H2C descriptor-fetch (SGDMA) blocks base.
pub const H2C_SGDMA_OFFSET: usize = 0x4000;
/// C2H descriptor-fetch (SGDMA) blocks base.
pub const C2H_SGDMA_OFFSET: usize = 0x5000;
/// Stride between per-channel blocks.
pub const CHANNEL_STRIDE: usize = 0x100;

/// Generate a read accessor for a register.
macro_rules! reg_ro {
    ($fn:ident, $offset:expr, $doc:expr) => {
        #[doc = concat!("Read ", $doc)]
        #[inline(always)]
        pub fn $fn(&self) -> u32 {
            self.regs.read32($offset)
        }
    };
}

/// Generate read and write accessors for a register.
macro_rules! reg_rw {
    ($read_fn:ident, $write_fn:ident, $offset:expr, $doc:expr) => {
        $crate::internal::register::reg_ro!($read_fn, $offset, $doc);

        #[doc = concat!("Write ", $doc)]
        #[inline(always)]
        pub fn $write_fn(&self, value: u32) {
            self.regs.write32($offset, value);
        }
    };
}

/// Generate a write-only accessor (W1S/W1C mirror registers).
macro_rules! reg_wo {
    ($write_fn:ident, $offset:expr, $doc:expr) => {
        #[doc = concat!("Write ", $doc)]
        #[inline(always)]
        pub fn $write_fn(&self, value: u32) {
            self.regs.write32($offset, value);
        }
    };
}

pub(crate) use reg_ro;
pub(crate) use reg_rw;
pub(crate) use reg_wo;

/// Does a block identifier carry the ADMA magic?
#[inline]
#[must_use]
pub fn is_adma_block(identifier: u32) -> bool {
    identifier & ADMA_ID_MASK == ADMA_ID
}
