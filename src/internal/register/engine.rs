//! Engine channel and descriptor-fetch register blocks.
//!
//! Every channel-direction pair owns one engine block (control, status,
//! interrupt enables, performance counters) and one fetch block (ring base
//! address, credit count). Control and interrupt-enable registers carry
//! W1S/W1C mirrors; status has a read-to-clear mirror used by the
//! deferred-work path.

use crate::hal::MmioRegion;
use crate::internal::register::{reg_ro, reg_rw, reg_wo};

/// Byte length of one engine channel block.
pub const ENGINE_BLOCK_LEN: usize = 0x100;
/// Byte length of one descriptor-fetch block.
pub const SGDMA_BLOCK_LEN: usize = 0x100;

pub(crate) const IDENTIFIER: usize = 0x00;
pub(crate) const CONTROL: usize = 0x04;
pub(crate) const CONTROL_W1S: usize = 0x08;
pub(crate) const CONTROL_W1C: usize = 0x0C;
pub(crate) const STATUS: usize = 0x40;
pub(crate) const STATUS_RC: usize = 0x44;
pub(crate) const COMPLETED_DESC_COUNT: usize = 0x48;
pub(crate) const ALIGNMENTS: usize = 0x4C;
pub(crate) const POLL_MODE_WB_LO: usize = 0x88;
pub(crate) const POLL_MODE_WB_HI: usize = 0x8C;
pub(crate) const INT_ENABLE_MASK: usize = 0x90;
pub(crate) const INT_ENABLE_W1S: usize = 0x94;
pub(crate) const INT_ENABLE_W1C: usize = 0x98;
pub(crate) const PERF_CONTROL: usize = 0xC0;
pub(crate) const PERF_CYCLE_LO: usize = 0xC4;
pub(crate) const PERF_CYCLE_HI: usize = 0xC8;
pub(crate) const PERF_DATA_LO: usize = 0xCC;
pub(crate) const PERF_DATA_HI: usize = 0xD0;
pub(crate) const PERF_PENDING_LO: usize = 0xD4;
pub(crate) const PERF_PENDING_HI: usize = 0xD8;

pub(crate) const FETCH_RING_BASE_LO: usize = 0x00;
pub(crate) const FETCH_RING_BASE_HI: usize = 0x04;
pub(crate) const FETCH_EP_FIFO_LO: usize = 0x08;
pub(crate) const FETCH_EP_FIFO_HI: usize = 0x0C;
pub(crate) const FETCH_LAST_PTR: usize = 0x10;
pub(crate) const FETCH_TABLE_SIZE: usize = 0x14;
pub(crate) const FETCH_CONTROL: usize = 0x18;

/// Engine control register bits.
pub mod control {
    /// Start fetching and executing descriptors.
    pub const RUN: u32 = 1 << 0;
    /// Interrupt on a descriptor with the stop bit set.
    pub const IE_DESC_STOPPED: u32 = 1 << 1;
    /// Interrupt on a descriptor with the completed bit set.
    pub const IE_DESC_COMPLETED: u32 = 1 << 2;
    /// Interrupt on address or length alignment mismatch.
    pub const IE_ALIGNMENT_MISMATCH: u32 = 1 << 3;
    /// Interrupt on a bad descriptor magic.
    pub const IE_MAGIC_STOPPED: u32 = 1 << 4;
    /// Interrupt on an invalid transfer length.
    pub const IE_INVALID_LENGTH: u32 = 1 << 5;
    /// Interrupt when the engine idles with descriptors outstanding.
    pub const IE_IDLE_STOPPED: u32 = 1 << 6;
    /// Interrupt on any read-side bus error.
    pub const IE_READ_ERROR: u32 = 0x1F << 9;
    /// Interrupt on any write-side bus error.
    pub const IE_WRITE_ERROR: u32 = 0x1F << 14;
    /// Interrupt on any descriptor-fetch error.
    pub const IE_DESCRIPTOR_ERROR: u32 = 0x1F << 19;
    /// Keep the device address fixed across the transfer (FIFO mode).
    pub const NON_INCR_ADDR: u32 = 1 << 25;
    /// Write the completed count to host memory instead of interrupting.
    pub const POLL_MODE_WB_ENABLE: u32 = 1 << 26;
    /// Reset the engine datapath.
    pub const RST: u32 = 1 << 31;

    /// Every interrupt-enable bit the driver arms at start.
    pub const IE_ALL: u32 = IE_DESC_STOPPED
        | IE_DESC_COMPLETED
        | IE_ALIGNMENT_MISMATCH
        | IE_MAGIC_STOPPED
        | IE_INVALID_LENGTH
        | IE_IDLE_STOPPED
        | IE_READ_ERROR
        | IE_WRITE_ERROR
        | IE_DESCRIPTOR_ERROR;
}

/// Engine status register bits.
pub mod status {
    /// Engine is fetching or executing descriptors.
    pub const BUSY: u32 = 1 << 0;
    /// Stopped on a descriptor with the stop bit.
    pub const DESC_STOPPED: u32 = 1 << 1;
    /// Completed a descriptor with the completed bit.
    pub const DESC_COMPLETED: u32 = 1 << 2;
    /// Address or length alignment mismatch.
    pub const ALIGN_MISMATCH: u32 = 1 << 3;
    /// Bad descriptor magic.
    pub const MAGIC_STOPPED: u32 = 1 << 4;
    /// Descriptor fetch stalled.
    pub const FETCH_STOPPED: u32 = 1 << 5;
    /// Idled with descriptors outstanding.
    pub const IDLE_STOPPED: u32 = 1 << 6;
    /// Read-side bus error class.
    pub const READ_ERROR: u32 = 0x1F << 9;
    /// Descriptor-fetch error class.
    pub const DESCRIPTOR_ERROR: u32 = 0x1F << 19;

    /// Bits that must read zero once a stopped engine has quiesced.
    pub const EXPECTED_ZERO: u32 =
        BUSY | MAGIC_STOPPED | FETCH_STOPPED | ALIGN_MISMATCH | READ_ERROR | DESCRIPTOR_ERROR;
}

/// Performance counter control bits.
pub mod perf {
    /// Start counting.
    pub const RUN: u32 = 1 << 0;
    /// Zero the counters.
    pub const CLEAR: u32 = 1 << 1;
    /// Latch automatically when the engine stops.
    pub const AUTO: u32 = 1 << 2;
}

/// Typed overlay onto one engine channel block.
#[derive(Debug, Clone, Copy)]
pub struct EngineRegs {
    regs: MmioRegion,
}

impl EngineRegs {
    /// Overlay the engine block onto a carved window.
    #[must_use]
    pub const fn new(regs: MmioRegion) -> Self {
        Self { regs }
    }

    reg_ro!(identifier, IDENTIFIER, "the engine identifier");
    reg_rw!(control, set_control, CONTROL, "the engine control register");
    reg_wo!(control_w1s, CONTROL_W1S, "control bits (write 1 to set)");
    reg_wo!(control_w1c, CONTROL_W1C, "control bits (write 1 to clear)");
    reg_ro!(status, STATUS, "the engine status register");
    reg_ro!(status_rc, STATUS_RC, "the engine status register, clearing it");
    reg_ro!(completed_desc_count, COMPLETED_DESC_COUNT, "the completed descriptor count");
    reg_ro!(alignments, ALIGNMENTS, "the engine alignment requirements");
    reg_rw!(
        poll_mode_wb_lo,
        set_poll_mode_wb_lo,
        POLL_MODE_WB_LO,
        "the writeback address low half"
    );
    reg_rw!(
        poll_mode_wb_hi,
        set_poll_mode_wb_hi,
        POLL_MODE_WB_HI,
        "the writeback address high half"
    );
    reg_ro!(int_enable_mask, INT_ENABLE_MASK, "the engine interrupt enable mask");
    reg_wo!(int_enable_w1s, INT_ENABLE_W1S, "engine interrupt enables (write 1 to set)");
    reg_wo!(int_enable_w1c, INT_ENABLE_W1C, "engine interrupt enables (write 1 to clear)");
    reg_rw!(perf_control, set_perf_control, PERF_CONTROL, "the performance counter control");

    /// Read the clock cycle counter (64-bit, low half latches the pair).
    #[must_use]
    pub fn perf_cycle_count(&self) -> u64 {
        let lo = self.regs.read32(PERF_CYCLE_LO);
        let hi = self.regs.read32(PERF_CYCLE_HI);
        (u64::from(hi) << 32) | u64::from(lo)
    }

    /// Read the data cycle counter.
    #[must_use]
    pub fn perf_data_count(&self) -> u64 {
        let lo = self.regs.read32(PERF_DATA_LO);
        let hi = self.regs.read32(PERF_DATA_HI);
        (u64::from(hi) << 32) | u64::from(lo)
    }

    /// Read the pending request counter.
    #[must_use]
    pub fn perf_pending_count(&self) -> u64 {
        let lo = self.regs.read32(PERF_PENDING_LO);
        let hi = self.regs.read32(PERF_PENDING_HI);
        (u64::from(hi) << 32) | u64::from(lo)
    }

    /// Program the writeback address as one 64-bit write pair.
    pub fn set_poll_mode_writeback(&self, bus_addr: u64) {
        self.set_poll_mode_wb_lo(bus_addr as u32);
        self.set_poll_mode_wb_hi((bus_addr >> 32) as u32);
    }
}

/// Alignment requirements reported by an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Alignments {
    /// Required source/destination address alignment in bytes.
    pub addr_alignment: u32,
    /// Transfer length granularity in bytes.
    pub len_granularity: u32,
    /// Usable device address bits.
    pub addr_bits: u32,
}

impl Alignments {
    /// Decode the packed alignments register.
    #[must_use]
    pub fn decode(value: u32) -> Self {
        Self {
            addr_alignment: (value >> 16) & 0xFF,
            len_granularity: (value >> 8) & 0xFF,
            addr_bits: value & 0xFF,
        }
    }
}

/// Typed overlay onto one descriptor-fetch block.
#[derive(Debug, Clone, Copy)]
pub struct SgdmaRegs {
    regs: MmioRegion,
}

impl SgdmaRegs {
    /// Overlay the fetch block onto a carved window.
    #[must_use]
    pub const fn new(regs: MmioRegion) -> Self {
        Self { regs }
    }

    reg_rw!(
        ring_base_lo,
        set_ring_base_lo,
        FETCH_RING_BASE_LO,
        "the ring base address low half"
    );
    reg_rw!(
        ring_base_hi,
        set_ring_base_hi,
        FETCH_RING_BASE_HI,
        "the ring base address high half"
    );
    reg_rw!(
        ep_fifo_lo,
        set_ep_fifo_lo,
        FETCH_EP_FIFO_LO,
        "the endpoint descriptor FIFO address low half"
    );
    reg_rw!(
        ep_fifo_hi,
        set_ep_fifo_hi,
        FETCH_EP_FIFO_HI,
        "the endpoint descriptor FIFO address high half"
    );
    reg_rw!(last_ptr, set_last_ptr, FETCH_LAST_PTR, "the last descriptor pointer");
    reg_rw!(table_size, set_table_size, FETCH_TABLE_SIZE, "the descriptor table size");
    reg_rw!(control, set_control, FETCH_CONTROL, "the fetch block control register");

    /// Program the ring base address as one 64-bit write pair.
    pub fn set_ring_base(&self, bus_addr: u64) {
        self.set_ring_base_lo(bus_addr as u32);
        self.set_ring_base_hi((bus_addr >> 32) as u32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expected_zero_covers_fault_classes() {
        assert_eq!(status::EXPECTED_ZERO & status::BUSY, status::BUSY);
        assert_eq!(status::EXPECTED_ZERO & status::READ_ERROR, status::READ_ERROR);
        // DESC_COMPLETED and DESC_STOPPED are normal end states, never faults.
        assert_eq!(status::EXPECTED_ZERO & status::DESC_COMPLETED, 0);
        assert_eq!(status::EXPECTED_ZERO & status::DESC_STOPPED, 0);
    }

    #[test]
    fn alignments_decode() {
        let a = Alignments::decode(0x0001_0140);
        assert_eq!(a.addr_alignment, 1);
        assert_eq!(a.len_granularity, 1);
        assert_eq!(a.addr_bits, 64);
    }

    #[test]
    fn perf_counters_assemble_64_bits() {
        let mut mem = [0u32; ENGINE_BLOCK_LEN / 4];
        mem[PERF_CYCLE_LO / 4] = 0xDEAD_BEEF;
        mem[PERF_CYCLE_HI / 4] = 0x0000_0001;
        // SAFETY: backing outlives the overlay.
        let region = unsafe { MmioRegion::new(mem.as_mut_ptr().cast(), ENGINE_BLOCK_LEN) };
        let engine = EngineRegs::new(region);
        assert_eq!(engine.perf_cycle_count(), 0x1_DEAD_BEEF);
    }

    #[test]
    fn writeback_address_splits_across_halves() {
        let mut mem = [0u32; ENGINE_BLOCK_LEN / 4];
        // SAFETY: backing outlives the overlay.
        let region = unsafe { MmioRegion::new(mem.as_mut_ptr().cast(), ENGINE_BLOCK_LEN) };
        let engine = EngineRegs::new(region);
        engine.set_poll_mode_writeback(0x1234_5678_9ABC_DEF0);
        assert_eq!(engine.poll_mode_wb_lo(), 0x9ABC_DEF0);
        assert_eq!(engine.poll_mode_wb_hi(), 0x1234_5678);
    }
}
