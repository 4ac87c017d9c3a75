//! Descriptor ring over a coherent buffer.
//!
//! The ring is a fixed-capacity circular window onto a coherent descriptor
//! buffer the fetch engine reads. Progress is tracked with two monotonic
//! counters: `head` counts descriptors submitted, `tail` counts descriptors
//! retired. Slot indices are always `counter % capacity`, so the occupancy
//! invariant `head - tail <= capacity` holds without any wraparound special
//! cases.

use crate::error::{DmaError, DmaResult};
use crate::hal::{DmaAllocator, DmaBuffer};
use crate::internal::constants::{
    DESCRIPTOR_ALIGN, DESCRIPTOR_SIZE, MAX_DESCRIPTOR_NUM, POLL_WB_SIZE,
};
use crate::internal::dma::descriptor::Descriptor;

/// Offset of the completed-count word within the writeback block.
const WB_COMPLETED_COUNT: usize = 0;

/// Fixed-capacity descriptor ring in coherent memory.
pub struct DescriptorRing {
    desc_buffer: DmaBuffer,
    wb_buffer: DmaBuffer,
    head: u64,
    tail: u64,
    inconsistent: bool,
}

impl DescriptorRing {
    /// Ring capacity in descriptors.
    pub const CAPACITY: usize = MAX_DESCRIPTOR_NUM;

    /// Allocate the descriptor and writeback buffers and build an empty ring.
    ///
    /// On partial allocation failure the first buffer is returned to the
    /// allocator before the error propagates.
    pub fn setup(allocator: &mut impl DmaAllocator) -> DmaResult<Self> {
        let desc_buffer = allocator
            .alloc_coherent(Self::CAPACITY * DESCRIPTOR_SIZE, DESCRIPTOR_ALIGN)
            .ok_or(DmaError::AllocFailed)?;
        let Some(wb_buffer) = allocator.alloc_coherent(POLL_WB_SIZE, DESCRIPTOR_ALIGN) else {
            allocator.free_coherent(desc_buffer);
            return Err(DmaError::AllocFailed);
        };

        let ring = Self {
            desc_buffer,
            wb_buffer,
            head: 0,
            tail: 0,
            inconsistent: false,
        };
        ring.wb_buffer.write32(WB_COMPLETED_COUNT, 0);
        Ok(ring)
    }

    /// Return both buffers to the allocator.
    pub fn teardown(self, allocator: &mut impl DmaAllocator) {
        allocator.free_coherent(self.desc_buffer);
        allocator.free_coherent(self.wb_buffer);
    }

    /// Bus address of the first descriptor slot.
    #[must_use]
    pub fn base_bus_addr(&self) -> u64 {
        self.desc_buffer.bus
    }

    /// Bus address the engine writes its completed count to.
    #[must_use]
    pub fn writeback_bus_addr(&self) -> u64 {
        self.wb_buffer.bus
    }

    /// Descriptors submitted so far (monotonic).
    #[must_use]
    pub fn head(&self) -> u64 {
        self.head
    }

    /// Descriptors retired so far (monotonic).
    #[must_use]
    pub fn tail(&self) -> u64 {
        self.tail
    }

    /// Descriptors submitted but not yet retired.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        (self.head - self.tail) as usize
    }

    /// Slots currently available for enqueue.
    #[must_use]
    pub fn free_slots(&self) -> usize {
        Self::CAPACITY - self.in_flight()
    }

    /// Slot index the next enqueued descriptor lands in.
    #[must_use]
    pub fn head_slot(&self) -> usize {
        (self.head % Self::CAPACITY as u64) as usize
    }

    /// Submit a batch of descriptors.
    ///
    /// All-or-nothing: if the batch does not fit in the free slots the ring
    /// is left untouched and [`DmaError::RingFull`] is returned so the caller
    /// can retire completions and retry. Returns the new head counter, which
    /// doubles as the completion target for the batch.
    pub fn enqueue(&mut self, descriptors: &[Descriptor]) -> DmaResult<u64> {
        if descriptors.is_empty() {
            return Err(DmaError::InvalidLength);
        }
        if descriptors.len() > self.free_slots() {
            return Err(DmaError::RingFull);
        }
        for (i, desc) in descriptors.iter().enumerate() {
            let slot = ((self.head + i as u64) % Self::CAPACITY as u64) as usize;
            desc.store(&self.desc_buffer, slot);
        }
        self.head += descriptors.len() as u64;
        Ok(self.head)
    }

    /// Retire completions up to the count the hardware reports.
    ///
    /// The count is clamped to `head`: the device claiming more completions
    /// than were ever submitted marks the ring inconsistent instead of
    /// corrupting the counters. A count below `tail` is stale and ignored.
    /// Returns the number of descriptors retired by this call.
    pub fn advance_on_completion(&mut self, hw_completed: u64) -> u64 {
        let clamped = if hw_completed > self.head {
            self.inconsistent = true;
            self.head
        } else {
            hw_completed
        };
        if clamped <= self.tail {
            return 0;
        }
        let retired = clamped - self.tail;
        self.tail = clamped;
        retired
    }

    /// Read the completed count the engine wrote back to host memory.
    #[must_use]
    pub fn poll_writeback(&self) -> u64 {
        u64::from(self.wb_buffer.read32(WB_COMPLETED_COUNT))
    }

    /// Has the hardware ever reported an impossible completion count?
    #[must_use]
    pub fn is_inconsistent(&self) -> bool {
        self.inconsistent
    }

    /// Reset the counters and writeback word for a fresh transfer sequence.
    pub fn reset(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.inconsistent = false;
        self.wb_buffer.write32(WB_COMPLETED_COUNT, 0);
    }
}

// =============================================================================
// Tests
// =============================================================================
