//! Test utilities: simulated ADMA hardware.
//!
//! Host tests run against plain memory standing in for BAR space. Mirror
//! registers (W1S/W1C and their targets) need active behavior, so writes from
//! [`MmioRegion`](crate::hal::MmioRegion) are routed through a small
//! per-thread simulation registry that applies set/clear semantics to the
//! backing word, the way the device would.

extern crate std;

use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::boxed::Box;
use std::collections::BTreeMap;
use std::vec;
use std::vec::Vec;

use embedded_hal::delay::DelayNs;

use crate::driver::config::Direction;
use crate::hal::{
    BarMapper, DmaAllocator, DmaBuffer, InterruptResource, MemoryResource, MmioRegion, Resource,
};
use crate::internal::constants::MAX_NUM_CHANNELS;
use crate::internal::register::engine::{self, EngineRegs, SgdmaRegs};
use crate::internal::register::irq::{self, IrqRegs};
use crate::internal::register::{
    ADMA_ID, ADMA_ID_ST_BIT, C2H_CHANNEL_OFFSET, C2H_SGDMA_OFFSET, CHANNEL_STRIDE,
    CONFIG_BLOCK_OFFSET, H2C_CHANNEL_OFFSET, IRQ_BLOCK_OFFSET,
};

// =============================================================================
// Mirror register simulation
// =============================================================================

pub(crate) mod mmio_sim {
    extern crate std;

    use core::cell::RefCell;
    use core::ptr::{read_volatile, write_volatile};

    use super::Vec;

    #[derive(Clone, Copy)]
    enum MirrorKind {
        SetBits,
        ClearBits,
    }

    #[derive(Clone, Copy)]
    struct Mirror {
        owner: usize,
        addr: usize,
        kind: MirrorKind,
        target: usize,
    }

    std::thread_local! {
        static MIRRORS: RefCell<Vec<Mirror>> = const { RefCell::new(Vec::new()) };
    }

    /// Register W1S/W1C mirror triples `(target, w1s, w1c)` relative to
    /// `base` for the lifetime of the owning fake block.
    pub(crate) fn install(base: *mut u8, triples: &[(usize, usize, usize)]) {
        let owner = base as usize;
        MIRRORS.with(|m| {
            let mut mirrors = m.borrow_mut();
            for &(target, w1s, w1c) in triples {
                mirrors.push(Mirror {
                    owner,
                    addr: owner + w1s,
                    kind: MirrorKind::SetBits,
                    target: owner + target,
                });
                mirrors.push(Mirror {
                    owner,
                    addr: owner + w1c,
                    kind: MirrorKind::ClearBits,
                    target: owner + target,
                });
            }
        });
    }

    pub(crate) fn uninstall(base: *mut u8) {
        let owner = base as usize;
        MIRRORS.with(|m| m.borrow_mut().retain(|mirror| mirror.owner != owner));
    }

    /// Apply mirror semantics for a write landing on a registered mirror
    /// address. Returns `true` when the write was consumed.
    pub(crate) fn intercept_write(addr: usize, value: u32) -> bool {
        MIRRORS.with(|m| {
            for mirror in m.borrow().iter() {
                if mirror.addr == addr {
                    let target = mirror.target as *mut u32;
                    // SAFETY: target lies inside the owning fake block's
                    // backing memory, alive while the mirror is installed.
                    unsafe {
                        let current = read_volatile(target);
                        let next = match mirror.kind {
                            MirrorKind::SetBits => current | value,
                            MirrorKind::ClearBits => current & !value,
                        };
                        write_volatile(target, next);
                    }
                    return true;
                }
            }
            false
        })
    }
}

// =============================================================================
// Delay
// =============================================================================

/// A delay that returns immediately (tests never need wall-clock time).
pub struct NoopDelay;

impl DelayNs for NoopDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

// =============================================================================
// Coherent DMA allocator mock
// =============================================================================

struct Allocation {
    ptr: *mut u8,
    len: usize,
    align: usize,
}

/// Allocator backed by the host heap, with bookkeeping for leak checks and
/// scripted failure.
pub struct MockAllocator {
    allocations: BTreeMap<u64, Allocation>,
    next_bus: u64,
    fail_after: Option<usize>,
    allocs_done: usize,
}

impl MockAllocator {
    /// An allocator that always succeeds.
    pub fn new() -> Self {
        Self {
            allocations: BTreeMap::new(),
            next_bus: 0x0010_0000,
            fail_after: None,
            allocs_done: 0,
        }
    }

    /// An allocator that fails every allocation after the first `n`.
    pub fn failing_after(n: usize) -> Self {
        let mut this = Self::new();
        this.fail_after = Some(n);
        this
    }

    /// Buffers allocated and not yet freed.
    pub fn outstanding(&self) -> usize {
        self.allocations.len()
    }

    /// Write a word into an allocated buffer, addressed by bus address (the
    /// way the simulated device writes host memory).
    pub fn write32_at_bus(&self, bus: u64, offset: usize, value: u32) {
        let (base, allocation) = self
            .allocations
            .range(..=bus)
            .next_back()
            .expect("no allocation at bus address");
        let start = (bus - base) as usize + offset;
        assert!(start + 4 <= allocation.len, "bus write past allocation");
        // SAFETY: in-bounds write into a live allocation.
        unsafe {
            core::ptr::write_volatile(allocation.ptr.add(start).cast::<u32>(), value);
        }
    }
}

impl Default for MockAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl DmaAllocator for MockAllocator {
    fn alloc_coherent(&mut self, len: usize, align: usize) -> Option<DmaBuffer> {
        if self.fail_after.is_some_and(|n| self.allocs_done >= n) {
            self.allocs_done += 1;
            return None;
        }
        self.allocs_done += 1;

        let align = align.max(4);
        let layout = Layout::from_size_align(len.max(1), align).ok()?;
        // SAFETY: layout has non-zero size.
        let ptr = unsafe { alloc_zeroed(layout) };
        if ptr.is_null() {
            return None;
        }

        let bus = self.next_bus.next_multiple_of(align as u64);
        self.next_bus = bus + (len as u64).next_multiple_of(0x1000);
        self.allocations.insert(bus, Allocation { ptr, len, align });
        Some(DmaBuffer {
            virt: ptr,
            bus,
            len,
        })
    }

    fn free_coherent(&mut self, buffer: DmaBuffer) {
        let allocation = self
            .allocations
            .remove(&buffer.bus)
            .expect("freed buffer that was never allocated");
        assert_eq!(allocation.ptr, buffer.virt);
        let layout = Layout::from_size_align(allocation.len.max(1), allocation.align)
            .expect("layout was valid at alloc");
        // SAFETY: ptr/layout pair came from alloc_zeroed above.
        unsafe { dealloc(allocation.ptr, layout) };
    }
}

impl Drop for MockAllocator {
    fn drop(&mut self) {
        for (_, allocation) in core::mem::take(&mut self.allocations) {
            let layout = Layout::from_size_align(allocation.len.max(1), allocation.align)
                .expect("layout was valid at alloc");
            // SAFETY: ptr/layout pair came from alloc_zeroed above.
            unsafe { dealloc(allocation.ptr, layout) };
        }
    }
}

// =============================================================================
// BAR mapper mock
// =============================================================================

/// Mapper that hands out pre-built regions and counts map/unmap pairs.
pub struct MockMapper {
    regions: Vec<MmioRegion>,
    next: usize,
    attempts: usize,
    fail_at: Option<usize>,
    mapped: usize,
    unmapped: usize,
}

impl MockMapper {
    /// A mapper serving the given regions in order.
    pub fn new(regions: Vec<MmioRegion>) -> Self {
        Self {
            regions,
            next: 0,
            attempts: 0,
            fail_at: None,
            mapped: 0,
            unmapped: 0,
        }
    }

    /// Fail the map attempt with the given zero-based index.
    pub fn fail_at(&mut self, attempt: usize) {
        self.fail_at = Some(attempt);
    }

    /// Successful map calls so far.
    pub fn mapped(&self) -> usize {
        self.mapped
    }

    /// Unmap calls so far.
    pub fn unmapped(&self) -> usize {
        self.unmapped
    }
}

impl BarMapper for MockMapper {
    fn map(&mut self, _resource: &MemoryResource) -> Option<MmioRegion> {
        let attempt = self.attempts;
        self.attempts += 1;
        if self.fail_at == Some(attempt) {
            return None;
        }
        let region = self.regions.get(self.next).copied()?;
        self.next += 1;
        self.mapped += 1;
        Some(region)
    }

    fn unmap(&mut self, _region: MmioRegion) {
        self.unmapped += 1;
    }
}

// =============================================================================
// Fake register blocks
// =============================================================================

/// Build an engine identifier word for the given direction and channel.
pub fn engine_id(dir: Direction, channel: usize, streaming: bool) -> u32 {
    let target = match dir {
        Direction::H2C => 0,
        Direction::C2H => 1,
    };
    let mut id = ADMA_ID | (target << 16) | ((channel as u32) << 8);
    if streaming {
        id |= ADMA_ID_ST_BIT;
    }
    id
}

fn boxed_words(len_bytes: usize) -> Box<[u32]> {
    vec![0u32; len_bytes / 4].into_boxed_slice()
}

fn region_over(words: &mut Box<[u32]>) -> MmioRegion {
    // SAFETY: the boxed slice outlives every overlay the fake hands out.
    unsafe { MmioRegion::new(words.as_mut_ptr().cast(), words.len() * 4) }
}

const ENGINE_MIRRORS: [(usize, usize, usize); 2] = [
    (engine::CONTROL, engine::CONTROL_W1S, engine::CONTROL_W1C),
    (
        engine::INT_ENABLE_MASK,
        engine::INT_ENABLE_W1S,
        engine::INT_ENABLE_W1C,
    ),
];

const IRQ_MIRRORS: [(usize, usize, usize); 2] = [
    (
        irq::USER_INT_ENABLE,
        irq::USER_INT_ENABLE_W1S,
        irq::USER_INT_ENABLE_W1C,
    ),
    (
        irq::CHANNEL_INT_ENABLE,
        irq::CHANNEL_INT_ENABLE_W1S,
        irq::CHANNEL_INT_ENABLE_W1C,
    ),
];

/// One engine channel block plus its fetch block, in host memory.
pub struct FakeEngineBlock {
    engine: MmioRegion,
    sgdma: MmioRegion,
    _engine_mem: Box<[u32]>,
    _sgdma_mem: Box<[u32]>,
}

impl FakeEngineBlock {
    /// A block answering probes with the given identifier.
    pub fn new(identifier: u32) -> Self {
        let mut engine_mem = boxed_words(engine::ENGINE_BLOCK_LEN);
        let mut sgdma_mem = boxed_words(engine::SGDMA_BLOCK_LEN);
        let engine_region = region_over(&mut engine_mem);
        let sgdma_region = region_over(&mut sgdma_mem);
        engine_region.write32(engine::IDENTIFIER, identifier);
        mmio_sim::install(engine_region.base(), &ENGINE_MIRRORS);
        Self {
            engine: engine_region,
            sgdma: sgdma_region,
            _engine_mem: engine_mem,
            _sgdma_mem: sgdma_mem,
        }
    }

    /// Engine register overlay for the code under test.
    pub fn engine_regs(&self) -> EngineRegs {
        EngineRegs::new(self.engine)
    }

    /// Fetch block overlay for the code under test.
    pub fn sgdma_regs(&self) -> SgdmaRegs {
        SgdmaRegs::new(self.sgdma)
    }

    /// Set the packed alignments word.
    pub fn set_alignments(&mut self, value: u32) {
        self.engine.write32(engine::ALIGNMENTS, value);
    }

    /// Set the engine status word (and its read-to-clear shadow).
    pub fn set_status(&mut self, value: u32) {
        self.engine.write32(engine::STATUS, value);
        self.engine.write32(engine::STATUS_RC, value);
    }

    /// Set the hardware completed descriptor count.
    pub fn set_completed_count(&mut self, value: u32) {
        self.engine.write32(engine::COMPLETED_DESC_COUNT, value);
    }

    /// Current control register value (mirror writes already folded in).
    pub fn control(&self) -> u32 {
        self.engine.read32(engine::CONTROL)
    }

    /// Current perf control register value.
    pub fn perf_control(&self) -> u32 {
        self.engine.read32(engine::PERF_CONTROL)
    }

    /// Load the three 64-bit performance counters.
    pub fn set_perf_counts(&mut self, cycles: u64, data: u64, pending: u64) {
        for (base, value) in [
            (engine::PERF_CYCLE_LO, cycles),
            (engine::PERF_DATA_LO, data),
            (engine::PERF_PENDING_LO, pending),
        ] {
            self.engine.write32(base, value as u32);
            self.engine.write32(base + 4, (value >> 32) as u32);
        }
    }

    /// Ring base address programmed into the fetch block.
    pub fn ring_base(&self) -> u64 {
        let lo = self.sgdma.read32(engine::FETCH_RING_BASE_LO);
        let hi = self.sgdma.read32(engine::FETCH_RING_BASE_HI);
        (u64::from(hi) << 32) | u64::from(lo)
    }

    /// Descriptor table size programmed into the fetch block.
    pub fn table_size(&self) -> u32 {
        self.sgdma.read32(engine::FETCH_TABLE_SIZE)
    }

    /// Low half of the programmed writeback address.
    pub fn writeback_addr_lo(&self) -> u32 {
        self.engine.read32(engine::POLL_MODE_WB_LO)
    }
}

impl Drop for FakeEngineBlock {
    fn drop(&mut self) {
        mmio_sim::uninstall(self.engine.base());
    }
}

/// An IRQ block in host memory.
pub struct FakeIrqBlock {
    region: MmioRegion,
    _mem: Box<[u32]>,
}

impl FakeIrqBlock {
    /// A block with everything masked and nothing pending.
    pub fn new() -> Self {
        let mut mem = boxed_words(irq::IRQ_BLOCK_LEN);
        let region = region_over(&mut mem);
        region.write32(irq::IDENTIFIER, ADMA_ID | 0x2_0000);
        mmio_sim::install(region.base(), &IRQ_MIRRORS);
        Self { region, _mem: mem }
    }

    /// IRQ register overlay for the code under test.
    pub fn irq_regs(&self) -> IrqRegs {
        IrqRegs::new(self.region)
    }

    /// Current user enable mask.
    pub fn user_enable(&self) -> u32 {
        self.region.read32(irq::USER_INT_ENABLE)
    }

    /// Current channel enable mask.
    pub fn channel_enable(&self) -> u32 {
        self.region.read32(irq::CHANNEL_INT_ENABLE)
    }

    /// Force the user enable mask.
    pub fn set_user_enable(&mut self, value: u32) {
        self.region.write32(irq::USER_INT_ENABLE, value);
    }

    /// Force the channel enable mask.
    pub fn set_channel_enable(&mut self, value: u32) {
        self.region.write32(irq::CHANNEL_INT_ENABLE, value);
    }

    /// Raise user request lines.
    pub fn set_user_request(&mut self, value: u32) {
        self.region.write32(irq::USER_INT_REQUEST, value);
    }

    /// Raise channel request lines.
    pub fn set_channel_request(&mut self, value: u32) {
        self.region.write32(irq::CHANNEL_INT_REQUEST, value);
    }

    /// Read back a user vector word.
    pub fn user_vector(&self, index: usize) -> u32 {
        self.region.read32(irq::USER_VECTOR_BASE + index * 4)
    }

    /// Read back a channel vector word.
    pub fn channel_vector(&self, index: usize) -> u32 {
        self.region.read32(irq::CHANNEL_VECTOR_BASE + index * 4)
    }
}

impl Default for FakeIrqBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for FakeIrqBlock {
    fn drop(&mut self) {
        mmio_sim::uninstall(self.region.base());
    }
}

// =============================================================================
// Whole-device BAR
// =============================================================================

/// Smallest BAR that can serve as the ADMA config BAR.
const BAR_LEN: usize = C2H_SGDMA_OFFSET + MAX_NUM_CHANNELS * CHANNEL_STRIDE;

/// A complete ADMA config BAR in host memory: IRQ block, config block, and
/// any number of engine channel blocks.
pub struct FakeAdmaBar {
    region: MmioRegion,
    _mem: Box<[u32]>,
}

impl FakeAdmaBar {
    /// A BAR of the right size with no ADMA identifiers anywhere.
    pub fn blank() -> Self {
        let mut mem = boxed_words(BAR_LEN);
        let region = region_over(&mut mem);
        Self { region, _mem: mem }
    }

    /// A BAR answering as the config BAR, with engines at the given
    /// channel/direction positions.
    pub fn with_engines(engines: &[(usize, Direction)]) -> Self {
        let bar = Self::blank();
        bar.region.write32(IRQ_BLOCK_OFFSET, ADMA_ID | 0x2_0000);
        bar.region.write32(CONFIG_BLOCK_OFFSET, ADMA_ID | 0x3_0000);
        mmio_sim::install(
            // SAFETY: offset within the BAR backing.
            unsafe { bar.region.base().add(IRQ_BLOCK_OFFSET) },
            &IRQ_MIRRORS,
        );
        for &(channel, dir) in engines {
            let offset = Self::engine_offset(channel, dir);
            bar.region
                .write32(offset + engine::IDENTIFIER, engine_id(dir, channel, false));
            mmio_sim::install(
                // SAFETY: offset within the BAR backing.
                unsafe { bar.region.base().add(offset) },
                &ENGINE_MIRRORS,
            );
        }
        bar
    }

    fn engine_offset(channel: usize, dir: Direction) -> usize {
        let base = match dir {
            Direction::H2C => H2C_CHANNEL_OFFSET,
            Direction::C2H => C2H_CHANNEL_OFFSET,
        };
        base + channel * CHANNEL_STRIDE
    }

    /// The whole-BAR region (what the mapper mock serves).
    pub fn region(&self) -> MmioRegion {
        self.region
    }

    /// Resource list: this BAR plus `irq_count` message interrupts.
    pub fn resources(&self, irq_count: usize) -> Vec<Resource> {
        let mut resources = vec![Resource::Memory(MemoryResource {
            base: 0xF000_0000,
            len: BAR_LEN,
            prefetchable: false,
        })];
        for _ in 0..irq_count {
            resources.push(Resource::Interrupt(InterruptResource {
                message: true,
                message_count: 1,
            }));
        }
        resources
    }

    /// Current channel enable mask in the IRQ block.
    pub fn channel_enable(&self) -> u32 {
        self.region
            .read32(IRQ_BLOCK_OFFSET + irq::CHANNEL_INT_ENABLE)
    }

    /// Current user enable mask in the IRQ block.
    pub fn user_enable(&self) -> u32 {
        self.region.read32(IRQ_BLOCK_OFFSET + irq::USER_INT_ENABLE)
    }

    /// Read back a user vector word.
    pub fn user_vector(&self, index: usize) -> u32 {
        self.region
            .read32(IRQ_BLOCK_OFFSET + irq::USER_VECTOR_BASE + index * 4)
    }

    /// Read back a channel vector word.
    pub fn channel_vector(&self, index: usize) -> u32 {
        self.region
            .read32(IRQ_BLOCK_OFFSET + irq::CHANNEL_VECTOR_BASE + index * 4)
    }

    /// Raise channel request lines.
    pub fn set_channel_request(&mut self, value: u32) {
        self.region
            .write32(IRQ_BLOCK_OFFSET + irq::CHANNEL_INT_REQUEST, value);
    }

    /// Raise user request lines.
    pub fn set_user_request(&mut self, value: u32) {
        self.region
            .write32(IRQ_BLOCK_OFFSET + irq::USER_INT_REQUEST, value);
    }

    /// Set an engine's hardware completed descriptor count.
    pub fn set_engine_completed(&mut self, channel: usize, dir: Direction, count: u32) {
        let offset = Self::engine_offset(channel, dir);
        self.region
            .write32(offset + engine::COMPLETED_DESC_COUNT, count);
    }

    /// Set an engine's status word (and its read-to-clear shadow).
    pub fn set_engine_status(&mut self, channel: usize, dir: Direction, value: u32) {
        let offset = Self::engine_offset(channel, dir);
        self.region.write32(offset + engine::STATUS, value);
        self.region.write32(offset + engine::STATUS_RC, value);
    }
}

impl Drop for FakeAdmaBar {
    fn drop(&mut self) {
        // SAFETY: same offsets used at install time.
        unsafe {
            mmio_sim::uninstall(self.region.base().add(IRQ_BLOCK_OFFSET));
            for dir in [Direction::H2C, Direction::C2H] {
                for channel in 0..MAX_NUM_CHANNELS {
                    mmio_sim::uninstall(self.region.base().add(Self::engine_offset(channel, dir)));
                }
            }
        }
    }
}
