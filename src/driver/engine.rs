//! DMA engine control.
//!
//! One [`Engine`] exists per (channel, direction) pair that answers its
//! identifier probe. The engine owns its descriptor ring, drives the channel
//! and fetch register blocks, and funnels both interrupt-driven and polled
//! completion reports through the same counter-based retire path.

use embedded_hal::delay::DelayNs;

use crate::driver::config::{AddressMode, DeviceAddress, Direction, EngineState, EngineType, PerfCounters};
use crate::error::{DmaError, DmaResult, HwError, Result};
use crate::hal::{DmaAllocator, DmaFragment};
use crate::internal::constants::{
    MAX_DESCRIPTOR_NUM, MAX_NUM_CHANNELS, ONE_DESCRIPTOR_MAX_TRANSFER, STOP_POLL_INTERVAL_US,
    STOP_TIMEOUT_US,
};
use crate::internal::dma::descriptor::{bits, Descriptor};
use crate::internal::dma::DescriptorRing;
use crate::internal::register::engine::{control, perf, status, Alignments, EngineRegs, SgdmaRegs};
use crate::internal::register::{is_adma_block, ADMA_ID_ST_BIT};
use crate::sync::CompletionFlag;

/// Direction field of the engine identifier (bits 19:16).
const ID_TARGET_SHIFT: u32 = 16;
const ID_TARGET_MASK: u32 = 0xF;
/// Channel field of the engine identifier (bits 11:8).
const ID_CHANNEL_SHIFT: u32 = 8;
const ID_CHANNEL_MASK: u32 = 0xF;

const ID_TARGET_H2C: u32 = 0;
const ID_TARGET_C2H: u32 = 1;

/// A scatter-gather DMA engine bound to one channel and direction.
pub struct Engine {
    regs: EngineRegs,
    sgdma: SgdmaRegs,
    channel: usize,
    dir: Direction,
    engine_type: EngineType,
    address_mode: AddressMode,
    alignments: Alignments,
    state: EngineState,
    ring: Option<DescriptorRing>,
    poll_mode: bool,
    completion: CompletionFlag,
}

impl Engine {
    /// Probe the engine at the given register windows.
    ///
    /// Returns `None` when no engine answers there: the identifier lacks the
    /// block magic or describes a different channel or direction than the
    /// windows were carved for.
    pub fn probe(
        regs: EngineRegs,
        sgdma: SgdmaRegs,
        channel: usize,
        dir: Direction,
    ) -> Option<Self> {
        let id = regs.identifier();
        if !is_adma_block(id) {
            return None;
        }
        let target = (id >> ID_TARGET_SHIFT) & ID_TARGET_MASK;
        let expected = match dir {
            Direction::H2C => ID_TARGET_H2C,
            Direction::C2H => ID_TARGET_C2H,
        };
        if target != expected {
            return None;
        }
        if (id >> ID_CHANNEL_SHIFT) & ID_CHANNEL_MASK != channel as u32 {
            return None;
        }
        let engine_type = if id & ADMA_ID_ST_BIT != 0 {
            EngineType::Streaming
        } else {
            EngineType::MemoryMapped
        };
        let alignments = Alignments::decode(regs.alignments());

        #[cfg(feature = "defmt")]
        defmt::info!(
            "engine {}_{}: type={:?} align={}/{}",
            dir.as_str(),
            channel,
            engine_type,
            alignments.addr_alignment,
            alignments.len_granularity
        );

        Some(Self {
            regs,
            sgdma,
            channel,
            dir,
            engine_type,
            address_mode: AddressMode::Contiguous,
            alignments,
            state: EngineState::Idle,
            ring: None,
            poll_mode: false,
            completion: CompletionFlag::new(),
        })
    }

    /// Channel number this engine serves.
    #[must_use]
    pub fn channel(&self) -> usize {
        self.channel
    }

    /// Transfer direction of this engine.
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.dir
    }

    /// Interface type decoded at probe.
    #[must_use]
    pub fn engine_type(&self) -> EngineType {
        self.engine_type
    }

    /// Alignment requirements decoded at probe.
    #[must_use]
    pub fn alignments(&self) -> Alignments {
        self.alignments
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// This engine's bit in the channel interrupt space.
    #[must_use]
    pub fn irq_bit_mask(&self) -> u32 {
        1 << (self.dir.index() * MAX_NUM_CHANNELS + self.channel)
    }

    /// Completion target for the last programmed batch (the ring head).
    #[must_use]
    pub fn submitted(&self) -> u64 {
        self.ring.as_ref().map_or(0, DescriptorRing::head)
    }

    /// Descriptors retired so far.
    #[must_use]
    pub fn completed(&self) -> u64 {
        self.ring.as_ref().map_or(0, DescriptorRing::tail)
    }

    /// Has the hardware ever reported an impossible completion count?
    #[must_use]
    pub fn is_inconsistent(&self) -> bool {
        self.ring.as_ref().is_some_and(DescriptorRing::is_inconsistent)
    }

    /// Allocate the descriptor ring and bind it to the fetch block.
    pub fn ring_setup(&mut self, allocator: &mut impl DmaAllocator, poll_mode: bool) -> DmaResult<()> {
        let ring = DescriptorRing::setup(allocator)?;
        self.sgdma.set_ring_base(ring.base_bus_addr());
        self.sgdma.set_table_size(DescriptorRing::CAPACITY as u32);
        if poll_mode {
            self.regs.set_poll_mode_writeback(ring.writeback_bus_addr());
        }
        self.poll_mode = poll_mode;
        self.ring = Some(ring);
        self.completion.reset();
        Ok(())
    }

    /// Unbind and free the descriptor ring.
    ///
    /// The engine must not be running. Idempotent once torn down.
    pub fn ring_teardown(&mut self, allocator: &mut impl DmaAllocator) {
        debug_assert!(self.state != EngineState::Running);
        if let Some(ring) = self.ring.take() {
            self.sgdma.set_ring_base(0);
            self.sgdma.set_table_size(0);
            ring.teardown(allocator);
        }
    }

    /// Build and enqueue descriptors for one scatter-gather transfer.
    ///
    /// Returns the completion target: the ring head counter after the batch,
    /// to be passed to [`Engine::wait_for_completion`]. A full ring fails
    /// with [`DmaError::RingFull`], leaving the ring untouched so the caller
    /// can retire completions and retry.
    pub fn program_dma(
        &mut self,
        fragments: &[DmaFragment],
        device: DeviceAddress<'_>,
    ) -> Result<u64> {
        if self.state == EngineState::Running || self.state == EngineState::Stopping {
            return Err(HwError::InvalidState.into());
        }
        let ring = self.ring.as_mut().ok_or(DmaError::RingNotReady)?;

        if fragments.is_empty() {
            return Err(DmaError::InvalidLength.into());
        }
        if fragments.len() > MAX_DESCRIPTOR_NUM {
            return Err(DmaError::TooManyFragments.into());
        }
        let fixed_addrs = match device {
            DeviceAddress::Contiguous(_) => None,
            DeviceAddress::Fixed(addrs) => {
                if addrs.len() != fragments.len() {
                    return Err(DmaError::MissingDeviceAddress.into());
                }
                Some(addrs)
            }
        };

        let addr_align = u64::from(self.alignments.addr_alignment.max(1));
        let len_gran = self.alignments.len_granularity.max(1);
        let mut device_addr = match device {
            DeviceAddress::Contiguous(addr) => addr,
            DeviceAddress::Fixed(addrs) => addrs[0],
        };
        let mut batch = [Descriptor::default(); MAX_DESCRIPTOR_NUM];
        for (i, fragment) in fragments.iter().enumerate() {
            if fragment.len == 0 || fragment.len > ONE_DESCRIPTOR_MAX_TRANSFER {
                return Err(DmaError::InvalidLength.into());
            }
            if fragment.len % len_gran != 0 {
                return Err(DmaError::AlignmentViolation.into());
            }
            if let Some(addrs) = fixed_addrs {
                device_addr = addrs[i];
            }
            if fragment.bus_addr % addr_align != 0 || device_addr % addr_align != 0 {
                return Err(DmaError::AlignmentViolation.into());
            }

            let mut ctrl = 0;
            if i == fragments.len() - 1 {
                ctrl = bits::STOP | bits::COMPLETED | bits::EOP;
            }
            batch[i] = match self.dir {
                Direction::H2C => Descriptor::new(fragment.bus_addr, device_addr, fragment.len, ctrl),
                Direction::C2H => Descriptor::new(device_addr, fragment.bus_addr, fragment.len, ctrl),
            };
            if fixed_addrs.is_none() {
                device_addr += u64::from(fragment.len);
            }
        }

        let target = ring.enqueue(&batch[..fragments.len()])?;
        self.address_mode = match device {
            DeviceAddress::Contiguous(_) => AddressMode::Contiguous,
            DeviceAddress::Fixed(_) => AddressMode::Fixed,
        };
        self.state = EngineState::Armed;
        Ok(target)
    }

    /// Start executing the enqueued descriptors.
    ///
    /// Idempotent while running. Fails with [`HwError::InvalidState`] when
    /// nothing has been enqueued.
    pub fn start(&mut self) -> Result<()> {
        match self.state {
            EngineState::Running => return Ok(()),
            EngineState::Armed => {}
            _ => return Err(HwError::InvalidState.into()),
        }
        let ring = self.ring.as_ref().ok_or(DmaError::RingNotReady)?;
        debug_assert!(ring.in_flight() > 0);

        let last_slot = ((ring.head() - 1) % DescriptorRing::CAPACITY as u64) as u32;
        self.sgdma.set_last_ptr(last_slot);

        let mut ctrl = control::RUN;
        if self.poll_mode {
            ctrl |= control::POLL_MODE_WB_ENABLE;
        } else {
            ctrl |= control::IE_ALL;
            self.regs.int_enable_w1s(control::IE_ALL);
        }
        if self.address_mode == AddressMode::Fixed {
            ctrl |= control::NON_INCR_ADDR;
        }
        self.regs.control_w1s(ctrl);
        self.state = EngineState::Running;

        #[cfg(feature = "defmt")]
        defmt::info!("engine {}_{}: started", self.dir.as_str(), self.channel);
        Ok(())
    }

    /// Request stop and wait for the engine to quiesce.
    ///
    /// Clears the run bit, then polls the status register until every fault
    /// and busy bit reads zero, sleeping `delay` between polls. On timeout
    /// the engine stays in `Stopping` and the ring counters are untouched;
    /// the caller decides whether to reset or retry.
    pub fn stop(&mut self, delay: &mut impl DelayNs) -> Result<()> {
        match self.state {
            EngineState::Running | EngineState::Stopping => {}
            _ => return Ok(()),
        }
        self.state = EngineState::Stopping;
        self.regs.control_w1c(control::RUN);
        self.regs.int_enable_w1c(control::IE_ALL);

        let mut waited: u32 = 0;
        while self.regs.status() & status::EXPECTED_ZERO != 0 {
            if waited >= STOP_TIMEOUT_US {
                #[cfg(feature = "defmt")]
                defmt::warn!(
                    "engine {}_{}: stop timed out, status={:#x}",
                    self.dir.as_str(),
                    self.channel,
                    self.regs.status()
                );
                return Err(HwError::NotResponding.into());
            }
            delay.delay_us(STOP_POLL_INTERVAL_US);
            waited = waited.saturating_add(STOP_POLL_INTERVAL_US);
        }

        self.state = if self.ring.as_ref().is_some_and(|r| r.in_flight() > 0) {
            EngineState::Armed
        } else {
            EngineState::Idle
        };
        Ok(())
    }

    /// Enable this engine's source bit in the channel interrupt enable mask.
    pub fn enable_interrupt(&self, router: &crate::driver::interrupt::InterruptRouter) {
        router.enable_channel(self.irq_bit_mask());
    }

    /// Disable this engine's source bit in the channel interrupt enable mask.
    pub fn disable_interrupt(&self, router: &crate::driver::interrupt::InterruptRouter) {
        router.disable_channel(self.irq_bit_mask());
    }

    /// Retire completions reported through the interrupt path.
    ///
    /// Reads (and clears) the engine status and the hardware completed
    /// count, advances the ring tail, and publishes the new count to
    /// waiters. Returns the number of descriptors retired.
    pub fn service_completion(&mut self) -> u64 {
        let hw_status = self.regs.status_rc();
        let hw_completed = u64::from(self.regs.completed_desc_count());
        let retired = self.retire(hw_completed);

        #[cfg(feature = "defmt")]
        if hw_status & (status::READ_ERROR | status::DESCRIPTOR_ERROR | status::MAGIC_STOPPED) != 0 {
            defmt::warn!(
                "engine {}_{}: fault status {:#x}",
                self.dir.as_str(),
                self.channel,
                hw_status
            );
        }
        #[cfg(not(feature = "defmt"))]
        let _ = hw_status;

        if self.state == EngineState::Running
            && self.ring.as_ref().is_some_and(|r| r.in_flight() == 0)
        {
            self.state = EngineState::Armed;
        }
        retired
    }

    /// Retire completions by reading the poll-mode writeback word.
    ///
    /// Same retire path as the interrupt route, fed from host memory
    /// instead of a register read.
    pub fn poll_for_completion(&mut self) -> u64 {
        let hw_completed = self.ring.as_ref().map_or(0, DescriptorRing::poll_writeback);
        self.retire(hw_completed)
    }

    fn retire(&mut self, hw_completed: u64) -> u64 {
        let Some(ring) = self.ring.as_mut() else {
            return 0;
        };
        let was_consistent = !ring.is_inconsistent();
        let retired = ring.advance_on_completion(hw_completed);
        if was_consistent && ring.is_inconsistent() {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "engine {}_{}: completion count {} exceeds submitted {}",
                self.dir.as_str(),
                self.channel,
                hw_completed,
                ring.head()
            );
        }
        if retired > 0 {
            self.completion.publish(ring.tail());
        }
        retired
    }

    /// Wait until the retired count reaches `target`.
    ///
    /// In poll mode this actively reads the writeback word between sleeps;
    /// in interrupt mode it relies on the deferred-work path publishing
    /// through [`Engine::service_completion`].
    pub fn wait_for_completion(
        &mut self,
        target: u64,
        delay: &mut impl DelayNs,
        timeout_us: u32,
    ) -> Result<()> {
        let mut waited: u32 = 0;
        loop {
            if self.poll_mode {
                self.poll_for_completion();
            }
            if self.completion.observed() >= target {
                return Ok(());
            }
            if waited >= timeout_us {
                return Err(HwError::Timeout.into());
            }
            delay.delay_us(STOP_POLL_INTERVAL_US);
            waited = waited.saturating_add(STOP_POLL_INTERVAL_US);
        }
    }

    /// Arm the performance counters; they latch when a stop-bit descriptor
    /// completes.
    pub fn arm_performance_counters(&self) {
        self.regs.set_perf_control(perf::AUTO | perf::CLEAR | perf::RUN);
    }

    /// Read the latched performance counter triple.
    ///
    /// Only meaningful after [`Engine::arm_performance_counters`] and a
    /// completed transfer.
    #[must_use]
    pub fn performance_counters(&self) -> PerfCounters {
        PerfCounters {
            clock_cycles: self.regs.perf_cycle_count(),
            data_cycles: self.regs.perf_data_count(),
            pending_cycles: self.regs.perf_pending_count(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
