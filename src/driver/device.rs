//! Device context: BAR ownership, engine array, interrupt routing.
//!
//! [`Device::open`] acquires every resource in a fixed order and unwinds the
//! already-acquired ones on any failure, so a failed open leaves the
//! platform exactly as it found it. [`Device::close`] releases in reverse
//! order, each resource exactly once.

use crate::driver::config::{DeviceConfig, Direction};
use crate::driver::engine::Engine;
use crate::driver::interrupt::{select_topology, InterruptRouter, IsrStatus, Topology};
use crate::error::{ConfigError, ConfigResult, DmaError, DmaResult, Result};
use crate::hal::{BarMapper, DmaAllocator, MmioRegion, Resource};
use crate::internal::constants::{MAX_NUM_BARS, MAX_NUM_CHANNELS, MAX_USER_IRQ, NUM_DIRECTIONS};
use crate::internal::register::config::{ConfigRegs, CONFIG_BLOCK_LEN};
use crate::internal::register::engine::{EngineRegs, SgdmaRegs, ENGINE_BLOCK_LEN, SGDMA_BLOCK_LEN};
use crate::internal::register::irq::{IrqRegs, IRQ_BLOCK_LEN};
use crate::internal::register::{
    is_adma_block, C2H_CHANNEL_OFFSET, C2H_SGDMA_OFFSET, CHANNEL_STRIDE, CONFIG_BLOCK_OFFSET,
    H2C_CHANNEL_OFFSET, H2C_SGDMA_OFFSET, IRQ_BLOCK_OFFSET,
};

/// Smallest BAR that can hold every register block the driver touches.
const CONFIG_BAR_MIN_LEN: usize = C2H_SGDMA_OFFSET + MAX_NUM_CHANNELS * CHANNEL_STRIDE;

/// User event callback: `(event_id, user_data)`.
pub type UserEventFn = fn(u32, usize);

#[derive(Clone, Copy)]
struct UserEvent {
    handler: UserEventFn,
    user_data: usize,
}

/// An open ADMA device.
pub struct Device {
    bars: [Option<MmioRegion>; MAX_NUM_BARS],
    config_regs: ConfigRegs,
    router: InterruptRouter,
    engines: [[Option<Engine>; NUM_DIRECTIONS]; MAX_NUM_CHANNELS],
    user_events: [Option<UserEvent>; MAX_USER_IRQ],
    poll_mode: bool,
}

const NO_ENGINE: Option<Engine> = None;
// Array-repeat needs a const operand because `Engine` is not `Copy`.
const NO_ENGINE_ROW: [Option<Engine>; NUM_DIRECTIONS] = [NO_ENGINE; NUM_DIRECTIONS];

impl Device {
    /// Open the device described by the granted resources.
    ///
    /// Maps every memory resource, identifies the config BAR by its block
    /// identifiers, decides the interrupt topology, probes the engines, and
    /// sets up one descriptor ring per engine. Any failure releases
    /// everything acquired up to that point before the error propagates.
    pub fn open(
        resources: &[Resource],
        msi_vectors: usize,
        mapper: &mut impl BarMapper,
        allocator: &mut impl DmaAllocator,
        config: DeviceConfig,
    ) -> Result<Self> {
        let mut bars: [Option<MmioRegion>; MAX_NUM_BARS] = [None; MAX_NUM_BARS];
        let mut next_bar = 0;
        for resource in resources {
            let Resource::Memory(mem) = resource else {
                continue;
            };
            if next_bar == MAX_NUM_BARS {
                unmap_all(&mut bars, mapper);
                return Err(ConfigError::InvalidConfig.into());
            }
            let Some(region) = mapper.map(mem) else {
                unmap_all(&mut bars, mapper);
                return Err(ConfigError::BarMapFailed.into());
            };
            bars[next_bar] = Some(region);
            next_bar += 1;
        }

        let Some(config_bar) = bars.iter().flatten().copied().find(|bar| is_config_bar(*bar))
        else {
            unmap_all(&mut bars, mapper);
            return Err(ConfigError::ConfigBarNotFound.into());
        };

        // is_config_bar validated the length, so the carves and the topology
        // check are the only remaining failure points before engine probing.
        let setup = (|| -> ConfigResult<(ConfigRegs, IrqRegs, Topology)> {
            let config_regs =
                ConfigRegs::new(carve(config_bar, CONFIG_BLOCK_OFFSET, CONFIG_BLOCK_LEN)?);
            let irq_regs = IrqRegs::new(carve(config_bar, IRQ_BLOCK_OFFSET, IRQ_BLOCK_LEN)?);
            let topology = select_topology(resources, msi_vectors)?;
            Ok((config_regs, irq_regs, topology))
        })();
        let (config_regs, irq_regs, topology) = match setup {
            Ok(parts) => parts,
            Err(e) => {
                unmap_all(&mut bars, mapper);
                return Err(e.into());
            }
        };
        let router = InterruptRouter::setup(irq_regs, topology, 0);

        let mut device = Self {
            bars,
            config_regs,
            router,
            engines: [NO_ENGINE_ROW; MAX_NUM_CHANNELS],
            user_events: [None; MAX_USER_IRQ],
            poll_mode: config.poll_mode,
        };

        if let Err(e) = device.probe_engines(config_bar, allocator) {
            device.release(mapper, allocator);
            return Err(e);
        }
        Ok(device)
    }

    fn probe_engines(
        &mut self,
        config_bar: MmioRegion,
        allocator: &mut impl DmaAllocator,
    ) -> Result<()> {
        let mut found = 0;
        for channel in 0..MAX_NUM_CHANNELS {
            for dir in [Direction::H2C, Direction::C2H] {
                let (engine_base, sgdma_base) = match dir {
                    Direction::H2C => (H2C_CHANNEL_OFFSET, H2C_SGDMA_OFFSET),
                    Direction::C2H => (C2H_CHANNEL_OFFSET, C2H_SGDMA_OFFSET),
                };
                let regs = EngineRegs::new(carve(
                    config_bar,
                    engine_base + channel * CHANNEL_STRIDE,
                    ENGINE_BLOCK_LEN,
                )?);
                let sgdma = SgdmaRegs::new(carve(
                    config_bar,
                    sgdma_base + channel * CHANNEL_STRIDE,
                    SGDMA_BLOCK_LEN,
                )?);
                let Some(mut engine) = Engine::probe(regs, sgdma, channel, dir) else {
                    continue;
                };
                engine.ring_setup(allocator, self.poll_mode)?;
                if !self.poll_mode {
                    engine.enable_interrupt(&self.router);
                }
                self.engines[channel][dir.index()] = Some(engine);
                found += 1;
            }
        }
        if found == 0 {
            return Err(ConfigError::NoEngineFound.into());
        }
        Ok(())
    }

    /// Interrupt topology decided at open.
    #[must_use]
    pub fn topology(&self) -> Topology {
        self.router.topology()
    }

    /// Config block register overlay.
    #[must_use]
    pub fn config_regs(&self) -> &ConfigRegs {
        &self.config_regs
    }

    /// Borrow the engine for a channel and direction, if one was probed.
    #[must_use]
    pub fn engine_mut(&mut self, channel: usize, dir: Direction) -> Option<&mut Engine> {
        self.engines.get_mut(channel)?.get_mut(dir.index())?.as_mut()
    }

    /// Count of engines that answered their probe.
    #[must_use]
    pub fn engine_count(&self) -> usize {
        self.engines.iter().flatten().flatten().count()
    }

    // =========================================================================
    // User events
    // =========================================================================

    /// Register (or replace) the handler for a user event source.
    ///
    /// The handler persists until replaced or the device is closed.
    pub fn register_user_event(
        &mut self,
        index: usize,
        handler: UserEventFn,
        user_data: usize,
    ) -> DmaResult<()> {
        let slot = self
            .user_events
            .get_mut(index)
            .ok_or(DmaError::InvalidEventIndex)?;
        *slot = Some(UserEvent { handler, user_data });
        Ok(())
    }

    /// Enable delivery of a user event source.
    pub fn enable_user_event(&mut self, index: usize) -> DmaResult<()> {
        if index >= MAX_USER_IRQ {
            return Err(DmaError::InvalidEventIndex);
        }
        self.router.enable_user(index);
        Ok(())
    }

    /// Disable delivery of a user event source.
    pub fn disable_user_event(&mut self, index: usize) -> DmaResult<()> {
        if index >= MAX_USER_IRQ {
            return Err(DmaError::InvalidEventIndex);
        }
        self.router.disable_user(index);
        Ok(())
    }

    // =========================================================================
    // Interrupt entry points
    // =========================================================================

    /// Shared-line ISR top half.
    ///
    /// Call from the platform's interrupt handler. `NotHandled` means the
    /// interrupt was raised by another device on the line. `Handled` means
    /// deferred work is pending: schedule [`Device::line_deferred_work`].
    pub fn line_isr(&self) -> IsrStatus {
        self.router.line_isr()
    }

    /// Shared-line deferred work (bottom half).
    ///
    /// Dispatches every engine and user event the ISR accumulated, then
    /// re-enables exactly those sources.
    pub fn line_deferred_work(&mut self) {
        let (user, channel) = self.router.pending_sources();
        self.dispatch_channels(channel);
        self.dispatch_users(user);
        self.router.finish_deferred_work();
    }

    /// Per-source ISR for a vectored channel interrupt.
    pub fn channel_isr(&self, _bit_mask: u32) -> IsrStatus {
        // Vectored sources are never shared; the vector firing is proof.
        IsrStatus::Handled
    }

    /// Deferred work for a vectored channel interrupt.
    pub fn channel_deferred_work(&mut self, bit_mask: u32) {
        self.dispatch_channels(bit_mask);
    }

    /// Per-source ISR for a vectored user event interrupt.
    pub fn user_isr(&self, index: usize) -> IsrStatus {
        if index < MAX_USER_IRQ {
            IsrStatus::Handled
        } else {
            IsrStatus::NotHandled
        }
    }

    /// Deferred work for a vectored user event interrupt.
    pub fn user_deferred_work(&mut self, index: usize) {
        if index < MAX_USER_IRQ {
            self.dispatch_users(1 << index);
        }
    }

    fn dispatch_channels(&mut self, bits: u32) {
        if bits == 0 {
            return;
        }
        for engine in self.engines.iter_mut().flatten().flatten() {
            if engine.irq_bit_mask() & bits != 0 {
                engine.service_completion();
            }
        }
    }

    fn dispatch_users(&self, bits: u32) {
        if bits == 0 {
            return;
        }
        for (index, event) in self.user_events.iter().enumerate() {
            if bits & (1 << index) != 0 {
                if let Some(event) = event {
                    (event.handler)(index as u32, event.user_data);
                }
            }
        }
    }

    // =========================================================================
    // Close
    // =========================================================================

    /// Close the device, releasing every resource exactly once.
    ///
    /// Engines must be stopped first. Order: descriptor rings back to the
    /// allocator, vector registers zeroed, BARs unmapped.
    pub fn close(mut self, mapper: &mut impl BarMapper, allocator: &mut impl DmaAllocator) {
        self.release(mapper, allocator);
    }

    fn release(&mut self, mapper: &mut impl BarMapper, allocator: &mut impl DmaAllocator) {
        for engine in self.engines.iter_mut().flatten() {
            if let Some(engine) = engine.as_mut() {
                engine.ring_teardown(allocator);
            }
            *engine = None;
        }
        self.router.reset_vectors();
        unmap_all(&mut self.bars, mapper);

        #[cfg(feature = "defmt")]
        defmt::info!("device closed");
    }
}

fn unmap_all(bars: &mut [Option<MmioRegion>; MAX_NUM_BARS], mapper: &mut impl BarMapper) {
    for bar in bars.iter_mut() {
        if let Some(region) = bar.take() {
            mapper.unmap(region);
        }
    }
}

/// Does this BAR hold the ADMA register file?
///
/// A config BAR is large enough for every block and answers the ADMA magic
/// at both the IRQ and config block identifiers.
fn is_config_bar(bar: MmioRegion) -> bool {
    if bar.len() < CONFIG_BAR_MIN_LEN {
        return false;
    }
    let irq_id = bar.read32(IRQ_BLOCK_OFFSET);
    let config_id = bar.read32(CONFIG_BLOCK_OFFSET);
    is_adma_block(irq_id) && is_adma_block(config_id)
}

fn carve(bar: MmioRegion, offset: usize, len: usize) -> ConfigResult<MmioRegion> {
    bar.subregion(offset, len).ok_or(ConfigError::BarTooSmall)
}

// =============================================================================
// Tests
// =============================================================================
