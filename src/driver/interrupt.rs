//! Interrupt topology selection and routing.
//!
//! The topology is decided once at open: enough per-source vectors for fully
//! vectored dispatch (MSI-X, or multi-message MSI at the same granularity),
//! otherwise one shared line. The shared-line path is split in two stages:
//! the ISR top half only reads request registers, masks the sources that
//! fired, and accumulates them; the deferred-work bottom half dispatches and
//! re-enables exactly the accumulated bits under the same lock the ISR uses,
//! so bits accumulated across back-to-back interrupts are never dropped.
//! Explicit enable/disable calls take that lock too, and a disable drops the
//! source from the accumulators so the re-enable step cannot undo it.

use crate::error::{ConfigError, ConfigResult};
use crate::hal::{count_interrupt_resources, Resource};
use crate::internal::constants::{MAX_CHANNEL_IRQ, MAX_NUM_IRQ, MAX_USER_IRQ};
use crate::internal::register::irq::{
    build_vector_reg, IrqRegs, CHANNEL_VECTOR_WORDS, USER_VECTOR_WORDS,
};
use crate::sync::CriticalSectionCell;

/// How interrupt sources reach the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Topology {
    /// One MSI-X table entry per source.
    MsiX,
    /// Multi-message MSI with one vector per source.
    MultiMsi,
    /// One shared (possibly legacy) line for every source.
    SingleLine,
}

/// What the ISR top half reports back to the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IsrStatus {
    /// The device raised this interrupt; deferred work is pending.
    Handled,
    /// Not ours; the platform should offer the line to the next handler.
    NotHandled,
}

/// Decide the interrupt topology from the granted resources.
///
/// Fully vectored dispatch needs 24 vectors: 16 user events plus 8
/// channel-direction sources. Zero interrupt resources is fatal; the device
/// cannot operate without at least a shared line.
pub fn select_topology(resources: &[Resource], msi_vectors: usize) -> ConfigResult<Topology> {
    let granted = count_interrupt_resources(resources);
    if granted == 0 {
        return Err(ConfigError::NoInterruptResource);
    }
    if granted >= MAX_NUM_IRQ {
        Ok(Topology::MsiX)
    } else if msi_vectors >= MAX_NUM_IRQ {
        Ok(Topology::MultiMsi)
    } else {
        Ok(Topology::SingleLine)
    }
}

/// Pending source bits accumulated by the shared-line ISR.
#[derive(Debug, Clone, Copy, Default)]
struct PendingBits {
    user: u32,
    channel: u32,
}

/// Routes interrupt sources to engines and user events.
pub struct InterruptRouter {
    topology: Topology,
    irq: IrqRegs,
    pending: CriticalSectionCell<PendingBits>,
}

impl InterruptRouter {
    /// Program the vector registers for the chosen topology.
    ///
    /// Vectored topologies assign message ids 0..15 to the user sources and
    /// 16..23 to the channel sources. The shared line writes its single
    /// message id into every vector slot.
    pub fn setup(irq: IrqRegs, topology: Topology, line_vector: u32) -> Self {
        match topology {
            Topology::MsiX | Topology::MultiMsi => {
                for word in 0..USER_VECTOR_WORDS {
                    let base = (word * 4) as u32;
                    irq.set_user_vector(
                        word,
                        build_vector_reg(base, base + 1, base + 2, base + 3),
                    );
                }
                for word in 0..CHANNEL_VECTOR_WORDS {
                    let base = (MAX_USER_IRQ + word * 4) as u32;
                    irq.set_channel_vector(
                        word,
                        build_vector_reg(base, base + 1, base + 2, base + 3),
                    );
                }
            }
            Topology::SingleLine => {
                let value = build_vector_reg(line_vector, line_vector, line_vector, line_vector);
                for word in 0..USER_VECTOR_WORDS {
                    irq.set_user_vector(word, value);
                }
                for word in 0..CHANNEL_VECTOR_WORDS {
                    irq.set_channel_vector(word, value);
                }
            }
        }

        #[cfg(feature = "defmt")]
        defmt::info!("interrupt topology: {:?}", topology);

        Self {
            topology,
            irq,
            pending: CriticalSectionCell::new(PendingBits::default()),
        }
    }

    /// The topology decided at open.
    #[must_use]
    pub fn topology(&self) -> Topology {
        self.topology
    }

    /// Zero every vector register (close path).
    pub fn reset_vectors(&self) {
        for word in 0..USER_VECTOR_WORDS {
            self.irq.set_user_vector(word, 0);
        }
        for word in 0..CHANNEL_VECTOR_WORDS {
            self.irq.set_channel_vector(word, 0);
        }
    }

    /// Enable a user event source bit.
    ///
    /// Runs under the accumulator lock so the write cannot interleave with
    /// the deferred-work re-enable step.
    pub fn enable_user(&self, index: usize) {
        debug_assert!(index < MAX_USER_IRQ);
        self.pending.with(|_| self.irq.user_int_enable_w1s(1 << index));
    }

    /// Disable a user event source bit.
    ///
    /// Also drops the bit from the pending accumulator, so a disable issued
    /// between an ISR pass and its deferred work is not undone by the
    /// re-enable step.
    pub fn disable_user(&self, index: usize) {
        debug_assert!(index < MAX_USER_IRQ);
        self.pending.with(|p| {
            p.user &= !(1 << index);
            self.irq.user_int_enable_w1c(1 << index);
        });
    }

    /// Enable a channel source bit (engine interrupt).
    pub fn enable_channel(&self, bit_mask: u32) {
        debug_assert!(bit_mask < (1 << MAX_CHANNEL_IRQ));
        self.pending.with(|_| self.irq.channel_int_enable_w1s(bit_mask));
    }

    /// Disable a channel source bit; sticks even against pending re-enables.
    pub fn disable_channel(&self, bit_mask: u32) {
        self.pending.with(|p| {
            p.channel &= !bit_mask;
            self.irq.channel_int_enable_w1c(bit_mask);
        });
    }

    /// Shared-line ISR top half.
    ///
    /// Reads both request registers. Nothing pending means the interrupt was
    /// not ours (shared line): report [`IsrStatus::NotHandled`] without
    /// touching any state. Otherwise mask exactly the enable bits that
    /// fired, fold them into the pending accumulators, and let the caller
    /// schedule deferred work.
    pub fn line_isr(&self) -> IsrStatus {
        let user_req = self.irq.user_int_request();
        let channel_req = self.irq.channel_int_request();
        if user_req == 0 && channel_req == 0 {
            return IsrStatus::NotHandled;
        }

        if user_req != 0 {
            self.irq.user_int_enable_w1c(user_req);
        }
        if channel_req != 0 {
            self.irq.channel_int_enable_w1c(channel_req);
        }
        self.pending.with(|p| {
            p.user |= user_req;
            p.channel |= channel_req;
        });
        IsrStatus::Handled
    }

    /// Snapshot the accumulated pending bits for dispatch.
    ///
    /// Returns `(user, channel)` bit sets. The accumulators are left intact;
    /// [`InterruptRouter::finish_deferred_work`] clears them after the
    /// sources have been re-enabled.
    #[must_use]
    pub fn pending_sources(&self) -> (u32, u32) {
        self.pending.with(|p| (p.user, p.channel))
    }

    /// Re-enable the accumulated sources and clear the accumulators.
    ///
    /// Runs under the same lock the ISR accumulates under, so a source that
    /// fired between the dispatch snapshot and this call is still
    /// re-enabled and its request line, being level-pending, raises the
    /// next interrupt.
    pub fn finish_deferred_work(&self) {
        self.pending.with(|p| {
            if p.user != 0 {
                self.irq.user_int_enable_w1s(p.user);
            }
            if p.channel != 0 {
                self.irq.channel_int_enable_w1s(p.channel);
            }
            p.user = 0;
            p.channel = 0;
        });
    }
}

// =============================================================================
// Tests
// =============================================================================
