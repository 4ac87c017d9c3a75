//! PCIe resource enumeration and BAR mapping contracts.
//!
//! The OS (or test harness) enumerates the device's resources once and hands
//! the driver an ordered list at open time. The driver consumes it to map
//! BARs and classify the interrupt topology; nothing from the list is stored
//! beyond the resulting register windows.

use super::mmio::MmioRegion;

/// A memory (BAR) resource granted by the bus driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MemoryResource {
    /// Bus physical base address.
    pub base: u64,
    /// Window length in bytes.
    pub len: usize,
    /// Prefetchable window hint (unused by this driver, carried for logs).
    pub prefetchable: bool,
}

/// An interrupt resource granted by the bus driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InterruptResource {
    /// `true` for message-signaled interrupts (MSI/MSI-X), `false` for a
    /// shared line interrupt.
    pub message: bool,
    /// Number of messages carried by this resource (1 for a line interrupt
    /// or a single MSI-X vector).
    pub message_count: u16,
}

/// One entry of the ordered resource list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Resource {
    /// A memory-mapped BAR window.
    Memory(MemoryResource),
    /// An interrupt vector or line.
    Interrupt(InterruptResource),
}

/// Maps BAR physical windows into driver-visible virtual windows.
///
/// The driver guarantees that every successful `map` is paired with exactly
/// one `unmap` by device close, in any order, including on partial-open
/// failure.
pub trait BarMapper {
    /// Map a BAR window. Returns `None` when the platform cannot map it;
    /// the driver treats that as a fatal configuration error.
    fn map(&mut self, resource: &MemoryResource) -> Option<MmioRegion>;

    /// Unmap a window previously returned by [`BarMapper::map`].
    fn unmap(&mut self, region: MmioRegion);
}

/// Count the interrupt resources in a resource list.
#[must_use]
pub fn count_interrupt_resources(resources: &[Resource]) -> usize {
    resources
        .iter()
        .filter(|r| matches!(r, Resource::Interrupt(_)))
        .count()
}
