//! Internal constants for the ADMA subsystem.

/// Maximum DMA channels the IP core can expose.
pub const MAX_NUM_CHANNELS: usize = 4;

/// Transfer directions (H2C and C2H).
pub const NUM_DIRECTIONS: usize = 2;

/// Maximum per-channel interrupt sources (one per channel-direction pair).
pub const MAX_CHANNEL_IRQ: usize = MAX_NUM_CHANNELS * NUM_DIRECTIONS;

/// User-defined event interrupt sources.
pub const MAX_USER_IRQ: usize = 16;

/// Interrupt sources needed for fully vectored (per-source) dispatch.
pub const MAX_NUM_IRQ: usize = MAX_USER_IRQ + MAX_CHANNEL_IRQ;

/// Maximum BARs a PCIe function can expose.
pub const MAX_NUM_BARS: usize = 6;

/// Hardware-imposed maximum descriptors per transfer and ring capacity.
pub const MAX_DESCRIPTOR_NUM: usize = 128;

/// Size of one transfer descriptor in bytes.
pub const DESCRIPTOR_SIZE: usize = 32;

/// Descriptor ring base alignment required by the fetch engine.
pub const DESCRIPTOR_ALIGN: usize = 32;

/// Largest payload one descriptor can carry.
pub const ONE_DESCRIPTOR_MAX_TRANSFER: u32 = 1024 * 1024 - 4;

/// Writeback block: one completed-count word plus reserved padding.
pub const POLL_WB_SIZE: usize = 32;

/// Bounded wait for engine quiesce on stop, in microseconds.
pub const STOP_TIMEOUT_US: u32 = 100_000;

/// Poll interval while waiting for quiesce, in microseconds.
pub const STOP_POLL_INTERVAL_US: u32 = 100;
