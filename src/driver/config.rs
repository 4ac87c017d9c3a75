//! Configuration types for the ADMA driver core

/// Transfer direction of an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Host-to-Card - write to the device
    H2C,
    /// Card-to-Host - read from the device
    C2H,
}

impl Direction {
    /// Returns the conventional short name (for log messages)
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Direction::H2C => "H2C",
            Direction::C2H => "C2H",
        }
    }

    /// Index into per-direction arrays (H2C = 0, C2H = 1)
    #[must_use]
    pub const fn index(&self) -> usize {
        match self {
            Direction::H2C => 0,
            Direction::C2H => 1,
        }
    }
}

impl core::fmt::Display for Direction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine interface type, decoded from the engine identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EngineType {
    /// Memory mapped - device address space is addressable
    #[default]
    MemoryMapped,
    /// Streaming - data flows through a FIFO interface
    Streaming,
}

/// How the engine interprets the device address across a transfer
///
/// Contiguous mode sets the device address on the first descriptor and lets
/// the engine increment it across subsequent descriptors. Fixed mode keeps
/// the address constant per descriptor (FIFO-style targets) and therefore
/// needs an explicit address for every fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AddressMode {
    /// Incrementing device address
    #[default]
    Contiguous,
    /// Non-incrementing device address
    Fixed,
}

/// Engine lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EngineState {
    /// Not probed or probe failed
    #[default]
    Disabled,
    /// Probed, no transfer prepared
    Idle,
    /// Descriptors enqueued, engine not yet running
    Armed,
    /// Engine fetching and executing descriptors
    Running,
    /// Stop requested, waiting for quiesce
    Stopping,
}

/// Device-side addressing for one programmed transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceAddress<'a> {
    /// One base address, incremented across fragments by the engine
    Contiguous(u64),
    /// One address per fragment (must match the fragment count)
    Fixed(&'a [u64]),
}

/// Latched performance counter snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PerfCounters {
    /// Clock cycles elapsed while the counters ran
    pub clock_cycles: u64,
    /// Cycles the datapath moved data
    pub data_cycles: u64,
    /// Cycles requests were outstanding
    pub pending_cycles: u64,
}

/// Device open options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceConfig {
    /// Complete transfers by polling the writeback word instead of
    /// interrupts
    pub poll_mode: bool,
}

impl DeviceConfig {
    /// Create a configuration with default settings (interrupt-driven)
    #[must_use]
    pub const fn new() -> Self {
        Self { poll_mode: false }
    }

    /// Select poll-mode completion
    #[must_use]
    pub const fn with_poll_mode(mut self, poll_mode: bool) -> Self {
        self.poll_mode = poll_mode;
        self
    }
}
