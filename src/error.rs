//! Error types for the ADMA driver core
//!
//! Errors are organized by domain for better diagnostics:
//! - [`ConfigError`]: Device open and configuration failures
//! - [`DmaError`]: Descriptor ring and transfer setup issues
//! - [`HwError`]: Hardware misbehavior detected at runtime
//!
//! The unified [`Error`] enum wraps all domain errors and is returned
//! by most driver methods.

// =============================================================================
// Configuration Errors
// =============================================================================

/// Device open and configuration errors
///
/// These errors occur during device open, BAR identification, interrupt
/// setup, or engine probing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Device already opened
    AlreadyOpen,
    /// A required BAR could not be mapped
    BarMapFailed,
    /// No BAR carries the ADMA register identifiers
    ConfigBarNotFound,
    /// A mapped BAR is too small for the expected register blocks
    BarTooSmall,
    /// No interrupt resource was granted to the device
    NoInterruptResource,
    /// No DMA engine responded at any channel location
    NoEngineFound,
    /// Invalid configuration parameter
    InvalidConfig,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ConfigError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ConfigError::AlreadyOpen => "device already open",
            ConfigError::BarMapFailed => "BAR mapping failed",
            ConfigError::ConfigBarNotFound => "config BAR not found",
            ConfigError::BarTooSmall => "BAR too small for register blocks",
            ConfigError::NoInterruptResource => "no interrupt resource",
            ConfigError::NoEngineFound => "no DMA engine found",
            ConfigError::InvalidConfig => "invalid configuration",
        }
    }
}

// =============================================================================
// DMA Errors
// =============================================================================

/// Descriptor ring and transfer setup errors
///
/// These errors relate to ring management, transfer validation, and
/// coherent buffer allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmaError {
    /// Not enough free ring slots for the transfer
    RingFull,
    /// Coherent buffer allocation failed
    AllocFailed,
    /// Transfer has no fragments or a zero-length fragment
    InvalidLength,
    /// Transfer needs more descriptors than the hardware supports
    TooManyFragments,
    /// A fragment violates the engine's address or length alignment
    AlignmentViolation,
    /// Fixed address mode needs one device address per fragment
    MissingDeviceAddress,
    /// Ring not set up for this engine
    RingNotReady,
    /// User event index outside the 16-slot table
    InvalidEventIndex,
}

impl core::fmt::Display for DmaError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DmaError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            DmaError::RingFull => "descriptor ring full",
            DmaError::AllocFailed => "coherent buffer allocation failed",
            DmaError::InvalidLength => "invalid transfer length",
            DmaError::TooManyFragments => "too many fragments for one transfer",
            DmaError::AlignmentViolation => "fragment violates engine alignment",
            DmaError::MissingDeviceAddress => "missing per-fragment device address",
            DmaError::RingNotReady => "descriptor ring not set up",
            DmaError::InvalidEventIndex => "user event index out of range",
        }
    }
}

// =============================================================================
// Hardware Errors
// =============================================================================

/// Runtime hardware misbehavior
///
/// These errors surface when the device stops answering or reports state
/// the driver knows to be impossible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HwError {
    /// Engine failed to quiesce within the stop timeout
    NotResponding,
    /// Hardware reported more completions than descriptors submitted
    Inconsistency,
    /// Engine is in the wrong state for the operation
    InvalidState,
    /// Operation timed out
    Timeout,
    /// Engine reported a fault status (bus or descriptor error)
    EngineFault,
}

impl core::fmt::Display for HwError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl HwError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            HwError::NotResponding => "engine not responding",
            HwError::Inconsistency => "hardware state inconsistency",
            HwError::InvalidState => "invalid state for operation",
            HwError::Timeout => "operation timed out",
            HwError::EngineFault => "engine fault status",
        }
    }
}

// =============================================================================
// Unified Error Type
// =============================================================================

/// This enum wraps all domain-specific errors for unified error handling.
///
/// Match on the inner domain error for specific handling:
/// ```ignore
/// match result {
///     Err(Error::Config(ConfigError::ConfigBarNotFound)) => { /* ... */ }
///     Err(Error::Dma(DmaError::RingFull)) => { /* ... */ }
///     Err(Error::Hw(HwError::NotResponding)) => { /* ... */ }
///     _ => {}
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Configuration error
    Config(ConfigError),
    /// DMA error
    Dma(DmaError),
    /// Hardware error
    Hw(HwError),
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Config(e) => write!(f, "config: {}", e.as_str()),
            Error::Dma(e) => write!(f, "dma: {}", e.as_str()),
            Error::Hw(e) => write!(f, "hw: {}", e.as_str()),
        }
    }
}

// From impls for automatic conversion
impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<DmaError> for Error {
    fn from(e: DmaError) -> Self {
        Error::Dma(e)
    }
}

impl From<HwError> for Error {
    fn from(e: HwError) -> Self {
        Error::Hw(e)
    }
}

/// Result type alias for driver operations
pub type Result<T> = core::result::Result<T, Error>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = core::result::Result<T, ConfigError>;

/// Result type alias for DMA operations
pub type DmaResult<T> = core::result::Result<T, DmaError>;

/// Result type alias for hardware operations
pub type HwResult<T> = core::result::Result<T, HwError>;

// =============================================================================
// Unit Tests
// =============================================================================
