//! Core driver components for the ADMA scatter-gather DMA subsystem.
//!
//! This module contains the building blocks for opening and operating the
//! DMA device:
//!
//! - [`config`] - Configuration types and the device open options
//! - [`device`] - Device context: open/close, BAR ownership, dispatch
//! - [`engine`] - Per-channel DMA engine control
//! - [`interrupt`] - Topology selection and the interrupt router
//!
//! # Example
//!
//! ```ignore
//! use pcie_adma::driver::{Device, DeviceConfig, Direction};
//!
//! let config = DeviceConfig::new().with_poll_mode(false);
//! let mut device = Device::open(&resources, msi_vectors, &mut mapper, &mut alloc, config)?;
//! let engine = device.engine_mut(0, Direction::H2C).unwrap();
//! ```

// Submodules
pub mod config;
pub mod device;
pub mod engine;
pub mod interrupt;

// Re-exports for convenience
pub use config::{
    AddressMode, DeviceAddress, DeviceConfig, Direction, EngineState, EngineType, PerfCounters,
};
pub use device::{Device, UserEventFn};
pub use engine::Engine;
pub use interrupt::{select_topology, InterruptRouter, IsrStatus, Topology};
