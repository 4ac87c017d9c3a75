//! PCIe ADMA Driver Core
//!
//! A `no_std`, `no_alloc` driver core for a PCIe FPGA scatter-gather DMA
//! (ADMA) subsystem.
//!
//! The ADMA IP core exposes up to four channels per direction (host-to-card
//! and card-to-host), each driven by a ring of transfer descriptors fetched
//! from coherent host memory. This crate owns the register layout, the
//! descriptor ring, the per-channel engine state machine, and interrupt
//! routing; the surrounding platform supplies BAR mapping, coherent DMA
//! allocation, and interrupt delivery through the traits in [`hal`].
//!
//! # Architecture
//!
//! The driver is organized into three layers:
//!
//! 1. **Device Layer** ([`driver::device`]): Open/close, BAR ownership,
//!    engine discovery, interrupt dispatch
//! 2. **Engine Layer** ([`driver::engine`]): Per-channel transfer
//!    programming, start/stop, completion tracking
//! 3. **HAL Layer** ([`hal`]): Platform contracts for resources, BAR
//!    mapping, and coherent DMA memory
//!
//! # Concurrency Model
//!
//! Interrupt service entry points ([`Device::line_isr`] and friends) only
//! read request registers, mask fired sources, and accumulate pending bits;
//! all register programming and ring bookkeeping happens in the paired
//! deferred-work entry points, which the platform invokes from task context.
//! Shared state between the two paths lives behind
//! [`sync::CriticalSectionCell`].
//!
//! # Features
//!
//! - `defmt`: Enable defmt formatting for driver types and inline logging
//!
//! # Example
//!
//! ```ignore
//! use pcie_adma::{Device, DeviceConfig, DeviceAddress, Direction};
//!
//! let config = DeviceConfig::new().with_poll_mode(false);
//! let mut device = Device::open(&resources, msi_vectors, &mut mapper, &mut alloc, config)?;
//!
//! let engine = device.engine_mut(0, Direction::H2C).ok_or(ConfigError::NoEngineFound)?;
//! let target = engine.program_dma(&fragments, DeviceAddress::Contiguous(0x1000))?;
//! engine.start()?;
//! engine.wait_for_completion(target, &mut delay, 1_000_000)?;
//! ```

#![no_std]
#![deny(missing_docs)]
#![allow(unsafe_code)]
#![deny(unsafe_op_in_unsafe_fn)]
// Clippy lint levels live here; thresholds and config are in clippy.toml.
#![deny(clippy::correctness)]
#![warn(
    clippy::suspicious,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::cloned_instead_of_copied,
    clippy::explicit_iter_loop,
    clippy::implicit_clone,
    clippy::inconsistent_struct_constructor,
    clippy::manual_assert,
    clippy::manual_let_else,
    clippy::match_same_arms,
    clippy::needless_pass_by_value,
    clippy::semicolon_if_nothing_returned,
    clippy::uninlined_format_args,
    clippy::unnested_or_patterns,
    clippy::std_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::alloc_instead_of_core
)]
#![allow(
    clippy::mod_module_files,
    clippy::self_named_module_files,
    clippy::similar_names,
    clippy::too_many_arguments,
    clippy::struct_excessive_bools,
    clippy::fn_params_excessive_bools,
    clippy::type_complexity,
    clippy::must_use_candidate,
    clippy::assertions_on_constants,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss,
    clippy::cast_lossless,
    clippy::panic_in_result_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::module_name_repetitions,
    clippy::wildcard_imports,
    clippy::items_after_statements
)]

// =============================================================================
// Modules
// =============================================================================

pub mod driver;
pub mod error;
pub mod hal;
pub mod sync;

// Internal implementation details (pub(crate) only)
mod internal;

// Test utilities (only available during testing)
#[cfg(test)]
pub mod testing;

// =============================================================================
// Re-exports
// =============================================================================

pub use driver::config::{
    AddressMode, DeviceAddress, DeviceConfig, Direction, EngineState, EngineType, PerfCounters,
};
pub use driver::device::{Device, UserEventFn};
pub use driver::engine::Engine;
pub use driver::interrupt::{InterruptRouter, IsrStatus, Topology, select_topology};
pub use error::{
    ConfigError, ConfigResult, DmaError, DmaResult, Error, HwError, HwResult, Result,
};
pub use internal::register::engine::Alignments;

/// Low-level register accessors for advanced use.
///
/// These are intentionally separated from the primary facade. Most users
/// should prefer the safe driver APIs instead of touching registers directly.
///
/// # Safety
///
/// Direct register access bypasses driver invariants. Use only if you fully
/// understand the ADMA IP core and accept responsibility for correct
/// sequencing and synchronization.
pub mod unsafe_registers {
    pub use crate::internal::register::config::ConfigRegs;
    pub use crate::internal::register::engine::{EngineRegs, SgdmaRegs};
    pub use crate::internal::register::irq::IrqRegs;
}

/// Shared driver constants.
///
/// These are grouped into a dedicated module to keep the top-level facade
/// focused on driver types and integration points.
pub mod constants {
    pub use crate::internal::constants::{
        DESCRIPTOR_ALIGN, DESCRIPTOR_SIZE, MAX_CHANNEL_IRQ, MAX_DESCRIPTOR_NUM, MAX_NUM_BARS,
        MAX_NUM_CHANNELS, MAX_NUM_IRQ, MAX_USER_IRQ, NUM_DIRECTIONS, ONE_DESCRIPTOR_MAX_TRANSFER,
        POLL_WB_SIZE, STOP_POLL_INTERVAL_US, STOP_TIMEOUT_US,
    };
}
