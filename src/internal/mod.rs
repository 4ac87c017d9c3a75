//! Internal implementation details.
//!
//! Register overlays, descriptor structures, and hardware constants. Nothing
//! in here is part of the public API surface.

pub mod constants;
pub mod dma;
pub mod register;
