//! Hardware abstraction seams.
//!
//! Everything the driver core needs from the surrounding platform is a trait
//! or plain data type in this module: resource enumeration results, BAR
//! mapping, coherent DMA allocation, and the bounds-checked MMIO window the
//! register overlays are built on. The platform glue (bus driver, test
//! harness) implements these; the core never calls the OS directly.

pub mod dma;
pub mod mmio;
pub mod resources;

pub use dma::{DmaAllocator, DmaBuffer, DmaFragment};
pub use mmio::MmioRegion;
pub use resources::{count_interrupt_resources, BarMapper, InterruptResource, MemoryResource, Resource};
