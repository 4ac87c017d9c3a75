//! DMA descriptors and the coherent descriptor ring.

pub mod descriptor;
pub mod ring;

pub use ring::DescriptorRing;
