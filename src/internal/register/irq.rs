//! IRQ block registers (offset 0x2000 in the config BAR).
//!
//! Enable registers come with W1S/W1C mirrors so the interrupt paths can
//! set and clear individual source bits without read-modify-write races.
//! Request registers reflect level-pending sources until the hardware
//! condition is removed; the driver never writes them.

use crate::hal::MmioRegion;
use crate::internal::register::{reg_ro, reg_wo};

/// Byte length of the IRQ block window.
pub const IRQ_BLOCK_LEN: usize = 0xB0;

pub(crate) const IDENTIFIER: usize = 0x00;
pub(crate) const USER_INT_ENABLE: usize = 0x04;
pub(crate) const USER_INT_ENABLE_W1S: usize = 0x08;
pub(crate) const USER_INT_ENABLE_W1C: usize = 0x0C;
pub(crate) const CHANNEL_INT_ENABLE: usize = 0x10;
pub(crate) const CHANNEL_INT_ENABLE_W1S: usize = 0x14;
pub(crate) const CHANNEL_INT_ENABLE_W1C: usize = 0x18;
pub(crate) const USER_INT_REQUEST: usize = 0x40;
pub(crate) const CHANNEL_INT_REQUEST: usize = 0x44;
pub(crate) const USER_INT_PENDING: usize = 0x48;
pub(crate) const CHANNEL_INT_PENDING: usize = 0x4C;
pub(crate) const USER_VECTOR_BASE: usize = 0x80;
pub(crate) const CHANNEL_VECTOR_BASE: usize = 0xA0;

/// User vector words (4 message ids each).
pub const USER_VECTOR_WORDS: usize = 4;
/// Channel vector words (4 message ids each).
pub const CHANNEL_VECTOR_WORDS: usize = 2;

/// Pack four 5-bit interrupt message ids into one vector register word.
#[must_use]
pub fn build_vector_reg(a: u32, b: u32, c: u32, d: u32) -> u32 {
    (a & 0x1F) | ((b & 0x1F) << 8) | ((c & 0x1F) << 16) | ((d & 0x1F) << 24)
}

/// Typed overlay onto the IRQ block.
#[derive(Debug, Clone, Copy)]
pub struct IrqRegs {
    regs: MmioRegion,
}

impl IrqRegs {
    /// Overlay the IRQ block onto a carved window.
    #[must_use]
    pub const fn new(regs: MmioRegion) -> Self {
        Self { regs }
    }

    reg_ro!(identifier, IDENTIFIER, "the IRQ block identifier");
    reg_ro!(user_int_enable, USER_INT_ENABLE, "the user interrupt enable mask");
    reg_wo!(user_int_enable_w1s, USER_INT_ENABLE_W1S, "user enable bits (write 1 to set)");
    reg_wo!(user_int_enable_w1c, USER_INT_ENABLE_W1C, "user enable bits (write 1 to clear)");
    reg_ro!(channel_int_enable, CHANNEL_INT_ENABLE, "the channel interrupt enable mask");
    reg_wo!(
        channel_int_enable_w1s,
        CHANNEL_INT_ENABLE_W1S,
        "channel enable bits (write 1 to set)"
    );
    reg_wo!(
        channel_int_enable_w1c,
        CHANNEL_INT_ENABLE_W1C,
        "channel enable bits (write 1 to clear)"
    );
    reg_ro!(user_int_request, USER_INT_REQUEST, "the user interrupt request register");
    reg_ro!(channel_int_request, CHANNEL_INT_REQUEST, "the channel interrupt request register");
    reg_ro!(user_int_pending, USER_INT_PENDING, "the user interrupt pending register");
    reg_ro!(channel_int_pending, CHANNEL_INT_PENDING, "the channel interrupt pending register");

    /// Write one user vector word (`index` in 0..4).
    #[inline]
    pub fn set_user_vector(&self, index: usize, value: u32) {
        assert!(index < USER_VECTOR_WORDS);
        self.regs.write32(USER_VECTOR_BASE + index * 4, value);
    }

    /// Write one channel vector word (`index` in 0..2).
    #[inline]
    pub fn set_channel_vector(&self, index: usize, value: u32) {
        assert!(index < CHANNEL_VECTOR_WORDS);
        self.regs.write32(CHANNEL_VECTOR_BASE + index * 4, value);
    }

    /// Read back a user vector word (diagnostics and tests).
    #[inline]
    #[must_use]
    pub fn user_vector(&self, index: usize) -> u32 {
        assert!(index < USER_VECTOR_WORDS);
        self.regs.read32(USER_VECTOR_BASE + index * 4)
    }

    /// Read back a channel vector word (diagnostics and tests).
    #[inline]
    #[must_use]
    pub fn channel_vector(&self, index: usize) -> u32 {
        assert!(index < CHANNEL_VECTOR_WORDS);
        self.regs.read32(CHANNEL_VECTOR_BASE + index * 4)
    }
}
