//! Config block registers (offset 0x3000 in the config BAR).

use crate::hal::MmioRegion;
use crate::internal::register::{reg_ro, reg_rw};

/// Byte length of the config block window.
pub const CONFIG_BLOCK_LEN: usize = 0x80;

const IDENTIFIER: usize = 0x00;
const BUS_DEV: usize = 0x04;
const PCIE_MPS: usize = 0x08;
const PCIE_MRRS: usize = 0x0C;
const SYSTEM_ID: usize = 0x10;
const MSI_ENABLE: usize = 0x14;
const PCIE_WIDTH: usize = 0x18;
const PCIE_CONTROL: usize = 0x1C;
const USER_MPS: usize = 0x40;
const USER_MRRS: usize = 0x44;
const WRITE_FLUSH_TIMEOUT: usize = 0x60;

/// Typed overlay onto the config block.
#[derive(Debug, Clone, Copy)]
pub struct ConfigRegs {
    regs: MmioRegion,
}

impl ConfigRegs {
    /// Overlay the config block onto a carved window.
    #[must_use]
    pub const fn new(regs: MmioRegion) -> Self {
        Self { regs }
    }

    reg_ro!(identifier, IDENTIFIER, "the config block identifier");
    reg_ro!(bus_dev, BUS_DEV, "the PCIe bus/device number");
    reg_ro!(pcie_mps, PCIE_MPS, "the PCIe max payload size");
    reg_ro!(pcie_mrrs, PCIE_MRRS, "the PCIe max read request size");
    reg_ro!(system_id, SYSTEM_ID, "the system identifier");
    reg_ro!(msi_enable, MSI_ENABLE, "the MSI enable status");
    reg_ro!(pcie_width, PCIE_WIDTH, "the negotiated link width");
    reg_rw!(pcie_control, set_pcie_control, PCIE_CONTROL, "the PCIe control register");
    reg_rw!(user_mps, set_user_mps, USER_MPS, "the user logic max payload size");
    reg_rw!(user_mrrs, set_user_mrrs, USER_MRRS, "the user logic max read request size");
    reg_rw!(
        write_flush_timeout,
        set_write_flush_timeout,
        WRITE_FLUSH_TIMEOUT,
        "the C2H write flush timeout"
    );
}
