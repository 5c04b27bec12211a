//! Device-capability configuration for the TCAM tables.
//!
//! These values describe the chip variant behind a device handle and are
//! assumed stable for its lifetime; they are validated once on load.

use serde::{Deserialize, Serialize};
use switch_regs::BlockAddr;

use crate::error::{TcamError, TcamResult};
use crate::layout;

/// Address range and size of one TCAM table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableGeometry {
    /// Register block the table's command and data registers live in.
    pub block: u8,
    /// Lowest usable slot index.
    pub min_index: u16,
    /// Highest usable slot index; also what GET_NEXT reports on a miss.
    pub max_index: u16,
    /// Frame-window pages per slot: 2 gives a 48-octet window, 1 gives
    /// only the 22 octets held in page 0.
    pub window_pages: u8,
}

impl TableGeometry {
    /// The 256-slot ingress table.
    pub const INGRESS: TableGeometry = TableGeometry {
        block: 0x1f,
        min_index: 0,
        max_index: 255,
        window_pages: 2,
    };

    /// The 63-slot egress table. Slot 0 is reserved by the hardware.
    pub const EGRESS: TableGeometry = TableGeometry {
        block: 0x1e,
        min_index: 1,
        max_index: 63,
        window_pages: 1,
    };

    pub const fn block_addr(&self) -> BlockAddr {
        BlockAddr::new(self.block)
    }

    /// Number of window octets a slot of this table can hold.
    pub const fn window_octets(&self) -> usize {
        if self.window_pages >= 2 {
            layout::WINDOW_BYTES
        } else {
            layout::PAGE0_OCTETS
        }
    }

    pub const fn contains(&self, slot: u16) -> bool {
        slot >= self.min_index && slot <= self.max_index
    }

    /// Rejects slots outside the table.
    pub fn check_slot(&self, slot: u16) -> TcamResult<()> {
        if self.contains(slot) {
            Ok(())
        } else {
            Err(TcamError::invalid_argument(format!(
                "slot {} outside table range {}..={}",
                slot, self.min_index, self.max_index
            )))
        }
    }

    pub fn validate(&self) -> TcamResult<()> {
        if !self.block_addr().is_valid() {
            return Err(TcamError::config(format!(
                "block address 0x{:02x} out of range",
                self.block
            )));
        }
        if self.max_index > layout::MAX_SLOT_INDEX {
            return Err(TcamError::config(format!(
                "max_index {} exceeds the {}-slot index field",
                self.max_index,
                layout::MAX_SLOT_INDEX as u32 + 1
            )));
        }
        if self.min_index > self.max_index {
            return Err(TcamError::config(format!(
                "min_index {} above max_index {}",
                self.min_index, self.max_index
            )));
        }
        if !(1..=2).contains(&self.window_pages) {
            return Err(TcamError::config(format!(
                "window_pages must be 1 or 2, got {}",
                self.window_pages
            )));
        }
        Ok(())
    }
}

/// Configuration for the TCAM driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TcamConfig {
    pub ingress: TableGeometry,
    pub egress: TableGeometry,
    /// Busy-bit reads before an operation fails. Applies to every command.
    pub busy_poll_limit: u32,
    /// Ports present on the device; port arguments must be below this.
    pub port_count: u8,
}

impl Default for TcamConfig {
    fn default() -> Self {
        Self {
            ingress: TableGeometry::INGRESS,
            egress: TableGeometry::EGRESS,
            busy_poll_limit: 1000,
            port_count: PORT_VECTOR_WIDTH,
        }
    }
}

const PORT_VECTOR_WIDTH: u8 = crate::types::PortVector::WIDTH;

impl TcamConfig {
    /// Parses and validates a JSON configuration. Missing keys take their
    /// defaults.
    pub fn from_json(json: &str) -> TcamResult<Self> {
        let config: TcamConfig =
            serde_json::from_str(json).map_err(|e| TcamError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> TcamResult<()> {
        self.ingress.validate()?;
        self.egress.validate()?;
        if self.ingress.block == self.egress.block {
            return Err(TcamError::config("ingress and egress share a block address"));
        }
        if self.busy_poll_limit == 0 {
            return Err(TcamError::config("busy_poll_limit must be non-zero"));
        }
        if self.port_count == 0 || self.port_count > PORT_VECTOR_WIDTH {
            return Err(TcamError::config(format!(
                "port_count must be 1..={}, got {}",
                PORT_VECTOR_WIDTH, self.port_count
            )));
        }
        Ok(())
    }

    /// Rejects ports the device does not have.
    pub fn check_port(&self, port: u8) -> TcamResult<()> {
        if port < self.port_count {
            Ok(())
        } else {
            Err(TcamError::invalid_argument(format!(
                "port {} out of range (device has {} ports)",
                port, self.port_count
            )))
        }
    }
}
