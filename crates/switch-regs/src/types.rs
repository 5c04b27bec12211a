//! Type-safe register addressing.
//!
//! A register is identified by the block (device address on the management
//! bus) and the offset inside that block. Both are 5-bit quantities on the
//! wire; keeping them as distinct newtypes stops a caller from swapping the
//! two arguments of a transport call.

use std::fmt;

/// Block (device) address of a register group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockAddr(u8);

impl BlockAddr {
    /// Largest block address representable on the management bus.
    pub const MAX: u8 = 0x1f;

    /// Creates a block address.
    pub const fn new(addr: u8) -> Self {
        BlockAddr(addr)
    }

    /// Returns the raw address.
    pub const fn as_u8(&self) -> u8 {
        self.0
    }

    /// Returns true if the address fits the 5-bit bus field.
    pub const fn is_valid(&self) -> bool {
        self.0 <= Self::MAX
    }
}

impl fmt::Display for BlockAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x}", self.0)
    }
}

impl From<u8> for BlockAddr {
    fn from(addr: u8) -> Self {
        BlockAddr(addr)
    }
}

/// Register offset inside a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegOffset(u8);

impl RegOffset {
    /// Largest register offset inside a block.
    pub const MAX: u8 = 0x1f;

    /// Creates a register offset.
    pub const fn new(offset: u8) -> Self {
        RegOffset(offset)
    }

    /// Returns the raw offset.
    pub const fn as_u8(&self) -> u8 {
        self.0
    }

    /// Returns the offset `n` registers further on.
    pub const fn add(&self, n: u8) -> Self {
        RegOffset(self.0 + n)
    }
}

impl fmt::Display for RegOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x}", self.0)
    }
}

impl From<u8> for RegOffset {
    fn from(offset: u8) -> Self {
        RegOffset(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_display() {
        assert_eq!(BlockAddr::new(0x1f).to_string(), "0x1f");
        assert_eq!(RegOffset::new(2).to_string(), "0x02");
    }

    #[test]
    fn test_block_validity() {
        assert!(BlockAddr::new(0x1e).is_valid());
        assert!(!BlockAddr::new(0x20).is_valid());
    }

    #[test]
    fn test_offset_add() {
        assert_eq!(RegOffset::new(0x07).add(21), RegOffset::new(0x1c));
    }
}
