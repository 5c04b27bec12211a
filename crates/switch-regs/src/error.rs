//! Transport error types.

use thiserror::Error;

use crate::types::{BlockAddr, RegOffset};

/// Error raised by a register transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegError {
    /// The bus transaction for a register failed.
    #[error("register access failed at block {block} offset {offset}: {message}")]
    Access {
        block: BlockAddr,
        offset: RegOffset,
        message: String,
    },

    /// The address does not exist on this device.
    #[error("no register at block {block} offset {offset}")]
    NoSuchRegister { block: BlockAddr, offset: RegOffset },

    /// The bus itself is unusable (device gone, shared handle poisoned).
    #[error("register bus unavailable: {message}")]
    BusUnavailable { message: String },
}

impl RegError {
    /// Creates an access error for a register.
    pub fn access(block: BlockAddr, offset: RegOffset, message: impl Into<String>) -> Self {
        RegError::Access {
            block,
            offset,
            message: message.into(),
        }
    }

    /// Creates a bus-unavailable error.
    pub fn bus_unavailable(message: impl Into<String>) -> Self {
        RegError::BusUnavailable {
            message: message.into(),
        }
    }
}

/// Result type for register transport operations.
pub type RegResult<T> = Result<T, RegError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RegError::access(BlockAddr::new(0x1f), RegOffset::new(0x00), "nak");
        assert_eq!(
            err.to_string(),
            "register access failed at block 0x1f offset 0x00: nak"
        );
    }

    #[test]
    fn test_bus_unavailable() {
        let err = RegError::bus_unavailable("poisoned");
        assert!(err.to_string().contains("poisoned"));
    }
}
