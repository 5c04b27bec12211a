//! The register transport trait.
//!
//! Drivers never talk to the management bus directly; they are generic over
//! a [`RegisterBus`]. Production code plugs in the platform's SMI/MDIO
//! accessor, tests plug in a device model.

use std::sync::{Arc, Mutex};

use crate::error::{RegError, RegResult};
use crate::field::{get_field, set_field};
use crate::types::{BlockAddr, RegOffset};

/// Synchronous access to 16-bit device registers.
///
/// Only [`read_register`](Self::read_register) and
/// [`write_register`](Self::write_register) are required. The field
/// accessors default to a read-modify-write through the field codec;
/// transports that have native field access may override them.
pub trait RegisterBus {
    /// Reads a full register.
    fn read_register(&mut self, block: BlockAddr, offset: RegOffset) -> RegResult<u16>;

    /// Writes a full register.
    fn write_register(&mut self, block: BlockAddr, offset: RegOffset, value: u16)
        -> RegResult<()>;

    /// Reads `width` bits at `bit_offset` of a register.
    fn read_register_field(
        &mut self,
        block: BlockAddr,
        offset: RegOffset,
        bit_offset: u8,
        width: u8,
    ) -> RegResult<u16> {
        let word = self.read_register(block, offset)?;
        Ok(get_field(word, bit_offset, width))
    }

    /// Replaces `width` bits at `bit_offset` of a register with `value`.
    fn write_register_field(
        &mut self,
        block: BlockAddr,
        offset: RegOffset,
        bit_offset: u8,
        width: u8,
        value: u16,
    ) -> RegResult<()> {
        let word = self.read_register(block, offset)?;
        self.write_register(block, offset, set_field(word, value, bit_offset, width))
    }
}

impl<T: RegisterBus + ?Sized> RegisterBus for &mut T {
    fn read_register(&mut self, block: BlockAddr, offset: RegOffset) -> RegResult<u16> {
        (**self).read_register(block, offset)
    }

    fn write_register(
        &mut self,
        block: BlockAddr,
        offset: RegOffset,
        value: u16,
    ) -> RegResult<()> {
        (**self).write_register(block, offset, value)
    }

    fn read_register_field(
        &mut self,
        block: BlockAddr,
        offset: RegOffset,
        bit_offset: u8,
        width: u8,
    ) -> RegResult<u16> {
        (**self).read_register_field(block, offset, bit_offset, width)
    }

    fn write_register_field(
        &mut self,
        block: BlockAddr,
        offset: RegOffset,
        bit_offset: u8,
        width: u8,
        value: u16,
    ) -> RegResult<()> {
        (**self).write_register_field(block, offset, bit_offset, width, value)
    }
}

impl<T: RegisterBus + ?Sized> RegisterBus for Box<T> {
    fn read_register(&mut self, block: BlockAddr, offset: RegOffset) -> RegResult<u16> {
        (**self).read_register(block, offset)
    }

    fn write_register(
        &mut self,
        block: BlockAddr,
        offset: RegOffset,
        value: u16,
    ) -> RegResult<()> {
        (**self).write_register(block, offset, value)
    }

    fn read_register_field(
        &mut self,
        block: BlockAddr,
        offset: RegOffset,
        bit_offset: u8,
        width: u8,
    ) -> RegResult<u16> {
        (**self).read_register_field(block, offset, bit_offset, width)
    }

    fn write_register_field(
        &mut self,
        block: BlockAddr,
        offset: RegOffset,
        bit_offset: u8,
        width: u8,
        value: u16,
    ) -> RegResult<()> {
        (**self).write_register_field(block, offset, bit_offset, width, value)
    }
}

/// A bus shared between several drivers. Each call takes the lock for a
/// single register access only; drivers that need multi-register atomicity
/// hold their own lock around the whole sequence.
impl<T: RegisterBus + ?Sized> RegisterBus for Arc<Mutex<T>> {
    fn read_register(&mut self, block: BlockAddr, offset: RegOffset) -> RegResult<u16> {
        self.lock()
            .map_err(|_| RegError::bus_unavailable("shared bus lock poisoned"))?
            .read_register(block, offset)
    }

    fn write_register(
        &mut self,
        block: BlockAddr,
        offset: RegOffset,
        value: u16,
    ) -> RegResult<()> {
        self.lock()
            .map_err(|_| RegError::bus_unavailable("shared bus lock poisoned"))?
            .write_register(block, offset, value)
    }

    fn read_register_field(
        &mut self,
        block: BlockAddr,
        offset: RegOffset,
        bit_offset: u8,
        width: u8,
    ) -> RegResult<u16> {
        self.lock()
            .map_err(|_| RegError::bus_unavailable("shared bus lock poisoned"))?
            .read_register_field(block, offset, bit_offset, width)
    }

    fn write_register_field(
        &mut self,
        block: BlockAddr,
        offset: RegOffset,
        bit_offset: u8,
        width: u8,
        value: u16,
    ) -> RegResult<()> {
        self.lock()
            .map_err(|_| RegError::bus_unavailable("shared bus lock poisoned"))?
            .write_register_field(block, offset, bit_offset, width, value)
    }
}
