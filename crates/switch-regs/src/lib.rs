//! Indirect register access for Ethernet switch ASICs.
//!
//! Switch ASICs of this family expose their internal tables through a small
//! window of 16-bit registers grouped into blocks (SMI/MDIO device
//! addresses). This crate is the seam between table drivers and whatever
//! actually moves bits over the management bus.
//!
//! # Architecture
//!
//! - [`types`]: type-safe block and register addresses
//! - [`field`]: the bit-field codec every register layout is built on
//! - [`bus`]: the [`RegisterBus`] transport trait
//! - [`error`]: transport error type
//!
//! # Example
//!
//! ```ignore
//! use switch_regs::{BlockAddr, RegOffset, RegisterBus, RegResult};
//!
//! fn busy<B: RegisterBus>(bus: &mut B) -> RegResult<bool> {
//!     let bit = bus.read_register_field(BlockAddr::new(0x1f), RegOffset::new(0x00), 15, 1)?;
//!     Ok(bit == 1)
//! }
//! ```

pub mod bus;
pub mod error;
pub mod field;
pub mod types;

pub use bus::RegisterBus;
pub use error::{RegError, RegResult};
pub use field::{get_field, set_field, BitField};
pub use types::{BlockAddr, RegOffset};
