//! Classification-rule compiler and TCAM table manager for switch ASICs.
//!
//! Rules match on the key header (frame type, ingress ports, VLAN) and a
//! value/mask window over the first bytes of the frame. This crate compiles
//! such rules into the bit-exact slot images the hardware stores and moves
//! them in and out of the table through the paged register protocol.
//!
//! # Architecture
//!
//! - [`types`], [`rule`]: the logical rule model
//! - [`entry`], [`layout`]: slot images and their register pages
//! - [`shape`], [`compile`], [`cascade`]: rule compilation, including
//!   rules that span two slots
//! - [`table`]: the locked command/busy-poll state machine
//! - [`orch`]: the rule-level API
//! - [`config`], [`error`]: configuration and error types
//! - `sim` (feature `sim`): a register-level table model for tests
//!
//! # Example
//!
//! ```ignore
//! use switch_tcam::{Rule, RuleAction, PortVector, ProtocolShape, TcamConfig, TcamOrch};
//!
//! let orch = TcamOrch::ingress(bus, TcamConfig::default())?;
//! let mut rule = Rule::new(ProtocolShape::Ipv4Tcp);
//! rule.action = RuleAction::redirect(PortVector::single(2));
//! let cascaded = orch.advanced_config(10, 11, &rule)?;
//! ```

pub mod cascade;
pub mod compile;
pub mod config;
pub mod entry;
pub mod error;
pub mod layout;
pub mod orch;
pub mod rule;
pub mod shape;
#[cfg(feature = "sim")]
pub mod sim;
pub mod table;
pub mod types;

// Re-export commonly used types
pub use compile::{compile, decode, CompiledRule};
pub use config::{TableGeometry, TcamConfig};
pub use entry::{ActionFields, CompiledEntry, FrameWindow, KeyMatch, RuleAction, Slot};
pub use error::{TcamError, TcamResult, TcamResultExt, TcamStatus};
pub use orch::{TcamOrch, TcamStats};
pub use rule::{EthernetMatch, Ipv4Match, Ipv6Match, ProtocolHeaders, Rule, TcpMatch, UdpMatch};
pub use table::{TableSession, TableState, TcamTable};
pub use types::{DpvMode, FrameType, MacAddress, Masked, PortVector, ProtocolShape};

#[cfg(feature = "sim")]
pub use sim::{SimCommand, TcamSimulator};
