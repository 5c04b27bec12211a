//! TCAM value types.
//!
//! These replace the raw integers of the register layout with type-safe
//! enums and newtypes wherever a field has a closed set of meanings.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use crate::error::TcamError;

/// Protocol combination a rule matches on.
///
/// The shape selects which header mapper lays out the frame window and
/// whether the rule may need a second (cascade) slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolShape {
    Ipv4Tcp,
    Ipv4Udp,
    Ipv6Tcp,
    Ipv6Udp,
}

impl ProtocolShape {
    /// EtherType the compiler writes at window bytes 16..=17.
    pub const fn ether_type(&self) -> u16 {
        match self {
            Self::Ipv4Tcp | Self::Ipv4Udp => 0x0800,
            Self::Ipv6Tcp | Self::Ipv6Udp => 0x86dd,
        }
    }

    /// IPv4 protocol / IPv6 next-header value implied by the shape.
    pub const fn ip_protocol(&self) -> u8 {
        match self {
            Self::Ipv4Tcp | Self::Ipv6Tcp => 6,
            Self::Ipv4Udp | Self::Ipv6Udp => 17,
        }
    }

    pub const fn is_ipv6(&self) -> bool {
        matches!(self, Self::Ipv6Tcp | Self::Ipv6Udp)
    }

    pub const fn is_tcp(&self) -> bool {
        matches!(self, Self::Ipv4Tcp | Self::Ipv6Tcp)
    }

    /// Looks the shape up from the EtherType and L4 protocol found in a
    /// frame window.
    pub fn from_wire(ether_type: u16, ip_protocol: u8) -> Option<Self> {
        match (ether_type, ip_protocol) {
            (0x0800, 6) => Some(Self::Ipv4Tcp),
            (0x0800, 17) => Some(Self::Ipv4Udp),
            (0x86dd, 6) => Some(Self::Ipv6Tcp),
            (0x86dd, 17) => Some(Self::Ipv6Udp),
            _ => None,
        }
    }
}

impl fmt::Display for ProtocolShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ipv4Tcp => write!(f, "IPV4_TCP"),
            Self::Ipv4Udp => write!(f, "IPV4_UDP"),
            Self::Ipv6Tcp => write!(f, "IPV6_TCP"),
            Self::Ipv6Udp => write!(f, "IPV6_UDP"),
        }
    }
}

impl FromStr for ProtocolShape {
    type Err = TcamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "IPV4_TCP" => Ok(Self::Ipv4Tcp),
            "IPV4_UDP" => Ok(Self::Ipv4Udp),
            "IPV6_TCP" => Ok(Self::Ipv6Tcp),
            "IPV6_UDP" => Ok(Self::Ipv6Udp),
            _ => Err(TcamError::invalid_argument(format!(
                "unsupported protocol shape: {}",
                s
            ))),
        }
    }
}

/// Frame type carried in the key header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FrameType {
    /// Normal network frame.
    #[default]
    Normal,
    /// Frame carrying a DSA tag.
    Dsa,
    /// Provider (double-tagged) frame.
    Provider,
}

impl FrameType {
    pub const fn bits(&self) -> u8 {
        match self {
            Self::Normal => 0,
            Self::Dsa => 1,
            Self::Provider => 2,
        }
    }

    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(Self::Normal),
            1 => Some(Self::Dsa),
            2 => Some(Self::Provider),
            _ => None,
        }
    }
}

/// How a matching entry's destination port vector combines with the
/// forwarding decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DpvMode {
    /// Leave the forwarding decision alone.
    #[default]
    Nop,
    /// AND the vector into the decision.
    And,
    /// OR the vector into the decision.
    Or,
    /// Replace the decision with the vector.
    Replace,
}

impl DpvMode {
    pub const fn bits(&self) -> u16 {
        match self {
            Self::Nop => 0,
            Self::And => 1,
            Self::Or => 2,
            Self::Replace => 3,
        }
    }

    /// Decodes the 2-bit register field; every value is defined.
    pub const fn from_bits(bits: u16) -> Self {
        match bits & 0x3 {
            0 => Self::Nop,
            1 => Self::And,
            2 => Self::Or,
            _ => Self::Replace,
        }
    }
}

impl fmt::Display for DpvMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nop => write!(f, "NOP"),
            Self::And => write!(f, "AND"),
            Self::Or => write!(f, "OR"),
            Self::Replace => write!(f, "REPLACE"),
        }
    }
}

/// Bitmap of switch ports, bit n = port n.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct PortVector(u16);

impl PortVector {
    /// Number of port bits held in a vector register field.
    pub const WIDTH: u8 = 11;

    pub const EMPTY: PortVector = PortVector(0);

    /// Every port of the widest supported device.
    pub const ALL: PortVector = PortVector((1 << Self::WIDTH) - 1);

    pub const fn from_bits(bits: u16) -> Self {
        PortVector(bits)
    }

    pub const fn bits(&self) -> u16 {
        self.0
    }

    /// Vector with only `port` set.
    pub const fn single(port: u8) -> Self {
        PortVector(1 << port)
    }

    pub const fn contains(&self, port: u8) -> bool {
        self.0 & (1 << port) != 0
    }

    pub const fn with(&self, port: u8) -> Self {
        PortVector(self.0 | (1 << port))
    }

    pub const fn without(&self, port: u8) -> Self {
        PortVector(self.0 & !(1 << port))
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterates over the set port numbers in ascending order.
    pub fn ports(&self) -> impl Iterator<Item = u8> + '_ {
        (0..16u8).filter(move |p| self.contains(*p))
    }
}

impl FromIterator<u8> for PortVector {
    fn from_iter<I: IntoIterator<Item = u8>>(iter: I) -> Self {
        iter.into_iter().fold(PortVector::EMPTY, |v, p| v.with(p))
    }
}

impl fmt::Display for PortVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ports: Vec<String> = self.ports().map(|p| p.to_string()).collect();
        write!(f, "[{}]", ports.join(","))
    }
}

/// A 48-bit Ethernet MAC address as it appears in the frame window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub const ZERO: MacAddress = MacAddress([0; 6]);
    pub const BROADCAST: MacAddress = MacAddress([0xff; 6]);

    pub const fn new(bytes: [u8; 6]) -> Self {
        MacAddress(bytes)
    }

    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl FromStr for MacAddress {
    type Err = TcamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TcamError::invalid_argument(format!("invalid MAC address: {}", s));
        let separator = if s.contains(':') { ':' } else { '-' };
        let mut bytes = [0u8; 6];
        let mut parts = s.split(separator);
        for byte in bytes.iter_mut() {
            let part = parts.next().ok_or_else(invalid)?;
            *byte = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(MacAddress(bytes))
    }
}

impl From<[u8; 6]> for MacAddress {
    fn from(bytes: [u8; 6]) -> Self {
        MacAddress(bytes)
    }
}

/// Values that can be matched ternary-style.
pub trait MaskValue: Copy + PartialEq + fmt::Debug {
    /// "Don't care" in every bit.
    const ZERO: Self;
    /// "Must compare" in every bit.
    const FULL: Self;
}

impl MaskValue for u8 {
    const ZERO: Self = 0;
    const FULL: Self = u8::MAX;
}

impl MaskValue for u16 {
    const ZERO: Self = 0;
    const FULL: Self = u16::MAX;
}

impl MaskValue for u32 {
    const ZERO: Self = 0;
    const FULL: Self = u32::MAX;
}

impl MaskValue for MacAddress {
    const ZERO: Self = MacAddress::ZERO;
    const FULL: Self = MacAddress::BROADCAST;
}

impl MaskValue for Ipv4Addr {
    const ZERO: Self = Ipv4Addr::UNSPECIFIED;
    const FULL: Self = Ipv4Addr::BROADCAST;
}

impl MaskValue for Ipv6Addr {
    const ZERO: Self = Ipv6Addr::UNSPECIFIED;
    const FULL: Self = Ipv6Addr::new(
        0xffff, 0xffff, 0xffff, 0xffff, 0xffff, 0xffff, 0xffff, 0xffff,
    );
}

impl MaskValue for PortVector {
    const ZERO: Self = PortVector::EMPTY;
    const FULL: Self = PortVector::ALL;
}

/// A value/mask pair. A mask bit of 1 means the bit must compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Masked<T> {
    pub value: T,
    pub mask: T,
}

impl<T: MaskValue> Masked<T> {
    pub const fn new(value: T, mask: T) -> Self {
        Self { value, mask }
    }

    /// Matches anything.
    pub const fn any() -> Self {
        Self {
            value: T::ZERO,
            mask: T::ZERO,
        }
    }

    /// Matches `value` in every bit of the type.
    ///
    /// Narrow fields (4-bit IHL, 12-bit VLAN id, ...) need an explicit
    /// mask through [`Masked::new`]; a full-width mask does not fit them.
    pub const fn exact(value: T) -> Self {
        Self {
            value,
            mask: T::FULL,
        }
    }

    /// Returns true if no bit is compared.
    pub fn is_wildcard(&self) -> bool {
        self.mask == T::ZERO
    }
}

impl<T: MaskValue> Default for Masked<T> {
    fn default() -> Self {
        Self::any()
    }
}
