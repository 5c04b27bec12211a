//! Logical classification rules.
//!
//! A [`Rule`] is what callers program: key header matches, an Ethernet
//! prefix, one protocol header stack and an action. The compiler turns it
//! into one or two [`crate::entry::CompiledEntry`] images.

use std::net::{Ipv4Addr, Ipv6Addr};

use crate::entry::{KeyMatch, RuleAction};
use crate::types::{MacAddress, Masked, ProtocolShape};

/// Ethernet and VLAN tag prefix, window bytes 0..=15.
///
/// The EtherType is implied by the rule's shape and not matched here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EthernetMatch {
    pub destination: Masked<MacAddress>,
    pub source: Masked<MacAddress>,
    /// TPID and TCI of the 802.1Q tag.
    pub vlan_tag: Masked<u32>,
}

/// IPv4 header fields. The protocol byte is implied by the shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Ipv4Match {
    /// 4 bits.
    pub version: Masked<u8>,
    /// 4 bits.
    pub ihl: Masked<u8>,
    pub tos: Masked<u8>,
    pub total_length: Masked<u16>,
    pub identification: Masked<u16>,
    /// 3 bits.
    pub flags: Masked<u8>,
    /// 13 bits.
    pub fragment_offset: Masked<u16>,
    pub ttl: Masked<u8>,
    pub checksum: Masked<u16>,
    pub source: Masked<Ipv4Addr>,
    pub destination: Masked<Ipv4Addr>,
}

/// IPv6 header fields. The next-header byte is implied by the shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Ipv6Match {
    /// 4 bits.
    pub version: Masked<u8>,
    pub traffic_class: Masked<u8>,
    /// 20 bits.
    pub flow_label: Masked<u32>,
    pub payload_length: Masked<u16>,
    pub hop_limit: Masked<u8>,
    pub source: Masked<Ipv6Addr>,
    pub destination: Masked<Ipv6Addr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TcpMatch {
    pub source_port: Masked<u16>,
    pub destination_port: Masked<u16>,
    pub sequence: Masked<u32>,
    pub acknowledgment: Masked<u32>,
    /// 4 bits.
    pub data_offset: Masked<u8>,
    /// Reserved bits and control flags, 12 bits.
    pub flags: Masked<u16>,
    pub window: Masked<u16>,
    pub checksum: Masked<u16>,
    pub urgent_pointer: Masked<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UdpMatch {
    pub source_port: Masked<u16>,
    pub destination_port: Masked<u16>,
    pub length: Masked<u16>,
    pub checksum: Masked<u16>,
}

/// The L3/L4 header stack of a rule; the variant is the protocol shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolHeaders {
    Ipv4Tcp(Ipv4Match, TcpMatch),
    Ipv4Udp(Ipv4Match, UdpMatch),
    Ipv6Tcp(Ipv6Match, TcpMatch),
    Ipv6Udp(Ipv6Match, UdpMatch),
}

impl ProtocolHeaders {
    pub fn shape(&self) -> ProtocolShape {
        match self {
            Self::Ipv4Tcp(..) => ProtocolShape::Ipv4Tcp,
            Self::Ipv4Udp(..) => ProtocolShape::Ipv4Udp,
            Self::Ipv6Tcp(..) => ProtocolShape::Ipv6Tcp,
            Self::Ipv6Udp(..) => ProtocolShape::Ipv6Udp,
        }
    }

    /// Headers of the given shape with every field wildcarded.
    pub fn wildcard(shape: ProtocolShape) -> Self {
        match shape {
            ProtocolShape::Ipv4Tcp => Self::Ipv4Tcp(Ipv4Match::default(), TcpMatch::default()),
            ProtocolShape::Ipv4Udp => Self::Ipv4Udp(Ipv4Match::default(), UdpMatch::default()),
            ProtocolShape::Ipv6Tcp => Self::Ipv6Tcp(Ipv6Match::default(), TcpMatch::default()),
            ProtocolShape::Ipv6Udp => Self::Ipv6Udp(Ipv6Match::default(), UdpMatch::default()),
        }
    }
}

/// A logical packet-matching rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub key: KeyMatch,
    pub ethernet: EthernetMatch,
    pub headers: ProtocolHeaders,
    pub action: RuleAction,
}

impl Rule {
    /// A rule of the given shape that matches every frame and does nothing.
    pub fn new(shape: ProtocolShape) -> Self {
        Self::with_headers(ProtocolHeaders::wildcard(shape))
    }

    pub fn with_headers(headers: ProtocolHeaders) -> Self {
        Self {
            key: KeyMatch::default(),
            ethernet: EthernetMatch::default(),
            headers,
            action: RuleAction::default(),
        }
    }

    pub fn shape(&self) -> ProtocolShape {
        self.headers.shape()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_shape_follows_headers() {
        for shape in [
            ProtocolShape::Ipv4Tcp,
            ProtocolShape::Ipv4Udp,
            ProtocolShape::Ipv6Tcp,
            ProtocolShape::Ipv6Udp,
        ] {
            assert_eq!(Rule::new(shape).shape(), shape);
        }
    }

    #[test]
    fn test_new_rule_is_wildcard() {
        let rule = Rule::new(ProtocolShape::Ipv4Udp);
        assert!(rule.ethernet.destination.is_wildcard());
        assert!(rule.key.spv.is_wildcard());
        assert_eq!(rule.action, RuleAction::default());
    }
}
