//! Protocol shape mappers.
//!
//! The two frame windows of a cascaded rule are treated as one 96-byte
//! stream: window 1 holds bytes 0..=47, window 2 bytes 48..=95. Every
//! mapper writes value and mask in lock-step at fixed offsets, big-endian.
//!
//! ```text
//!  0 DA | 6 SA | 12 VLAN tag | 16 EtherType | 18 IPv4 (20) | 38 TCP/UDP
//!                                           | 18 IPv6 (40) | 58 TCP/UDP
//! ```

use std::net::{Ipv4Addr, Ipv6Addr};

use switch_regs::BitField;

use crate::entry::FrameWindow;
use crate::error::{TcamError, TcamResult};
use crate::layout::WINDOW_BYTES;
use crate::rule::{EthernetMatch, Ipv4Match, Ipv6Match, ProtocolHeaders, TcpMatch, UdpMatch};
use crate::types::{MacAddress, Masked, ProtocolShape};

/// Bytes in the two-window stream.
pub const STREAM_BYTES: usize = 2 * WINDOW_BYTES;

const ETH_DESTINATION: usize = 0;
const ETH_SOURCE: usize = 6;
const ETH_VLAN_TAG: usize = 12;
const ETH_TYPE: usize = 16;
const L3: usize = 18;
/// L4 header offset behind a 20-byte IPv4 header.
pub const L4_OVER_IPV4: usize = L3 + 20;
/// L4 header offset behind a 40-byte IPv6 header.
pub const L4_OVER_IPV6: usize = L3 + 40;

// IPv4, relative to L3.
const V4_VER_IHL_TOS: usize = 0;
const V4_TOTAL_LENGTH: usize = 2;
const V4_IDENTIFICATION: usize = 4;
const V4_FLAGS_FRAGMENT: usize = 6;
const V4_TTL: usize = 8;
const V4_PROTOCOL: usize = 9;
const V4_CHECKSUM: usize = 10;
const V4_SOURCE: usize = 12;
const V4_DESTINATION: usize = 16;

const V4_VERSION: BitField = BitField::new(12, 4);
const V4_IHL: BitField = BitField::new(8, 4);
const V4_TOS: BitField = BitField::new(0, 8);
const V4_FLAGS: BitField = BitField::new(13, 3);
const V4_FRAGMENT: BitField = BitField::new(0, 13);

// IPv6, relative to L3.
const V6_VER_TC_FLOW: usize = 0;
const V6_FLOW_LOW: usize = 2;
const V6_PAYLOAD_LENGTH: usize = 4;
const V6_NEXT_HEADER: usize = 6;
const V6_HOP_LIMIT: usize = 7;
const V6_SOURCE: usize = 8;
const V6_DESTINATION: usize = 24;

const V6_VERSION: BitField = BitField::new(12, 4);
const V6_TRAFFIC_CLASS: BitField = BitField::new(4, 8);
const V6_FLOW_HIGH: BitField = BitField::new(0, 4);
const FLOW_LABEL_BITS: u32 = 20;

// TCP and UDP, relative to the L4 offset.
const L4_SOURCE_PORT: usize = 0;
const L4_DESTINATION_PORT: usize = 2;
const TCP_SEQUENCE: usize = 4;
const TCP_ACKNOWLEDGMENT: usize = 8;
const TCP_OFFSET_FLAGS: usize = 12;
const TCP_WINDOW: usize = 14;
const TCP_CHECKSUM: usize = 16;
const TCP_URGENT_POINTER: usize = 18;
const UDP_LENGTH: usize = 4;
const UDP_CHECKSUM: usize = 6;

const TCP_DATA_OFFSET: BitField = BitField::new(12, 4);
const TCP_FLAGS: BitField = BitField::new(0, 12);

/// Value/mask bytes of both frame windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameStream {
    pub value: [u8; STREAM_BYTES],
    pub mask: [u8; STREAM_BYTES],
}

impl Default for FrameStream {
    fn default() -> Self {
        Self {
            value: [0; STREAM_BYTES],
            mask: [0; STREAM_BYTES],
        }
    }
}

impl FrameStream {
    /// Joins two windows; a missing second window reads as all wildcard.
    pub fn from_windows(first: &FrameWindow, second: Option<&FrameWindow>) -> Self {
        let mut stream = Self::default();
        stream.value[..WINDOW_BYTES].copy_from_slice(&first.value);
        stream.mask[..WINDOW_BYTES].copy_from_slice(&first.mask);
        if let Some(second) = second {
            stream.value[WINDOW_BYTES..].copy_from_slice(&second.value);
            stream.mask[WINDOW_BYTES..].copy_from_slice(&second.mask);
        }
        stream
    }

    /// Splits the stream back into its two windows.
    pub fn windows(&self) -> (FrameWindow, FrameWindow) {
        let mut first = FrameWindow::default();
        let mut second = FrameWindow::default();
        first.value.copy_from_slice(&self.value[..WINDOW_BYTES]);
        first.mask.copy_from_slice(&self.mask[..WINDOW_BYTES]);
        second.value.copy_from_slice(&self.value[WINDOW_BYTES..]);
        second.mask.copy_from_slice(&self.mask[WINDOW_BYTES..]);
        (first, second)
    }

    fn put_bytes(&mut self, offset: usize, value: &[u8], mask: &[u8]) {
        self.value[offset..offset + value.len()].copy_from_slice(value);
        self.mask[offset..offset + mask.len()].copy_from_slice(mask);
    }

    fn bytes<const N: usize>(&self, offset: usize) -> ([u8; N], [u8; N]) {
        let mut value = [0u8; N];
        let mut mask = [0u8; N];
        value.copy_from_slice(&self.value[offset..offset + N]);
        mask.copy_from_slice(&self.mask[offset..offset + N]);
        (value, mask)
    }

    pub fn put_u8(&mut self, offset: usize, field: Masked<u8>) {
        self.value[offset] = field.value;
        self.mask[offset] = field.mask;
    }

    pub fn u8_at(&self, offset: usize) -> Masked<u8> {
        Masked::new(self.value[offset], self.mask[offset])
    }

    pub fn put_u16(&mut self, offset: usize, field: Masked<u16>) {
        self.put_bytes(offset, &field.value.to_be_bytes(), &field.mask.to_be_bytes());
    }

    pub fn u16_at(&self, offset: usize) -> Masked<u16> {
        let (value, mask) = self.bytes::<2>(offset);
        Masked::new(u16::from_be_bytes(value), u16::from_be_bytes(mask))
    }

    pub fn put_u32(&mut self, offset: usize, field: Masked<u32>) {
        self.put_bytes(offset, &field.value.to_be_bytes(), &field.mask.to_be_bytes());
    }

    pub fn u32_at(&self, offset: usize) -> Masked<u32> {
        let (value, mask) = self.bytes::<4>(offset);
        Masked::new(u32::from_be_bytes(value), u32::from_be_bytes(mask))
    }

    pub fn put_mac(&mut self, offset: usize, field: Masked<MacAddress>) {
        self.put_bytes(offset, &field.value.octets(), &field.mask.octets());
    }

    pub fn mac_at(&self, offset: usize) -> Masked<MacAddress> {
        let (value, mask) = self.bytes::<6>(offset);
        Masked::new(MacAddress::new(value), MacAddress::new(mask))
    }

    pub fn put_ipv4(&mut self, offset: usize, field: Masked<Ipv4Addr>) {
        self.put_bytes(offset, &field.value.octets(), &field.mask.octets());
    }

    pub fn ipv4_at(&self, offset: usize) -> Masked<Ipv4Addr> {
        let (value, mask) = self.bytes::<4>(offset);
        Masked::new(Ipv4Addr::from(value), Ipv4Addr::from(mask))
    }

    pub fn put_ipv6(&mut self, offset: usize, field: Masked<Ipv6Addr>) {
        self.put_bytes(offset, &field.value.octets(), &field.mask.octets());
    }

    pub fn ipv6_at(&self, offset: usize) -> Masked<Ipv6Addr> {
        let (value, mask) = self.bytes::<16>(offset);
        Masked::new(Ipv6Addr::from(value), Ipv6Addr::from(mask))
    }

    /// Packs sub-byte fields into one big-endian 16-bit word.
    fn put_word(&mut self, offset: usize, fields: &[(BitField, Masked<u16>)]) {
        let (value, mask) = fields.iter().fold((0u16, 0u16), |(v, m), (f, field)| {
            (f.set(v, field.value), f.set(m, field.mask))
        });
        self.put_u16(offset, Masked::new(value, mask));
    }

    fn word_field(&self, offset: usize, field: BitField) -> Masked<u16> {
        let word = self.u16_at(offset);
        Masked::new(field.get(word.value), field.get(word.mask))
    }
}

fn check_width(name: &str, field: Masked<u32>, bits: u32) -> TcamResult<()> {
    let limit = if bits >= 32 { u32::MAX } else { (1u32 << bits) - 1 };
    if field.value > limit || field.mask > limit {
        return Err(TcamError::invalid_argument(format!(
            "{} value/mask 0x{:x}/0x{:x} exceeds its {}-bit field",
            name, field.value, field.mask, bits
        )));
    }
    Ok(())
}

fn check_field(name: &str, field: Masked<u16>, bits: BitField) -> TcamResult<()> {
    check_width(
        name,
        Masked::new(field.value as u32, field.mask as u32),
        bits.width as u32,
    )
}

fn widen(field: Masked<u8>) -> Masked<u16> {
    Masked::new(field.value as u16, field.mask as u16)
}

fn narrow(field: Masked<u16>) -> Masked<u8> {
    Masked::new(field.value as u8, field.mask as u8)
}

/// Writes the Ethernet prefix and the EtherType the shape implies.
pub fn encode_ethernet(stream: &mut FrameStream, eth: &EthernetMatch, shape: ProtocolShape) {
    stream.put_mac(ETH_DESTINATION, eth.destination);
    stream.put_mac(ETH_SOURCE, eth.source);
    stream.put_u32(ETH_VLAN_TAG, eth.vlan_tag);
    stream.put_u16(ETH_TYPE, Masked::exact(shape.ether_type()));
}

pub fn decode_ethernet(stream: &FrameStream) -> EthernetMatch {
    EthernetMatch {
        destination: stream.mac_at(ETH_DESTINATION),
        source: stream.mac_at(ETH_SOURCE),
        vlan_tag: stream.u32_at(ETH_VLAN_TAG),
    }
}

/// Writes the L3 and L4 headers at their shape-specific offsets.
pub fn encode_headers(stream: &mut FrameStream, headers: &ProtocolHeaders) -> TcamResult<()> {
    let shape = headers.shape();
    match headers {
        ProtocolHeaders::Ipv4Tcp(ip, tcp) => {
            encode_ipv4(stream, ip, shape)?;
            encode_tcp(stream, L4_OVER_IPV4, tcp)
        }
        ProtocolHeaders::Ipv4Udp(ip, udp) => {
            encode_ipv4(stream, ip, shape)?;
            encode_udp(stream, L4_OVER_IPV4, udp);
            Ok(())
        }
        ProtocolHeaders::Ipv6Tcp(ip, tcp) => {
            encode_ipv6(stream, ip, shape)?;
            encode_tcp(stream, L4_OVER_IPV6, tcp)
        }
        ProtocolHeaders::Ipv6Udp(ip, udp) => {
            encode_ipv6(stream, ip, shape)?;
            encode_udp(stream, L4_OVER_IPV6, udp);
            Ok(())
        }
    }
}

/// Identifies the shape from the EtherType and protocol bytes the compiler
/// wrote.
pub fn decode_shape(stream: &FrameStream) -> TcamResult<ProtocolShape> {
    let ether_type = stream.u16_at(ETH_TYPE).value;
    let protocol = match ether_type {
        0x0800 => stream.value[L3 + V4_PROTOCOL],
        0x86dd => stream.value[L3 + V6_NEXT_HEADER],
        _ => 0,
    };
    ProtocolShape::from_wire(ether_type, protocol).ok_or_else(|| {
        TcamError::invalid_argument(format!(
            "entry matches no supported protocol shape (ethertype 0x{:04x}, protocol {})",
            ether_type, protocol
        ))
    })
}

pub fn decode_headers(stream: &FrameStream, shape: ProtocolShape) -> ProtocolHeaders {
    match shape {
        ProtocolShape::Ipv4Tcp => {
            ProtocolHeaders::Ipv4Tcp(decode_ipv4(stream), decode_tcp(stream, L4_OVER_IPV4))
        }
        ProtocolShape::Ipv4Udp => {
            ProtocolHeaders::Ipv4Udp(decode_ipv4(stream), decode_udp(stream, L4_OVER_IPV4))
        }
        ProtocolShape::Ipv6Tcp => {
            ProtocolHeaders::Ipv6Tcp(decode_ipv6(stream), decode_tcp(stream, L4_OVER_IPV6))
        }
        ProtocolShape::Ipv6Udp => {
            ProtocolHeaders::Ipv6Udp(decode_ipv6(stream), decode_udp(stream, L4_OVER_IPV6))
        }
    }
}

fn encode_ipv4(stream: &mut FrameStream, ip: &Ipv4Match, shape: ProtocolShape) -> TcamResult<()> {
    check_field("IPv4 version", widen(ip.version), V4_VERSION)?;
    check_field("IPv4 IHL", widen(ip.ihl), V4_IHL)?;
    check_field("IPv4 flags", widen(ip.flags), V4_FLAGS)?;
    check_field("IPv4 fragment offset", ip.fragment_offset, V4_FRAGMENT)?;

    stream.put_word(
        L3 + V4_VER_IHL_TOS,
        &[
            (V4_VERSION, widen(ip.version)),
            (V4_IHL, widen(ip.ihl)),
            (V4_TOS, widen(ip.tos)),
        ],
    );
    stream.put_u16(L3 + V4_TOTAL_LENGTH, ip.total_length);
    stream.put_u16(L3 + V4_IDENTIFICATION, ip.identification);
    stream.put_word(
        L3 + V4_FLAGS_FRAGMENT,
        &[(V4_FLAGS, widen(ip.flags)), (V4_FRAGMENT, ip.fragment_offset)],
    );
    stream.put_u8(L3 + V4_TTL, ip.ttl);
    stream.put_u8(L3 + V4_PROTOCOL, Masked::exact(shape.ip_protocol()));
    stream.put_u16(L3 + V4_CHECKSUM, ip.checksum);
    stream.put_ipv4(L3 + V4_SOURCE, ip.source);
    stream.put_ipv4(L3 + V4_DESTINATION, ip.destination);
    Ok(())
}

fn decode_ipv4(stream: &FrameStream) -> Ipv4Match {
    Ipv4Match {
        version: narrow(stream.word_field(L3 + V4_VER_IHL_TOS, V4_VERSION)),
        ihl: narrow(stream.word_field(L3 + V4_VER_IHL_TOS, V4_IHL)),
        tos: narrow(stream.word_field(L3 + V4_VER_IHL_TOS, V4_TOS)),
        total_length: stream.u16_at(L3 + V4_TOTAL_LENGTH),
        identification: stream.u16_at(L3 + V4_IDENTIFICATION),
        flags: narrow(stream.word_field(L3 + V4_FLAGS_FRAGMENT, V4_FLAGS)),
        fragment_offset: stream.word_field(L3 + V4_FLAGS_FRAGMENT, V4_FRAGMENT),
        ttl: stream.u8_at(L3 + V4_TTL),
        checksum: stream.u16_at(L3 + V4_CHECKSUM),
        source: stream.ipv4_at(L3 + V4_SOURCE),
        destination: stream.ipv4_at(L3 + V4_DESTINATION),
    }
}

fn encode_ipv6(stream: &mut FrameStream, ip: &Ipv6Match, shape: ProtocolShape) -> TcamResult<()> {
    check_field("IPv6 version", widen(ip.version), V6_VERSION)?;
    check_width("IPv6 flow label", ip.flow_label, FLOW_LABEL_BITS)?;

    let flow_high = Masked::new(
        (ip.flow_label.value >> 16) as u16,
        (ip.flow_label.mask >> 16) as u16,
    );
    stream.put_word(
        L3 + V6_VER_TC_FLOW,
        &[
            (V6_VERSION, widen(ip.version)),
            (V6_TRAFFIC_CLASS, widen(ip.traffic_class)),
            (V6_FLOW_HIGH, flow_high),
        ],
    );
    stream.put_u16(
        L3 + V6_FLOW_LOW,
        Masked::new(ip.flow_label.value as u16, ip.flow_label.mask as u16),
    );
    stream.put_u16(L3 + V6_PAYLOAD_LENGTH, ip.payload_length);
    stream.put_u8(L3 + V6_NEXT_HEADER, Masked::exact(shape.ip_protocol()));
    stream.put_u8(L3 + V6_HOP_LIMIT, ip.hop_limit);
    stream.put_ipv6(L3 + V6_SOURCE, ip.source);
    stream.put_ipv6(L3 + V6_DESTINATION, ip.destination);
    Ok(())
}

fn decode_ipv6(stream: &FrameStream) -> Ipv6Match {
    let flow_high = stream.word_field(L3 + V6_VER_TC_FLOW, V6_FLOW_HIGH);
    let flow_low = stream.u16_at(L3 + V6_FLOW_LOW);
    Ipv6Match {
        version: narrow(stream.word_field(L3 + V6_VER_TC_FLOW, V6_VERSION)),
        traffic_class: narrow(stream.word_field(L3 + V6_VER_TC_FLOW, V6_TRAFFIC_CLASS)),
        flow_label: Masked::new(
            ((flow_high.value as u32) << 16) | flow_low.value as u32,
            ((flow_high.mask as u32) << 16) | flow_low.mask as u32,
        ),
        payload_length: stream.u16_at(L3 + V6_PAYLOAD_LENGTH),
        hop_limit: stream.u8_at(L3 + V6_HOP_LIMIT),
        source: stream.ipv6_at(L3 + V6_SOURCE),
        destination: stream.ipv6_at(L3 + V6_DESTINATION),
    }
}

fn encode_tcp(stream: &mut FrameStream, l4: usize, tcp: &TcpMatch) -> TcamResult<()> {
    check_field("TCP data offset", widen(tcp.data_offset), TCP_DATA_OFFSET)?;
    check_field("TCP flags", tcp.flags, TCP_FLAGS)?;

    stream.put_u16(l4 + L4_SOURCE_PORT, tcp.source_port);
    stream.put_u16(l4 + L4_DESTINATION_PORT, tcp.destination_port);
    stream.put_u32(l4 + TCP_SEQUENCE, tcp.sequence);
    stream.put_u32(l4 + TCP_ACKNOWLEDGMENT, tcp.acknowledgment);
    stream.put_word(
        l4 + TCP_OFFSET_FLAGS,
        &[
            (TCP_DATA_OFFSET, widen(tcp.data_offset)),
            (TCP_FLAGS, tcp.flags),
        ],
    );
    stream.put_u16(l4 + TCP_WINDOW, tcp.window);
    stream.put_u16(l4 + TCP_CHECKSUM, tcp.checksum);
    stream.put_u16(l4 + TCP_URGENT_POINTER, tcp.urgent_pointer);
    Ok(())
}

fn decode_tcp(stream: &FrameStream, l4: usize) -> TcpMatch {
    TcpMatch {
        source_port: stream.u16_at(l4 + L4_SOURCE_PORT),
        destination_port: stream.u16_at(l4 + L4_DESTINATION_PORT),
        sequence: stream.u32_at(l4 + TCP_SEQUENCE),
        acknowledgment: stream.u32_at(l4 + TCP_ACKNOWLEDGMENT),
        data_offset: narrow(stream.word_field(l4 + TCP_OFFSET_FLAGS, TCP_DATA_OFFSET)),
        flags: stream.word_field(l4 + TCP_OFFSET_FLAGS, TCP_FLAGS),
        window: stream.u16_at(l4 + TCP_WINDOW),
        checksum: stream.u16_at(l4 + TCP_CHECKSUM),
        urgent_pointer: stream.u16_at(l4 + TCP_URGENT_POINTER),
    }
}

fn encode_udp(stream: &mut FrameStream, l4: usize, udp: &UdpMatch) {
    stream.put_u16(l4 + L4_SOURCE_PORT, udp.source_port);
    stream.put_u16(l4 + L4_DESTINATION_PORT, udp.destination_port);
    stream.put_u16(l4 + UDP_LENGTH, udp.length);
    stream.put_u16(l4 + UDP_CHECKSUM, udp.checksum);
}

fn decode_udp(stream: &FrameStream, l4: usize) -> UdpMatch {
    UdpMatch {
        source_port: stream.u16_at(l4 + L4_SOURCE_PORT),
        destination_port: stream.u16_at(l4 + L4_DESTINATION_PORT),
        length: stream.u16_at(l4 + UDP_LENGTH),
        checksum: stream.u16_at(l4 + UDP_CHECKSUM),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn encode(headers: &ProtocolHeaders) -> FrameStream {
        let mut stream = FrameStream::default();
        encode_ethernet(&mut stream, &EthernetMatch::default(), headers.shape());
        encode_headers(&mut stream, headers).unwrap();
        stream
    }

    #[test]
    fn test_ethertype_and_protocol_are_implied() {
        let stream = encode(&ProtocolHeaders::wildcard(ProtocolShape::Ipv4Udp));
        assert_eq!(&stream.value[16..18], &[0x08, 0x00]);
        assert_eq!(&stream.mask[16..18], &[0xff, 0xff]);
        assert_eq!(stream.value[27], 17);
        assert_eq!(stream.mask[27], 0xff);
        assert_eq!(decode_shape(&stream).unwrap(), ProtocolShape::Ipv4Udp);

        let stream = encode(&ProtocolHeaders::wildcard(ProtocolShape::Ipv6Tcp));
        assert_eq!(&stream.value[16..18], &[0x86, 0xdd]);
        assert_eq!(stream.value[24], 6);
        assert_eq!(decode_shape(&stream).unwrap(), ProtocolShape::Ipv6Tcp);
    }

    #[test]
    fn test_ipv4_offsets() {
        let ip = Ipv4Match {
            version: Masked::new(4, 0xf),
            ihl: Masked::new(5, 0xf),
            flags: Masked::new(0b010, 0b111),
            fragment_offset: Masked::new(0x1abc, 0x1fff),
            source: Masked::exact(Ipv4Addr::new(192, 168, 1, 1)),
            destination: Masked::exact(Ipv4Addr::new(10, 0, 0, 1)),
            ..Ipv4Match::default()
        };
        let stream = encode(&ProtocolHeaders::Ipv4Udp(ip, UdpMatch::default()));
        assert_eq!(stream.value[18], 0x45);
        assert_eq!(stream.mask[18], 0xff);
        assert_eq!(&stream.value[24..26], &[0x5a, 0xbc]);
        assert_eq!(&stream.value[30..34], &[192, 168, 1, 1]);
        assert_eq!(&stream.value[34..38], &[10, 0, 0, 1]);
        assert_eq!(&stream.mask[34..38], &[0xff; 4]);
        assert_eq!(decode_ipv4(&stream), ip);
    }

    #[test]
    fn test_ipv6_destination_straddles_windows() {
        let dst: Ipv6Addr = "2001:db8::1".parse().unwrap();
        let ip = Ipv6Match {
            flow_label: Masked::new(0xabcde, 0xfffff),
            destination: Masked::exact(dst),
            ..Ipv6Match::default()
        };
        let stream = encode(&ProtocolHeaders::Ipv6Udp(ip, UdpMatch::default()));
        assert_eq!(&stream.value[42..58], &dst.octets());
        assert_eq!(stream.value[19] & 0x0f, 0x0a);
        assert_eq!(&stream.value[20..22], &[0xbc, 0xde]);

        let (first, second) = stream.windows();
        assert_eq!(&first.value[42..48], &dst.octets()[..6]);
        assert_eq!(&second.value[..10], &dst.octets()[6..]);
        assert_eq!(decode_ipv6(&stream), ip);
    }

    #[test]
    fn test_tcp_over_ipv4_spills_into_window_two() {
        let tcp = TcpMatch {
            destination_port: Masked::exact(443),
            acknowledgment: Masked::exact(0x01020304),
            urgent_pointer: Masked::exact(0x0506),
            ..TcpMatch::default()
        };
        let stream = encode(&ProtocolHeaders::Ipv4Tcp(Ipv4Match::default(), tcp));
        assert_eq!(&stream.value[40..42], &443u16.to_be_bytes());
        let (first, second) = stream.windows();
        assert_eq!(&first.value[46..48], &[0x01, 0x02]);
        assert_eq!(&second.value[0..2], &[0x03, 0x04]);
        assert_eq!(&second.value[8..10], &[0x05, 0x06]);
        assert_eq!(&second.mask[8..10], &[0xff, 0xff]);
    }

    #[test]
    fn test_l4_over_ipv6_starts_at_window_two_offset_ten() {
        let udp = UdpMatch {
            source_port: Masked::exact(53),
            ..UdpMatch::default()
        };
        let stream = encode(&ProtocolHeaders::Ipv6Udp(Ipv6Match::default(), udp));
        let (_, second) = stream.windows();
        assert_eq!(&second.value[10..12], &53u16.to_be_bytes());
        assert_eq!(decode_udp(&stream, L4_OVER_IPV6), udp);
    }

    #[test]
    fn test_rejects_wide_subfields() {
        let mut stream = FrameStream::default();
        let ip = Ipv4Match {
            ihl: Masked::new(0x10, 0),
            ..Ipv4Match::default()
        };
        let headers = ProtocolHeaders::Ipv4Udp(ip, UdpMatch::default());
        assert!(encode_headers(&mut stream, &headers).is_err());

        let ip = Ipv6Match {
            flow_label: Masked::new(0, 0x100000),
            ..Ipv6Match::default()
        };
        let headers = ProtocolHeaders::Ipv6Udp(ip, UdpMatch::default());
        assert!(encode_headers(&mut stream, &headers).is_err());

        let tcp = TcpMatch {
            flags: Masked::new(0x1000, 0),
            ..TcpMatch::default()
        };
        let headers = ProtocolHeaders::Ipv4Tcp(Ipv4Match::default(), tcp);
        assert!(encode_headers(&mut stream, &headers).is_err());
    }

    #[test]
    fn test_unknown_shape_rejected() {
        let mut stream = FrameStream::default();
        stream.put_u16(ETH_TYPE, Masked::exact(0x0806));
        assert!(decode_shape(&stream).is_err());
        stream.put_u16(ETH_TYPE, Masked::exact(0x0800));
        stream.put_u8(L3 + V4_PROTOCOL, Masked::exact(1));
        assert!(decode_shape(&stream).is_err());
    }
}
