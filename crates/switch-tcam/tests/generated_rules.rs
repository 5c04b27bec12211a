//! Round trips over generated rules, with every field drawn from its full
//! bit width and biased towards the all-zero and all-ones boundaries.

#![cfg(feature = "sim")]

mod common;

use std::net::{Ipv4Addr, Ipv6Addr};

use proptest::prelude::*;
use switch_tcam::{
    compile, decode, DpvMode, EthernetMatch, Ipv4Match, Ipv6Match, KeyMatch, MacAddress, Masked,
    PortVector, ProtocolHeaders, Rule, RuleAction, TcpMatch, UdpMatch,
};

use common::ingress_orch;

/// Widths of the non-flag action fields, in `action()` order.
const ACTION_WIDTHS: [u32; 14] = [12, 3, 3, 2, 11, 2, 2, 6, 3, 6, 15, 2, 6, 8];

fn bits(width: u32) -> impl Strategy<Value = u32> {
    let max = if width == 32 {
        u32::MAX
    } else {
        (1 << width) - 1
    };
    prop_oneof![Just(0u32), Just(max), 0..=max]
}

/// A value/mask pair of `width` bits. Bits outside the mask are left zero,
/// which is how a match without them compiles.
fn masked(width: u32) -> impl Strategy<Value = (u32, u32)> {
    (bits(width), bits(width)).prop_map(|(value, mask)| (value & mask, mask))
}

fn m8(width: u32) -> impl Strategy<Value = Masked<u8>> {
    masked(width).prop_map(|(v, m)| Masked::new(v as u8, m as u8))
}

fn m16(width: u32) -> impl Strategy<Value = Masked<u16>> {
    masked(width).prop_map(|(v, m)| Masked::new(v as u16, m as u16))
}

fn m32() -> impl Strategy<Value = Masked<u32>> {
    masked(32).prop_map(|(v, m)| Masked::new(v, m))
}

fn mac() -> impl Strategy<Value = Masked<MacAddress>> {
    let mask = prop_oneof![Just([0u8; 6]), Just([0xffu8; 6]), any::<[u8; 6]>()];
    (any::<[u8; 6]>(), mask).prop_map(|(v, m)| {
        let value = std::array::from_fn(|i| v[i] & m[i]);
        Masked::new(MacAddress::new(value), MacAddress::new(m))
    })
}

fn ipv4_addr() -> impl Strategy<Value = Masked<Ipv4Addr>> {
    masked(32).prop_map(|(v, m)| Masked::new(Ipv4Addr::from(v), Ipv4Addr::from(m)))
}

fn ipv6_addr() -> impl Strategy<Value = Masked<Ipv6Addr>> {
    let prefix = (0u32..=128).prop_map(|len| u128::MAX.checked_shl(128 - len).unwrap_or(0));
    let mask = prop_oneof![Just(0u128), Just(u128::MAX), prefix, any::<u128>()];
    (any::<u128>(), mask).prop_map(|(v, m)| Masked::new(Ipv6Addr::from(v & m), Ipv6Addr::from(m)))
}

fn key() -> impl Strategy<Value = KeyMatch> {
    (m8(2), m8(1), masked(11), m8(3), m16(12)).prop_map(|(frame_type, time_key, spv, ppri, pvid)| {
        KeyMatch {
            frame_type,
            time_key,
            spv: Masked::new(
                PortVector::from_bits(spv.0 as u16),
                PortVector::from_bits(spv.1 as u16),
            ),
            ppri,
            pvid,
        }
    })
}

fn ethernet() -> impl Strategy<Value = EthernetMatch> {
    (mac(), mac(), m32()).prop_map(|(destination, source, vlan_tag)| EthernetMatch {
        destination,
        source,
        vlan_tag,
    })
}

fn ipv4() -> impl Strategy<Value = Ipv4Match> {
    (
        (m8(4), m8(4), m8(8), m16(16), m16(16), m8(3)),
        (m16(13), m8(8), m16(16), ipv4_addr(), ipv4_addr()),
    )
        .prop_map(
            |(
                (version, ihl, tos, total_length, identification, flags),
                (fragment_offset, ttl, checksum, source, destination),
            )| Ipv4Match {
                version,
                ihl,
                tos,
                total_length,
                identification,
                flags,
                fragment_offset,
                ttl,
                checksum,
                source,
                destination,
            },
        )
}

fn ipv6() -> impl Strategy<Value = Ipv6Match> {
    (
        m8(4),
        m8(8),
        masked(20),
        m16(16),
        m8(8),
        ipv6_addr(),
        ipv6_addr(),
    )
        .prop_map(
            |(version, traffic_class, flow, payload_length, hop_limit, source, destination)| {
                Ipv6Match {
                    version,
                    traffic_class,
                    flow_label: Masked::new(flow.0, flow.1),
                    payload_length,
                    hop_limit,
                    source,
                    destination,
                }
            },
        )
}

fn tcp() -> impl Strategy<Value = TcpMatch> {
    (
        m16(16),
        m16(16),
        m32(),
        m32(),
        m8(4),
        m16(12),
        m16(16),
        m16(16),
        m16(16),
    )
        .prop_map(
            |(
                source_port,
                destination_port,
                sequence,
                acknowledgment,
                data_offset,
                flags,
                window,
                checksum,
                urgent_pointer,
            )| TcpMatch {
                source_port,
                destination_port,
                sequence,
                acknowledgment,
                data_offset,
                flags,
                window,
                checksum,
                urgent_pointer,
            },
        )
}

fn udp() -> impl Strategy<Value = UdpMatch> {
    (m16(16), m16(16), m16(16), m16(16)).prop_map(
        |(source_port, destination_port, length, checksum)| UdpMatch {
            source_port,
            destination_port,
            length,
            checksum,
        },
    )
}

fn headers() -> impl Strategy<Value = ProtocolHeaders> {
    prop_oneof![
        (ipv4(), tcp()).prop_map(|(ip, l4)| ProtocolHeaders::Ipv4Tcp(ip, l4)),
        (ipv4(), udp()).prop_map(|(ip, l4)| ProtocolHeaders::Ipv4Udp(ip, l4)),
        (ipv6(), tcp()).prop_map(|(ip, l4)| ProtocolHeaders::Ipv6Tcp(ip, l4)),
        (ipv6(), udp()).prop_map(|(ip, l4)| ProtocolHeaders::Ipv6Udp(ip, l4)),
    ]
}

fn action() -> impl Strategy<Value = RuleAction> {
    let values: Vec<_> = ACTION_WIDTHS.iter().map(|w| bits(*w)).collect();
    (any::<[bool; 12]>(), values).prop_map(|(f, v)| RuleAction {
        interrupt: f[0],
        inc_tcam_counter: f[1],
        vid_override: f[2],
        vid: v[0] as u16,
        qpri_override: f[3],
        qpri: v[1] as u8,
        fpri_override: f[4],
        fpri: v[2] as u8,
        dpv_mode: DpvMode::from_bits(v[3] as u16),
        dpv: PortVector::from_bits(v[4] as u16),
        color_mode: v[5] as u8,
        vtu_page_override: f[5],
        vtu_page: f[6],
        unknown_filter: v[6] as u8,
        egress_action_pointer: v[7] as u8,
        ld_balance_override: f[7],
        ld_balance: v[8] as u8,
        dscp_override: f[8],
        dscp: v[9] as u8,
        frame_action_override: f[9],
        frame_action: v[10] as u16,
        tcam_counter: v[11] as u8,
        flow_meter_enable: f[10],
        flow_meter_id: v[12] as u8,
        stream_filter_enable: f[11],
        stream_filter_id: v[13] as u8,
    })
}

fn rule() -> impl Strategy<Value = Rule> {
    (key(), ethernet(), headers(), action()).prop_map(|(key, ethernet, headers, action)| Rule {
        key,
        ethernet,
        headers,
        action,
    })
}

proptest! {
    #[test]
    fn test_compile_decode_round_trip(rule in rule(), slot2 in 0u16..=255) {
        let compiled = compile(&rule, slot2).unwrap();
        let second = compiled.continuation.as_ref().map(|(_, e)| e);
        prop_assert_eq!(decode(&compiled.primary, second).unwrap(), rule);
        if let Some((slot, entry)) = compiled.continuation {
            prop_assert_eq!(slot, slot2);
            prop_assert_eq!(entry.key.pvid, Masked::new(slot2, 0xfff));
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_table_round_trip(rule in rule(), slot1 in 0u16..=255, slot2 in 0u16..=255) {
        prop_assume!(slot1 != slot2);
        let (orch, sim) = ingress_orch();
        let cascaded = orch.advanced_config(slot1, slot2, &rule).unwrap();
        prop_assert_eq!(sim.lock().unwrap().is_valid(slot2), cascaded);
        prop_assert_eq!(orch.read_rule(slot1).unwrap(), Some(rule));

        orch.remove_rule(slot1).unwrap();
        prop_assert!(!sim.lock().unwrap().is_valid(slot1));
        prop_assert!(!sim.lock().unwrap().is_valid(slot2));
    }
}
