//! Shared fixtures for the TCAM integration tests.

#![allow(dead_code)]

use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::{Arc, Mutex};

use switch_tcam::{
    DpvMode, EthernetMatch, FrameType, Ipv4Match, Ipv6Match, KeyMatch, MacAddress, Masked,
    PortVector, ProtocolHeaders, Rule, RuleAction, TableGeometry, TcamConfig, TcamOrch,
    TcamSimulator, TcpMatch, UdpMatch,
};

pub type SharedSim = Arc<Mutex<TcamSimulator>>;

/// Installs a test-writer subscriber once; `RUST_LOG` selects the level.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_test_writer())
        .try_init();
}

pub fn shared_sim(geometry: &TableGeometry) -> SharedSim {
    Arc::new(Mutex::new(TcamSimulator::new(geometry)))
}

/// An ingress orch plus a handle on the simulator behind it.
pub fn ingress_orch() -> (TcamOrch<SharedSim>, SharedSim) {
    init_tracing();
    let config = TcamConfig::default();
    let sim = shared_sim(&config.ingress);
    let orch = TcamOrch::ingress(sim.clone(), config).unwrap();
    (orch, sim)
}

pub fn egress_orch() -> (TcamOrch<SharedSim>, SharedSim) {
    init_tracing();
    let config = TcamConfig::default();
    let sim = shared_sim(&config.egress);
    let orch = TcamOrch::egress(sim.clone(), config).unwrap();
    (orch, sim)
}

pub fn key() -> KeyMatch {
    KeyMatch {
        frame_type: Masked::new(FrameType::Normal.bits(), 0x3),
        time_key: Masked::new(0, 1),
        spv: Masked::new(PortVector::EMPTY, PortVector::ALL.without(1).without(4)),
        ppri: Masked::new(5, 0x7),
        pvid: Masked::new(100, 0xfff),
    }
}

pub fn ethernet() -> EthernetMatch {
    EthernetMatch {
        destination: Masked::exact(MacAddress::new([0x00, 0x11, 0x22, 0x33, 0x44, 0x55])),
        source: Masked::new(
            MacAddress::new([0x02, 0x00, 0x00, 0x00, 0x00, 0x00]),
            MacAddress::new([0xff, 0xff, 0xff, 0x00, 0x00, 0x00]),
        ),
        vlan_tag: Masked::new(0x8100_0064, 0xffff_0fff),
    }
}

pub fn action() -> RuleAction {
    RuleAction {
        interrupt: true,
        inc_tcam_counter: true,
        qpri_override: true,
        qpri: 6,
        fpri_override: true,
        fpri: 2,
        dpv_mode: DpvMode::Replace,
        dpv: PortVector::single(2),
        dscp_override: true,
        dscp: 46,
        tcam_counter: 1,
        flow_meter_enable: true,
        flow_meter_id: 12,
        stream_filter_enable: true,
        stream_filter_id: 200,
        ..RuleAction::default()
    }
}

pub fn ipv4() -> Ipv4Match {
    Ipv4Match {
        version: Masked::new(4, 0xf),
        ihl: Masked::new(5, 0xf),
        tos: Masked::new(0xb8, 0xfc),
        total_length: Masked::new(0x0400, 0xfc00),
        flags: Masked::new(0b010, 0b010),
        fragment_offset: Masked::new(0, 0x1fff),
        ttl: Masked::new(64, 0xff),
        source: Masked::new(Ipv4Addr::new(192, 168, 0, 0), Ipv4Addr::new(255, 255, 0, 0)),
        destination: Masked::exact(Ipv4Addr::new(10, 0, 0, 1)),
        ..Ipv4Match::default()
    }
}

pub fn ipv6() -> Ipv6Match {
    Ipv6Match {
        version: Masked::new(6, 0xf),
        traffic_class: Masked::new(0x20, 0xff),
        flow_label: Masked::new(0x12345, 0xfffff),
        payload_length: Masked::new(0, 0),
        hop_limit: Masked::new(255, 0xff),
        source: Masked::new(
            "fe80::".parse::<Ipv6Addr>().unwrap(),
            "ffff:ffff::".parse::<Ipv6Addr>().unwrap(),
        ),
        destination: Masked::exact("2001:db8::443".parse::<Ipv6Addr>().unwrap()),
    }
}

pub fn tcp() -> TcpMatch {
    TcpMatch {
        source_port: Masked::new(0x0400, 0xfc00),
        destination_port: Masked::exact(443),
        sequence: Masked::exact(0xdead_beef),
        acknowledgment: Masked::new(0x0102_0304, 0xffff_ff00),
        data_offset: Masked::new(5, 0xf),
        flags: Masked::new(0x002, 0x012),
        window: Masked::new(0xffff, 0xff00),
        checksum: Masked::any(),
        urgent_pointer: Masked::exact(7),
    }
}

pub fn udp() -> UdpMatch {
    UdpMatch {
        source_port: Masked::any(),
        destination_port: Masked::exact(4789),
        length: Masked::new(0x0100, 0xff00),
        checksum: Masked::any(),
    }
}

/// A rule of each shape with most fields matched.
pub fn full_rules() -> Vec<Rule> {
    [
        ProtocolHeaders::Ipv4Tcp(ipv4(), tcp()),
        ProtocolHeaders::Ipv4Udp(ipv4(), udp()),
        ProtocolHeaders::Ipv6Tcp(ipv6(), tcp()),
        ProtocolHeaders::Ipv6Udp(ipv6(), udp()),
    ]
    .into_iter()
    .map(|headers| Rule {
        key: key(),
        ethernet: ethernet(),
        headers,
        action: action(),
    })
    .collect()
}
