//! Host-inbound protocols and system services.
//!
//! Each keyword stands for a fixed set of protocol/port tuples of traffic
//! addressed to the device. `all` matches everything.

use packet_model::{HeaderField, IpProtocol, MatchExpr, SubRange};

use crate::convert::applications::Expansion;

fn proto(protocol: IpProtocol) -> MatchExpr {
    MatchExpr::protocols(&[protocol])
}

fn dst_ports(protocol: IpProtocol, low: u32, high: u32) -> MatchExpr {
    MatchExpr::and(vec![
        proto(protocol),
        MatchExpr::field(HeaderField::DstPort, [SubRange::new(low, high)]),
    ])
}

fn icmp_type(icmp_type: u32) -> MatchExpr {
    MatchExpr::and(vec![
        proto(IpProtocol::ICMP),
        MatchExpr::field(HeaderField::IcmpType, [SubRange::singleton(icmp_type)]),
    ])
}

/// Tuples for a `host-inbound-traffic protocols` keyword.
pub fn protocol_entries(name: &str) -> Option<Vec<Expansion>> {
    let exprs = match name {
        "all" => vec![MatchExpr::True],
        "bfd" => vec![dst_ports(IpProtocol::UDP, 3784, 3785)],
        "bgp" => vec![
            dst_ports(IpProtocol::TCP, 179, 179),
            MatchExpr::and(vec![
                proto(IpProtocol::TCP),
                MatchExpr::field(HeaderField::SrcPort, [SubRange::singleton(179)]),
            ]),
        ],
        "igmp" => vec![proto(IpProtocol::IGMP)],
        "ldp" => vec![
            dst_ports(IpProtocol::TCP, 646, 646),
            dst_ports(IpProtocol::UDP, 646, 646),
        ],
        "ospf" | "ospf3" => vec![proto(IpProtocol::OSPF)],
        "pim" => vec![proto(IpProtocol::PIM)],
        "rip" => vec![dst_ports(IpProtocol::UDP, 520, 520)],
        "ripng" => vec![dst_ports(IpProtocol::UDP, 521, 521)],
        "rsvp" => vec![proto(IpProtocol::RSVP)],
        "vrrp" => vec![proto(IpProtocol::VRRP)],
        _ => return None,
    };
    Some(label_all(&format!("host-inbound protocol {name}"), exprs))
}

/// Tuples for a `host-inbound-traffic system-services` keyword.
pub fn service_entries(name: &str) -> Option<Vec<Expansion>> {
    let exprs = match name {
        "all" => vec![MatchExpr::True],
        "dhcp" => vec![dst_ports(IpProtocol::UDP, 67, 68)],
        "dns" => vec![
            dst_ports(IpProtocol::UDP, 53, 53),
            dst_ports(IpProtocol::TCP, 53, 53),
        ],
        "ftp" => vec![dst_ports(IpProtocol::TCP, 21, 21)],
        "http" => vec![dst_ports(IpProtocol::TCP, 80, 80)],
        "https" => vec![dst_ports(IpProtocol::TCP, 443, 443)],
        "ike" => vec![
            dst_ports(IpProtocol::UDP, 500, 500),
            dst_ports(IpProtocol::UDP, 4500, 4500),
        ],
        "netconf" => vec![dst_ports(IpProtocol::TCP, 830, 830)],
        "ntp" => vec![dst_ports(IpProtocol::UDP, 123, 123)],
        "ping" => vec![icmp_type(8)],
        "snmp" => vec![dst_ports(IpProtocol::UDP, 161, 161)],
        "snmp-trap" => vec![dst_ports(IpProtocol::UDP, 162, 162)],
        "ssh" => vec![dst_ports(IpProtocol::TCP, 22, 22)],
        "telnet" => vec![dst_ports(IpProtocol::TCP, 23, 23)],
        "tftp" => vec![dst_ports(IpProtocol::UDP, 69, 69)],
        "traceroute" => vec![dst_ports(IpProtocol::UDP, 33434, 33523), icmp_type(30)],
        _ => return None,
    };
    Some(label_all(&format!("host-inbound system-service {name}"), exprs))
}

fn label_all(label: &str, exprs: Vec<MatchExpr>) -> Vec<Expansion> {
    exprs
        .into_iter()
        .map(|expr| Expansion::new(label, expr))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::net::IpAddr;

    use packet_model::{EvalContext, Flow};

    use super::{protocol_entries, service_entries};

    fn ip(raw: &str) -> IpAddr {
        raw.parse().expect("ip")
    }

    #[test]
    fn dns_service_covers_udp_and_tcp() {
        let entries = service_entries("dns").expect("dns");
        assert_eq!(entries.len(), 2);
        let ctx = EvalContext::empty();
        let query = Flow::udp("ge-0/0/0.0", ip("10.0.0.9"), 5353, ip("10.0.0.1"), 53);
        assert!(entries[0].expr.matches(&query, &ctx));
        assert!(!entries[1].expr.matches(&query, &ctx));
    }

    #[test]
    fn unknown_keywords_do_not_resolve() {
        assert!(service_entries("xnm-clear-text").is_none());
        assert!(protocol_entries("isis").is_none());
        assert_eq!(protocol_entries("ospf").expect("ospf").len(), 1);
    }
}
