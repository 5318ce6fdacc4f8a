use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// IP protocol number carried in the IPv4 protocol / IPv6 next-header field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IpProtocol(pub u8);

const NAMED: &[(&str, u8)] = &[
    ("icmp", 1),
    ("igmp", 2),
    ("ipip", 4),
    ("tcp", 6),
    ("egp", 8),
    ("udp", 17),
    ("rsvp", 46),
    ("gre", 47),
    ("esp", 50),
    ("ah", 51),
    ("icmp6", 58),
    ("icmpv6", 58),
    ("ospf", 89),
    ("pim", 103),
    ("vrrp", 112),
    ("l2tp", 115),
    ("sctp", 132),
];

impl IpProtocol {
    pub const ICMP: Self = Self(1);
    pub const IGMP: Self = Self(2);
    pub const TCP: Self = Self(6);
    pub const UDP: Self = Self(17);
    pub const RSVP: Self = Self(46);
    pub const GRE: Self = Self(47);
    pub const ESP: Self = Self(50);
    pub const AH: Self = Self(51);
    pub const ICMP6: Self = Self(58);
    pub const OSPF: Self = Self(89);
    pub const PIM: Self = Self(103);
    pub const VRRP: Self = Self(112);
    pub const SCTP: Self = Self(132);

    /// Protocols whose headers carry source and destination ports.
    pub const PORT_PROTOCOLS: [Self; 3] = [Self::TCP, Self::UDP, Self::SCTP];

    /// Resolve a protocol keyword or a decimal protocol number.
    pub fn from_name(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Ok(number) = raw.parse::<u8>() {
            return Some(Self(number));
        }
        NAMED
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(raw))
            .map(|(_, number)| Self(*number))
    }

    pub fn number(self) -> u8 {
        self.0
    }
}

impl Display for IpProtocol {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match NAMED.iter().find(|(_, number)| *number == self.0) {
            Some((name, _)) => write!(f, "{name}"),
            None => write!(f, "{}", self.0),
        }
    }
}
