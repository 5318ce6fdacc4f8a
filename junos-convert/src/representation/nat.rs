use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::net::IpAddr;

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Nat {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<NatBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<NatBlock>,
    #[serde(rename = "static", skip_serializing_if = "Option::is_none")]
    pub static_nat: Option<NatBlock>,
}

/// One of the `source`, `destination` or `static` NAT stanzas.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NatBlock {
    pub pools: BTreeMap<String, NatPool>,
    pub rule_sets: Vec<NatRuleSet>,
    /// Overrides the default PAT port range for this block.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pat_port_range: Option<PortRange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NatPool {
    pub from_address: IpAddr,
    /// Defaults to `from_address` for single-address pools.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_address: Option<IpAddr>,
    /// Destination-NAT port rewrite.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_address_translation: Option<PortAddressTranslation>,
}

impl NatPool {
    pub fn high(&self) -> IpAddr {
        self.to_address.unwrap_or(self.from_address)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum PortAddressTranslation {
    NoTranslation,
    Range { start: u16, end: u16 },
}

/// Where traffic enters or leaves: an interface unit, a zone or a routing
/// instance. Variant order is specificity order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "kebab-case")]
pub enum NatPacketLocation {
    Interface(String),
    Zone(String),
    RoutingInstance(String),
}

impl NatPacketLocation {
    /// Lower is more specific.
    pub fn specificity(&self) -> u8 {
        match self {
            Self::Interface(_) => 0,
            Self::Zone(_) => 1,
            Self::RoutingInstance(_) => 2,
        }
    }
}

impl Display for NatPacketLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interface(name) => write!(f, "interface {name}"),
            Self::Zone(name) => write!(f, "zone {name}"),
            Self::RoutingInstance(name) => write!(f, "routing-instance {name}"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NatRuleSet {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<NatPacketLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<NatPacketLocation>,
    pub rules: Vec<NatRule>,
}

impl NatRuleSet {
    /// Order by to-location specificity, then from-location specificity,
    /// then name. An absent location sorts after every present one.
    pub fn cmp_specificity(&self, other: &Self) -> Ordering {
        rank(self.to.as_ref())
            .cmp(&rank(other.to.as_ref()))
            .then_with(|| rank(self.from.as_ref()).cmp(&rank(other.from.as_ref())))
            .then_with(|| self.name.cmp(&other.name))
    }
}

fn rank(location: Option<&NatPacketLocation>) -> u8 {
    location.map_or(u8::MAX, NatPacketLocation::specificity)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NatRule {
    pub name: String,
    pub matches: Vec<NatRuleMatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub then: Option<NatRuleThen>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum NatRuleMatch {
    SourceAddress {
        prefix: IpNetwork,
    },
    DestinationAddress {
        prefix: IpNetwork,
    },
    /// Address-book entry name.
    SourceAddressName {
        name: String,
    },
    DestinationAddressName {
        name: String,
    },
    SourcePort {
        low: u16,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        high: Option<u16>,
    },
    DestinationPort {
        low: u16,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        high: Option<u16>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum NatRuleThen {
    Pool { name: String },
    /// Translate to the egress interface address.
    Interface,
    Prefix { prefix: IpNetwork },
    /// Address-book entry that must be a single prefix.
    PrefixName { name: String },
    Off,
}

impl NatRuleThen {
    pub fn describe(&self) -> String {
        match self {
            Self::Pool { name } => format!("pool {name}"),
            Self::Interface => "interface".to_string(),
            Self::Prefix { prefix } => format!("prefix {prefix}"),
            Self::PrefixName { name } => format!("prefix-name {name}"),
            Self::Off => "off".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{NatPacketLocation, NatRuleSet};

    fn rule_set(name: &str, to: NatPacketLocation) -> NatRuleSet {
        NatRuleSet {
            name: name.to_string(),
            to: Some(to),
            ..NatRuleSet::default()
        }
    }

    #[test]
    fn sorts_most_specific_first() {
        let mut sets = vec![
            rule_set("ri", NatPacketLocation::RoutingInstance("default".into())),
            rule_set("zone", NatPacketLocation::Zone("untrust".into())),
            rule_set("iface", NatPacketLocation::Interface("ge-0/0/1.0".into())),
        ];
        sets.sort_by(NatRuleSet::cmp_specificity);
        let names = sets.iter().map(|s| s.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["iface", "zone", "ri"]);
    }

    #[test]
    fn location_serializes_as_kind_and_name() {
        let raw = serde_json::to_string(&NatPacketLocation::Zone("trust".into())).expect("json");
        assert_eq!(raw, r#"{"kind":"zone","name":"trust"}"#);
    }
}
