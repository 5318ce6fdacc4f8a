use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};

/// Address family a firewall filter is declared under.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Family {
    #[default]
    Inet,
    Inet6,
    Bridge,
    Mpls,
}

impl Family {
    pub fn name(self) -> &'static str {
        match self {
            Self::Inet => "inet",
            Self::Inet6 => "inet6",
            Self::Bridge => "bridge",
            Self::Mpls => "mpls",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FirewallFilter {
    pub name: String,
    pub family: Family,
    pub terms: Vec<Term>,
    /// Zone whose member interfaces are the only ingress this filter applies to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_zone: Option<String>,
    /// Filter is shaped like a routing policy (prefix-list modifiers expected).
    pub routing_policy: bool,
    /// Filter is used for filter-based forwarding.
    pub filter_based_forwarding: bool,
}

impl FirewallFilter {
    pub fn new(name: impl Into<String>, family: Family, terms: Vec<Term>) -> Self {
        Self {
            name: name.into(),
            family,
            terms,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Term {
    pub name: String,
    pub froms: Vec<FwFrom>,
    pub thens: Vec<FwThen>,
}

impl Term {
    pub fn new(name: impl Into<String>, froms: Vec<FwFrom>, thens: Vec<FwThen>) -> Self {
        Self {
            name: name.into(),
            froms,
            thens,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrefixListModifier {
    #[default]
    Exact,
    Except,
    Longer,
    OrLonger,
}

/// One `from` condition of a filter term.
///
/// Range-valued clauses (`ports`, `types`, `codes`, `lengths`, `ttls`) accept
/// a single value, `low-high`, or a well-known keyword where Junos has one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum FwFrom {
    SourceAddress {
        prefix: IpNetwork,
        #[serde(default)]
        except: bool,
    },
    DestinationAddress {
        prefix: IpNetwork,
        #[serde(default)]
        except: bool,
    },
    /// Source or destination.
    Address {
        prefix: IpNetwork,
        #[serde(default)]
        except: bool,
    },
    /// Address-book entry name.
    SourceAddressName {
        name: String,
    },
    DestinationAddressName {
        name: String,
    },
    SourcePrefixList {
        name: String,
        #[serde(default)]
        modifier: PrefixListModifier,
    },
    DestinationPrefixList {
        name: String,
        #[serde(default)]
        modifier: PrefixListModifier,
    },
    PrefixList {
        name: String,
        #[serde(default)]
        modifier: PrefixListModifier,
    },
    SourcePort {
        ports: String,
        #[serde(default)]
        except: bool,
    },
    DestinationPort {
        ports: String,
        #[serde(default)]
        except: bool,
    },
    Port {
        ports: String,
        #[serde(default)]
        except: bool,
    },
    Protocol {
        protocol: String,
        #[serde(default)]
        except: bool,
    },
    IcmpType {
        types: String,
        #[serde(default)]
        except: bool,
    },
    IcmpCode {
        codes: String,
        #[serde(default)]
        except: bool,
    },
    Dscp {
        value: String,
        #[serde(default)]
        except: bool,
    },
    Ttl {
        ttls: String,
    },
    PacketLength {
        lengths: String,
        #[serde(default)]
        except: bool,
    },
    TcpEstablished,
    TcpInitial,
    SourceClass {
        name: String,
    },
    Interface {
        name: String,
    },
    InterfaceSet {
        name: String,
    },
    /// Application or application-set name.
    Application {
        name: String,
    },
    HostInboundProtocol {
        protocol: String,
    },
    HostInboundService {
        service: String,
    },
}

impl FwFrom {
    /// Clauses that expand into one line per entry instead of conjoining.
    pub fn is_expansion(&self) -> bool {
        matches!(
            self,
            Self::Application { .. }
                | Self::HostInboundProtocol { .. }
                | Self::HostInboundService { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum FwThen {
    Accept,
    Discard,
    Reject,
    NextTerm,
    Nop,
    RoutingInstance { name: String },
    Count { name: String },
    Log,
    Syslog,
}
