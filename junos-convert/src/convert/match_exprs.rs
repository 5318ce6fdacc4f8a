//! Filter-term `from` clauses to packet predicates.
//!
//! Clauses on the same header field are alternatives and clauses on different
//! fields must all hold, so clauses are grouped by [`Slot`] first. Every
//! `except` clause of a slot is folded into a single negated disjunction. Port
//! and ICMP slots are guarded by the protocols that carry those fields. A
//! clause whose reference cannot be resolved forces the whole term to match
//! nothing.

use std::collections::BTreeMap;

use ipnetwork::IpNetwork;
use packet_model::flow::{TCP_ACK, TCP_RST, TCP_SYN};
use packet_model::{HeaderField, IpProtocol, IpSpace, MatchExpr, SubRange};

use crate::convert::CompileContext;
use crate::representation::{Family, FirewallFilter, FwFrom, PrefixListModifier};
use crate::warnings::Warnings;

const PORT_NAMES: &[(&str, u32)] = &[
    ("ftp-data", 20),
    ("ftp", 21),
    ("ssh", 22),
    ("telnet", 23),
    ("smtp", 25),
    ("domain", 53),
    ("bootps", 67),
    ("bootpc", 68),
    ("tftp", 69),
    ("http", 80),
    ("kerberos-sec", 88),
    ("pop3", 110),
    ("ntp", 123),
    ("imap", 143),
    ("snmp", 161),
    ("snmptrap", 162),
    ("bgp", 179),
    ("ldap", 389),
    ("https", 443),
    ("syslog", 514),
    ("ldp", 646),
    ("radius", 1812),
    ("radacct", 1813),
];

const ICMP_TYPE_NAMES: &[(&str, u32)] = &[
    ("echo-reply", 0),
    ("unreachable", 3),
    ("source-quench", 4),
    ("redirect", 5),
    ("echo-request", 8),
    ("router-advertisement", 9),
    ("router-solicit", 10),
    ("time-exceeded", 11),
    ("parameter-problem", 12),
    ("timestamp", 13),
    ("timestamp-reply", 14),
    ("info-request", 15),
    ("info-reply", 16),
    ("mask-request", 17),
    ("mask-reply", 18),
];

const DSCP_NAMES: &[(&str, u32)] = &[
    ("be", 0),
    ("cs0", 0),
    ("cs1", 8),
    ("af11", 10),
    ("af12", 12),
    ("af13", 14),
    ("cs2", 16),
    ("af21", 18),
    ("af22", 20),
    ("af23", 22),
    ("cs3", 24),
    ("af31", 26),
    ("af32", 28),
    ("af33", 30),
    ("cs4", 32),
    ("af41", 34),
    ("af42", 36),
    ("af43", 38),
    ("cs5", 40),
    ("ef", 46),
    ("cs6", 48),
    ("cs7", 56),
];

/// Parse `22`, `1024-2048` or a keyword from `names` into a range bounded by
/// `max`.
pub fn parse_range(raw: &str, names: &[(&str, u32)], max: u32) -> Option<SubRange> {
    let raw = raw.trim();
    let value = |part: &str| -> Option<u32> {
        let part = part.trim();
        part.parse::<u32>().ok().or_else(|| {
            names
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(part))
                .map(|(_, number)| *number)
        })
    };
    let range = match raw.split_once('-') {
        Some((low, high)) if !low.is_empty() && low.chars().all(|c| c.is_ascii_digit()) => {
            SubRange::new(value(low)?, value(high)?)
        }
        _ => SubRange::singleton(value(raw)?),
    };
    (range.start <= range.end && range.end <= max).then_some(range)
}

pub fn parse_ports(raw: &str) -> Option<SubRange> {
    parse_range(raw, PORT_NAMES, u32::from(u16::MAX))
}

pub fn parse_icmp_types(raw: &str) -> Option<SubRange> {
    parse_range(raw, ICMP_TYPE_NAMES, u32::from(u8::MAX))
}

pub fn parse_dscp(raw: &str) -> Option<SubRange> {
    parse_range(raw, DSCP_NAMES, 63)
}

/// Where a filter's named address references resolve.
#[derive(Debug, Clone, Copy)]
pub struct ClauseScope<'s> {
    pub filter: &'s FirewallFilter,
    pub source_zone: Option<&'s str>,
    pub destination_zone: Option<&'s str>,
    /// Human description of the enclosing term for diagnostics.
    pub context: &'s str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Slot {
    SourceAddress,
    DestinationAddress,
    AnyAddress,
    SourcePort,
    DestinationPort,
    AnyPort,
    Protocol,
    IcmpType,
    IcmpCode,
    Dscp,
    PacketLength,
    TcpEstablished,
    TcpInitial,
    Interface,
}

impl Slot {
    fn guard(self, family: Family) -> Option<MatchExpr> {
        match self {
            Self::SourcePort | Self::DestinationPort | Self::AnyPort => {
                Some(MatchExpr::protocols(&IpProtocol::PORT_PROTOCOLS))
            }
            Self::IcmpType | Self::IcmpCode => Some(MatchExpr::protocols(&[icmp_for(family)])),
            _ => None,
        }
    }
}

pub fn icmp_for(family: Family) -> IpProtocol {
    match family {
        Family::Inet6 => IpProtocol::ICMP6,
        _ => IpProtocol::ICMP,
    }
}

#[derive(Debug, Default)]
struct SlotClauses {
    positive: Vec<MatchExpr>,
    except: Vec<MatchExpr>,
}

enum Clause {
    Match {
        slot: Slot,
        except: bool,
        expr: MatchExpr,
    },
    /// Forces the term to match nothing.
    Nothing,
    /// Handled by term expansion.
    Expansion,
}

/// Conjunction of every non-expansion clause of a term.
pub fn term_predicate(
    froms: &[FwFrom],
    scope: ClauseScope<'_>,
    ctx: &CompileContext<'_>,
    warnings: &mut Warnings,
) -> MatchExpr {
    let mut slots: BTreeMap<Slot, SlotClauses> = BTreeMap::new();
    let mut nothing = false;
    for from in froms {
        match compile_clause(from, scope, ctx, warnings) {
            Clause::Match { slot, except, expr } => {
                let entry = slots.entry(slot).or_default();
                let expr = ctx.traced(expr, || describe(from));
                if except {
                    entry.except.push(expr);
                } else {
                    entry.positive.push(expr);
                }
            }
            Clause::Nothing => nothing = true,
            Clause::Expansion => {}
        }
    }
    if nothing {
        return MatchExpr::False;
    }

    let family = scope.filter.family;
    let conjuncts = slots.into_iter().map(|(slot, clauses)| {
        let guard = slot.guard(family);
        let mut parts = Vec::new();
        if !clauses.positive.is_empty() {
            parts.push(MatchExpr::and(
                guard.clone().into_iter().chain([MatchExpr::or(clauses.positive)]),
            ));
        }
        if !clauses.except.is_empty() {
            parts.push(MatchExpr::not(MatchExpr::and(
                guard.into_iter().chain([MatchExpr::or(clauses.except)]),
            )));
        }
        MatchExpr::and(parts)
    });
    MatchExpr::and(conjuncts.collect::<Vec<_>>())
}

fn compile_clause(
    from: &FwFrom,
    scope: ClauseScope<'_>,
    ctx: &CompileContext<'_>,
    warnings: &mut Warnings,
) -> Clause {
    let matched = |slot, except, expr| Clause::Match { slot, except, expr };
    match from {
        FwFrom::SourceAddress { prefix, except } => {
            matched(Slot::SourceAddress, *except, MatchExpr::src_ip(*prefix))
        }
        FwFrom::DestinationAddress { prefix, except } => {
            matched(Slot::DestinationAddress, *except, MatchExpr::dst_ip(*prefix))
        }
        FwFrom::Address { prefix, except } => matched(
            Slot::AnyAddress,
            *except,
            either_direction(IpSpace::prefix(*prefix)),
        ),
        FwFrom::SourceAddressName { name } => {
            match ctx.books.resolve(scope.source_zone, name) {
                Some(space) => matched(Slot::SourceAddress, false, MatchExpr::src_ip(space)),
                None => {
                    warnings.undefined_reference("address-book entry", name, scope.context);
                    Clause::Nothing
                }
            }
        }
        FwFrom::DestinationAddressName { name } => {
            match ctx.books.resolve(scope.destination_zone, name) {
                Some(space) => matched(Slot::DestinationAddress, false, MatchExpr::dst_ip(space)),
                None => {
                    warnings.undefined_reference("address-book entry", name, scope.context);
                    Clause::Nothing
                }
            }
        }
        FwFrom::SourcePrefixList { name, modifier } => {
            prefix_list_clause(name, *modifier, Slot::SourceAddress, scope, ctx, warnings)
        }
        FwFrom::DestinationPrefixList { name, modifier } => {
            prefix_list_clause(name, *modifier, Slot::DestinationAddress, scope, ctx, warnings)
        }
        FwFrom::PrefixList { name, modifier } => {
            prefix_list_clause(name, *modifier, Slot::AnyAddress, scope, ctx, warnings)
        }
        FwFrom::SourcePort { ports, except } => {
            range_clause(ports, *except, Slot::SourcePort, scope, warnings, |raw| {
                parse_ports(raw).map(|r| MatchExpr::field(HeaderField::SrcPort, [r]))
            })
        }
        FwFrom::DestinationPort { ports, except } => {
            range_clause(ports, *except, Slot::DestinationPort, scope, warnings, |raw| {
                parse_ports(raw).map(|r| MatchExpr::field(HeaderField::DstPort, [r]))
            })
        }
        FwFrom::Port { ports, except } => {
            range_clause(ports, *except, Slot::AnyPort, scope, warnings, |raw| {
                parse_ports(raw).map(|r| {
                    MatchExpr::or(vec![
                        MatchExpr::field(HeaderField::SrcPort, [r]),
                        MatchExpr::field(HeaderField::DstPort, [r]),
                    ])
                })
            })
        }
        FwFrom::Protocol { protocol, except } => match IpProtocol::from_name(protocol) {
            Some(number) => matched(Slot::Protocol, *except, MatchExpr::protocols(&[number])),
            None => {
                warnings.red_flag(
                    "unknown_protocol",
                    format!("unknown protocol '{protocol}' in {}", scope.context),
                );
                Clause::Nothing
            }
        },
        FwFrom::IcmpType { types, except } => {
            range_clause(types, *except, Slot::IcmpType, scope, warnings, |raw| {
                parse_icmp_types(raw).map(|r| MatchExpr::field(HeaderField::IcmpType, [r]))
            })
        }
        FwFrom::IcmpCode { codes, except } => {
            range_clause(codes, *except, Slot::IcmpCode, scope, warnings, |raw| {
                parse_range(raw, &[], u32::from(u8::MAX))
                    .map(|r| MatchExpr::field(HeaderField::IcmpCode, [r]))
            })
        }
        FwFrom::Dscp { value, except } => {
            range_clause(value, *except, Slot::Dscp, scope, warnings, |raw| {
                parse_dscp(raw).map(|r| MatchExpr::field(HeaderField::Dscp, [r]))
            })
        }
        FwFrom::PacketLength { lengths, except } => {
            range_clause(lengths, *except, Slot::PacketLength, scope, warnings, |raw| {
                parse_range(raw, &[], u32::from(u16::MAX))
                    .map(|r| MatchExpr::field(HeaderField::PacketLength, [r]))
            })
        }
        FwFrom::Ttl { ttls } => {
            warnings.unimplemented(
                "ttl_match",
                format!("ttl {ttls} in {} is not modeled; term matches nothing", scope.context),
            );
            Clause::Nothing
        }
        FwFrom::SourceClass { name } => {
            warnings.unimplemented(
                "source_class_match",
                format!(
                    "source-class {name} in {} is not modeled; term matches nothing",
                    scope.context
                ),
            );
            Clause::Nothing
        }
        FwFrom::TcpEstablished => matched(
            Slot::TcpEstablished,
            false,
            MatchExpr::and(vec![
                MatchExpr::protocols(&[IpProtocol::TCP]),
                MatchExpr::or(vec![
                    MatchExpr::TcpFlags {
                        set: TCP_ACK,
                        unset: 0,
                    },
                    MatchExpr::TcpFlags {
                        set: TCP_RST,
                        unset: 0,
                    },
                ]),
            ]),
        ),
        FwFrom::TcpInitial => matched(
            Slot::TcpInitial,
            false,
            MatchExpr::TcpFlags {
                set: TCP_SYN,
                unset: TCP_ACK,
            },
        ),
        FwFrom::Interface { name } => {
            matched(Slot::Interface, false, MatchExpr::src_interfaces([name.as_str()]))
        }
        FwFrom::InterfaceSet { name } => match ctx.config.interface_sets.get(name) {
            Some(members) => matched(
                Slot::Interface,
                false,
                MatchExpr::src_interfaces(members.iter().map(String::as_str)),
            ),
            None => {
                warnings.undefined_reference("interface-set", name, scope.context);
                Clause::Nothing
            }
        },
        FwFrom::Application { .. }
        | FwFrom::HostInboundProtocol { .. }
        | FwFrom::HostInboundService { .. } => Clause::Expansion,
    }
}

fn either_direction(space: IpSpace) -> MatchExpr {
    MatchExpr::or(vec![MatchExpr::src_ip(space.clone()), MatchExpr::dst_ip(space)])
}

fn range_clause(
    raw: &str,
    except: bool,
    slot: Slot,
    scope: ClauseScope<'_>,
    warnings: &mut Warnings,
    parse: impl Fn(&str) -> Option<MatchExpr>,
) -> Clause {
    match parse(raw) {
        Some(expr) => Clause::Match { slot, except, expr },
        None => {
            warnings.red_flag(
                "invalid_range",
                format!("cannot interpret '{raw}' in {}", scope.context),
            );
            Clause::Nothing
        }
    }
}

fn prefix_list_clause(
    name: &str,
    modifier: PrefixListModifier,
    slot: Slot,
    scope: ClauseScope<'_>,
    ctx: &CompileContext<'_>,
    warnings: &mut Warnings,
) -> Clause {
    let Some(list) = ctx.config.prefix_lists.get(name) else {
        warnings.undefined_reference("prefix-list", name, scope.context);
        return Clause::Nothing;
    };
    if matches!(modifier, PrefixListModifier::Longer | PrefixListModifier::OrLonger)
        && !scope.filter.routing_policy
    {
        warnings.pedantic(
            "prefix_list_modifier",
            format!(
                "prefix-list {name} uses a routing-policy modifier in packet filter {}",
                scope.context
            ),
        );
    }
    let prefixes = list
        .prefixes
        .iter()
        .filter(|prefix| modifier != PrefixListModifier::Longer || has_longer(prefix))
        .map(|prefix| IpSpace::prefix(*prefix));
    let space = IpSpace::union(prefixes);
    let expr = match slot {
        Slot::SourceAddress => MatchExpr::src_ip(space),
        Slot::DestinationAddress => MatchExpr::dst_ip(space),
        _ => either_direction(space),
    };
    Clause::Match {
        slot,
        except: modifier == PrefixListModifier::Except,
        expr,
    }
}

/// A strictly longer prefix exists inside `prefix`.
fn has_longer(prefix: &IpNetwork) -> bool {
    match prefix {
        IpNetwork::V4(net) => net.prefix() < 32,
        IpNetwork::V6(net) => net.prefix() < 128,
    }
}

fn describe(from: &FwFrom) -> String {
    let except = |flag: bool| if flag { " except" } else { "" };
    match from {
        FwFrom::SourceAddress { prefix, except: e } => {
            format!("source-address {prefix}{}", except(*e))
        }
        FwFrom::DestinationAddress { prefix, except: e } => {
            format!("destination-address {prefix}{}", except(*e))
        }
        FwFrom::Address { prefix, except: e } => format!("address {prefix}{}", except(*e)),
        FwFrom::SourceAddressName { name } => format!("source-address {name}"),
        FwFrom::DestinationAddressName { name } => format!("destination-address {name}"),
        FwFrom::SourcePrefixList { name, .. } => format!("source-prefix-list {name}"),
        FwFrom::DestinationPrefixList { name, .. } => format!("destination-prefix-list {name}"),
        FwFrom::PrefixList { name, .. } => format!("prefix-list {name}"),
        FwFrom::SourcePort { ports, except: e } => format!("source-port {ports}{}", except(*e)),
        FwFrom::DestinationPort { ports, except: e } => {
            format!("destination-port {ports}{}", except(*e))
        }
        FwFrom::Port { ports, except: e } => format!("port {ports}{}", except(*e)),
        FwFrom::Protocol { protocol, except: e } => format!("protocol {protocol}{}", except(*e)),
        FwFrom::IcmpType { types, except: e } => format!("icmp-type {types}{}", except(*e)),
        FwFrom::IcmpCode { codes, except: e } => format!("icmp-code {codes}{}", except(*e)),
        FwFrom::Dscp { value, except: e } => format!("dscp {value}{}", except(*e)),
        FwFrom::Ttl { ttls } => format!("ttl {ttls}"),
        FwFrom::PacketLength { lengths, except: e } => {
            format!("packet-length {lengths}{}", except(*e))
        }
        FwFrom::TcpEstablished => "tcp-established".to_string(),
        FwFrom::TcpInitial => "tcp-initial".to_string(),
        FwFrom::SourceClass { name } => format!("source-class {name}"),
        FwFrom::Interface { name } => format!("interface {name}"),
        FwFrom::InterfaceSet { name } => format!("interface-set {name}"),
        FwFrom::Application { name } => format!("application {name}"),
        FwFrom::HostInboundProtocol { protocol } => format!("host-inbound-protocol {protocol}"),
        FwFrom::HostInboundService { service } => format!("host-inbound-service {service}"),
    }
}
