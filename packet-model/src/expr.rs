//! Boolean packet predicates.
//!
//! A [`MatchExpr`] is a closed expression tree over header fields, ingress
//! interface, connection state and references to other access lists. Leaves
//! are evaluated against a [`Flow`]; named references (IP spaces and ACLs)
//! resolve through an [`EvalContext`].
//!
//! The smart constructors [`MatchExpr::and`], [`MatchExpr::or`] and
//! [`MatchExpr::not`] fold literal `true`/`false` operands so compiled output
//! stays readable. They never reorder or flatten operands, which keeps trace
//! annotations where the compiler put them.

use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::acl::{EvalContext, LineAction};
use crate::flow::{Flow, FlowState};
use crate::ip_space::IpSpace;
use crate::protocol::IpProtocol;
use crate::sub_range::SubRange;

/// Header fields that can be matched against integer ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderField {
    IpProtocol,
    SrcPort,
    DstPort,
    IcmpType,
    IcmpCode,
    Dscp,
    Ttl,
    PacketLength,
}

impl Display for HeaderField {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::IpProtocol => "ip_protocol",
            Self::SrcPort => "src_port",
            Self::DstPort => "dst_port",
            Self::IcmpType => "icmp_type",
            Self::IcmpCode => "icmp_code",
            Self::Dscp => "dscp",
            Self::Ttl => "ttl",
            Self::PacketLength => "packet_length",
        };
        write!(f, "{name}")
    }
}

/// A boolean predicate over packets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatchExpr {
    True,
    False,
    SrcIp {
        space: IpSpace,
    },
    DstIp {
        space: IpSpace,
    },
    /// Field value lies in any of `ranges`.
    Field {
        field: HeaderField,
        ranges: Vec<SubRange>,
    },
    /// All bits of `set` are set and all bits of `unset` are clear.
    TcpFlags {
        set: u8,
        unset: u8,
    },
    FlowState {
        states: Vec<FlowState>,
    },
    SrcInterface {
        interfaces: BTreeSet<String>,
    },
    OriginatingFromDevice,
    /// The named ACL permits the flow. With `default_accept`, a flow that
    /// reaches the end of the ACL without matching counts as permitted.
    PermittedByAcl {
        acl: String,
        default_accept: bool,
    },
    And {
        conjuncts: Vec<MatchExpr>,
    },
    Or {
        disjuncts: Vec<MatchExpr>,
    },
    Not {
        expr: Box<MatchExpr>,
    },
    /// Annotation for explainability; does not change matching.
    Traced {
        trace: String,
        expr: Box<MatchExpr>,
    },
}

impl MatchExpr {
    pub fn and(conjuncts: impl IntoIterator<Item = MatchExpr>) -> Self {
        let mut kept = Vec::new();
        for conjunct in conjuncts {
            match conjunct {
                Self::True => {}
                Self::False => return Self::False,
                other => kept.push(other),
            }
        }
        match kept.len() {
            0 => Self::True,
            1 => kept.remove(0),
            _ => Self::And { conjuncts: kept },
        }
    }

    pub fn or(disjuncts: impl IntoIterator<Item = MatchExpr>) -> Self {
        let mut kept = Vec::new();
        for disjunct in disjuncts {
            match disjunct {
                Self::False => {}
                Self::True => return Self::True,
                other => kept.push(other),
            }
        }
        match kept.len() {
            0 => Self::False,
            1 => kept.remove(0),
            _ => Self::Or { disjuncts: kept },
        }
    }

    pub fn not(expr: MatchExpr) -> Self {
        match expr {
            Self::True => Self::False,
            Self::False => Self::True,
            Self::Not { expr } => *expr,
            other => Self::Not {
                expr: Box::new(other),
            },
        }
    }

    pub fn traced(expr: MatchExpr, trace: impl Into<String>) -> Self {
        Self::Traced {
            trace: trace.into(),
            expr: Box::new(expr),
        }
    }

    pub fn src_ip(space: impl Into<IpSpace>) -> Self {
        Self::SrcIp {
            space: space.into(),
        }
    }

    pub fn dst_ip(space: impl Into<IpSpace>) -> Self {
        Self::DstIp {
            space: space.into(),
        }
    }

    pub fn field(field: HeaderField, ranges: impl IntoIterator<Item = SubRange>) -> Self {
        Self::Field {
            field,
            ranges: ranges.into_iter().collect(),
        }
    }

    pub fn protocols(protocols: &[IpProtocol]) -> Self {
        Self::field(
            HeaderField::IpProtocol,
            protocols
                .iter()
                .map(|p| SubRange::singleton(u32::from(p.number()))),
        )
    }

    pub fn src_interfaces<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self::SrcInterface {
            interfaces: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn permitted_by(acl: impl Into<String>) -> Self {
        Self::PermittedByAcl {
            acl: acl.into(),
            default_accept: false,
        }
    }

    /// Permitted by `acl` or unmatched by every line of it.
    pub fn not_denied_by(acl: impl Into<String>) -> Self {
        Self::PermittedByAcl {
            acl: acl.into(),
            default_accept: true,
        }
    }

    /// Strip any trace wrappers from the top of the expression.
    pub fn untraced(&self) -> &MatchExpr {
        let mut current = self;
        while let Self::Traced { expr, .. } = current {
            current = expr;
        }
        current
    }

    pub fn matches(&self, flow: &Flow, ctx: &EvalContext<'_>) -> bool {
        match self {
            Self::True => true,
            Self::False => false,
            Self::SrcIp { space } => space.contains(flow.src_ip, ctx.ip_spaces),
            Self::DstIp { space } => space.contains(flow.dst_ip, ctx.ip_spaces),
            Self::Field { field, ranges } => {
                let value = flow.header_value(*field);
                ranges.iter().any(|range| range.contains(value))
            }
            Self::TcpFlags { set, unset } => {
                flow.ip_protocol == IpProtocol::TCP
                    && flow.tcp_flags & set == *set
                    && flow.tcp_flags & unset == 0
            }
            Self::FlowState { states } => states.contains(&flow.state),
            Self::SrcInterface { interfaces } => flow
                .ingress_interface
                .as_ref()
                .is_some_and(|iface| interfaces.contains(iface)),
            Self::OriginatingFromDevice => flow.ingress_interface.is_none(),
            Self::PermittedByAcl {
                acl,
                default_accept,
            } => {
                let Some(list) = ctx.acls.get(acl) else {
                    return false;
                };
                let result = list.filter(flow, ctx);
                match result.line {
                    Some(_) => result.action == LineAction::Permit,
                    None => *default_accept,
                }
            }
            Self::And { conjuncts } => conjuncts.iter().all(|c| c.matches(flow, ctx)),
            Self::Or { disjuncts } => disjuncts.iter().any(|d| d.matches(flow, ctx)),
            Self::Not { expr } => !expr.matches(flow, ctx),
            Self::Traced { expr, .. } => expr.matches(flow, ctx),
        }
    }
}

impl Display for MatchExpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::True => write!(f, "true"),
            Self::False => write!(f, "false"),
            Self::SrcIp { space } => write!(f, "src_ip in {space}"),
            Self::DstIp { space } => write!(f, "dst_ip in {space}"),
            Self::Field { field, ranges } => {
                write!(f, "{field} in ")?;
                write_list(f, ranges)
            }
            Self::TcpFlags { set, unset } => write!(f, "tcp_flags set={set:#04x} unset={unset:#04x}"),
            Self::FlowState { states } => {
                let names = states
                    .iter()
                    .map(|s| format!("{s:?}").to_ascii_lowercase())
                    .collect::<Vec<_>>();
                write!(f, "state in [{}]", names.join(", "))
            }
            Self::SrcInterface { interfaces } => {
                let names = interfaces.iter().cloned().collect::<Vec<_>>();
                write!(f, "src_interface in [{}]", names.join(", "))
            }
            Self::OriginatingFromDevice => write!(f, "originating_from_device"),
            Self::PermittedByAcl {
                acl,
                default_accept,
            } => {
                if *default_accept {
                    write!(f, "not_denied_by({acl})")
                } else {
                    write!(f, "permitted_by({acl})")
                }
            }
            Self::And { conjuncts } => {
                write!(f, "and(")?;
                write_joined(f, conjuncts)?;
                write!(f, ")")
            }
            Self::Or { disjuncts } => {
                write!(f, "or(")?;
                write_joined(f, disjuncts)?;
                write!(f, ")")
            }
            Self::Not { expr } => write!(f, "not({expr})"),
            Self::Traced { expr, .. } => write!(f, "{expr}"),
        }
    }
}

fn write_list(f: &mut Formatter<'_>, ranges: &[SubRange]) -> fmt::Result {
    write!(f, "[")?;
    for (idx, range) in ranges.iter().enumerate() {
        if idx > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{range}")?;
    }
    write!(f, "]")
}

fn write_joined(f: &mut Formatter<'_>, exprs: &[MatchExpr]) -> fmt::Result {
    for (idx, expr) in exprs.iter().enumerate() {
        if idx > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{expr}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crate::acl::{AclLine, EvalContext, IpAccessList};
    use crate::flow::Flow;
    use crate::ip_space::IpSpace;
    use crate::protocol::IpProtocol;

    use super::MatchExpr;

    fn ip(raw: &str) -> std::net::IpAddr {
        raw.parse().expect("ip")
    }

    #[test]
    fn and_or_fold_literals() {
        assert_eq!(MatchExpr::and(Vec::new()), MatchExpr::True);
        assert_eq!(MatchExpr::or(Vec::new()), MatchExpr::False);
        assert_eq!(
            MatchExpr::and(vec![MatchExpr::True, MatchExpr::False]),
            MatchExpr::False
        );
        assert_eq!(
            MatchExpr::or(vec![MatchExpr::False, MatchExpr::OriginatingFromDevice]),
            MatchExpr::OriginatingFromDevice
        );
        assert_eq!(
            MatchExpr::not(MatchExpr::not(MatchExpr::OriginatingFromDevice)),
            MatchExpr::OriginatingFromDevice
        );
    }

    #[test]
    fn evaluates_header_fields() {
        let acls = BTreeMap::new();
        let spaces = BTreeMap::new();
        let ctx = EvalContext::new(&acls, &spaces);
        let expr = MatchExpr::and(vec![
            MatchExpr::src_ip(IpSpace::prefix("10.0.0.0/8".parse().expect("net"))),
            MatchExpr::protocols(&[IpProtocol::TCP]),
        ]);
        let flow = Flow::tcp("ge-0/0/0.0", ip("10.1.1.1"), 40000, ip("192.0.2.1"), 80);
        assert!(expr.matches(&flow, &ctx));
        let udp = Flow::udp("ge-0/0/0.0", ip("10.1.1.1"), 40000, ip("192.0.2.1"), 80);
        assert!(!expr.matches(&udp, &ctx));
    }

    #[test]
    fn permitted_by_acl_respects_default_accept() {
        let mut acls = BTreeMap::new();
        acls.insert(
            "only-web".to_string(),
            IpAccessList::new(
                "only-web",
                vec![AclLine::denying(MatchExpr::protocols(&[IpProtocol::UDP]))],
            ),
        );
        let spaces = BTreeMap::new();
        let ctx = EvalContext::new(&acls, &spaces);
        let tcp = Flow::tcp("ge-0/0/0.0", ip("10.1.1.1"), 1, ip("10.2.2.2"), 2);

        assert!(!MatchExpr::permitted_by("only-web").matches(&tcp, &ctx));
        assert!(MatchExpr::not_denied_by("only-web").matches(&tcp, &ctx));
        assert!(!MatchExpr::permitted_by("missing").matches(&tcp, &ctx));
    }

    #[test]
    fn traced_renders_inner_expression() {
        let expr = MatchExpr::traced(MatchExpr::OriginatingFromDevice, "from host");
        assert_eq!(expr.to_string(), "originating_from_device");
        assert_eq!(expr.untraced(), &MatchExpr::OriginatingFromDevice);
    }
}
