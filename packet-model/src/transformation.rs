//! Conditional address and port rewriting.
//!
//! A [`Transformation`] is a right-nested decision tree. When the guard
//! matches, its steps are applied and evaluation continues with `and_then`;
//! otherwise evaluation continues with `or_else`. A missing branch ends the
//! walk. Compiled NAT chains use `and_then` for "this rule matched, keep
//! going with the next stage" and `or_else` for "try the next rule".

use std::fmt::{self, Display, Formatter};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};

use crate::acl::EvalContext;
use crate::expr::MatchExpr;
use crate::flow::Flow;
use crate::range::IpRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformationType {
    SourceNat,
    DestinationNat,
    StaticNat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IpField {
    Source,
    Destination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortField {
    Source,
    Destination,
}

/// One primitive rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum TransformationStep {
    /// Rewrite the address to one taken from `ranges`.
    AssignIpFromPool {
        kind: TransformationType,
        field: IpField,
        ranges: Vec<IpRange>,
    },
    /// Rewrite the port to one in `[start, end]`.
    AssignPortFromPool {
        kind: TransformationType,
        field: PortField,
        start: u16,
        end: u16,
    },
    /// Replace the network bits of the address with those of `subnet`, keeping
    /// the host bits.
    ShiftIpIntoSubnet {
        kind: TransformationType,
        field: IpField,
        subnet: IpNetwork,
    },
    /// Matched, but translation is explicitly disabled.
    Noop { kind: TransformationType },
}

impl TransformationStep {
    pub fn kind(&self) -> TransformationType {
        match self {
            Self::AssignIpFromPool { kind, .. }
            | Self::AssignPortFromPool { kind, .. }
            | Self::ShiftIpIntoSubnet { kind, .. }
            | Self::Noop { kind } => *kind,
        }
    }

    /// Apply the step, returning `false` when it could not be applied to this
    /// flow (for example a pool of the other address family).
    fn apply_to(&self, flow: &mut Flow) -> bool {
        match self {
            Self::AssignIpFromPool { field, ranges, .. } => {
                let current = ip_of(flow, *field);
                let Some(range) = ranges
                    .iter()
                    .find(|range| range.low.is_ipv4() == current.is_ipv4())
                else {
                    return false;
                };
                // an address already inside the pool is kept
                if !ranges.iter().any(|range| range.contains(current)) {
                    set_ip(flow, *field, range.low);
                }
                true
            }
            Self::AssignPortFromPool {
                field, start, end, ..
            } => {
                let port = match field {
                    PortField::Source => &mut flow.src_port,
                    PortField::Destination => &mut flow.dst_port,
                };
                if *port < *start || *port > *end {
                    *port = *start;
                }
                true
            }
            Self::ShiftIpIntoSubnet { field, subnet, .. } => {
                let current = ip_of(flow, *field);
                match shift_into(current, *subnet) {
                    Some(shifted) => {
                        set_ip(flow, *field, shifted);
                        true
                    }
                    None => false,
                }
            }
            Self::Noop { .. } => true,
        }
    }
}

impl Display for TransformationStep {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::AssignIpFromPool {
                kind,
                field,
                ranges,
            } => {
                let ranges = ranges.iter().map(ToString::to_string).collect::<Vec<_>>();
                write!(
                    f,
                    "{} assign {} ip from [{}]",
                    kind_label(*kind),
                    ip_field_label(*field),
                    ranges.join(", ")
                )
            }
            Self::AssignPortFromPool {
                kind,
                field,
                start,
                end,
            } => {
                let field = match field {
                    PortField::Source => "src",
                    PortField::Destination => "dst",
                };
                write!(
                    f,
                    "{} assign {field} port from {start}-{end}",
                    kind_label(*kind)
                )
            }
            Self::ShiftIpIntoSubnet {
                kind,
                field,
                subnet,
            } => write!(
                f,
                "{} shift {} ip into {subnet}",
                kind_label(*kind),
                ip_field_label(*field)
            ),
            Self::Noop { kind } => write!(f, "{} noop", kind_label(*kind)),
        }
    }
}

fn kind_label(kind: TransformationType) -> &'static str {
    match kind {
        TransformationType::SourceNat => "snat",
        TransformationType::DestinationNat => "dnat",
        TransformationType::StaticNat => "static",
    }
}

fn ip_field_label(field: IpField) -> &'static str {
    match field {
        IpField::Source => "src",
        IpField::Destination => "dst",
    }
}

fn ip_of(flow: &Flow, field: IpField) -> IpAddr {
    match field {
        IpField::Source => flow.src_ip,
        IpField::Destination => flow.dst_ip,
    }
}

fn set_ip(flow: &mut Flow, field: IpField, ip: IpAddr) {
    match field {
        IpField::Source => flow.src_ip = ip,
        IpField::Destination => flow.dst_ip = ip,
    }
}

fn shift_into(ip: IpAddr, subnet: IpNetwork) -> Option<IpAddr> {
    match (ip, subnet) {
        (IpAddr::V4(ip), IpNetwork::V4(net)) => {
            let mask = u32::from(net.mask());
            let shifted = (u32::from(net.network()) & mask) | (u32::from(ip) & !mask);
            Some(IpAddr::V4(Ipv4Addr::from(shifted)))
        }
        (IpAddr::V6(ip), IpNetwork::V6(net)) => {
            let mask = u128::from(net.mask());
            let shifted = (u128::from(net.network()) & mask) | (u128::from(ip) & !mask);
            Some(IpAddr::V6(Ipv6Addr::from(shifted)))
        }
        _ => None,
    }
}

/// A guarded list of steps with continuation branches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transformation {
    pub guard: MatchExpr,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<TransformationStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub and_then: Option<Box<Transformation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub or_else: Option<Box<Transformation>>,
}

/// Flow after a transformation together with the steps that fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformationResult {
    pub flow: Flow,
    pub steps: Vec<TransformationStep>,
}

impl TransformationResult {
    pub fn translated(&self) -> bool {
        self.steps
            .iter()
            .any(|step| !matches!(step, TransformationStep::Noop { .. }))
    }
}

impl Transformation {
    pub fn when(guard: MatchExpr) -> TransformationBuilder {
        TransformationBuilder {
            guard,
            steps: Vec::new(),
            and_then: None,
            or_else: None,
        }
    }

    pub fn always() -> TransformationBuilder {
        Self::when(MatchExpr::True)
    }

    pub fn apply(&self, flow: &Flow, ctx: &EvalContext<'_>) -> TransformationResult {
        let mut current = flow.clone();
        let mut fired = Vec::new();
        let mut node = Some(self);
        while let Some(transformation) = node {
            if transformation.guard.matches(&current, ctx) {
                for step in &transformation.steps {
                    if step.apply_to(&mut current) {
                        fired.push(step.clone());
                    }
                }
                node = transformation.and_then.as_deref();
            } else {
                node = transformation.or_else.as_deref();
            }
        }
        TransformationResult {
            flow: current,
            steps: fired,
        }
    }

    /// Number of guarded nodes in the tree.
    pub fn node_count(&self) -> usize {
        1 + self.and_then.as_ref().map_or(0, |t| t.node_count())
            + self.or_else.as_ref().map_or(0, |t| t.node_count())
    }
}

#[derive(Debug, Clone)]
pub struct TransformationBuilder {
    guard: MatchExpr,
    steps: Vec<TransformationStep>,
    and_then: Option<Box<Transformation>>,
    or_else: Option<Box<Transformation>>,
}

impl TransformationBuilder {
    pub fn apply(mut self, steps: impl IntoIterator<Item = TransformationStep>) -> Self {
        self.steps.extend(steps);
        self
    }

    pub fn and_then(mut self, next: Option<Transformation>) -> Self {
        self.and_then = next.map(Box::new);
        self
    }

    pub fn or_else(mut self, next: Option<Transformation>) -> Self {
        self.or_else = next.map(Box::new);
        self
    }

    pub fn build(self) -> Transformation {
        Transformation {
            guard: self.guard,
            steps: self.steps,
            and_then: self.and_then,
            or_else: self.or_else,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::IpAddr;

    use crate::acl::EvalContext;
    use crate::expr::MatchExpr;
    use crate::flow::Flow;
    use crate::ip_space::IpSpace;
    use crate::range::IpRange;

    use super::{IpField, PortField, Transformation, TransformationStep, TransformationType};

    fn ip(raw: &str) -> IpAddr {
        raw.parse().expect("ip")
    }

    fn snat_pool(low: &str) -> TransformationStep {
        TransformationStep::AssignIpFromPool {
            kind: TransformationType::SourceNat,
            field: IpField::Source,
            ranges: vec![IpRange::singleton(ip(low))],
        }
    }

    #[test]
    fn guard_miss_falls_through_to_or_else() {
        let inner = Transformation::always().apply([snat_pool("198.51.100.2")]).build();
        let outer = Transformation::when(MatchExpr::src_ip(IpSpace::prefix(
            "10.1.0.0/16".parse().expect("net"),
        )))
        .apply([snat_pool("198.51.100.1")])
        .or_else(Some(inner))
        .build();

        let ctx = EvalContext::empty();
        let hit = Flow::tcp("ge-0/0/1.0", ip("10.1.2.3"), 4000, ip("8.8.8.8"), 53);
        assert_eq!(outer.apply(&hit, &ctx).flow.src_ip, ip("198.51.100.1"));

        let miss = Flow::tcp("ge-0/0/1.0", ip("10.2.2.3"), 4000, ip("8.8.8.8"), 53);
        assert_eq!(outer.apply(&miss, &ctx).flow.src_ip, ip("198.51.100.2"));
    }

    #[test]
    fn and_then_continues_after_match() {
        let ports = Transformation::always()
            .apply([TransformationStep::AssignPortFromPool {
                kind: TransformationType::SourceNat,
                field: PortField::Source,
                start: 1024,
                end: 63487,
            }])
            .build();
        let outer = Transformation::always()
            .apply([snat_pool("198.51.100.1")])
            .and_then(Some(ports))
            .build();
        let flow = Flow::tcp("ge-0/0/1.0", ip("10.1.2.3"), 80, ip("8.8.8.8"), 53);
        let result = outer.apply(&flow, &EvalContext::empty());
        assert_eq!(result.flow.src_port, 1024);
        assert_eq!(result.steps.len(), 2);
        assert_eq!(outer.node_count(), 2);
    }

    #[test]
    fn shift_keeps_host_bits() {
        let shift = Transformation::always()
            .apply([TransformationStep::ShiftIpIntoSubnet {
                kind: TransformationType::StaticNat,
                field: IpField::Destination,
                subnet: "10.9.0.0/16".parse().expect("net"),
            }])
            .build();
        let flow = Flow::tcp("ge-0/0/1.0", ip("8.8.8.8"), 1, ip("203.0.113.77"), 443);
        let result = shift.apply(&flow, &EvalContext::empty());
        assert_eq!(result.flow.dst_ip, ip("10.9.113.77"));
        assert!(result.translated());
    }

    #[test]
    fn noop_records_step_without_translating() {
        let off = Transformation::always()
            .apply([TransformationStep::Noop {
                kind: TransformationType::SourceNat,
            }])
            .build();
        let flow = Flow::tcp("ge-0/0/1.0", ip("10.1.2.3"), 80, ip("8.8.8.8"), 53);
        let result = off.apply(&flow, &EvalContext::empty());
        assert_eq!(result.flow, flow);
        assert_eq!(result.steps.len(), 1);
        assert!(!result.translated());
    }
}
