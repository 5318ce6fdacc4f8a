//! NAT rules to guards and rewrite steps.

use packet_model::{
    HeaderField, IpField, IpProtocol, IpRange, MatchExpr, PortField, SubRange, TransformationStep,
    TransformationType,
};

use crate::convert::CompileContext;
use crate::error::ConversionError;
use crate::representation::{
    Interface, NatBlock, NatPool, NatRule, NatRuleMatch, NatRuleThen, PortAddressTranslation,
};
use crate::warnings::Warnings;

/// Which NAT stanza a rule comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NatDirection {
    Source,
    Destination,
    /// Static rules applied to arriving traffic.
    StaticForward,
    /// Mirrored static rules applied to departing traffic.
    StaticReverse,
}

impl NatDirection {
    pub fn kind(self) -> TransformationType {
        match self {
            Self::Source => TransformationType::SourceNat,
            Self::Destination => TransformationType::DestinationNat,
            Self::StaticForward | Self::StaticReverse => TransformationType::StaticNat,
        }
    }

    /// The address the rule rewrites.
    pub fn ip_field(self) -> IpField {
        match self {
            Self::Source | Self::StaticReverse => IpField::Source,
            Self::Destination | Self::StaticForward => IpField::Destination,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Destination => "destination",
            Self::StaticForward => "static",
            Self::StaticReverse => "reverse-static",
        }
    }
}

/// Guard of a rule: OR within one field, AND across fields.
pub fn rule_match_expr(
    rule: &NatRule,
    context: &str,
    ctx: &CompileContext<'_>,
    warnings: &mut Warnings,
) -> MatchExpr {
    let mut src_addrs = Vec::new();
    let mut dst_addrs = Vec::new();
    let mut src_ports = Vec::new();
    let mut dst_ports = Vec::new();

    let mut named = |name: &str| match ctx.books.resolve(None, name) {
        Some(space) => Some(space),
        None => {
            warnings.undefined_reference("address-book entry", name, context);
            None
        }
    };
    for clause in &rule.matches {
        match clause {
            NatRuleMatch::SourceAddress { prefix } => src_addrs.push(MatchExpr::src_ip(*prefix)),
            NatRuleMatch::DestinationAddress { prefix } => {
                dst_addrs.push(MatchExpr::dst_ip(*prefix));
            }
            NatRuleMatch::SourceAddressName { name } => {
                src_addrs.push(named(name).map_or(MatchExpr::False, MatchExpr::src_ip));
            }
            NatRuleMatch::DestinationAddressName { name } => {
                dst_addrs.push(named(name).map_or(MatchExpr::False, MatchExpr::dst_ip));
            }
            NatRuleMatch::SourcePort { low, high } => src_ports.push(port_range(*low, *high)),
            NatRuleMatch::DestinationPort { low, high } => dst_ports.push(port_range(*low, *high)),
        }
    }

    let mut conjuncts = Vec::new();
    if !src_ports.is_empty() || !dst_ports.is_empty() {
        conjuncts.push(MatchExpr::protocols(&IpProtocol::PORT_PROTOCOLS));
    }
    for group in [src_addrs, dst_addrs] {
        if !group.is_empty() {
            conjuncts.push(MatchExpr::or(group));
        }
    }
    for (field, ranges) in [(HeaderField::SrcPort, src_ports), (HeaderField::DstPort, dst_ports)] {
        if !ranges.is_empty() {
            conjuncts.push(MatchExpr::field(field, ranges));
        }
    }
    ctx.traced(MatchExpr::and(conjuncts), || context.to_string())
}

fn port_range(low: u16, high: Option<u16>) -> SubRange {
    SubRange::new(u32::from(low), u32::from(high.unwrap_or(low)))
}

/// Default source port range: the block override, else the settings.
pub fn default_pat(block: &NatBlock, ctx: &CompileContext<'_>) -> TransformationStep {
    let (start, end) = block.pat_port_range.map_or(
        (ctx.settings.pat_port_start, ctx.settings.pat_port_end),
        |range| (range.start, range.end),
    );
    TransformationStep::AssignPortFromPool {
        kind: TransformationType::SourceNat,
        field: PortField::Source,
        start,
        end,
    }
}

/// Rewrite steps of a rule.
///
/// `Ok(None)` means the rule cannot rewrite anything and is treated as
/// unmatched; a warning has already been recorded.
pub fn then_steps(
    rule: &NatRule,
    block: &NatBlock,
    direction: NatDirection,
    interface: &Interface,
    context: &str,
    ctx: &CompileContext<'_>,
    warnings: &mut Warnings,
) -> Result<Option<Vec<TransformationStep>>, ConversionError> {
    let kind = direction.kind();
    let Some(then) = &rule.then else {
        warnings.red_flag("nat_rule_without_then", format!("{context} has no then action"));
        return Ok(None);
    };
    match then {
        NatRuleThen::Off => Ok(Some(vec![TransformationStep::Noop { kind }])),
        NatRuleThen::Prefix { prefix } => Ok(Some(vec![TransformationStep::ShiftIpIntoSubnet {
            kind,
            field: direction.ip_field(),
            subnet: *prefix,
        }])),
        NatRuleThen::PrefixName { name } => match ctx.books.prefix(None, name) {
            Some(subnet) => Ok(Some(vec![TransformationStep::ShiftIpIntoSubnet {
                kind,
                field: direction.ip_field(),
                subnet,
            }])),
            None => {
                warnings.red_flag(
                    "nat_prefix_name",
                    format!("{context} rewrites to prefix-name {name}, which is not a single-prefix address-book entry"),
                );
                Ok(None)
            }
        },
        NatRuleThen::Interface => {
            if direction != NatDirection::Source {
                warnings.red_flag(
                    "nat_interface_rewrite",
                    format!("{context} rewrites to the interface address outside source NAT"),
                );
                return Ok(None);
            }
            let Some(address) = interface.primary_address else {
                warnings.red_flag(
                    "nat_interface_without_address",
                    format!(
                        "{context} rewrites to the address of {}, which has none",
                        interface.name
                    ),
                );
                return Ok(None);
            };
            Ok(Some(vec![
                TransformationStep::AssignIpFromPool {
                    kind,
                    field: IpField::Source,
                    ranges: vec![IpRange::singleton(address.ip())],
                },
                default_pat(block, ctx),
            ]))
        }
        NatRuleThen::Pool { name } => match block.pools.get(name) {
            Some(pool) => pool_steps(pool, name, block, direction, ctx).map(Some),
            None => {
                let kind = format!("{} NAT pool", direction.name());
                warnings.undefined_reference(&kind, name, context);
                Ok(None)
            }
        },
    }
}

fn pool_steps(
    pool: &NatPool,
    name: &str,
    block: &NatBlock,
    direction: NatDirection,
    ctx: &CompileContext<'_>,
) -> Result<Vec<TransformationStep>, ConversionError> {
    let kind = direction.kind();
    let range = IpRange::new(pool.from_address, pool.high()).map_err(|source| {
        ConversionError::InvalidRange {
            context: format!("{} NAT pool {name}", direction.name()),
            source,
        }
    })?;
    let mut steps = vec![TransformationStep::AssignIpFromPool {
        kind,
        field: direction.ip_field(),
        ranges: vec![range],
    }];
    match direction {
        NatDirection::Source => match pool.port_address_translation {
            None => steps.push(default_pat(block, ctx)),
            Some(PortAddressTranslation::NoTranslation) => {}
            Some(PortAddressTranslation::Range { start, end }) => {
                steps.push(TransformationStep::AssignPortFromPool {
                    kind,
                    field: PortField::Source,
                    start,
                    end,
                });
            }
        },
        _ => {
            if let Some(port) = pool.port {
                steps.push(TransformationStep::AssignPortFromPool {
                    kind,
                    field: PortField::Destination,
                    start: port,
                    end: port,
                });
            }
        }
    }
    Ok(steps)
}
