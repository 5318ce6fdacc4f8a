//! Rule-set selection and the fold into one transformation per interface.
//!
//! Within a rule set the first matching rule wins. Across rule sets the most
//! specific location tier is tried first and falls back to the next tier when
//! none of its rules match.

use packet_model::{MatchExpr, Transformation};

use crate::convert::nat_locations::LocationMap;
use crate::convert::nat_rules::{rule_match_expr, then_steps, NatDirection};
use crate::convert::CompileContext;
use crate::error::ConversionError;
use crate::representation::{Interface, JuniperConfig, NatBlock, NatPacketLocation, NatRuleSet};
use crate::warnings::Warnings;

/// The locations `interface` sits in, most specific first.
fn locations_of(config: &JuniperConfig, interface: &str) -> Vec<NatPacketLocation> {
    let mut out = vec![NatPacketLocation::Interface(interface.to_string())];
    if let Some(zone) = config.zone_of(interface) {
        out.push(NatPacketLocation::Zone(zone.name.clone()));
    }
    out.push(NatPacketLocation::RoutingInstance(
        config.routing_instance_of(interface).to_string(),
    ));
    out
}

/// Rule sets whose to-location contains `interface`, most specific first.
pub fn outgoing_rule_sets<'b>(
    block: &'b NatBlock,
    interface: &str,
    config: &JuniperConfig,
) -> Vec<&'b NatRuleSet> {
    let locations = locations_of(config, interface);
    let mut sets = block
        .rule_sets
        .iter()
        .filter(|rs| rs.to.as_ref().is_some_and(|to| locations.contains(to)))
        .collect::<Vec<_>>();
    sets.sort_by(|a, b| a.cmp_specificity(b));
    sets
}

/// The first declared rule set per from-location tier, least specific first.
pub fn incoming_rule_sets<'b>(
    block: &'b NatBlock,
    interface: &str,
    config: &JuniperConfig,
) -> Vec<&'b NatRuleSet> {
    locations_of(config, interface)
        .iter()
        .rev()
        .filter_map(|location| {
            block
                .rule_sets
                .iter()
                .find(|rs| rs.from.as_ref() == Some(location))
        })
        .collect()
}

/// Rules of one rule set in order, ending in `fallback`.
///
/// `location_guard` is conjoined into every rule guard. The result holds one
/// node per compiled rule on top of `fallback`.
pub fn rule_set_chain(
    rule_set: &NatRuleSet,
    block: &NatBlock,
    direction: NatDirection,
    interface: &Interface,
    location_guard: Option<&MatchExpr>,
    ctx: &CompileContext<'_>,
    fallback: Option<Transformation>,
    warnings: &mut Warnings,
) -> Result<Option<Transformation>, ConversionError> {
    let mut acc = fallback;
    for rule in rule_set.rules.iter().rev() {
        let context = format!(
            "{} NAT rule-set {} rule {}",
            direction.name(),
            rule_set.name,
            rule.name
        );
        let Some(steps) = then_steps(rule, block, direction, interface, &context, ctx, warnings)?
        else {
            continue;
        };
        let rule_guard = rule_match_expr(rule, &context, ctx, warnings);
        let guard = match location_guard {
            Some(location) => MatchExpr::and([location.clone(), rule_guard]),
            None => rule_guard,
        };
        acc = Some(Transformation::when(guard).apply(steps).or_else(acc).build());
    }
    Ok(acc)
}

/// Transformation for traffic leaving `interface`.
pub fn outgoing_transformation(
    block: &NatBlock,
    direction: NatDirection,
    interface: &Interface,
    locations: &LocationMap,
    ctx: &CompileContext<'_>,
    fallback: Option<Transformation>,
    warnings: &mut Warnings,
) -> Result<Option<Transformation>, ConversionError> {
    let mut acc = fallback;
    for rule_set in outgoing_rule_sets(block, &interface.name, ctx.config).into_iter().rev() {
        let guard = match &rule_set.from {
            None => None,
            Some(from) => match locations.get(from) {
                Some(guard) => Some(guard),
                None => {
                    warnings.undefined_reference(
                        "NAT location",
                        &from.to_string(),
                        &format!("{} NAT rule-set {}", direction.name(), rule_set.name),
                    );
                    continue;
                }
            },
        };
        acc = rule_set_chain(
            rule_set,
            block,
            direction,
            interface,
            guard,
            ctx,
            acc,
            warnings,
        )?;
    }
    Ok(acc)
}

/// Transformation for traffic arriving on `interface`.
pub fn incoming_transformation(
    block: &NatBlock,
    direction: NatDirection,
    interface: &Interface,
    ctx: &CompileContext<'_>,
    fallback: Option<Transformation>,
    warnings: &mut Warnings,
) -> Result<Option<Transformation>, ConversionError> {
    let mut acc = fallback;
    for rule_set in incoming_rule_sets(block, &interface.name, ctx.config) {
        acc = rule_set_chain(rule_set, block, direction, interface, None, ctx, acc, warnings)?;
    }
    Ok(acc)
}
