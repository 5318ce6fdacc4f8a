//! Zone security policies.
//!
//! Traffic leaving an interface that belongs to a zone is filtered by
//! `~SECURITY_POLICY_TO~<iface>`, which layers the fixed defaults, the
//! from-zone policies into that zone, the global policy and the default
//! cross-zone action. Every layer is a separate named ACL so that a trace
//! names the policy that decided.

use std::collections::BTreeMap;

use packet_model::{AclLine, FlowState, IpAccessList, LineAction, MatchExpr};
use tracing::debug;

use crate::convert::filters::compile_filter;
use crate::convert::names;
use crate::convert::CompileContext;
use crate::representation::{Family, FirewallFilter, JuniperConfig, PolicyAction, Zone};
use crate::warnings::Warnings;

/// Policy filters for every from-zone/to-zone pair plus the global policy.
pub fn compile_zone_policies(
    ctx: &CompileContext<'_>,
    warnings: &mut Warnings,
) -> BTreeMap<String, IpAccessList> {
    let mut acls = BTreeMap::new();
    for zone in ctx.config.zones.values() {
        for policy in &zone.from_zone_policies {
            let mut filter = FirewallFilter::new(
                names::zone_policy(&policy.from_zone, &zone.name),
                Family::Inet,
                policy.policies.clone(),
            );
            filter.from_zone = Some(policy.from_zone.clone());
            if let Some(acl) = compile_filter(&filter, Some(&zone.name), ctx, warnings) {
                acls.insert(acl.name.clone(), acl);
            }
        }
    }
    if let Some(terms) = &ctx.config.global_policy {
        let filter =
            FirewallFilter::new(names::GLOBAL_SECURITY_POLICY, Family::Inet, terms.clone());
        if let Some(acl) = compile_filter(&filter, None, ctx, warnings) {
            acls.insert(acl.name.clone(), acl);
        }
    }
    debug!(policies = acls.len(), "compiled zone policies");
    acls
}

/// PERMIT flows that belong to an established or related session.
pub fn existing_connection_acl() -> IpAccessList {
    IpAccessList::new(
        names::EXISTING_CONNECTION,
        vec![AclLine::permitting(MatchExpr::FlowState {
            states: vec![FlowState::Established, FlowState::Related],
        })
        .with_name("existing-connection")],
    )
}

/// Destination zone name to the from-zone policy ACL of `zone` into it.
pub fn to_zone_policies(config: &JuniperConfig, zone: &str) -> BTreeMap<String, String> {
    config
        .zones
        .values()
        .filter(|to| to.from_zone_policies.iter().any(|p| p.from_zone == zone))
        .map(|to| (to.name.clone(), names::zone_policy(zone, &to.name)))
        .collect()
}

fn line_action(action: PolicyAction) -> LineAction {
    match action {
        PolicyAction::Permit => LineAction::Permit,
        PolicyAction::Deny => LineAction::Deny,
    }
}

/// The security policy for traffic leaving `interface` into `zone`.
///
/// `acls` must already hold the policy ACLs; only policies that compiled are
/// referenced.
pub fn security_policy_acl(
    interface: &str,
    zone: &Zone,
    acls: &BTreeMap<String, IpAccessList>,
    ctx: &CompileContext<'_>,
) -> IpAccessList {
    let mut lines = vec![
        AclLine::permitting(MatchExpr::permitted_by(names::EXISTING_CONNECTION))
            .with_name("existing-connection"),
        AclLine::permitting(MatchExpr::OriginatingFromDevice).with_name("from-device"),
    ];

    let policies = zone
        .from_zone_policies
        .iter()
        .map(|policy| names::zone_policy(&policy.from_zone, &zone.name))
        .chain(std::iter::once(names::GLOBAL_SECURITY_POLICY.to_string()))
        .filter(|name| acls.contains_key(name));
    for policy in policies {
        lines.push(policy_line(LineAction::Permit, MatchExpr::permitted_by(&policy), &policy, ctx));
        lines.push(policy_line(
            LineAction::Deny,
            MatchExpr::not(MatchExpr::not_denied_by(&policy)),
            &policy,
            ctx,
        ));
    }

    let catch_all = AclLine {
        name: Some("default-cross-zone".to_string()),
        action: line_action(ctx.config.default_cross_zone_action),
        expr: MatchExpr::True,
        trace: None,
    };
    lines.push(if ctx.settings.emit_trace_tags {
        catch_all.with_trace("default cross-zone action")
    } else {
        catch_all
    });
    IpAccessList::new(names::security_policy_to(interface), lines)
}

fn policy_line(
    action: LineAction,
    expr: MatchExpr,
    policy: &str,
    ctx: &CompileContext<'_>,
) -> AclLine {
    let line = AclLine {
        name: Some(policy.to_string()),
        action,
        expr,
        trace: None,
    };
    if ctx.settings.emit_trace_tags {
        line.with_trace(format!("security policy {policy}"))
    } else {
        line
    }
}

/// PERMIT only what both the security policy and the outgoing filter permit.
pub fn combined_outgoing_acl(interface: &str, policy: &str, outgoing: &str) -> IpAccessList {
    IpAccessList::new(
        names::combined_outgoing_filter(interface),
        vec![AclLine::permitting(MatchExpr::and(vec![
            MatchExpr::permitted_by(policy),
            MatchExpr::permitted_by(outgoing),
        ]))],
    )
}
