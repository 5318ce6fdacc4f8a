use std::collections::BTreeSet;

use packet_model::{AclLine, LineAction, MatchExpr};

use crate::convert::applications::Expansion;
use crate::convert::host_inbound;
use crate::convert::match_exprs::{term_predicate, ClauseScope};
use crate::convert::CompileContext;
use crate::representation::{FirewallFilter, FwFrom, FwThen, Term};
use crate::warnings::Warnings;

/// What a term contributes to its filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermAction {
    Line(LineAction),
    /// The term contributes no lines.
    Skip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Terminal {
    Accept,
    Deny,
    NextTerm,
    Nop,
    RoutingInstance,
}

/// Pick the term's action by precedence: accept, discard or reject,
/// next-term, nop, routing-instance.
pub fn resolve_action(
    term: &Term,
    filter: &FirewallFilter,
    context: &str,
    warnings: &mut Warnings,
) -> TermAction {
    let terminals = term
        .thens
        .iter()
        .filter_map(|then| match then {
            FwThen::Accept => Some(Terminal::Accept),
            FwThen::Discard | FwThen::Reject => Some(Terminal::Deny),
            FwThen::NextTerm => Some(Terminal::NextTerm),
            FwThen::Nop => Some(Terminal::Nop),
            FwThen::RoutingInstance { .. } => Some(Terminal::RoutingInstance),
            FwThen::Count { .. } | FwThen::Log | FwThen::Syslog => None,
        })
        .collect::<BTreeSet<_>>();

    if terminals.len() > 1 {
        warnings.red_flag(
            "multiple_actions",
            format!("{context} declares more than one terminating action"),
        );
    }
    if terminals.contains(&Terminal::RoutingInstance) && !filter.filter_based_forwarding {
        warnings.red_flag(
            "routing_instance_action",
            format!("{context} diverts to a routing-instance outside a filter-based-forwarding filter"),
        );
    }

    match terminals.first() {
        Some(Terminal::Accept) | Some(Terminal::Nop) => TermAction::Line(LineAction::Permit),
        Some(Terminal::Deny) => TermAction::Line(LineAction::Deny),
        Some(Terminal::NextTerm) | Some(Terminal::RoutingInstance) => TermAction::Skip,
        None => {
            warnings.red_flag(
                "missing_action",
                format!("{context} has no action; treated as discard"),
            );
            TermAction::Line(LineAction::Deny)
        }
    }
}

/// Compile one term into zero or more ACL lines.
pub fn compile_term(
    term: &Term,
    filter: &FirewallFilter,
    source_zone: Option<&str>,
    destination_zone: Option<&str>,
    ctx: &CompileContext<'_>,
    warnings: &mut Warnings,
) -> Vec<AclLine> {
    let context = format!("filter {} term {}", filter.name, term.name);
    let action = match resolve_action(term, filter, &context, warnings) {
        TermAction::Line(action) => action,
        TermAction::Skip => return Vec::new(),
    };

    let scope = ClauseScope {
        filter,
        source_zone,
        destination_zone,
        context: &context,
    };
    let base = term_predicate(&term.froms, scope, ctx, warnings);

    let expansion_froms = term.froms.iter().filter(|from| from.is_expansion());
    let mut expanded = Vec::new();
    let mut has_expansion = false;
    for from in expansion_froms {
        has_expansion = true;
        expanded.extend(expand(from, &context, ctx, warnings));
    }

    let line = |expr: MatchExpr, label: Option<&str>| {
        let line = AclLine {
            name: Some(term.name.clone()),
            action,
            expr,
            trace: None,
        };
        if !ctx.settings.emit_trace_tags {
            return line;
        }
        match label {
            Some(label) => line.with_trace(format!("{context} ({label})")),
            None => line.with_trace(context.clone()),
        }
    };

    if !has_expansion {
        return vec![line(base, None)];
    }
    expanded
        .into_iter()
        .map(|entry| {
            let entry_expr = ctx.traced(entry.expr, || entry.label.clone());
            line(
                MatchExpr::and(vec![base.clone(), entry_expr]),
                Some(&entry.label),
            )
        })
        .collect()
}

fn expand(
    from: &FwFrom,
    context: &str,
    ctx: &CompileContext<'_>,
    warnings: &mut Warnings,
) -> Vec<Expansion> {
    match from {
        FwFrom::Application { name } => match ctx.applications.expand(name, context, warnings) {
            Some(entries) => entries,
            None => {
                warnings.undefined_reference("application", name, context);
                Vec::new()
            }
        },
        FwFrom::HostInboundProtocol { protocol } => {
            host_inbound::protocol_entries(protocol).unwrap_or_else(|| {
                warnings.unimplemented(
                    "host_inbound_protocol",
                    format!("host-inbound protocol {protocol} in {context} is not modeled"),
                );
                Vec::new()
            })
        }
        FwFrom::HostInboundService { service } => {
            host_inbound::service_entries(service).unwrap_or_else(|| {
                warnings.unimplemented(
                    "host_inbound_service",
                    format!("host-inbound system-service {service} in {context} is not modeled"),
                );
                Vec::new()
            })
        }
        _ => Vec::new(),
    }
}
